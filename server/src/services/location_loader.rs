use std::time::Duration;

use tracing::warn;

use crate::services::feed_loader;
use crate::state::{AppState, OverrideFeed};

/// Poll the remote override feed; a changed feed triggers a season rescan so
/// integrity reports reflect the new locations.
pub async fn run(state: AppState, url: String, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // First tick fires immediately; startup already fetched once.
    interval.tick().await;

    loop {
        interval.tick().await;
        if refresh(&state, &url).await {
            feed_loader::scan(&state).await;
        }
    }
}

/// Fetch once and swap the feed in. Returns `true` when the overrides changed.
pub async fn refresh(state: &AppState, url: &str) -> bool {
    match fetch_overrides(&state.http_client, url).await {
        Ok(feed) => feed_loader::replace_overrides(state, feed).await,
        Err(e) => {
            warn!(error = %e, %url, "failed to fetch location overrides");
            false
        }
    }
}

async fn fetch_overrides(
    client: &reqwest::Client,
    url: &str,
) -> Result<OverrideFeed, Box<dyn std::error::Error + Send + Sync>> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    Ok(OverrideFeed::from_bytes(bytes)?)
}
