use std::fmt;

use frcmap_shared::locations::{apply_overrides, spread_collisions};
use frcmap_shared::{
    Graph, JoinSummary, LocationOverrides, OverrideReport, RawFeed, join, parse_feed,
    season_file_name,
};
use gloo_timers::future::TimeoutFuture;

pub const MAX_LOAD_ATTEMPTS: u32 = 5;
const LOAD_RETRY_BASE_MS: u32 = 500;
const LOAD_RETRY_MAX_MS: u32 = 8_000;

/// Delay before the next attempt after `consecutive_failures` failed loads.
pub fn load_backoff_ms(consecutive_failures: u32) -> u32 {
    let exponent = consecutive_failures.saturating_sub(1).min(6);
    (LOAD_RETRY_BASE_MS << exponent).min(LOAD_RETRY_MAX_MS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Network(String),
    Status(u16),
    Parse(String),
}

impl FetchError {
    /// Missing files and malformed feeds will not fix themselves on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(status) => *status >= 500 || *status == 429,
            FetchError::Parse(_) => false,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(e) => write!(f, "fetch error: {e}"),
            FetchError::Status(status) => write!(f, "HTTP {status}"),
            FetchError::Parse(e) => write!(f, "parse error: {e}"),
        }
    }
}

async fn fetch_text(url: &str) -> Result<String, FetchError> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }

    resp.text()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))
}

pub async fn fetch_season(year: i32) -> Result<RawFeed, FetchError> {
    let text = fetch_text(&format!("/data/{}", season_file_name(year))).await?;
    parse_feed(&text).map_err(|e| FetchError::Parse(e.to_string()))
}

pub async fn fetch_overrides() -> Result<LocationOverrides, FetchError> {
    let text = fetch_text("/data/locations.json").await?;
    serde_json::from_str(&text).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Seasons the server has feeds for, oldest first, plus the newest one.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct SeasonIndex {
    pub seasons: Vec<i32>,
    pub latest: Option<i32>,
}

pub async fn fetch_season_index() -> Result<SeasonIndex, String> {
    let resp = gloo_net::http::Request::get("/api/seasons")
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<SeasonIndex>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// A season ready to hand to the map.
pub struct LoadedSeason {
    pub graph: Graph,
    pub summary: JoinSummary,
    pub overrides: OverrideReport,
}

/// Apply overrides, separate colliding markers and link the records.
/// Integrity problems are logged and the affected references dropped.
pub fn prepare(mut feed: RawFeed, overrides: &LocationOverrides) -> LoadedSeason {
    let report = apply_overrides(&mut feed, overrides);
    if report.unmatched > 0 || report.invalid > 0 {
        log::info!(
            "location overrides: {} relocated, {} ignored, {} unmatched, {} invalid",
            report.relocated,
            report.ignored,
            report.unmatched,
            report.invalid
        );
    }
    let spread = spread_collisions(&mut feed);
    if spread > 0 {
        log::debug!("spread {spread} colliding markers");
    }

    let outcome = join(&feed);
    let summary = outcome.summary();
    LoadedSeason {
        graph: outcome.graph,
        summary,
        overrides: report,
    }
}

/// Fetch the override feed and one season, retrying transient failures.
/// A missing override feed is not fatal.
pub async fn load_season(year: i32) -> Result<LoadedSeason, String> {
    let overrides = match fetch_overrides().await {
        Ok(overrides) => overrides,
        Err(e) => {
            log::warn!("location overrides unavailable: {e}");
            LocationOverrides::default()
        }
    };

    let mut failures = 0;
    let feed = loop {
        match fetch_season(year).await {
            Ok(feed) => break feed,
            Err(e) => {
                failures += 1;
                if !e.is_retryable() || failures >= MAX_LOAD_ATTEMPTS {
                    return Err(e.to_string());
                }
                let delay = load_backoff_ms(failures);
                log::warn!("season {year} load failed ({e}); retrying in {delay} ms");
                TimeoutFuture::new(delay).await;
            }
        }
    };

    let loaded = prepare(feed, &overrides);
    log::info!(
        "season {year}: {} teams, {} events, {} edges, {} integrity errors, {} relocated",
        loaded.summary.teams,
        loaded.summary.events,
        loaded.summary.edges,
        loaded.summary.errors,
        loaded.overrides.relocated
    );
    Ok(loaded)
}
