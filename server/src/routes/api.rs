use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use frcmap_shared::parse_season_file_name;

use crate::config::{LOCATIONS_FILE, SEASON_CACHE_CONTROL};
use crate::state::AppState;

const OVERRIDES_CACHE_CONTROL: &str = "public, max-age=60";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let seasons = state.seasons.read().await.len();
    let overrides = state.overrides.read().await.len();
    Json(serde_json::json!({
        "status": "ok",
        "seasons": seasons,
        "overrides": overrides,
        "remote_overrides": state.locations_url.is_some(),
    }))
}

pub async fn list_seasons(State(state): State<AppState>) -> Json<serde_json::Value> {
    let seasons: Vec<i32> = state.seasons.read().await.keys().copied().collect();
    let latest = seasons.last().copied();
    Json(serde_json::json!({
        "seasons": seasons,
        "latest": latest,
    }))
}

pub async fn season_report(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<impl IntoResponse, StatusCode> {
    let seasons = state.seasons.read().await;
    let entry = seasons.get(&year).ok_or(StatusCode::NOT_FOUND)?;
    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Json(entry.report.clone()),
    ))
}

/// `/data/season_{year}.json` and `/data/locations.json`.
pub async fn data_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (etag, json, cache_control): (String, Arc<Bytes>, &'static str) = if file == LOCATIONS_FILE
    {
        let overrides = state.overrides.read().await;
        (
            overrides.etag.clone(),
            Arc::clone(&overrides.json),
            OVERRIDES_CACHE_CONTROL,
        )
    } else {
        let Some(year) = parse_season_file_name(&file) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        let seasons = state.seasons.read().await;
        let Some(entry) = seasons.get(&year) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        (
            entry.etag.clone(),
            Arc::clone(&entry.json),
            SEASON_CACHE_CONTROL,
        )
    };

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response(cache_control, Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), cache_control, Some(etag.as_str()))
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use super::{HeaderMap, HeaderValue, header, if_none_match_matches};
    use crate::state::{AppState, OverrideFeed, SeasonEntry};

    const SEASON_2019: &[u8] = br#"{
        "teams": {
            "frc254": {"team_number": 254, "lat": 37.3, "lng": -121.9, "events": ["2019casj", "2019gone"]}
        },
        "events": {
            "2019casj": {"name": "Silicon Valley Regional", "week": 3, "lat": 37.33, "lng": -121.88}
        }
    }"#;

    async fn seeded_state() -> AppState {
        let state = AppState::new(PathBuf::from("/nonexistent"), None);
        let overrides = OverrideFeed::from_bytes(Bytes::from_static(br#"{"254": {"lat": 37.0, "lng": -122.0}}"#))
            .expect("overrides parse");
        let season_2019 = SeasonEntry::validate(2019, Bytes::from_static(SEASON_2019), &overrides, None)
            .expect("2019 parses");
        let season_2018 = SeasonEntry::validate(2018, Bytes::from_static(b"{}"), &overrides, None)
            .expect("2018 parses");
        {
            let mut seasons = state.seasons.write().await;
            seasons.insert(2019, season_2019);
            seasons.insert(2018, season_2018);
        }
        *state.overrides.write().await = overrides;
        state
    }

    async fn spawn_test_server(state: AppState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    #[test]
    fn if_none_match_accepts_lists_weak_tags_and_wildcard() {
        let mut headers = HeaderMap::new();
        assert!(!if_none_match_matches(&headers, "\"abc\""));

        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_static("\"zzz\", W/\"abc\""),
        );
        assert!(if_none_match_matches(&headers, "\"abc\""));
        assert!(!if_none_match_matches(&headers, "\"def\""));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(if_none_match_matches(&headers, "\"anything\""));
    }

    #[tokio::test]
    async fn season_feed_is_served_with_etag_and_revalidates() {
        let (addr, server_handle) = spawn_test_server(seeded_state().await).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{base_url}/data/season_2019.json"))
            .send()
            .await
            .expect("season request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("cache-control")
                .and_then(|v| v.to_str().ok()),
            Some("public, max-age=300")
        );
        let etag = resp
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .expect("etag header");
        let body = resp.bytes().await.expect("season body");
        assert_eq!(body.as_ref(), SEASON_2019);

        let revalidated = client
            .get(format!("{base_url}/data/season_2019.json"))
            .header("if-none-match", etag)
            .send()
            .await
            .expect("conditional request");
        assert_eq!(revalidated.status(), reqwest::StatusCode::NOT_MODIFIED);

        let missing = client
            .get(format!("{base_url}/data/season_2007.json"))
            .send()
            .await
            .expect("missing season request");
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let bogus = client
            .get(format!("{base_url}/data/secrets.json"))
            .send()
            .await
            .expect("bogus data request");
        assert_eq!(bogus.status(), reqwest::StatusCode::NOT_FOUND);

        server_handle.abort();
    }

    #[tokio::test]
    async fn seasons_reports_and_health_expose_expected_contract() {
        let (addr, server_handle) = spawn_test_server(seeded_state().await).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let seasons: serde_json::Value = client
            .get(format!("{base_url}/api/seasons"))
            .send()
            .await
            .expect("seasons request")
            .json()
            .await
            .expect("seasons json");
        assert_eq!(seasons["seasons"], serde_json::json!([2018, 2019]));
        assert_eq!(seasons["latest"], 2019);

        let report: serde_json::Value = client
            .get(format!("{base_url}/api/seasons/2019/report"))
            .send()
            .await
            .expect("report request")
            .error_for_status()
            .expect("report status")
            .json()
            .await
            .expect("report json");
        assert_eq!(report["year"], 2019);
        assert_eq!(report["teams"], 1);
        assert_eq!(report["edges"], 1);
        assert_eq!(report["errors"], 1);
        assert_eq!(report["overrides"]["relocated"], 1);
        assert_eq!(
            report["problems"][0],
            "team frc254 references event 2019gone which does not exist"
        );

        let unknown = client
            .get(format!("{base_url}/api/seasons/1990/report"))
            .send()
            .await
            .expect("unknown report request");
        assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);

        let health: serde_json::Value = client
            .get(format!("{base_url}/api/health"))
            .send()
            .await
            .expect("health request")
            .json()
            .await
            .expect("health json");
        assert_eq!(health["status"], "ok");
        assert_eq!(health["seasons"], 2);
        assert_eq!(health["overrides"], 1);

        server_handle.abort();
    }

    #[tokio::test]
    async fn locations_feed_is_served() {
        let (addr, server_handle) = spawn_test_server(seeded_state().await).await;
        let overrides: serde_json::Value = reqwest::get(format!("http://{addr}/data/locations.json"))
            .await
            .expect("locations request")
            .json()
            .await
            .expect("locations json");
        assert_eq!(overrides["254"]["lat"], 37.0);
        server_handle.abort();
    }
}
