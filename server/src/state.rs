use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use frcmap_shared::locations::{apply_overrides, spread_collisions};
use frcmap_shared::{FeedError, JoinSummary, LocationOverrides, OverrideReport, join, parse_feed_bytes};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::{connect_timeout, http_timeout};

/// Strong validator for a payload: CRC32 plus length.
pub fn content_etag(bytes: &[u8]) -> String {
    format!("\"{:08x}-{:x}\"", crc32fast::hash(bytes), bytes.len())
}

/// Integrity report for one season, as served by `/api/seasons/{year}/report`.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonReport {
    pub year: i32,
    #[serde(flatten)]
    pub summary: JoinSummary,
    pub overrides: OverrideReport,
    pub spread: usize,
    pub problems: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

/// A validated season feed. `json` is served byte-for-byte as read from disk.
#[derive(Debug, Clone)]
pub struct SeasonEntry {
    pub json: Arc<Bytes>,
    pub etag: String,
    pub modified: Option<SystemTime>,
    pub overrides_etag: String,
    pub report: SeasonReport,
}

impl SeasonEntry {
    /// Run the feed through the same pipeline the client uses and record
    /// what it would draw. Only malformed JSON is an error here.
    pub fn validate(
        year: i32,
        bytes: Bytes,
        overrides: &OverrideFeed,
        modified: Option<SystemTime>,
    ) -> Result<Self, FeedError> {
        let mut feed = parse_feed_bytes(&bytes)?;
        let override_report = apply_overrides(&mut feed, &overrides.overrides);
        let spread = spread_collisions(&mut feed);
        let outcome = join(&feed);
        let report = SeasonReport {
            year,
            summary: outcome.summary(),
            overrides: override_report,
            spread,
            problems: outcome.errors.iter().map(ToString::to_string).collect(),
            loaded_at: Utc::now(),
        };
        Ok(Self {
            etag: content_etag(&bytes),
            json: Arc::new(bytes),
            modified,
            overrides_etag: overrides.etag.clone(),
            report,
        })
    }
}

pub type SeasonMap = BTreeMap<i32, SeasonEntry>;

/// The location-override feed currently in effect.
#[derive(Debug, Clone)]
pub struct OverrideFeed {
    pub overrides: Arc<LocationOverrides>,
    pub json: Arc<Bytes>,
    pub etag: String,
}

impl Default for OverrideFeed {
    fn default() -> Self {
        let json = Bytes::from_static(b"{}");
        Self {
            overrides: Arc::new(LocationOverrides::new()),
            etag: content_etag(&json),
            json: Arc::new(json),
        }
    }
}

impl OverrideFeed {
    pub fn from_bytes(bytes: Bytes) -> Result<Self, FeedError> {
        let overrides: LocationOverrides = serde_json::from_slice(&bytes)?;
        Ok(Self {
            overrides: Arc::new(overrides),
            etag: content_etag(&bytes),
            json: Arc::new(bytes),
        })
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub seasons: Arc<RwLock<SeasonMap>>,
    pub overrides: Arc<RwLock<OverrideFeed>>,
    pub data_dir: PathBuf,
    pub locations_url: Option<String>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(data_dir: PathBuf, locations_url: Option<String>) -> Self {
        let request_timeout = http_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("frcmap/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build configured HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self {
            seasons: Arc::new(RwLock::new(SeasonMap::new())),
            overrides: Arc::new(RwLock::new(OverrideFeed::default())),
            data_dir,
            locations_url,
            http_client,
        }
    }
}
