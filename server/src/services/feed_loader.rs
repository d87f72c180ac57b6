use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use frcmap_shared::parse_season_file_name;
use tracing::{debug, info, warn};

use crate::config::LOCATIONS_FILE;
use crate::state::{AppState, OverrideFeed, SeasonEntry, SeasonMap};

pub async fn run(state: AppState, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // First tick fires immediately; startup already did a full load.
    interval.tick().await;

    loop {
        interval.tick().await;
        if state.locations_url.is_none() {
            load_local_overrides(&state).await;
        }
        scan(&state).await;
    }
}

/// Load overrides and every season once, before the listener is bound.
pub async fn warm(state: &AppState) {
    if state.locations_url.is_none() {
        load_local_overrides(state).await;
    }
    let count = scan(state).await;
    if count == 0 {
        warn!(dir = %state.data_dir.display(), "no season feeds found");
    }
}

/// Read `locations.json` from the data directory. A missing file clears the
/// overrides; a malformed one keeps the previous set.
pub async fn load_local_overrides(state: &AppState) {
    let path = state.data_dir.join(LOCATIONS_FILE);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no local location overrides");
            replace_overrides(state, OverrideFeed::default()).await;
            return;
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to read location overrides");
            return;
        }
    };
    match OverrideFeed::from_bytes(Bytes::from(bytes)) {
        Ok(feed) => {
            replace_overrides(state, feed).await;
        }
        Err(e) => warn!(error = %e, path = %path.display(), "ignoring malformed location overrides"),
    }
}

/// Swap in a new override set. Returns `true` when it differs from the current one.
pub async fn replace_overrides(state: &AppState, feed: OverrideFeed) -> bool {
    let mut current = state.overrides.write().await;
    if current.etag == feed.etag {
        return false;
    }
    info!(overrides = feed.len(), "location overrides updated");
    *current = feed;
    true
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

/// Rescan the data directory and rebuild the season map. Unchanged files are
/// reused; a file that fails to parse keeps its previous entry.
/// Returns the number of seasons now loaded.
pub async fn scan(state: &AppState) -> usize {
    let mut dir = match tokio::fs::read_dir(&state.data_dir).await {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, dir = %state.data_dir.display(), "failed to read data directory");
            return state.seasons.read().await.len();
        }
    };

    let overrides = state.overrides.read().await.clone();
    let previous = state.seasons.read().await.clone();
    let mut next = SeasonMap::new();

    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to list data directory entry");
                break;
            }
        };
        let file_name = entry.file_name();
        let Some(year) = file_name.to_str().and_then(parse_season_file_name) else {
            continue;
        };
        let path = entry.path();
        let modified = modified_at(&path).await;

        if let Some(old) = previous.get(&year)
            && old.modified.is_some()
            && old.modified == modified
            && old.overrides_etag == overrides.etag
        {
            next.insert(year, old.clone());
            continue;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                warn!(error = %e, year, "failed to read season feed");
                if let Some(old) = previous.get(&year) {
                    next.insert(year, old.clone());
                }
                continue;
            }
        };

        match SeasonEntry::validate(year, bytes, &overrides, modified) {
            Ok(season) => {
                let summary = season.report.summary;
                if summary.errors > 0 {
                    for problem in season.report.problems.iter().take(20) {
                        warn!(year, "{problem}");
                    }
                }
                info!(
                    year,
                    teams = summary.teams,
                    events = summary.events,
                    edges = summary.edges,
                    errors = summary.errors,
                    "season feed loaded"
                );
                next.insert(year, season);
            }
            Err(e) => {
                warn!(error = %e, year, line = e.line(), column = e.column(), "season feed rejected");
                if let Some(old) = previous.get(&year) {
                    next.insert(year, old.clone());
                }
            }
        }
    }

    let count = next.len();
    *state.seasons.write().await = next;
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_data_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "frcmap-feed-loader-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create temp data dir");
        dir
    }

    const SEASON: &str = r#"{
        "teams": {"frc1": {"team_number": 1, "lat": 1.0, "lng": 1.0, "events": ["2019a"]}},
        "events": {"2019a": {"name": "A", "lat": 2.0, "lng": 2.0}}
    }"#;

    #[tokio::test]
    async fn scan_picks_up_season_files_only() {
        let dir = temp_data_dir("scan");
        std::fs::write(dir.join("season_2019.json"), SEASON).expect("write season");
        std::fs::write(dir.join("season_2018.json"), "{ not json").expect("write broken");
        std::fs::write(dir.join("season_2019_pretty.json"), SEASON).expect("write decoy");
        std::fs::write(dir.join("notes.txt"), "hello").expect("write decoy");

        let state = AppState::new(dir.clone(), None);
        assert_eq!(scan(&state).await, 1);

        let seasons = state.seasons.read().await;
        let entry = seasons.get(&2019).expect("2019 loaded");
        assert_eq!(entry.report.summary.edges, 1);
        assert_eq!(entry.json.as_ref(), SEASON.as_bytes());
        drop(seasons);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn broken_rewrite_keeps_previous_entry() {
        let dir = temp_data_dir("keep");
        let path = dir.join("season_2020.json");
        std::fs::write(&path, SEASON).expect("write season");
        let state = AppState::new(dir.clone(), None);
        scan(&state).await;

        std::fs::write(&path, "{").expect("overwrite with garbage");
        // Drop the cached mtime so the rescan re-reads the file.
        if let Some(entry) = state.seasons.write().await.get_mut(&2020) {
            entry.modified = None;
        }
        assert_eq!(scan(&state).await, 1);
        let seasons = state.seasons.read().await;
        assert_eq!(
            seasons.get(&2020).map(|e| e.json.as_ref().to_vec()),
            Some(SEASON.as_bytes().to_vec())
        );
        drop(seasons);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn local_overrides_are_applied_to_reports() {
        let dir = temp_data_dir("overrides");
        std::fs::write(dir.join("season_2019.json"), SEASON).expect("write season");
        std::fs::write(dir.join(LOCATIONS_FILE), r#"{"1": {"ignore": true}}"#)
            .expect("write overrides");
        let state = AppState::new(dir.clone(), None);
        warm(&state).await;

        assert_eq!(state.overrides.read().await.len(), 1);
        let seasons = state.seasons.read().await;
        let report = &seasons.get(&2019).expect("2019 loaded").report;
        assert_eq!(report.summary.teams, 0);
        assert_eq!(report.overrides.ignored, 1);
        drop(seasons);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn deleted_overrides_file_clears_overrides() {
        let dir = temp_data_dir("deleted-overrides");
        std::fs::write(dir.join("season_2019.json"), SEASON).expect("write season");
        std::fs::write(dir.join(LOCATIONS_FILE), r#"{"1": {"ignore": true}}"#)
            .expect("write overrides");
        let state = AppState::new(dir.clone(), None);
        warm(&state).await;
        assert_eq!(state.overrides.read().await.len(), 1);

        std::fs::remove_file(dir.join(LOCATIONS_FILE)).expect("remove overrides");
        load_local_overrides(&state).await;
        assert_eq!(state.overrides.read().await.len(), 0);
        assert_eq!(state.overrides.read().await.etag, OverrideFeed::default().etag);

        // the etag changed, so the rescan revalidates with the team back in
        scan(&state).await;
        let seasons = state.seasons.read().await;
        assert_eq!(seasons.get(&2019).expect("2019 loaded").report.summary.teams, 1);
        drop(seasons);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_directory_is_not_fatal() {
        let state = AppState::new(PathBuf::from("/nonexistent/frcmap/data"), None);
        assert_eq!(scan(&state).await, 0);
        load_local_overrides(&state).await;
        assert_eq!(state.overrides.read().await.len(), 0);
    }
}
