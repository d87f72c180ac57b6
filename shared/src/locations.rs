use std::collections::{BTreeMap, HashSet};
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::feed::{FeedError, RawEvent, RawFeed, RawTeam};
use crate::geo::LatLng;

/// Largest offset (degrees) applied when separating stacked markers.
pub const SPREAD_DEGREES: f64 = 0.01;

/// A manual location correction, e.g. from `locations.json`.
/// May carry `lat`/`lng`, or just `"ignore": true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

/// Keyed by raw team number (`"254"`) or team key (`"frc254"`).
pub type LocationOverrides = BTreeMap<String, LocationOverride>;

pub fn parse_overrides(json: &str) -> Result<LocationOverrides, FeedError> {
    Ok(serde_json::from_str(json)?)
}

/// Normalize an override key to a feed team key.
pub fn override_team_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("frc")
        .or_else(|| raw.strip_prefix("FRC"))
        .unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u32 = digits.parse().ok()?;
    Some(format!("frc{number}"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverrideReport {
    pub relocated: usize,
    pub ignored: usize,
    /// Overrides naming a team absent from the feed.
    pub unmatched: usize,
    /// Keys that are not team numbers, or coordinates out of range.
    pub invalid: usize,
}

/// Apply location corrections to the feed before the graph is built.
pub fn apply_overrides(feed: &mut RawFeed, overrides: &LocationOverrides) -> OverrideReport {
    let mut report = OverrideReport::default();
    for (raw_key, entry) in overrides {
        let Some(key) = override_team_key(raw_key) else {
            log::warn!("ignoring location override with invalid key {raw_key:?}");
            report.invalid += 1;
            continue;
        };
        let Some(team) = feed.teams.get_mut(&key) else {
            report.unmatched += 1;
            continue;
        };
        if entry.ignore.unwrap_or(false) {
            team.ignore = Some(true);
            report.ignored += 1;
        }
        match (entry.lat, entry.lng) {
            (None, None) => {}
            (lat, lng) => match LatLng::from_parts(lat, lng) {
                Some(point) => {
                    team.lat = Some(point.lat);
                    team.lng = Some(point.lng);
                    report.relocated += 1;
                }
                None => {
                    log::warn!("location override for {key} has unusable coordinates");
                    report.invalid += 1;
                }
            },
        }
    }
    report
}

/// Records that carry a movable location.
pub trait Located {
    fn location(&self) -> Option<LatLng>;
    fn set_location(&mut self, point: LatLng);
}

impl Located for RawTeam {
    fn location(&self) -> Option<LatLng> {
        RawTeam::location(self)
    }

    fn set_location(&mut self, point: LatLng) {
        self.lat = Some(point.lat);
        self.lng = Some(point.lng);
    }
}

impl Located for RawEvent {
    fn location(&self) -> Option<LatLng> {
        RawEvent::location(self)
    }

    fn set_location(&mut self, point: LatLng) {
        self.lat = Some(point.lat);
        self.lng = Some(point.lng);
    }
}

/// Deterministic small offset for `key`, between half and all of
/// [`SPREAD_DEGREES`] in a hash-chosen direction.
pub fn collision_offset(key: &str) -> (f64, f64) {
    let hash = crc32fast::hash(key.as_bytes());
    let angle = f64::from(hash & 0xffff) / 65_536.0 * TAU;
    let radius = SPREAD_DEGREES * (0.5 + f64::from(hash >> 16) / 65_536.0 * 0.5);
    (radius * angle.sin(), radius * angle.cos())
}

fn spread_records<'a, T: Located + 'a>(
    records: impl Iterator<Item = (&'a String, &'a mut T)>,
) -> usize {
    let mut seen: HashSet<(u64, u64)> = HashSet::new();
    let mut moved = 0;
    for (key, record) in records {
        let Some(point) = record.location() else {
            continue;
        };
        let bits = (point.lat.to_bits(), point.lng.to_bits());
        if seen.insert(bits) {
            continue;
        }
        let (d_lat, d_lng) = collision_offset(key);
        let nudged = LatLng::new(
            (point.lat + d_lat).clamp(-90.0, 90.0),
            (point.lng + d_lng).clamp(-180.0, 180.0),
        );
        record.set_location(nudged);
        seen.insert((nudged.lat.to_bits(), nudged.lng.to_bits()));
        moved += 1;
    }
    moved
}

/// Nudge teams (and, separately, events) that share identical coordinates so
/// their markers do not stack. The first record at a spot keeps it.
/// Returns how many records moved.
pub fn spread_collisions(feed: &mut RawFeed) -> usize {
    spread_records(feed.teams.iter_mut()) + spread_records(feed.events.iter_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_feed;

    fn feed() -> RawFeed {
        parse_feed(
            r#"{
                "teams": {
                    "frc254": {"team_number": 254, "lat": 1.0, "lng": 2.0},
                    "frc1678": {"team_number": 1678, "lat": 1.0, "lng": 2.0},
                    "frc971": {"team_number": 971, "lat": 1.0, "lng": 2.0},
                    "frc118": {"team_number": 118}
                },
                "events": {}
            }"#,
        )
        .expect("fixture parses")
    }

    #[test]
    fn override_keys_accept_numbers_and_team_keys() {
        assert_eq!(override_team_key("254").as_deref(), Some("frc254"));
        assert_eq!(override_team_key("frc254").as_deref(), Some("frc254"));
        assert_eq!(override_team_key(" 0254 ").as_deref(), Some("frc254"));
        assert_eq!(override_team_key("frc"), None);
        assert_eq!(override_team_key("2019casj"), None);
    }

    #[test]
    fn apply_overrides_relocates_and_ignores() {
        let mut feed = feed();
        let overrides = parse_overrides(
            r#"{
                "118": {"lat": 29.7, "lng": -95.4},
                "frc971": {"ignore": true},
                "5": {"lat": 0.0, "lng": 0.0},
                "abc": {"lat": 0.0, "lng": 0.0},
                "254": {"lat": 120.0, "lng": 0.0}
            }"#,
        )
        .expect("overrides parse");

        let report = apply_overrides(&mut feed, &overrides);

        assert_eq!(
            report,
            OverrideReport {
                relocated: 1,
                ignored: 1,
                unmatched: 1,
                invalid: 2,
            }
        );
        assert_eq!(feed.teams["frc118"].lat, Some(29.7));
        assert_eq!(feed.teams["frc118"].lng, Some(-95.4));
        assert!(feed.teams["frc971"].is_ignored());
        // out-of-range override leaves the original position alone
        assert_eq!(feed.teams["frc254"].lat, Some(1.0));
    }

    #[test]
    fn spread_collisions_separates_stacked_teams() {
        let mut feed = feed();
        let moved = spread_collisions(&mut feed);
        assert_eq!(moved, 2);

        let points: Vec<LatLng> = ["frc254", "frc1678", "frc971"]
            .iter()
            .filter_map(|key| feed.teams[*key].location())
            .collect();
        assert_eq!(points.len(), 3);
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert_ne!(a, b);
            }
            assert!((a.lat - 1.0).abs() <= SPREAD_DEGREES + 1e-12);
            assert!((a.lng - 2.0).abs() <= SPREAD_DEGREES + 1e-12);
        }
    }

    #[test]
    fn collision_offset_is_deterministic_and_nonzero() {
        assert_eq!(collision_offset("frc254"), collision_offset("frc254"));
        let (d_lat, d_lng) = collision_offset("frc254");
        let radius = (d_lat * d_lat + d_lng * d_lng).sqrt();
        assert!(radius >= SPREAD_DEGREES * 0.5 - 1e-12);
        assert!(radius <= SPREAD_DEGREES + 1e-12);
    }
}
