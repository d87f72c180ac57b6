use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// TBA event types for championship divisions and the championship finals.
pub const CMP_EVENT_TYPES: [i64; 2] = [3, 4];

/// One season's feed as published in `season_{year}.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeed {
    #[serde(default)]
    pub teams: BTreeMap<String, RawTeam>,
    #[serde(default)]
    pub events: BTreeMap<String, RawEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTeam {
    pub team_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_prov: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rookie_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

impl RawTeam {
    pub fn is_ignored(&self) -> bool {
        self.ignore.unwrap_or(false)
    }

    pub fn location(&self) -> Option<LatLng> {
        LatLng::from_parts(self.lat, self.lng)
    }

    /// "City, State, Country" with missing parts skipped.
    pub fn hometown(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.state_prov, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cmp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
}

impl RawEvent {
    pub fn is_ignored(&self) -> bool {
        self.ignore.unwrap_or(false)
    }

    pub fn location(&self) -> Option<LatLng> {
        LatLng::from_parts(self.lat, self.lng)
    }

    pub fn schedule(&self) -> EventSchedule {
        let cmp_type = self
            .event_type
            .is_some_and(|t| CMP_EVENT_TYPES.contains(&t));
        if self.is_cmp.unwrap_or(false) || cmp_type {
            EventSchedule::Championship
        } else if let Some(week) = self.week {
            EventSchedule::Week(week)
        } else {
            EventSchedule::Unscheduled
        }
    }

    /// `start_date` as `YYYY-MM-DD`; anything else reads as unknown.
    pub fn start_date(&self) -> Option<NaiveDate> {
        let raw = self.start_date.as_deref()?;
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
    }
}

/// Where an event sits in the season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSchedule {
    /// Zero-based competition week as published by TBA.
    Week(u32),
    Championship,
    /// Off-season and other events without a week number.
    Unscheduled,
}

impl fmt::Display for EventSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSchedule::Week(week) => write!(f, "Week {}", week + 1),
            EventSchedule::Championship => write!(f, "Championship"),
            EventSchedule::Unscheduled => write!(f, "Unscheduled"),
        }
    }
}

/// Malformed JSON in a season or override feed.
#[derive(Debug)]
pub struct FeedError {
    source: serde_json::Error,
}

impl FeedError {
    pub fn line(&self) -> usize {
        self.source.line()
    }

    pub fn column(&self) -> usize {
        self.source.column()
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed feed: {}", self.source)
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(source: serde_json::Error) -> Self {
        Self { source }
    }
}

pub fn parse_feed(json: &str) -> Result<RawFeed, FeedError> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_feed_bytes(bytes: &[u8]) -> Result<RawFeed, FeedError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn season_file_name(year: i32) -> String {
    format!("season_{year}.json")
}

/// Inverse of [`season_file_name`]; rejects `season_2019_pretty.json` and friends.
pub fn parse_season_file_name(name: &str) -> Option<i32> {
    let digits = name.strip_prefix("season_")?.strip_suffix(".json")?;
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
