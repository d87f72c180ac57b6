use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::feed::{RawEvent, RawFeed, RawTeam};
use crate::graph::{Event, Graph, Team};
use crate::visibility::Visibility;

/// A feed record, by kind and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordRef {
    Team(String),
    Event(String),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Team(key) => write!(f, "team {key}"),
            RecordRef::Event(key) => write!(f, "event {key}"),
        }
    }
}

/// Why a cross-reference could not be linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DanglingReason {
    Unknown,
    Ignored,
    Unlocated,
}

impl DanglingReason {
    fn describe(self) -> &'static str {
        match self {
            DanglingReason::Unknown => "which does not exist",
            DanglingReason::Ignored => "which is ignored",
            DanglingReason::Unlocated => "which has no location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    MissingLocation {
        record: RecordRef,
    },
    DanglingReference {
        from: RecordRef,
        to: RecordRef,
        reason: DanglingReason,
    },
    DuplicateReference {
        team: String,
        event: String,
    },
    KeyMismatch {
        key: String,
        number: u32,
    },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::MissingLocation { record } => {
                write!(f, "{record} has no usable lat/lng and was skipped")
            }
            IntegrityError::DanglingReference { from, to, reason } => {
                write!(f, "{from} references {to} {}", reason.describe())
            }
            IntegrityError::DuplicateReference { team, event } => {
                write!(f, "team {team} lists event {event} more than once")
            }
            IntegrityError::KeyMismatch { key, number } => {
                write!(f, "team {key} has team_number {number}")
            }
        }
    }
}

impl std::error::Error for IntegrityError {}

/// Every integrity error from a join that was asked to be strict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinErrors(pub Vec<IntegrityError>);

impl fmt::Display for JoinErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no integrity errors"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

impl std::error::Error for JoinErrors {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinSummary {
    pub teams: usize,
    pub events: usize,
    pub edges: usize,
    pub errors: usize,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub graph: Graph,
    pub errors: Vec<IntegrityError>,
}

impl JoinOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> JoinSummary {
        JoinSummary {
            teams: self.graph.team_count(),
            events: self.graph.event_count(),
            edges: self.graph.edge_count(),
            errors: self.errors.len(),
        }
    }

    /// Abort on any integrity error instead of drawing the partial graph.
    pub fn strict(self) -> Result<Graph, JoinErrors> {
        if self.errors.is_empty() {
            Ok(self.graph)
        } else {
            Err(JoinErrors(self.errors))
        }
    }
}

fn team_reason(feed: &RawFeed, key: &str) -> DanglingReason {
    match feed.teams.get(key) {
        None => DanglingReason::Unknown,
        Some(team) if team.is_ignored() => DanglingReason::Ignored,
        Some(_) => DanglingReason::Unlocated,
    }
}

fn event_reason(feed: &RawFeed, key: &str) -> DanglingReason {
    match feed.events.get(key) {
        None => DanglingReason::Unknown,
        Some(event) if event.is_ignored() => DanglingReason::Ignored,
        Some(_) => DanglingReason::Unlocated,
    }
}

fn build_event(key: &str, raw: &RawEvent) -> Option<Event> {
    let location = raw.location()?;
    let name = raw
        .name
        .clone()
        .or_else(|| raw.short_name.clone())
        .unwrap_or_else(|| key.to_string());
    Some(Event {
        key: key.to_string(),
        name,
        schedule: raw.schedule(),
        start_date: raw.start_date(),
        location,
        focus: Visibility::Hidden,
        edges: Vec::new(),
    })
}

fn build_team(key: &str, raw: &RawTeam) -> Option<Team> {
    let location = raw.location()?;
    let nickname = raw
        .nickname
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Team {}", raw.team_number));
    Some(Team {
        key: key.to_string(),
        number: raw.team_number,
        nickname,
        hometown: raw.hometown(),
        rookie_year: raw.rookie_year,
        location,
        focus: Visibility::Hidden,
        edges: Vec::new(),
    })
}

/// Link a season feed into a [`Graph`].
///
/// Ignored records are skipped silently. Everything else that cannot be
/// drawn or linked is reported in [`JoinOutcome::errors`] and left out of
/// the graph. Edges come from each team's `events` list; event rosters are
/// only cross-checked.
pub fn join(feed: &RawFeed) -> JoinOutcome {
    let mut graph = Graph::default();
    let mut errors = Vec::new();

    for (key, raw) in feed.events.iter().filter(|(_, e)| !e.is_ignored()) {
        match build_event(key, raw) {
            Some(event) => {
                graph.push_event(event);
            }
            None => errors.push(IntegrityError::MissingLocation {
                record: RecordRef::Event(key.clone()),
            }),
        }
    }

    let mut teams: Vec<(&String, &RawTeam)> = feed
        .teams
        .iter()
        .filter(|(_, t)| !t.is_ignored())
        .collect();
    teams.sort_by(|a, b| a.1.team_number.cmp(&b.1.team_number).then(a.0.cmp(b.0)));

    for (key, raw) in teams {
        if key.strip_prefix("frc") != Some(raw.team_number.to_string().as_str()) {
            errors.push(IntegrityError::KeyMismatch {
                key: key.clone(),
                number: raw.team_number,
            });
        }
        let Some(team) = build_team(key, raw) else {
            errors.push(IntegrityError::MissingLocation {
                record: RecordRef::Team(key.clone()),
            });
            continue;
        };
        let team_id = graph.push_team(team);

        let mut linked = HashSet::new();
        for event_key in &raw.events {
            if !linked.insert(event_key.as_str()) {
                errors.push(IntegrityError::DuplicateReference {
                    team: key.clone(),
                    event: event_key.clone(),
                });
                continue;
            }
            match graph.event_by_key(event_key) {
                Some(event_id) => {
                    graph.link(team_id, event_id);
                }
                None => errors.push(IntegrityError::DanglingReference {
                    from: RecordRef::Team(key.clone()),
                    to: RecordRef::Event(event_key.clone()),
                    reason: event_reason(feed, event_key),
                }),
            }
        }
    }

    for (key, raw) in feed.events.iter() {
        if graph.event_by_key(key).is_none() {
            continue;
        }
        for team_key in &raw.teams {
            if graph.team_by_key(team_key).is_none() {
                errors.push(IntegrityError::DanglingReference {
                    from: RecordRef::Event(key.clone()),
                    to: RecordRef::Team(team_key.clone()),
                    reason: team_reason(feed, team_key),
                });
            }
        }
    }

    for error in &errors {
        log::warn!("{error}");
    }
    JoinOutcome { graph, errors }
}
