use std::fmt;

use crate::graph::{Graph, TeamId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    Empty,
    /// Carries the query as the user typed it, trimmed.
    NotFound(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Empty => write!(f, "Enter a team number"),
            SearchError::NotFound(query) => write!(f, "Could not find team {query}"),
        }
    }
}

impl std::error::Error for SearchError {}

/// Accepts `254`, `frc254` and `FRC 254`.
pub fn normalize_team_query(query: &str) -> Option<u32> {
    let trimmed = query.trim();
    let digits = trimmed
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("frc"))
        .map_or(trimmed, |_| trimmed[3..].trim_start());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Resolves through the `frc{number}` key first; the bare number is only a
/// fallback for records keyed some other way.
pub fn find_team(graph: &Graph, query: &str) -> Result<TeamId, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::Empty);
    }
    normalize_team_query(trimmed)
        .and_then(|number| {
            graph
                .team_by_key(&format!("frc{number}"))
                .or_else(|| graph.team_by_number(number))
        })
        .ok_or_else(|| SearchError::NotFound(trimmed.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub team: TeamId,
    pub number: u32,
    pub label: String,
}

/// Autocomplete entries: numbers starting with the typed digits first, then
/// nicknames containing the text.
pub fn suggest(graph: &Graph, query: &str, limit: usize) -> Vec<Suggestion> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }
    let number_prefix = normalize_team_query(&needle).map(|n| n.to_string());

    let mut by_number = Vec::new();
    let mut by_name = Vec::new();
    for (id, team) in graph.teams() {
        let entry = Suggestion {
            team: id,
            number: team.number,
            label: team.title(),
        };
        let number_hit = number_prefix
            .as_deref()
            .is_some_and(|prefix| team.number.to_string().starts_with(prefix));
        if number_hit {
            by_number.push(entry);
        } else if team.nickname.to_lowercase().contains(&needle) {
            by_name.push(entry);
        }
    }
    by_number.into_iter().chain(by_name).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_feed;
    use crate::join::join;

    fn graph() -> Graph {
        let feed = parse_feed(
            r#"{
                "teams": {
                    "frc254": {"team_number": 254, "nickname": "The Cheesy Poofs", "lat": 1.0, "lng": 1.0},
                    "frc2541": {"team_number": 2541, "nickname": "Botfather", "lat": 1.0, "lng": 1.1},
                    "frc25": {"team_number": 25, "nickname": "Raider Robotix", "lat": 1.0, "lng": 1.2},
                    "frc118": {"team_number": 118, "nickname": "Robonauts", "lat": 1.0, "lng": 1.3}
                }
            }"#,
        )
        .expect("fixture parses");
        join(&feed).graph
    }

    #[test]
    fn query_forms_resolve_to_the_same_team() {
        let graph = graph();
        let expected = graph.team_by_number(254);
        for query in ["254", "frc254", " 254 ", "FRC 254", "Frc254"] {
            assert_eq!(find_team(&graph, query).ok(), expected, "{query:?}");
        }
    }

    #[test]
    fn unknown_and_empty_queries() {
        let graph = graph();
        let err = find_team(&graph, "9999").expect_err("no such team");
        assert_eq!(err, SearchError::NotFound("9999".into()));
        assert_eq!(err.to_string(), "Could not find team 9999");
        assert_eq!(find_team(&graph, "   "), Err(SearchError::Empty));
        assert_eq!(
            find_team(&graph, "poofs"),
            Err(SearchError::NotFound("poofs".into()))
        );
    }

    #[test]
    fn team_key_wins_over_mismatched_team_number() {
        let feed = parse_feed(
            r#"{
                "teams": {
                    "frc7": {"team_number": 8, "nickname": "Mislabelled", "lat": 1.0, "lng": 1.0},
                    "frc8": {"team_number": 8, "nickname": "Eight", "lat": 2.0, "lng": 2.0},
                    "frc9": {"team_number": 90, "nickname": "Ninety", "lat": 3.0, "lng": 3.0}
                }
            }"#,
        )
        .expect("fixture parses");
        let graph = join(&feed).graph;
        let eight = graph.team_by_key("frc8");
        assert_eq!(find_team(&graph, "8").ok(), eight);
        assert_eq!(find_team(&graph, "frc8").ok(), eight);
        // no frc90 key, so the number lookup still finds it
        assert_eq!(find_team(&graph, "90").ok(), graph.team_by_key("frc9"));
    }

    #[test]
    fn suggestions_put_number_prefixes_before_names() {
        let graph = graph();
        let numbers: Vec<u32> = suggest(&graph, "25", 10).iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![25, 254, 2541]);

        let names: Vec<u32> = suggest(&graph, "ro", 10).iter().map(|s| s.number).collect();
        assert_eq!(names, vec![25, 118]);

        assert_eq!(suggest(&graph, "25", 2).len(), 2);
        assert!(suggest(&graph, "", 5).is_empty());
        assert_eq!(suggest(&graph, "254", 1)[0].label, "The Cheesy Poofs (254)");
    }
}
