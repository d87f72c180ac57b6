/// First FRC season with a published feed.
pub const FIRST_SEASON: i32 = 1992;
/// Season shown when no usable `year` is requested.
pub const LATEST_SEASON: i32 = 2026;

pub fn is_supported_season(year: i32) -> bool {
    (FIRST_SEASON..=LATEST_SEASON).contains(&year)
}

/// Parameters read from the page URL, e.g. `?year=2019&team=254`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapQuery {
    pub year: Option<i32>,
    pub team: Option<String>,
}

impl MapQuery {
    /// Tolerant of a leading `?`, unknown keys, and repeated keys (last wins).
    pub fn parse(search: &str) -> Self {
        let mut query = MapQuery::default();
        let search = search.strip_prefix('?').unwrap_or(search);
        for pair in search.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.trim();
            match key {
                "year" => {
                    query.year = value.parse().ok().filter(|y| is_supported_season(*y));
                }
                "team" => {
                    query.team = (!value.is_empty()).then(|| value.to_string());
                }
                _ => {}
            }
        }
        query
    }

    pub fn year_or_latest(&self) -> i32 {
        self.year.unwrap_or(LATEST_SEASON)
    }

    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(year) = self.year {
            parts.push(format!("year={year}"));
        }
        if let Some(team) = &self.team {
            parts.push(format!("team={team}"));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_and_team() {
        let query = MapQuery::parse("?year=2019&team=254");
        assert_eq!(query.year, Some(2019));
        assert_eq!(query.team.as_deref(), Some("254"));
        assert_eq!(query.year_or_latest(), 2019);
        assert_eq!(query.to_query_string(), "?year=2019&team=254");
    }

    #[test]
    fn unsupported_years_fall_back_to_latest() {
        for search in ["?year=1991", "?year=2099", "?year=abc", "?year=", "?year"] {
            let query = MapQuery::parse(search);
            assert_eq!(query.year, None, "{search}");
            assert_eq!(query.year_or_latest(), LATEST_SEASON);
        }
    }

    #[test]
    fn ignores_unknown_and_empty_parameters() {
        let query = MapQuery::parse("utm_source=x&&team=&year=2008");
        assert_eq!(query.year, Some(2008));
        assert_eq!(query.team, None);
        assert_eq!(MapQuery::parse("").to_query_string(), "");
    }
}
