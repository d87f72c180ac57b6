use serde::{Deserialize, Serialize};

use crate::color::Color;

const TBA_BASE_URL: &str = "https://www.thebluealliance.com";

/// Age bracket of a team, from its rookie year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamTier {
    /// Rookie in the season being shown.
    Rookie,
    Before2000,
    Before2005,
    Before2010,
    Before2015,
    Before2020,
    Before2025,
    Since2025,
}

impl TeamTier {
    pub const ALL: [TeamTier; 8] = [
        TeamTier::Rookie,
        TeamTier::Before2000,
        TeamTier::Before2005,
        TeamTier::Before2010,
        TeamTier::Before2015,
        TeamTier::Before2020,
        TeamTier::Before2025,
        TeamTier::Since2025,
    ];

    /// A missing rookie year is treated as the oldest bracket.
    pub fn for_rookie_year(rookie_year: Option<i32>, season: i32) -> Self {
        let Some(year) = rookie_year else {
            return TeamTier::Before2000;
        };
        if year == season {
            return TeamTier::Rookie;
        }
        match year {
            ..2000 => TeamTier::Before2000,
            2000..2005 => TeamTier::Before2005,
            2005..2010 => TeamTier::Before2010,
            2010..2015 => TeamTier::Before2015,
            2015..2020 => TeamTier::Before2020,
            2020..2025 => TeamTier::Before2025,
            _ => TeamTier::Since2025,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TeamTier::Rookie => "Rookie",
            TeamTier::Before2000 => "Before 2000",
            TeamTier::Before2005 => "2000 – 2004",
            TeamTier::Before2010 => "2005 – 2009",
            TeamTier::Before2015 => "2010 – 2014",
            TeamTier::Before2020 => "2015 – 2019",
            TeamTier::Before2025 => "2020 – 2024",
            TeamTier::Since2025 => "2025 and later",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerStyle {
    Team(TeamTier),
    Event,
    Championship,
}

impl MarkerStyle {
    pub fn color(self) -> Color {
        match self {
            MarkerStyle::Team(TeamTier::Rookie) => Color::rgb(0x7c, 0x00, 0x8f),
            MarkerStyle::Team(TeamTier::Before2000) => Color::rgb(0x00, 0x00, 0xff),
            MarkerStyle::Team(TeamTier::Before2005) => Color::rgb(0x00, 0x33, 0xcc),
            MarkerStyle::Team(TeamTier::Before2010) => Color::rgb(0x00, 0x66, 0x99),
            MarkerStyle::Team(TeamTier::Before2015) => Color::rgb(0x00, 0x99, 0x66),
            MarkerStyle::Team(TeamTier::Before2020) => Color::rgb(0x00, 0xcc, 0x33),
            MarkerStyle::Team(TeamTier::Before2025) => Color::rgb(0x00, 0xff, 0x00),
            MarkerStyle::Team(TeamTier::Since2025) => Color::rgb(0x66, 0xff, 0x66),
            MarkerStyle::Event => Color::rgb(0xff, 0x00, 0x00),
            MarkerStyle::Championship => Color::rgb(0xff, 0xa5, 0x00),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MarkerStyle::Team(tier) => tier.label(),
            MarkerStyle::Event => "Event",
            MarkerStyle::Championship => "Championship",
        }
    }

    pub fn is_team(self) -> bool {
        matches!(self, MarkerStyle::Team(_))
    }
}

/// Legend rows, in display order.
pub fn legend() -> impl Iterator<Item = MarkerStyle> {
    TeamTier::ALL
        .into_iter()
        .map(MarkerStyle::Team)
        .chain([MarkerStyle::Event, MarkerStyle::Championship])
}

pub fn team_page_url(team_number: u32, season: i32) -> String {
    format!("{TBA_BASE_URL}/team/{team_number}/{season}")
}

pub fn event_page_url(event_key: &str) -> String {
    format!("{TBA_BASE_URL}/event/{event_key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_season_rookies_get_rookie_tier() {
        assert_eq!(TeamTier::for_rookie_year(Some(2019), 2019), TeamTier::Rookie);
        assert_eq!(
            TeamTier::for_rookie_year(Some(2019), 2020),
            TeamTier::Before2020
        );
    }

    #[test]
    fn tier_boundaries() {
        let cases = [
            (1992, TeamTier::Before2000),
            (1999, TeamTier::Before2000),
            (2000, TeamTier::Before2005),
            (2004, TeamTier::Before2005),
            (2005, TeamTier::Before2010),
            (2014, TeamTier::Before2015),
            (2015, TeamTier::Before2020),
            (2024, TeamTier::Before2025),
            (2025, TeamTier::Since2025),
        ];
        for (year, tier) in cases {
            assert_eq!(TeamTier::for_rookie_year(Some(year), 2030), tier, "{year}");
        }
        assert_eq!(TeamTier::for_rookie_year(None, 2019), TeamTier::Before2000);
    }

    #[test]
    fn legend_lists_every_style_once() {
        let rows: Vec<MarkerStyle> = legend().collect();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0], MarkerStyle::Team(TeamTier::Rookie));
        assert_eq!(rows[9], MarkerStyle::Championship);
        assert_eq!(MarkerStyle::Event.color().hex(), "#ff0000");
        assert_eq!(MarkerStyle::Team(TeamTier::Rookie).color().hex(), "#7c008f");
    }

    #[test]
    fn tba_links() {
        assert_eq!(
            team_page_url(254, 2019),
            "https://www.thebluealliance.com/team/254/2019"
        );
        assert_eq!(
            event_page_url("2019casj"),
            "https://www.thebluealliance.com/event/2019casj"
        );
    }
}
