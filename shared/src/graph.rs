use std::collections::HashMap;

use chrono::NaiveDate;

use crate::color::{Color, edge_color};
use crate::feed::EventSchedule;
use crate::geo::LatLng;
use crate::marker::{MarkerStyle, TeamTier};
use crate::visibility::{Category, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(usize);

impl TeamId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl EventId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Either end of an edge; what a marker on the map stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerRef {
    Team(TeamId),
    Event(EventId),
}

/// Result of a viewer count change, as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Shown,
    Hidden,
    Unchanged,
}

/// Number of endpoints currently asking for an edge to be drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerCount(u32);

impl ViewerCount {
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_visible(self) -> bool {
        self.0 > 0
    }

    pub fn add(&mut self) -> Transition {
        self.0 = self.0.saturating_add(1);
        if self.0 == 1 {
            Transition::Shown
        } else {
            Transition::Unchanged
        }
    }

    /// Never drops below zero; an extra release is logged and ignored.
    pub fn remove(&mut self) -> Transition {
        match self.0 {
            0 => {
                log::warn!("edge viewer count released below zero; clamping at 0");
                Transition::Unchanged
            }
            1 => {
                self.0 = 0;
                Transition::Hidden
            }
            _ => {
                self.0 -= 1;
                Transition::Unchanged
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub key: String,
    pub number: u32,
    pub nickname: String,
    pub hometown: Option<String>,
    pub rookie_year: Option<i32>,
    pub location: LatLng,
    pub focus: Visibility,
    pub edges: Vec<EdgeId>,
}

impl Team {
    pub fn title(&self) -> String {
        format!("{} ({})", self.nickname, self.number)
    }

    /// Marker tooltip: the title, then the hometown when the feed has one.
    pub fn label(&self) -> String {
        match &self.hometown {
            Some(hometown) => format!("{} · {hometown}", self.title()),
            None => self.title(),
        }
    }

    pub fn tier(&self, season: i32) -> TeamTier {
        TeamTier::for_rookie_year(self.rookie_year, season)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub key: String,
    pub name: String,
    pub schedule: EventSchedule,
    pub start_date: Option<NaiveDate>,
    pub location: LatLng,
    pub focus: Visibility,
    pub edges: Vec<EdgeId>,
}

impl Event {
    pub fn title(&self) -> String {
        match self.schedule {
            EventSchedule::Unscheduled => self.name.clone(),
            schedule => format!("{} ({schedule})", self.name),
        }
    }

    pub fn category(&self) -> Category {
        match self.schedule {
            EventSchedule::Championship => Category::Championships,
            _ => Category::Events,
        }
    }

    pub fn style(&self) -> MarkerStyle {
        match self.category() {
            Category::Championships => MarkerStyle::Championship,
            _ => MarkerStyle::Event,
        }
    }
}

/// A team's attendance at an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub team: TeamId,
    pub event: EventId,
    pub length_m: f64,
    pub color: Color,
    viewers: ViewerCount,
}

impl Edge {
    pub fn new(team: TeamId, event: EventId, from: LatLng, to: LatLng) -> Self {
        let length_m = from.distance_to(&to);
        Self {
            team,
            event,
            length_m,
            color: edge_color(length_m),
            viewers: ViewerCount::default(),
        }
    }

    pub fn add_viewer(&mut self) -> Transition {
        self.viewers.add()
    }

    pub fn remove_viewer(&mut self) -> Transition {
        self.viewers.remove()
    }

    pub fn viewer_count(&self) -> u32 {
        self.viewers.get()
    }

    pub fn is_visible(&self) -> bool {
        self.viewers.is_visible()
    }
}

/// Linked teams, events and edges for one season.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    teams: Vec<Team>,
    events: Vec<Event>,
    edges: Vec<Edge>,
    team_keys: HashMap<String, TeamId>,
    team_numbers: HashMap<u32, TeamId>,
    event_keys: HashMap<String, EventId>,
}

impl Graph {
    pub(crate) fn push_team(&mut self, team: Team) -> TeamId {
        let id = TeamId(self.teams.len());
        self.team_keys.insert(team.key.clone(), id);
        self.team_numbers.entry(team.number).or_insert(id);
        self.teams.push(team);
        id
    }

    pub(crate) fn push_event(&mut self, event: Event) -> EventId {
        let id = EventId(self.events.len());
        self.event_keys.insert(event.key.clone(), id);
        self.events.push(event);
        id
    }

    /// Build the edge and append it to both endpoint lists.
    pub(crate) fn link(&mut self, team: TeamId, event: EventId) -> EdgeId {
        let id = EdgeId(self.edges.len());
        let from = self.teams[team.0].location;
        let to = self.events[event.0].location;
        self.edges.push(Edge::new(team, event, from, to));
        self.teams[team.0].edges.push(id);
        self.events[event.0].edges.push(id);
        id
    }

    pub fn team(&self, id: TeamId) -> &Team {
        &self.teams[id.0]
    }

    pub fn event(&self, id: EventId) -> &Event {
        &self.events[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn teams(&self) -> impl Iterator<Item = (TeamId, &Team)> {
        self.teams.iter().enumerate().map(|(i, t)| (TeamId(i), t))
    }

    pub fn events(&self) -> impl Iterator<Item = (EventId, &Event)> {
        self.events.iter().enumerate().map(|(i, e)| (EventId(i), e))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId(i), e))
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn team_by_key(&self, key: &str) -> Option<TeamId> {
        self.team_keys.get(key).copied()
    }

    pub fn team_by_number(&self, number: u32) -> Option<TeamId> {
        self.team_numbers.get(&number).copied()
    }

    pub fn event_by_key(&self, key: &str) -> Option<EventId> {
        self.event_keys.get(key).copied()
    }

    pub fn marker_edges(&self, marker: MarkerRef) -> &[EdgeId] {
        match marker {
            MarkerRef::Team(id) => &self.teams[id.0].edges,
            MarkerRef::Event(id) => &self.events[id.0].edges,
        }
    }

    pub fn location(&self, marker: MarkerRef) -> LatLng {
        match marker {
            MarkerRef::Team(id) => self.teams[id.0].location,
            MarkerRef::Event(id) => self.events[id.0].location,
        }
    }

    pub fn category(&self, marker: MarkerRef) -> Category {
        match marker {
            MarkerRef::Team(_) => Category::Teams,
            MarkerRef::Event(id) => self.events[id.0].category(),
        }
    }

    pub fn focus(&self, marker: MarkerRef) -> Visibility {
        match marker {
            MarkerRef::Team(id) => self.teams[id.0].focus,
            MarkerRef::Event(id) => self.events[id.0].focus,
        }
    }

    /// Markers in `category`, in graph order.
    pub fn members(&self, category: Category) -> Vec<MarkerRef> {
        match category {
            Category::Teams => self.teams().map(|(id, _)| MarkerRef::Team(id)).collect(),
            _ => self
                .events()
                .filter(|(_, event)| event.category() == category)
                .map(|(id, _)| MarkerRef::Event(id))
                .collect(),
        }
    }

    pub fn add_viewer(&mut self, edge: EdgeId) -> Transition {
        self.edges[edge.0].add_viewer()
    }

    pub fn remove_viewer(&mut self, edge: EdgeId) -> Transition {
        self.edges[edge.0].remove_viewer()
    }

    /// Move a marker between Hidden and Visible focus, adding or releasing its
    /// viewer on every attached edge. Returns the edges whose drawn state
    /// changed; setting the current state again is a no-op.
    pub fn set_focus(&mut self, marker: MarkerRef, focus: Visibility) -> Vec<(EdgeId, Transition)> {
        let slot = match marker {
            MarkerRef::Team(id) => &mut self.teams[id.0].focus,
            MarkerRef::Event(id) => &mut self.events[id.0].focus,
        };
        if *slot == focus {
            return Vec::new();
        }
        *slot = focus;

        let edge_ids = match marker {
            MarkerRef::Team(id) => self.teams[id.0].edges.clone(),
            MarkerRef::Event(id) => self.events[id.0].edges.clone(),
        };
        edge_ids
            .into_iter()
            .filter_map(|edge| {
                let transition = match focus {
                    Visibility::Visible => self.add_viewer(edge),
                    Visibility::Hidden => self.remove_viewer(edge),
                };
                (transition != Transition::Unchanged).then_some((edge, transition))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(key: &str, number: u32, lat: f64, lng: f64) -> Team {
        Team {
            key: key.to_string(),
            number,
            nickname: format!("Team {number}"),
            hometown: None,
            rookie_year: Some(2005),
            location: LatLng::new(lat, lng),
            focus: Visibility::Hidden,
            edges: Vec::new(),
        }
    }

    fn event(key: &str, schedule: EventSchedule, lat: f64, lng: f64) -> Event {
        Event {
            key: key.to_string(),
            name: key.to_uppercase(),
            schedule,
            start_date: None,
            location: LatLng::new(lat, lng),
            focus: Visibility::Hidden,
            edges: Vec::new(),
        }
    }

    fn two_by_one() -> (Graph, TeamId, TeamId, EventId, EdgeId, EdgeId) {
        let mut graph = Graph::default();
        let a = graph.push_team(team("frc1", 1, 10.0, 10.0));
        let b = graph.push_team(team("frc2", 2, 11.0, 11.0));
        let e = graph.push_event(event("2019aaa", EventSchedule::Week(0), 12.0, 12.0));
        let ae = graph.link(a, e);
        let be = graph.link(b, e);
        (graph, a, b, e, ae, be)
    }

    #[test]
    fn add_then_remove_returns_edge_to_hidden() {
        let (mut graph, _, _, _, edge, _) = two_by_one();
        assert_eq!(graph.add_viewer(edge), Transition::Shown);
        assert!(graph.edge(edge).is_visible());
        assert_eq!(graph.remove_viewer(edge), Transition::Hidden);
        assert_eq!(graph.edge(edge).viewer_count(), 0);
        assert!(!graph.edge(edge).is_visible());
    }

    #[test]
    fn edge_stays_visible_until_both_endpoints_release() {
        let (mut graph, _, _, _, edge, _) = two_by_one();
        assert_eq!(graph.add_viewer(edge), Transition::Shown);
        assert_eq!(graph.add_viewer(edge), Transition::Unchanged);
        assert_eq!(graph.remove_viewer(edge), Transition::Unchanged);
        assert!(graph.edge(edge).is_visible());
        assert_eq!(graph.remove_viewer(edge), Transition::Hidden);
        assert!(!graph.edge(edge).is_visible());
    }

    #[test]
    fn release_below_zero_is_clamped() {
        let (mut graph, _, _, _, edge, _) = two_by_one();
        assert_eq!(graph.remove_viewer(edge), Transition::Unchanged);
        assert_eq!(graph.edge(edge).viewer_count(), 0);
        assert_eq!(graph.add_viewer(edge), Transition::Shown);
    }

    #[test]
    fn link_appends_to_both_endpoints() {
        let (graph, a, b, e, ae, be) = two_by_one();
        assert_eq!(graph.team(a).edges, vec![ae]);
        assert_eq!(graph.team(b).edges, vec![be]);
        assert_eq!(graph.event(e).edges, vec![ae, be]);
        assert_eq!(graph.edge(ae).team, a);
        assert_eq!(graph.edge(ae).event, e);
        assert!(graph.edge(ae).length_m > 0.0);
        assert_eq!(graph.edge(ae).color, edge_color(graph.edge(ae).length_m));
    }

    #[test]
    fn overlapping_focus_keeps_shared_edge_visible() {
        let (mut graph, a, _, e, ae, be) = two_by_one();

        let shown = graph.set_focus(MarkerRef::Event(e), Visibility::Visible);
        assert_eq!(shown, vec![(ae, Transition::Shown), (be, Transition::Shown)]);

        // Team hover over an edge the selected event already shows.
        assert!(graph.set_focus(MarkerRef::Team(a), Visibility::Visible).is_empty());
        assert_eq!(graph.edge(ae).viewer_count(), 2);

        // Team leaves: edge still held by the event.
        assert!(graph.set_focus(MarkerRef::Team(a), Visibility::Hidden).is_empty());
        assert!(graph.edge(ae).is_visible());

        let hidden = graph.set_focus(MarkerRef::Event(e), Visibility::Hidden);
        assert_eq!(hidden, vec![(ae, Transition::Hidden), (be, Transition::Hidden)]);
    }

    #[test]
    fn repeated_focus_is_idempotent() {
        let (mut graph, a, _, _, ae, _) = two_by_one();
        graph.set_focus(MarkerRef::Team(a), Visibility::Visible);
        assert!(graph.set_focus(MarkerRef::Team(a), Visibility::Visible).is_empty());
        assert_eq!(graph.edge(ae).viewer_count(), 1);
        graph.set_focus(MarkerRef::Team(a), Visibility::Hidden);
        assert!(graph.set_focus(MarkerRef::Team(a), Visibility::Hidden).is_empty());
        assert_eq!(graph.edge(ae).viewer_count(), 0);
    }

    #[test]
    fn titles_and_categories() {
        let mut graph = Graph::default();
        let t = graph.push_team(team("frc254", 254, 0.0, 0.0));
        let regional = graph.push_event(event("2019casj", EventSchedule::Week(3), 0.0, 0.0));
        let cmp = graph.push_event(event("2019cmptx", EventSchedule::Championship, 0.0, 0.0));
        let off = graph.push_event(event("2019cc", EventSchedule::Unscheduled, 0.0, 0.0));

        assert_eq!(graph.team(t).title(), "Team 254 (254)");
        assert_eq!(graph.team(t).label(), "Team 254 (254)");
        let mut poofs = team("frc254", 254, 0.0, 0.0);
        poofs.hometown = Some("San Jose, California, USA".into());
        assert_eq!(poofs.label(), "Team 254 (254) · San Jose, California, USA");
        assert_eq!(graph.event(regional).title(), "2019CASJ (Week 4)");
        assert_eq!(graph.event(cmp).title(), "2019CMPTX (Championship)");
        assert_eq!(graph.event(off).title(), "2019CC");

        assert_eq!(graph.category(MarkerRef::Team(t)), Category::Teams);
        assert_eq!(graph.category(MarkerRef::Event(cmp)), Category::Championships);
        assert_eq!(
            graph.members(Category::Events),
            vec![MarkerRef::Event(regional), MarkerRef::Event(off)]
        );
        assert_eq!(graph.event(cmp).style(), MarkerStyle::Championship);
    }

    #[test]
    fn lookups_by_key_and_number() {
        let (graph, a, b, e, _, _) = two_by_one();
        assert_eq!(graph.team_by_key("frc1"), Some(a));
        assert_eq!(graph.team_by_number(2), Some(b));
        assert_eq!(graph.event_by_key("2019aaa"), Some(e));
        assert_eq!(graph.team_by_key("frc3"), None);
    }
}
