use crate::color::Color;
use crate::geo::LatLng;
use crate::graph::{EdgeId, EventId, Graph, MarkerRef, TeamId};
use crate::marker::MarkerStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineHandle(pub usize);

/// Everything a surface needs to draw one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub marker: MarkerRef,
    pub position: LatLng,
    pub style: MarkerStyle,
    pub title: String,
}

/// Drawing primitives the map core relies on.
pub trait MapSurface {
    fn place_marker(&mut self, spec: &MarkerSpec) -> MarkerHandle;
    fn draw_polyline(&mut self, from: LatLng, to: LatLng, color: Color) -> LineHandle;
    fn set_marker_visible(&mut self, handle: MarkerHandle, visible: bool);
    fn set_line_visible(&mut self, handle: LineHandle, visible: bool);
    fn focus_on(&mut self, center: LatLng, zoom: f64);
}

/// Surface handles for one graph, indexed like the graph's arenas.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    teams: Vec<MarkerHandle>,
    events: Vec<MarkerHandle>,
    lines: Vec<LineHandle>,
}

impl Scene {
    /// Place every marker (shown) and every edge line (hidden).
    pub fn build<S: MapSurface>(graph: &Graph, season: i32, surface: &mut S) -> Self {
        let teams = graph
            .teams()
            .map(|(id, team)| {
                surface.place_marker(&MarkerSpec {
                    marker: MarkerRef::Team(id),
                    position: team.location,
                    style: MarkerStyle::Team(team.tier(season)),
                    title: team.label(),
                })
            })
            .collect();
        let events = graph
            .events()
            .map(|(id, event)| {
                surface.place_marker(&MarkerSpec {
                    marker: MarkerRef::Event(id),
                    position: event.location,
                    style: event.style(),
                    title: event.title(),
                })
            })
            .collect();
        let lines = graph
            .edges()
            .map(|(_, edge)| {
                let from = graph.team(edge.team).location;
                let to = graph.event(edge.event).location;
                let line = surface.draw_polyline(from, to, edge.color);
                surface.set_line_visible(line, false);
                line
            })
            .collect();
        log::debug!(
            "scene built: {} team markers, {} event markers, {} lines",
            graph.team_count(),
            graph.event_count(),
            graph.edge_count()
        );
        Self {
            teams,
            events,
            lines,
        }
    }

    pub fn team_marker(&self, id: TeamId) -> MarkerHandle {
        self.teams[id.index()]
    }

    pub fn event_marker(&self, id: EventId) -> MarkerHandle {
        self.events[id.index()]
    }

    pub fn marker(&self, marker: MarkerRef) -> MarkerHandle {
        match marker {
            MarkerRef::Team(id) => self.team_marker(id),
            MarkerRef::Event(id) => self.event_marker(id),
        }
    }

    pub fn line(&self, id: EdgeId) -> LineHandle {
        self.lines[id.index()]
    }
}
