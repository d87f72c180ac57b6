use std::collections::HashMap;

use crate::graph::{Graph, MarkerRef, TeamId, Transition};
use crate::marker::{event_page_url, team_page_url};
use crate::search::{SearchError, Suggestion, find_team, suggest};
use crate::surface::{MapSurface, Scene};
use crate::visibility::{Category, CategoryToggles, InteractionMode, Visibility};

/// Zoom level used when centring on a search result.
pub const SEARCH_ZOOM: f64 = 14.0;

/// What the UI should do after a marker was clicked or tapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerAction {
    OpenPage(String),
    /// Tap mode: the marker's edges are now shown (`true`) or hidden.
    FocusChanged(bool),
    /// The marker's category is switched off.
    Ignored,
}

/// All mutable map state for one loaded season.
pub struct MapContext<S> {
    season: i32,
    graph: Graph,
    scene: Scene,
    surface: S,
    mode: InteractionMode,
    toggles: CategoryToggles,
    parked: HashMap<Category, Vec<MarkerRef>>,
}

impl<S: MapSurface> MapContext<S> {
    pub fn new(season: i32, graph: Graph, mode: InteractionMode, mut surface: S) -> Self {
        let scene = Scene::build(&graph, season, &mut surface);
        Self {
            season,
            graph,
            scene,
            surface,
            mode,
            toggles: CategoryToggles::default(),
            parked: HashMap::new(),
        }
    }

    pub fn season(&self) -> i32 {
        self.season
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn toggles(&self) -> CategoryToggles {
        self.toggles
    }

    pub fn is_drawn(&self, marker: MarkerRef) -> bool {
        self.toggles.is_on(self.graph.category(marker))
    }

    fn apply_focus(&mut self, marker: MarkerRef, focus: Visibility) -> bool {
        if self.graph.focus(marker) == focus {
            return false;
        }
        for (edge, transition) in self.graph.set_focus(marker, focus) {
            let line = self.scene.line(edge);
            self.surface
                .set_line_visible(line, transition == Transition::Shown);
        }
        true
    }

    /// Returns `false` when nothing changed or the marker is not drawn.
    pub fn set_focus(&mut self, marker: MarkerRef, focus: Visibility) -> bool {
        if !self.is_drawn(marker) {
            return false;
        }
        self.apply_focus(marker, focus)
    }

    pub fn pointer_enter(&mut self, marker: MarkerRef) {
        if self.mode == InteractionMode::Hover {
            self.set_focus(marker, Visibility::Visible);
        }
    }

    pub fn pointer_leave(&mut self, marker: MarkerRef) {
        if self.mode == InteractionMode::Hover {
            self.set_focus(marker, Visibility::Hidden);
        }
    }

    pub fn activate(&mut self, marker: MarkerRef) -> MarkerAction {
        if !self.is_drawn(marker) {
            return MarkerAction::Ignored;
        }
        match self.mode {
            InteractionMode::Hover => MarkerAction::OpenPage(self.page_url(marker)),
            InteractionMode::TapToggle => {
                let next = self.graph.focus(marker).toggled();
                self.apply_focus(marker, next);
                MarkerAction::FocusChanged(next.is_visible())
            }
        }
    }

    pub fn page_url(&self, marker: MarkerRef) -> String {
        match marker {
            MarkerRef::Team(id) => team_page_url(self.graph.team(id).number, self.season),
            MarkerRef::Event(id) => event_page_url(&self.graph.event(id).key),
        }
    }

    /// Release every focused marker, e.g. after a tap on empty map.
    pub fn clear_focus(&mut self) {
        let focused: Vec<MarkerRef> = Category::ALL
            .into_iter()
            .flat_map(|category| self.graph.members(category))
            .filter(|marker| self.graph.focus(*marker).is_visible())
            .collect();
        for marker in focused {
            self.apply_focus(marker, Visibility::Hidden);
        }
    }

    /// Switch a whole category. Focused members are released while the
    /// category is off and refocused when it comes back.
    pub fn set_category(&mut self, category: Category, on: bool) {
        if !self.toggles.set(category, on) {
            return;
        }
        let members = self.graph.members(category);
        if on {
            for marker in &members {
                let handle = self.scene.marker(*marker);
                self.surface.set_marker_visible(handle, true);
            }
            for marker in self.parked.remove(&category).unwrap_or_default() {
                self.apply_focus(marker, Visibility::Visible);
            }
        } else {
            let focused: Vec<MarkerRef> = members
                .iter()
                .copied()
                .filter(|marker| self.graph.focus(*marker).is_visible())
                .collect();
            for marker in &focused {
                self.apply_focus(*marker, Visibility::Hidden);
            }
            for marker in &members {
                let handle = self.scene.marker(*marker);
                self.surface.set_marker_visible(handle, false);
            }
            self.parked.insert(category, focused);
        }
        log::debug!("{} switched {}", category.label(), if on { "on" } else { "off" });
    }

    pub fn apply_toggles(&mut self, toggles: CategoryToggles) {
        for category in Category::ALL {
            self.set_category(category, toggles.is_on(category));
        }
    }

    /// Centre the map on a team by number. Teams are switched back on if
    /// they were hidden, so the result is never an invisible marker.
    pub fn search(&mut self, query: &str) -> Result<TeamId, SearchError> {
        let id = find_team(&self.graph, query)?;
        if !self.toggles.teams {
            self.set_category(Category::Teams, true);
        }
        let location = self.graph.team(id).location;
        self.surface.focus_on(location, SEARCH_ZOOM);
        Ok(id)
    }

    pub fn suggest(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        suggest(&self.graph, query, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_feed;
    use crate::join::join;
    use crate::surface::tests::RecordingSurface;

    const FEED: &str = r#"{
        "teams": {
            "frc1": {"team_number": 1, "nickname": "One", "lat": 10.0, "lng": 10.0,
                     "events": ["2019reg", "2019cmp"]},
            "frc2": {"team_number": 2, "nickname": "Two", "lat": 20.0, "lng": 20.0,
                     "events": ["2019reg"]}
        },
        "events": {
            "2019reg": {"name": "Regional", "week": 1, "lat": 15.0, "lng": 15.0},
            "2019cmp": {"name": "Champs", "event_type": 3, "lat": 30.0, "lng": 30.0}
        }
    }"#;

    fn context(mode: InteractionMode) -> MapContext<RecordingSurface> {
        let graph = join(&parse_feed(FEED).expect("fixture parses")).graph;
        MapContext::new(2019, graph, mode, RecordingSurface::default())
    }

    fn team(ctx: &MapContext<RecordingSurface>, number: u32) -> MarkerRef {
        MarkerRef::Team(ctx.graph().team_by_number(number).expect("team exists"))
    }

    fn event(ctx: &MapContext<RecordingSurface>, key: &str) -> MarkerRef {
        MarkerRef::Event(ctx.graph().event_by_key(key).expect("event exists"))
    }

    fn visible_lines(ctx: &MapContext<RecordingSurface>) -> usize {
        ctx.graph()
            .edges()
            .filter(|(id, _)| ctx.surface().line_visible(ctx.scene().line(*id)))
            .count()
    }

    #[test]
    fn hover_shows_and_hides_team_edges() {
        let mut ctx = context(InteractionMode::Hover);
        let one = team(&ctx, 1);
        ctx.pointer_enter(one);
        assert_eq!(visible_lines(&ctx), 2);
        ctx.pointer_leave(one);
        assert_eq!(visible_lines(&ctx), 0);
    }

    #[test]
    fn shared_edge_needs_both_endpoints_released() {
        let mut ctx = context(InteractionMode::TapToggle);
        let one = team(&ctx, 1);
        let reg = event(&ctx, "2019reg");

        assert_eq!(ctx.activate(reg), MarkerAction::FocusChanged(true));
        assert_eq!(ctx.activate(one), MarkerAction::FocusChanged(true));
        assert_eq!(visible_lines(&ctx), 3);

        assert_eq!(ctx.activate(reg), MarkerAction::FocusChanged(false));
        // frc1's two edges stay up, frc2's edge to the regional goes.
        assert_eq!(visible_lines(&ctx), 2);

        assert_eq!(ctx.activate(one), MarkerAction::FocusChanged(false));
        assert_eq!(visible_lines(&ctx), 0);
    }

    #[test]
    fn surface_only_sees_real_transitions() {
        let mut ctx = context(InteractionMode::Hover);
        let one = team(&ctx, 1);
        let reg = event(&ctx, "2019reg");
        let before = ctx.surface().line_calls.len();
        ctx.pointer_enter(reg);
        ctx.pointer_enter(one);
        ctx.pointer_enter(one);
        // regional shows two lines, frc1 adds only the championship line
        assert_eq!(ctx.surface().line_calls.len() - before, 3);
    }

    #[test]
    fn category_round_trip_restores_focus() {
        let mut ctx = context(InteractionMode::TapToggle);
        let one = team(&ctx, 1);
        let two = team(&ctx, 2);
        let cmp = event(&ctx, "2019cmp");
        ctx.activate(one);
        ctx.activate(cmp);

        ctx.set_category(Category::Teams, false);
        assert_eq!(ctx.graph().focus(one), Visibility::Hidden);
        assert!(!ctx.surface().marker_visible(ctx.scene().marker(one)));
        assert!(!ctx.surface().marker_visible(ctx.scene().marker(two)));
        // championship focus untouched, its edge to frc1 still shown
        assert_eq!(ctx.graph().focus(cmp), Visibility::Visible);
        assert_eq!(visible_lines(&ctx), 1);
        assert_eq!(ctx.activate(two), MarkerAction::Ignored);

        ctx.set_category(Category::Teams, true);
        assert_eq!(ctx.graph().focus(one), Visibility::Visible);
        assert_eq!(ctx.graph().focus(two), Visibility::Hidden);
        assert!(ctx.surface().marker_visible(ctx.scene().marker(two)));
        assert_eq!(visible_lines(&ctx), 2);
    }

    #[test]
    fn categories_are_independent() {
        let mut ctx = context(InteractionMode::Hover);
        let reg = event(&ctx, "2019reg");
        let cmp = event(&ctx, "2019cmp");
        ctx.set_category(Category::Championships, false);
        assert!(!ctx.is_drawn(cmp));
        assert!(ctx.is_drawn(reg));
        assert!(ctx.surface().marker_visible(ctx.scene().marker(reg)));
        assert!(!ctx.toggles().championships);
        assert!(ctx.toggles().events);
    }

    #[test]
    fn hover_mode_click_opens_tba_page() {
        let mut ctx = context(InteractionMode::Hover);
        let one = team(&ctx, 1);
        let cmp = event(&ctx, "2019cmp");
        assert_eq!(
            ctx.activate(one),
            MarkerAction::OpenPage("https://www.thebluealliance.com/team/1/2019".into())
        );
        assert_eq!(
            ctx.activate(cmp),
            MarkerAction::OpenPage("https://www.thebluealliance.com/event/2019cmp".into())
        );
    }

    #[test]
    fn tap_mode_ignores_pointer_hover() {
        let mut ctx = context(InteractionMode::TapToggle);
        let one = team(&ctx, 1);
        ctx.pointer_enter(one);
        assert_eq!(visible_lines(&ctx), 0);
    }

    #[test]
    fn clear_focus_releases_everything() {
        let mut ctx = context(InteractionMode::TapToggle);
        let one = team(&ctx, 1);
        let reg = event(&ctx, "2019reg");
        ctx.activate(one);
        ctx.activate(reg);
        ctx.clear_focus();
        assert_eq!(visible_lines(&ctx), 0);
        assert!(ctx.graph().edges().all(|(_, e)| e.viewer_count() == 0));
    }

    #[test]
    fn search_centres_map_on_team() {
        let mut ctx = context(InteractionMode::Hover);
        let id = ctx.search("frc2").expect("team 2 exists");
        assert_eq!(ctx.graph().team(id).number, 2);
        let (center, zoom) = ctx.surface().focus.expect("focus_on called");
        assert_eq!(center, ctx.graph().team(id).location);
        assert_eq!(zoom, SEARCH_ZOOM);

        let err = ctx.search("404").expect_err("unknown team");
        assert_eq!(err.to_string(), "Could not find team 404");
    }

    #[test]
    fn search_turns_teams_back_on() {
        let mut ctx = context(InteractionMode::Hover);
        ctx.set_category(Category::Teams, false);
        let id = ctx.search("1").expect("team 1 exists");
        assert!(ctx.toggles().teams);
        assert!(ctx.is_drawn(MarkerRef::Team(id)));
        assert!(ctx.surface().marker_visible(ctx.scene().marker(MarkerRef::Team(id))));

        // a miss leaves the toggles alone
        ctx.set_category(Category::Teams, false);
        assert!(ctx.search("404").is_err());
        assert!(!ctx.toggles().teams);
    }

    #[test]
    fn apply_toggles_hides_switched_off_categories() {
        let mut ctx = context(InteractionMode::Hover);
        ctx.apply_toggles(CategoryToggles {
            teams: true,
            events: false,
            championships: true,
        });
        let reg = event(&ctx, "2019reg");
        assert!(!ctx.surface().marker_visible(ctx.scene().marker(reg)));
        assert_eq!(ctx.suggest("tw", 5).len(), 1);
    }
}
