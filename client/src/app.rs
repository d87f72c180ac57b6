use frcmap_shared::{
    CategoryToggles, FIRST_SEASON, InteractionMode, LATEST_SEASON, MapContext, MapQuery,
    MarkerRef,
};
use gloo_storage::Storage;
use leptos::prelude::*;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use crate::canvas::MapCanvas;
use crate::controls::{ControlPanel, Legend, SnackbarView};
use crate::feed;
use crate::surface::CanvasSurface;
use crate::viewport::Viewport;

const SETTINGS_KEY: &str = "frcmap_settings";
const SNACKBAR_MS: u32 = 4_000;

pub(crate) fn canvas_dimensions() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

/// Touch-only devices get tap-to-toggle; anything with a hovering pointer
/// gets hover focus and click-through.
fn detect_interaction_mode() -> InteractionMode {
    let can_hover = web_sys::window()
        .and_then(|w| w.match_media("(any-hover: hover)").ok().flatten())
        .map(|mq| mq.matches())
        .unwrap_or(true);
    InteractionMode::detect(can_hover)
}

fn initial_query() -> MapQuery {
    let search = web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default();
    MapQuery::parse(&search)
}

/// Rewrite the address bar without adding a history entry.
fn replace_query(query: &MapQuery) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let url = match query.to_query_string() {
        qs if qs.is_empty() => window.location().pathname().unwrap_or_else(|_| "/".into()),
        qs => qs,
    };
    if let Ok(history) = window.history() {
        history
            .replace_state_with_url(&JsValue::NULL, "", Some(&url))
            .ok();
    }
}

/// The map context for the loaded season. `None` while loading or after a failure.
#[derive(Clone, Copy)]
pub(crate) struct MapState(pub StoredValue<Option<MapContext<CanvasSurface>>>);
/// Bumped whenever the map context is replaced or its markers change.
#[derive(Clone, Copy)]
pub(crate) struct SceneRevision(pub RwSignal<u64>);
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<MarkerRef>>);
#[derive(Clone, Copy)]
pub(crate) struct Toggles(pub RwSignal<CategoryToggles>);
#[derive(Clone, Copy)]
pub(crate) struct SelectedYear(pub RwSignal<Option<i32>>);
#[derive(Clone, Copy)]
pub(crate) struct AvailableSeasons(pub RwSignal<Vec<i32>>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LoadState {
    Idle,
    Loading(i32),
    Ready(i32),
    Failed(i32, String),
}

#[derive(Clone, Copy)]
pub(crate) struct LoadStatus(pub RwSignal<LoadState>);

/// Transient notification line. Each message replaces the previous one and
/// clears itself after a few seconds.
#[derive(Clone, Copy)]
pub(crate) struct Snackbar {
    pub message: RwSignal<Option<String>>,
    serial: StoredValue<u64>,
}

impl Snackbar {
    fn new() -> Self {
        Self {
            message: RwSignal::new(None),
            serial: StoredValue::new(0),
        }
    }

    pub fn show(self, message: impl Into<String>) {
        let id = self.serial.get_value().wrapping_add(1);
        self.serial.set_value(id);
        self.message.set(Some(message.into()));
        let Self { message, serial } = self;
        gloo_timers::callback::Timeout::new(SNACKBAR_MS, move || {
            if serial.get_value() == id {
                message.set(None);
            }
        })
        .forget();
    }
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
struct Settings {
    toggles: CategoryToggles,
}

/// Centre the map on a team; misses go to the snackbar. A hit may have
/// switched teams back on, so the toggles are re-read from the context.
pub(crate) fn search_team(
    map: StoredValue<Option<MapContext<CanvasSurface>>>,
    viewport: RwSignal<Viewport>,
    toggles: RwSignal<CategoryToggles>,
    revision: RwSignal<u64>,
    snackbar: Snackbar,
    query: &str,
) {
    let mut outcome = None;
    let mut shown = None;
    map.update_value(|ctx| {
        if let Some(ctx) = ctx.as_mut() {
            outcome = Some(ctx.search(query).map(|_| ctx.surface_mut().take_focus()));
            shown = Some(ctx.toggles());
        }
    });
    if let Some(shown) = shown
        && shown != toggles.get_untracked()
    {
        toggles.set(shown);
        revision.update(|r| *r = r.wrapping_add(1));
    }
    match outcome {
        None => snackbar.show("The season is still loading"),
        Some(Ok(Some((center, zoom)))) => {
            let (w, h) = canvas_dimensions();
            viewport.update(|vp| vp.center_on(center, zoom, w, h));
        }
        Some(Ok(None)) => {}
        Some(Err(e)) => snackbar.show(e.to_string()),
    }
}

fn season_choices(mut seasons: Vec<i32>, selected: Option<i32>) -> Vec<i32> {
    if seasons.is_empty() {
        seasons = (FIRST_SEASON..=LATEST_SEASON).collect();
    }
    if let Some(year) = selected
        && !seasons.contains(&year)
    {
        seasons.push(year);
    }
    seasons.sort_unstable_by(|a, b| b.cmp(a));
    seasons.dedup();
    seasons
}

/// Root application component. Provides global reactive state via context.
#[component]
pub fn App() -> impl IntoView {
    let query = initial_query();
    let mode = detect_interaction_mode();
    log::info!("interaction mode: {mode:?}");

    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let map: StoredValue<Option<MapContext<CanvasSurface>>> = StoredValue::new(None);
    let revision: RwSignal<u64> = RwSignal::new(0);
    let hovered: RwSignal<Option<MarkerRef>> = RwSignal::new(None);
    let toggles: RwSignal<CategoryToggles> = RwSignal::new(saved.toggles);
    let selected_year: RwSignal<Option<i32>> = RwSignal::new(None);
    let seasons: RwSignal<Vec<i32>> = RwSignal::new(season_choices(Vec::new(), query.year));
    let status: RwSignal<LoadState> = RwSignal::new(LoadState::Idle);
    let viewport: RwSignal<Viewport> = RwSignal::new(Viewport::default());
    let snackbar = Snackbar::new();
    let load_generation: StoredValue<u64> = StoredValue::new(0);
    let pending_team: StoredValue<Option<String>> = StoredValue::new(query.team.clone());

    provide_context(MapState(map));
    provide_context(SceneRevision(revision));
    provide_context(Hovered(hovered));
    provide_context(Toggles(toggles));
    provide_context(SelectedYear(selected_year));
    provide_context(AvailableSeasons(seasons));
    provide_context(LoadStatus(status));
    provide_context(snackbar);
    provide_context(viewport);

    // Persist toggles on every change.
    Effect::new(move || {
        let settings = Settings {
            toggles: toggles.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    // Pick the starting season once the server has said which feeds exist.
    let requested_year = query.year;
    spawn_local(async move {
        let index = match feed::fetch_season_index().await {
            Ok(index) => index,
            Err(e) => {
                log::warn!("season list unavailable: {e}");
                feed::SeasonIndex::default()
            }
        };
        let year = requested_year.or(index.latest).unwrap_or(LATEST_SEASON);
        seasons.set(season_choices(index.seasons, Some(year)));
        selected_year.set(Some(year));
    });

    // Load whichever season is selected; a newer selection discards older results.
    Effect::new(move || {
        let Some(year) = selected_year.get() else {
            return;
        };
        let generation = load_generation.get_value().wrapping_add(1);
        load_generation.set_value(generation);
        status.set(LoadState::Loading(year));

        spawn_local(async move {
            let result = feed::load_season(year).await;
            if load_generation.get_value() != generation {
                log::debug!("discarding stale load of season {year}");
                return;
            }
            hovered.set(None);
            match result {
                Ok(loaded) => {
                    let mut ctx =
                        MapContext::new(year, loaded.graph, mode, CanvasSurface::default());
                    ctx.apply_toggles(toggles.get_untracked());
                    let bounds = ctx.surface().world_bounds();
                    map.set_value(Some(ctx));
                    if let Some(bounds) = bounds {
                        let (w, h) = canvas_dimensions();
                        viewport.update(|vp| vp.fit_bounds(bounds, w, h));
                    }
                    status.set(LoadState::Ready(year));
                    revision.update(|r| *r = r.wrapping_add(1));

                    if let Some(team) = pending_team.get_value() {
                        pending_team.set_value(None);
                        search_team(map, viewport, toggles, revision, snackbar, &team);
                    }
                }
                Err(e) => {
                    log::error!("season {year} failed to load: {e}");
                    map.set_value(None);
                    status.set(LoadState::Failed(year, e.clone()));
                    revision.update(|r| *r = r.wrapping_add(1));
                    snackbar.show(format!("Could not load the {year} season ({e})"));
                }
            }
        });
    });

    // Keep the address bar in step with the selected season.
    Effect::new(move || {
        if let Some(year) = selected_year.get() {
            let team = pending_team.get_value();
            replace_query(&MapQuery {
                year: Some(year),
                team,
            });
        }
    });

    view! {
        <div class="frcmap" style="position: fixed; inset: 0;">
            <MapCanvas />
            <ControlPanel />
            <Legend />
            <SnackbarView />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_choices_fall_back_to_full_range() {
        let choices = season_choices(Vec::new(), None);
        assert_eq!(choices.first(), Some(&LATEST_SEASON));
        assert_eq!(choices.last(), Some(&FIRST_SEASON));
        assert_eq!(choices.len(), (LATEST_SEASON - FIRST_SEASON + 1) as usize);
    }

    #[test]
    fn season_choices_include_selected_year_newest_first() {
        let choices = season_choices(vec![2018, 2019], Some(2007));
        assert_eq!(choices, vec![2019, 2018, 2007]);
        let choices = season_choices(vec![2019, 2018], Some(2019));
        assert_eq!(choices, vec![2019, 2018]);
    }

    #[test]
    fn settings_default_to_every_category_on() {
        let settings: Settings = serde_json::from_str("{}").expect("empty settings parse");
        assert_eq!(settings.toggles, CategoryToggles::default());
        let settings: Settings =
            serde_json::from_str(r#"{"toggles": {"events": false}}"#).expect("partial settings");
        assert!(settings.toggles.teams);
        assert!(!settings.toggles.events);
    }
}
