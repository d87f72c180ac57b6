use frcmap_shared::marker::legend;
use frcmap_shared::{Category, MapQuery};
use leptos::prelude::*;

use crate::app::{
    AvailableSeasons, Hovered, LoadState, LoadStatus, MapState, SceneRevision, SelectedYear,
    Snackbar, Toggles, search_team,
};
use crate::viewport::Viewport;

const SUGGESTION_LIMIT: usize = 8;
const LEGEND_STYLE: &str = "position: absolute; bottom: 12px; left: 12px; padding: 8px 10px; \
    background: rgba(18, 22, 34, 0.92); color: #e2e0d8; border-radius: 6px; \
    font: 12px system-ui, sans-serif;";
const SNACKBAR_STYLE: &str = "position: absolute; bottom: 16px; left: 50%; transform: translateX(-50%); \
    padding: 10px 16px; background: #2a2f42; color: #f5f5f5; border-radius: 4px; \
    font: 14px system-ui, sans-serif;";
const PANEL_STYLE: &str = "position: absolute; top: 12px; left: 12px; padding: 10px 12px; \
    background: rgba(18, 22, 34, 0.92); color: #e2e0d8; border-radius: 6px; \
    font: 13px system-ui, sans-serif; display: flex; flex-direction: column; gap: 8px;";

/// Season selector, category switches and team search.
#[component]
pub fn ControlPanel() -> impl IntoView {
    let MapState(map) = expect_context();
    let SceneRevision(revision) = expect_context();
    let Hovered(hovered) = expect_context();
    let Toggles(toggles) = expect_context();
    let SelectedYear(selected_year) = expect_context();
    let AvailableSeasons(seasons) = expect_context();
    let LoadStatus(status) = expect_context();
    let snackbar: Snackbar = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    let search_text: RwSignal<String> = RwSignal::new(String::new());

    let set_category = move |category: Category, on: bool| {
        map.update_value(|ctx| {
            let Some(ctx) = ctx.as_mut() else {
                return;
            };
            // Release hover focus before its marker disappears.
            if !on
                && let Some(marker) = hovered.get_untracked()
                && ctx.graph().category(marker) == category
            {
                ctx.pointer_leave(marker);
                hovered.set(None);
            }
            ctx.set_category(category, on);
        });
        toggles.update(|t| {
            t.set(category, on);
        });
        revision.update(|r| *r = r.wrapping_add(1));
    };

    let on_year_change = move |ev: web_sys::Event| {
        match event_target_value(&ev).parse::<i32>() {
            Ok(year) => {
                selected_year.set(Some(year));
            }
            Err(e) => log::warn!("ignoring season selection: {e}"),
        }
    };

    let on_search = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let text = search_text.get_untracked();
        search_team(map, viewport, toggles, revision, snackbar, &text);
    };

    let suggestions = move || {
        revision.track();
        let text = search_text.get();
        if text.trim().is_empty() {
            return Vec::new();
        }
        map.with_value(|ctx| {
            ctx.as_ref()
                .map(|ctx| ctx.suggest(&text, SUGGESTION_LIMIT))
                .unwrap_or_default()
        })
    };

    let status_line = move || match status.get() {
        LoadState::Idle => String::new(),
        LoadState::Loading(year) => format!("Loading {year}…"),
        LoadState::Ready(year) => map.with_value(|ctx| {
            ctx.as_ref()
                .map(|ctx| {
                    format!(
                        "{year}: {} teams, {} events",
                        ctx.graph().team_count(),
                        ctx.graph().event_count()
                    )
                })
                .unwrap_or_default()
        }),
        LoadState::Failed(year, e) => format!("{year} unavailable: {e}"),
    };

    let share_link = move || {
        let year = selected_year.get();
        MapQuery { year, team: None }.to_query_string()
    };

    view! {
        <div class="control-panel" style=PANEL_STYLE>
            <label>
                "Season "
                <select
                    on:change=on_year_change
                    prop:value=move || selected_year.get().map(|y| y.to_string()).unwrap_or_default()
                >
                    {move || {
                        seasons
                            .get()
                            .into_iter()
                            .map(|year| {
                                view! { <option value=year.to_string()>{year.to_string()}</option> }
                            })
                            .collect_view()
                    }}
                </select>
            </label>
            {Category::ALL
                .into_iter()
                .map(|category| {
                    view! {
                        <label>
                            <input
                                type="checkbox"
                                prop:checked=move || toggles.get().is_on(category)
                                on:change=move |ev| set_category(category, event_target_checked(&ev))
                            />
                            " "
                            {category.label()}
                        </label>
                    }
                })
                .collect_view()}
            <form on:submit=on_search>
                <input
                    type="search"
                    placeholder="Team number"
                    list="team-suggestions"
                    prop:value=move || search_text.get()
                    on:input=move |ev| search_text.set(event_target_value(&ev))
                />
                <datalist id="team-suggestions">
                    {move || {
                        suggestions()
                            .into_iter()
                            .map(|s| view! { <option value=s.number.to_string()>{s.label}</option> })
                            .collect_view()
                    }}
                </datalist>
                <button type="submit">"Find"</button>
            </form>
            <div class="status" style="color: #8a8894; font-size: 12px;">{status_line}</div>
            <a href=share_link style="color: #8a8894; font-size: 12px;">"Link to this season"</a>
        </div>
    }
}

/// Marker colour key: team rookie-year tiers, then events and championships.
#[component]
pub fn Legend() -> impl IntoView {
    view! {
        <div class="legend" style=LEGEND_STYLE>
            <div style="margin-bottom: 4px; color: #8a8894;">"Teams by rookie year"</div>
            {legend()
                .map(|style| {
                    let swatch = format!(
                        "display: inline-block; width: 10px; height: 10px; border-radius: 50%; \
                         margin-right: 6px; background: {};",
                        style.color().hex()
                    );
                    view! {
                        <div>
                            <span style=swatch></span>
                            {style.label()}
                        </div>
                    }
                })
                .collect_view()}
        </div>
    }
}

#[component]
pub fn SnackbarView() -> impl IntoView {
    let snackbar: Snackbar = expect_context();
    move || {
        snackbar.message.get().map(|message| {
            view! {
                <div class="snackbar" role="status" style=SNACKBAR_STYLE>
                    {message}
                </div>
            }
        })
    }
}
