use std::cell::{Cell, RefCell};
use std::f64::consts::TAU;
use std::rc::Rc;

use frcmap_shared::{InteractionMode, MapContext, MarkerAction, MarkerRef};
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use crate::app::{Hovered, MapState, SceneRevision};
use crate::render_loop::RenderScheduler;
use crate::spatial::MarkerGrid;
use crate::surface::CanvasSurface;
use crate::tiles::{ATTRIBUTION, ATTRIBUTION_URL, TileLayer, visible_tiles};
use crate::viewport::{Viewport, WORLD_SIZE};

const TEAM_RADIUS_PX: f64 = 4.0;
const EVENT_RADIUS_PX: f64 = 6.0;
const HOVER_GROWTH_PX: f64 = 2.0;
const HIT_RADIUS_PX: f64 = 9.0;
const CLICK_SLOP_PX: f64 = 5.0;

const BACKGROUND: &str = "#0b0e17";
const WORLD_FILL: &str = "#121828";
const TILE_ALPHA: f64 = 0.8;
const ATTRIBUTION_STYLE: &str = "position: absolute; right: 4px; bottom: 2px; padding: 1px 5px; \
    background: rgba(18, 22, 34, 0.75); color: #8a8894; font: 11px system-ui, sans-serif;";
const MARKER_OUTLINE: &str = "rgba(8, 10, 18, 0.9)";
const HOVER_OUTLINE: &str = "#f5f5f5";
const EDGE_ALPHA: f64 = 0.85;

fn local_point(canvas: Option<HtmlCanvasElement>, client_x: f64, client_y: f64) -> (f64, f64) {
    canvas
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (client_x - rect.left(), client_y - rect.top())
        })
        .unwrap_or((client_x, client_y))
}

/// Topmost visible marker under a screen point.
fn marker_at(
    map: StoredValue<Option<MapContext<CanvasSurface>>>,
    grid: &MarkerGrid,
    vp: &Viewport,
    sx: f64,
    sy: f64,
) -> Option<MarkerRef> {
    let (wx, wy) = vp.screen_to_world(sx, sy);
    let radius = HIT_RADIUS_PX / vp.scale;
    map.with_value(|ctx| {
        let surface = ctx.as_ref()?.surface();
        let idx = grid.find_nearest(wx, wy, radius, |idx| {
            surface.markers().get(idx).is_some_and(|marker| marker.visible)
        })?;
        surface.markers().get(idx).map(|marker| marker.marker)
    })
}

fn open_page(url: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.open_with_url_and_target(url, "_blank") {
        log::warn!("could not open {url}: {e:?}");
    }
}

/// Canvas map: edge lines under markers, with pan, wheel/pinch zoom,
/// hover and click/tap wired into the map context.
#[component]
pub fn MapCanvas() -> impl IntoView {
    let MapState(map) = expect_context();
    let SceneRevision(revision) = expect_context();
    let Hovered(hovered) = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let tile_tick: RwSignal<u64> = RwSignal::new(0);
    let tiles = TileLayer::new(tile_tick);
    let grid: Rc<RefCell<MarkerGrid>> = Rc::new(RefCell::new(MarkerGrid::default()));

    let is_dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0_f64, 0.0_f64)));
    let last_pos = Rc::new(Cell::new((0.0_f64, 0.0_f64)));
    let pinch_dist = Rc::new(Cell::new(0.0_f64));

    let scheduler = Rc::new(RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let vp = viewport.get_untracked();
        let hov = hovered.get_untracked();
        map.with_value(|ctx| {
            paint(&canvas, &vp, &tiles, ctx.as_ref().map(|c| c.surface()), hov)
        });
    }));

    // Any state change that moves or restyles something on screen.
    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            viewport.track();
            revision.track();
            hovered.track();
            tile_tick.track();
            scheduler.mark_dirty();
        }
    });

    // Marker positions only change when a season is (re)built.
    Effect::new({
        let grid = grid.clone();
        move || {
            revision.track();
            let points = map.with_value(|ctx| {
                ctx.as_ref()
                    .map(|c| c.surface().marker_points())
                    .unwrap_or_default()
            });
            *grid.borrow_mut() = MarkerGrid::build(&points);
        }
    });

    if let Some(window) = web_sys::window() {
        let scheduler = scheduler.clone();
        let on_resize = Closure::<dyn Fn()>::new(move || scheduler.mark_dirty());
        if window
            .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
            .is_ok()
        {
            on_resize.forget();
        }
    }

    let set_hovered = move |next: Option<MarkerRef>| {
        let current = hovered.get_untracked();
        if current == next {
            return;
        }
        map.update_value(|ctx| {
            if let Some(ctx) = ctx.as_mut() {
                if let Some(old) = current {
                    ctx.pointer_leave(old);
                }
                if let Some(new) = next {
                    ctx.pointer_enter(new);
                }
            }
        });
        hovered.set(next);
    };

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let x = e.offset_x() as f64;
        let y = e.offset_y() as f64;
        viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start = drag_start.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            let pos = (e.client_x() as f64, e.client_y() as f64);
            is_dragging.set(true);
            drag_start.set(pos);
            last_pos.set(pos);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_pos = last_pos.clone();
        let grid = grid.clone();
        move |e: PointerEvent| {
            let pos = (e.client_x() as f64, e.client_y() as f64);
            if is_dragging.get() {
                let (lx, ly) = last_pos.get();
                last_pos.set(pos);
                viewport.update(|vp| vp.pan(pos.0 - lx, pos.1 - ly));
                return;
            }
            let (sx, sy) = local_point(canvas_ref.get_untracked(), pos.0, pos.1);
            let vp = viewport.get_untracked();
            let hit = marker_at(map, &grid.borrow(), &vp, sx, sy);
            set_hovered(hit);
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_pointer_leave = {
        let is_dragging = is_dragging.clone();
        move |_: PointerEvent| {
            is_dragging.set(false);
            set_hovered(None);
        }
    };

    let on_click = {
        let drag_start = drag_start.clone();
        let grid = grid.clone();
        let scheduler = scheduler.clone();
        move |e: MouseEvent| {
            let (start_x, start_y) = drag_start.get();
            let dx = (e.client_x() as f64 - start_x).abs();
            let dy = (e.client_y() as f64 - start_y).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }
            let (sx, sy) = local_point(
                canvas_ref.get_untracked(),
                e.client_x() as f64,
                e.client_y() as f64,
            );
            let vp = viewport.get_untracked();
            let hit = marker_at(map, &grid.borrow(), &vp, sx, sy);

            let mut action = MarkerAction::Ignored;
            map.update_value(|ctx| {
                let Some(ctx) = ctx.as_mut() else {
                    return;
                };
                match hit {
                    Some(marker) => action = ctx.activate(marker),
                    None if ctx.mode() == InteractionMode::TapToggle => {
                        ctx.clear_focus();
                        action = MarkerAction::FocusChanged(false);
                    }
                    None => {}
                }
            });

            match action {
                MarkerAction::OpenPage(url) => open_page(&url),
                MarkerAction::FocusChanged(_) => {
                    // Taps also show the title, like hover does.
                    hovered.set(hit);
                    scheduler.mark_dirty();
                }
                MarkerAction::Ignored => {}
            }
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                let new_dist = (dx * dx + dy * dy).sqrt();
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 {
                    let (mid_x, mid_y) = local_point(
                        canvas_ref.get_untracked(),
                        (t0.client_x() + t1.client_x()) as f64 / 2.0,
                        (t0.client_y() + t1.client_y()) as f64 / 2.0,
                    );
                    let delta = -(new_dist - old_dist) * 2.0;
                    viewport.update(|vp| vp.zoom_at(delta, mid_x, mid_y));
                }

                pinch_dist.set(new_dist);
            }
        }
    };

    let tooltip = move || {
        let marker = hovered.get()?;
        let vp = viewport.get();
        revision.track();
        map.with_value(|ctx| {
            let ctx = ctx.as_ref()?;
            let drawn = ctx.surface().marker(ctx.scene().marker(marker))?;
            let (sx, sy) = vp.world_to_screen(drawn.world.0, drawn.world.1);
            Some((drawn.title.clone(), sx, sy))
        })
    };

    view! {
        <div
            style="position: absolute; inset: 0; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
            {move || {
                tooltip()
                    .map(|(title, sx, sy)| {
                        view! {
                            <div
                                class="map-tooltip"
                                style=format!(
                                    "position: absolute; left: {:.0}px; top: {:.0}px; pointer-events: none;",
                                    sx + 12.0,
                                    sy - 28.0,
                                )
                            >
                                {title}
                            </div>
                        }
                    })
            }}
            <a
                href=ATTRIBUTION_URL
                target="_blank"
                rel="noopener"
                style=ATTRIBUTION_STYLE
                on:pointerdown=|ev: PointerEvent| ev.stop_propagation()
                on:click=|ev: MouseEvent| ev.stop_propagation()
            >
                {ATTRIBUTION}
            </a>
        </div>
    }
}

fn paint(
    canvas: &HtmlCanvasElement,
    vp: &Viewport,
    tiles: &TileLayer,
    surface: Option<&CanvasSurface>,
    hovered: Option<MarkerRef>,
) {
    let dpr = web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0);
    let css_w = canvas.client_width().max(1) as f64;
    let css_h = canvas.client_height().max(1) as f64;
    let px_w = (css_w * dpr).round() as u32;
    let px_h = (css_h * dpr).round() as u32;
    if canvas.width() != px_w || canvas.height() != px_h {
        canvas.set_width(px_w);
        canvas.set_height(px_h);
    }

    let Some(ctx) = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
    else {
        return;
    };
    // All drawing stays in CSS pixel coordinates.
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, css_w, css_h);
    paint_world(&ctx, vp, tiles, css_w, css_h);

    let Some(surface) = surface else {
        return;
    };

    ctx.set_line_width(1.5);
    for line in surface.visible_lines() {
        let (x0, y0) = vp.world_to_screen(line.from.0, line.from.1);
        let (x1, y1) = vp.world_to_screen(line.to.0, line.to.1);
        ctx.set_stroke_style_str(&line.color.css_rgba(EDGE_ALPHA));
        ctx.begin_path();
        ctx.move_to(x0, y0);
        ctx.line_to(x1, y1);
        ctx.stroke();
    }

    // Handle order puts events after teams, so events paint on top.
    let mut hovered_marker = None;
    ctx.set_line_width(1.0);
    ctx.set_stroke_style_str(MARKER_OUTLINE);
    for (_, marker) in surface.visible_markers() {
        let (sx, sy) = vp.world_to_screen(marker.world.0, marker.world.1);
        let radius = if marker.style.is_team() {
            TEAM_RADIUS_PX
        } else {
            EVENT_RADIUS_PX
        };
        if sx < -radius || sy < -radius || sx > css_w + radius || sy > css_h + radius {
            continue;
        }
        if Some(marker.marker) == hovered {
            hovered_marker = Some((sx, sy, radius, marker.style.color()));
            continue;
        }
        ctx.set_fill_style_str(&marker.style.color().hex());
        ctx.begin_path();
        ctx.arc(sx, sy, radius, 0.0, TAU).ok();
        ctx.fill();
        ctx.stroke();
    }

    if let Some((sx, sy, radius, color)) = hovered_marker {
        ctx.set_fill_style_str(&color.hex());
        ctx.set_stroke_style_str(HOVER_OUTLINE);
        ctx.set_line_width(2.0);
        ctx.begin_path();
        ctx.arc(sx, sy, radius + HOVER_GROWTH_PX, 0.0, TAU).ok();
        ctx.fill();
        ctx.stroke();
    }
}

/// World square, then whatever base-map tiles are loaded for this view.
/// Missing tiles borrow a cropped ancestor until their own image arrives.
fn paint_world(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    tiles: &TileLayer,
    css_w: f64,
    css_h: f64,
) {
    let (x0, y0) = vp.world_to_screen(0.0, 0.0);
    let size = WORLD_SIZE * vp.scale;
    ctx.set_fill_style_str(WORLD_FILL);
    ctx.fill_rect(x0, y0, size, size);

    let wanted = visible_tiles(vp, css_w, css_h);
    tiles.request(&wanted);

    ctx.set_global_alpha(TILE_ALPHA);
    for coord in wanted {
        let Some((img, (sx, sy, sw))) = tiles.drawable(coord) else {
            continue;
        };
        let (ox, oy) = coord.origin();
        let span = coord.span();
        let (left, top) = vp.world_to_screen(ox, oy);
        let (right, bottom) = vp.world_to_screen(ox + span, oy + span);
        // Snap outward to whole pixels so neighbouring tiles leave no seams.
        let (dx, dy) = (left.floor(), top.floor());
        ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
            &img,
            sx,
            sy,
            sw,
            sw,
            dx,
            dy,
            right.ceil() - dx,
            bottom.ceil() - dy,
        )
        .ok();
    }
    ctx.set_global_alpha(1.0);
}
