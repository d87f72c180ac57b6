#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

use js_sys::Reflect;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use crate::viewport::{Viewport, WORLD_SIZE};

/// Deepest zoom the tile server publishes.
pub const MAX_TILE_ZOOM: u8 = 19;
/// Pixel size of one published tile image.
pub const TILE_PIXELS: f64 = 256.0;
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";
pub const ATTRIBUTION_URL: &str = "https://www.openstreetmap.org/copyright";

const MAX_IN_FLIGHT: usize = 8;
const MAX_CACHED_TILES: usize = 384;
/// How many zoom levels up a missing tile may borrow a scaled-up ancestor.
pub const FALLBACK_LEVELS: u8 = 4;
const ONLOAD_HANDLE_KEY: &str = "__frcmapTileOnload";
const ONERROR_HANDLE_KEY: &str = "__frcmapTileOnerror";

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn url(&self) -> String {
        format!(
            "https://tile.openstreetmap.org/{}/{}/{}.png",
            self.z, self.x, self.y
        )
    }

    /// World-space side length of a tile at this zoom.
    pub fn span(&self) -> f64 {
        WORLD_SIZE / f64::from(1u32 << self.z)
    }

    /// Top-left corner in world space.
    pub fn origin(&self) -> (f64, f64) {
        let span = self.span();
        (f64::from(self.x) * span, f64::from(self.y) * span)
    }

    pub fn parent(&self) -> Option<TileCoord> {
        (self.z > 0).then(|| TileCoord {
            z: self.z - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    fn ancestors(&self) -> impl Iterator<Item = TileCoord> {
        std::iter::successors(self.parent(), TileCoord::parent).take(usize::from(FALLBACK_LEVELS))
    }
}

/// Tile zoom whose images come out closest to their native size.
pub fn tile_zoom(vp: &Viewport) -> u8 {
    vp.zoom().round().clamp(0.0, f64::from(MAX_TILE_ZOOM)) as u8
}

/// Tiles covering a `width` x `height` canvas, nearest to its centre first.
pub fn visible_tiles(vp: &Viewport, width: f64, height: f64) -> Vec<TileCoord> {
    if width <= 0.0 || height <= 0.0 {
        return Vec::new();
    }
    let z = tile_zoom(vp);
    let n = 1u32 << z;
    let span = WORLD_SIZE / f64::from(n);
    let (min_x, min_y) = vp.screen_to_world(0.0, 0.0);
    let (max_x, max_y) = vp.screen_to_world(width, height);
    if max_x <= 0.0 || max_y <= 0.0 || min_x >= WORLD_SIZE || min_y >= WORLD_SIZE {
        return Vec::new();
    }

    let last = f64::from(n - 1);
    let cell = |v: f64| (v / span).floor().clamp(0.0, last) as u32;
    let (x0, x1) = (cell(min_x), cell(max_x));
    let (y0, y1) = (cell(min_y), cell(max_y));

    let center = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    let mut tiles: Vec<TileCoord> = (y0..=y1)
        .flat_map(|y| (x0..=x1).map(move |x| TileCoord { z, x, y }))
        .collect();
    tiles.sort_by(|a, b| {
        distance_sq(a, center)
            .total_cmp(&distance_sq(b, center))
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });
    tiles
}

fn distance_sq(tile: &TileCoord, (cx, cy): (f64, f64)) -> f64 {
    let (ox, oy) = tile.origin();
    let half = tile.span() / 2.0;
    let dx = ox + half - cx;
    let dy = oy + half - cy;
    dx * dx + dy * dy
}

/// Source rectangle `(sx, sy, size)`, in image pixels, of `ancestor`'s
/// image that covers `tile`.
pub fn ancestor_source_rect(tile: TileCoord, ancestor: TileCoord) -> (f64, f64, f64) {
    let (tx, ty) = tile.origin();
    let (ax, ay) = ancestor.origin();
    let per_world = TILE_PIXELS / ancestor.span();
    (
        (tx - ax) * per_world,
        (ty - ay) * per_world,
        tile.span() * per_world,
    )
}

#[derive(Clone)]
enum TileState {
    Loading,
    Ready(HtmlImageElement),
    Failed,
}

#[derive(Default)]
struct Inner {
    tiles: HashMap<TileCoord, TileState>,
    queue: VecDeque<TileCoord>,
    in_flight: usize,
}

impl Inner {
    /// Replace the queue with the wanted tiles not yet seen, and drop cached
    /// tiles that are neither wanted nor usable as a fallback.
    fn set_wanted(&mut self, wanted: &[TileCoord]) {
        self.queue = wanted
            .iter()
            .filter(|coord| !self.tiles.contains_key(coord))
            .copied()
            .collect();

        if self.tiles.len() > MAX_CACHED_TILES {
            let keep: HashSet<TileCoord> = wanted
                .iter()
                .flat_map(|coord| std::iter::once(*coord).chain(coord.ancestors()))
                .collect();
            self.tiles
                .retain(|coord, state| keep.contains(coord) || matches!(state, TileState::Loading));
        }
    }

    fn take_jobs(&mut self) -> Vec<TileCoord> {
        let mut jobs = Vec::new();
        while self.in_flight < MAX_IN_FLIGHT {
            let Some(coord) = self.queue.pop_front() else {
                break;
            };
            if self.tiles.contains_key(&coord) {
                continue;
            }
            self.tiles.insert(coord, TileState::Loading);
            self.in_flight += 1;
            jobs.push(coord);
        }
        jobs
    }

    fn finish(&mut self, coord: TileCoord, state: TileState) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.tiles.insert(coord, state);
    }
}

/// Base-map tile images, loaded on demand with a bounded number of requests
/// in flight. `tick` is bumped whenever a tile becomes drawable.
#[derive(Clone)]
pub struct TileLayer {
    inner: Rc<RefCell<Inner>>,
    tick: RwSignal<u64>,
}

impl TileLayer {
    pub fn new(tick: RwSignal<u64>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner::default())),
            tick,
        }
    }

    /// Queue the tiles the next frame needs; earlier requests not yet started
    /// are dropped.
    pub fn request(&self, wanted: &[TileCoord]) {
        self.inner.borrow_mut().set_wanted(wanted);
        pump(&self.inner, self.tick);
    }

    pub fn image(&self, coord: TileCoord) -> Option<HtmlImageElement> {
        match self.inner.borrow().tiles.get(&coord) {
            Some(TileState::Ready(img)) => Some(img.clone()),
            _ => None,
        }
    }

    /// The tile's own image, else the nearest loaded ancestor with the source
    /// rectangle to crop from it.
    pub fn drawable(&self, coord: TileCoord) -> Option<(HtmlImageElement, (f64, f64, f64))> {
        if let Some(img) = self.image(coord) {
            return Some((img, (0.0, 0.0, TILE_PIXELS)));
        }
        coord.ancestors().find_map(|ancestor| {
            self.image(ancestor)
                .map(|img| (img, ancestor_source_rect(coord, ancestor)))
        })
    }
}

fn pump(inner: &Rc<RefCell<Inner>>, tick: RwSignal<u64>) {
    let jobs = inner.borrow_mut().take_jobs();
    for coord in jobs {
        load_tile(inner, tick, coord);
    }
}

fn finish(inner: &Weak<RefCell<Inner>>, tick: RwSignal<u64>, coord: TileCoord, state: TileState) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let ready = matches!(state, TileState::Ready(_));
    inner.borrow_mut().finish(coord, state);
    if ready {
        tick.try_update(|t| *t = t.wrapping_add(1));
    }
    pump(&inner, tick);
}

fn load_tile(inner: &Rc<RefCell<Inner>>, tick: RwSignal<u64>, coord: TileCoord) {
    let weak = Rc::downgrade(inner);
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(e) => {
            log::warn!("could not create tile image: {e:?}");
            finish(&weak, tick, coord, TileState::Failed);
            return;
        }
    };

    let img_for_load = img.clone();
    let weak_load = weak.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);
        finish(
            &weak_load,
            tick,
            coord,
            TileState::Ready(img_for_load.clone()),
        );
    });

    let img_for_error = img.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        log::debug!("tile {}/{}/{} failed to load", coord.z, coord.x, coord.y);
        finish(&weak, tick, coord, TileState::Failed);
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    // Keep the callbacks reachable from the image until one of them fires.
    let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY), &onload_js);
    let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY), &onerror_js);
    img.set_src(&coord.url());
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
