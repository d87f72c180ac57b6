use frcmap_shared::LatLng;

/// Side of the Web-Mercator world square at zoom 0, in CSS pixels.
pub const WORLD_SIZE: f64 = 256.0;

const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 18.0;
const ZOOM_SENSITIVITY: f64 = 0.002;

/// Project a coordinate into world space (`0.0..=WORLD_SIZE` on both axes).
pub fn world_point(position: LatLng) -> (f64, f64) {
    let (x, y) = position.to_mercator();
    (x * WORLD_SIZE, y * WORLD_SIZE)
}

/// Pan/zoom transformation from world coordinates to screen coordinates.
/// `scale` is `2^zoom`: screen pixels per world unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 4.0,
        }
    }
}

impl Viewport {
    fn min_scale() -> f64 {
        MIN_ZOOM.exp2()
    }

    fn max_scale() -> f64 {
        MAX_ZOOM.exp2()
    }

    pub fn zoom(&self) -> f64 {
        self.scale.log2()
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.offset_x,
            wy * self.scale + self.offset_y,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    /// Zoom toward a focus point (screen coordinates).
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(Self::min_scale(), Self::max_scale());
        let ratio = new_scale / self.scale;

        // Keep the point under the cursor fixed.
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Put `center` in the middle of the canvas at the given zoom level.
    pub fn center_on(&mut self, center: LatLng, zoom: f64, canvas_w: f64, canvas_h: f64) {
        let (wx, wy) = world_point(center);
        self.scale = zoom
            .clamp(MIN_ZOOM, MAX_ZOOM)
            .exp2();
        self.offset_x = canvas_w / 2.0 - wx * self.scale;
        self.offset_y = canvas_h / 2.0 - wy * self.scale;
    }

    /// Fit the viewport to world-coordinate bounds with padding. A degenerate
    /// box (single marker) is centred at a fixed zoom instead.
    pub fn fit_bounds(
        &mut self,
        (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
        canvas_w: f64,
        canvas_h: f64,
    ) {
        if canvas_w <= 0.0 || canvas_h <= 0.0 {
            return;
        }
        let world_w = max_x - min_x;
        let world_h = max_y - min_y;
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;

        self.scale = if world_w <= 0.0 && world_h <= 0.0 {
            10.0_f64.exp2()
        } else {
            let padding = 0.05;
            let scale_x = canvas_w / (world_w.max(f64::EPSILON) * (1.0 + padding * 2.0));
            let scale_y = canvas_h / (world_h.max(f64::EPSILON) * (1.0 + padding * 2.0));
            scale_x.min(scale_y)
        }
        .clamp(Self::min_scale(), Self::max_scale());

        self.offset_x = canvas_w / 2.0 - center_x * self.scale;
        self.offset_y = canvas_h / 2.0 - center_y * self.scale;
    }
}
