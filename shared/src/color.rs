use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn css_rgba(&self, alpha: f64) -> String {
        format!("rgba({},{},{},{alpha})", self.r, self.g, self.b)
    }
}

/// Red (short) to blue (long) ramp used for team→event edges.
pub const RED_TO_BLUE: [Color; 20] = [
    Color::rgb(0xff, 0x00, 0x00),
    Color::rgb(0xf8, 0x00, 0x3b),
    Color::rgb(0xf1, 0x00, 0x53),
    Color::rgb(0xea, 0x00, 0x65),
    Color::rgb(0xe3, 0x00, 0x75),
    Color::rgb(0xdb, 0x00, 0x83),
    Color::rgb(0xd4, 0x00, 0x8f),
    Color::rgb(0xcb, 0x00, 0x9b),
    Color::rgb(0xc3, 0x00, 0xa5),
    Color::rgb(0xba, 0x00, 0xb0),
    Color::rgb(0xb1, 0x00, 0xb9),
    Color::rgb(0xa7, 0x00, 0xc2),
    Color::rgb(0x9d, 0x00, 0xcb),
    Color::rgb(0x91, 0x00, 0xd3),
    Color::rgb(0x85, 0x00, 0xdb),
    Color::rgb(0x78, 0x00, 0xe3),
    Color::rgb(0x69, 0x00, 0xea),
    Color::rgb(0x57, 0x00, 0xf1),
    Color::rgb(0x41, 0x00, 0xf8),
    Color::rgb(0x1e, 0x00, 0xff),
];

/// Distance domain (meters) mapped onto [`RED_TO_BLUE`] for edges.
pub const EDGE_DISTANCE_DOMAIN: (f64, f64) = (0.0, 10_000_000.0);

/// Index into a palette of `len` entries for `value` within `min..=max`.
///
/// Scales by `len` rather than `len - 1`, so `rel` near 1 rounds to `len`;
/// that index is clamped to the last entry. NaN (including a zero-width
/// domain at `value == min`) selects the first entry.
pub fn palette_index(len: usize, min: f64, max: f64, value: f64) -> usize {
    let last = len.saturating_sub(1);
    let rel = (value - min) / (max - min);
    if rel.is_nan() || rel < 0.0 {
        0
    } else if rel > 1.0 {
        last
    } else {
        ((rel * len as f64).round() as usize).min(last)
    }
}

/// Pick a [`RED_TO_BLUE`] entry for `value` within `min..=max`.
pub fn color_for(min: f64, max: f64, value: f64) -> Color {
    RED_TO_BLUE[palette_index(RED_TO_BLUE.len(), min, max, value)]
}

pub fn edge_color(length_m: f64) -> Color {
    let (min, max) = EDGE_DISTANCE_DOMAIN;
    color_for(min, max, length_m)
}
