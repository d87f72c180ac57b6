use frcmap_shared::{
    Color, LatLng, LineHandle, MapSurface, MarkerHandle, MarkerRef, MarkerSpec, MarkerStyle,
};

use crate::viewport::world_point;

#[derive(Debug, Clone)]
pub struct DrawnMarker {
    pub marker: MarkerRef,
    pub world: (f64, f64),
    pub style: MarkerStyle,
    pub title: String,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct DrawnLine {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub color: Color,
    pub visible: bool,
}

/// Retained display list painted by the canvas each frame. Handles are
/// indices into `markers` / `lines`.
#[derive(Debug, Default)]
pub struct CanvasSurface {
    markers: Vec<DrawnMarker>,
    lines: Vec<DrawnLine>,
    pending_focus: Option<(LatLng, f64)>,
}

impl CanvasSurface {
    pub fn markers(&self) -> &[DrawnMarker] {
        &self.markers
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&DrawnMarker> {
        self.markers.get(handle.0)
    }

    pub fn visible_lines(&self) -> impl Iterator<Item = &DrawnLine> {
        self.lines.iter().filter(|line| line.visible)
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = (MarkerHandle, &DrawnMarker)> {
        self.markers
            .iter()
            .enumerate()
            .filter(|(_, marker)| marker.visible)
            .map(|(idx, marker)| (MarkerHandle(idx), marker))
    }

    /// World positions in handle order, for hit-testing.
    pub fn marker_points(&self) -> Vec<(f64, f64)> {
        self.markers.iter().map(|marker| marker.world).collect()
    }

    /// Bounding box of every marker in world space.
    pub fn world_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut iter = self.markers.iter().map(|marker| marker.world);
        let (x, y) = iter.next()?;
        Some(iter.fold((x, y, x, y), |(min_x, min_y, max_x, max_y), (x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        }))
    }

    /// Viewport target requested by `focus_on` since the last call.
    pub fn take_focus(&mut self) -> Option<(LatLng, f64)> {
        self.pending_focus.take()
    }
}

impl MapSurface for CanvasSurface {
    fn place_marker(&mut self, spec: &MarkerSpec) -> MarkerHandle {
        self.markers.push(DrawnMarker {
            marker: spec.marker,
            world: world_point(spec.position),
            style: spec.style,
            title: spec.title.clone(),
            visible: true,
        });
        MarkerHandle(self.markers.len() - 1)
    }

    fn draw_polyline(&mut self, from: LatLng, to: LatLng, color: Color) -> LineHandle {
        self.lines.push(DrawnLine {
            from: world_point(from),
            to: world_point(to),
            color,
            visible: true,
        });
        LineHandle(self.lines.len() - 1)
    }

    fn set_marker_visible(&mut self, handle: MarkerHandle, visible: bool) {
        if let Some(marker) = self.markers.get_mut(handle.0) {
            marker.visible = visible;
        }
    }

    fn set_line_visible(&mut self, handle: LineHandle, visible: bool) {
        if let Some(line) = self.lines.get_mut(handle.0) {
            line.visible = visible;
        }
    }

    fn focus_on(&mut self, center: LatLng, zoom: f64) {
        self.pending_focus = Some((center, zoom));
    }
}
