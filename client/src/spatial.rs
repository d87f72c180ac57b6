const GRID_COLS: usize = 50;
const GRID_ROWS: usize = 50;

/// A flat 2D grid over world space for marker hit-testing.
/// Rebuilt whenever a season is loaded; visibility is checked at query time.
pub struct MarkerGrid {
    cells: Vec<Vec<usize>>,
    points: Vec<(f64, f64)>,
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
}

impl Default for MarkerGrid {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            points: Vec::new(),
            min_x: 0.0,
            min_y: 0.0,
            cell_w: 1.0,
            cell_h: 1.0,
        }
    }
}

impl MarkerGrid {
    /// Index `points`; query results are positions in this slice.
    pub fn build(points: &[(f64, f64)]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        // Pad so points on the max edge land inside the last cell.
        let pad = ((max_x - min_x).max(max_y - min_y) * 0.01).max(1e-6);
        min_x -= pad;
        min_y -= pad;
        max_x += pad;
        max_y += pad;

        let cell_w = (max_x - min_x) / GRID_COLS as f64;
        let cell_h = (max_y - min_y) / GRID_ROWS as f64;

        let mut cells = vec![Vec::new(); GRID_COLS * GRID_ROWS];
        for (idx, &(x, y)) in points.iter().enumerate() {
            let col = (((x - min_x) / cell_w).floor() as usize).min(GRID_COLS - 1);
            let row = (((y - min_y) / cell_h).floor() as usize).min(GRID_ROWS - 1);
            cells[row * GRID_COLS + col].push(idx);
        }

        Self {
            cells,
            points: points.to_vec(),
            min_x,
            min_y,
            cell_w,
            cell_h,
        }
    }

    /// Nearest accepted point within `radius` world units of `(wx, wy)`.
    pub fn find_nearest(
        &self,
        wx: f64,
        wy: f64,
        radius: f64,
        accept: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        if self.cells.is_empty() {
            return None;
        }

        let col_range = self.span(wx, radius, self.min_x, self.cell_w, GRID_COLS)?;
        let row_range = self.span(wy, radius, self.min_y, self.cell_h, GRID_ROWS)?;

        let radius_sq = radius * radius;
        let mut best: Option<(usize, f64)> = None;
        for row in row_range.0..=row_range.1 {
            for col in col_range.0..=col_range.1 {
                for &idx in &self.cells[row * GRID_COLS + col] {
                    let (px, py) = self.points[idx];
                    let dist_sq = (px - wx).powi(2) + (py - wy).powi(2);
                    if dist_sq > radius_sq || !accept(idx) {
                        continue;
                    }
                    // Ties go to the later point, which is drawn on top.
                    if best.is_none_or(|(_, d)| dist_sq <= d) {
                        best = Some((idx, dist_sq));
                    }
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn span(
        &self,
        center: f64,
        radius: f64,
        min: f64,
        cell: f64,
        count: usize,
    ) -> Option<(usize, usize)> {
        let lo = ((center - radius - min) / cell).floor();
        let hi = ((center + radius - min) / cell).floor();
        if hi < 0.0 || lo >= count as f64 {
            return None;
        }
        Some((lo.max(0.0) as usize, (hi as usize).min(count - 1)))
    }
}
