//! Grid geometry shared by the state store, the drag controller and the
//! layout orchestrator.
//!
//! Widget geometry is stored in integer grid units. Pixel values only exist
//! transiently, derived from the active [`GridMetrics`].

use crate::config::schema::Breakpoint;
use serde::{Deserialize, Serialize};

/// A cell coordinate in grid units (column `x`, row `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPosition {
    /// Column index, 0-based.
    pub x: u32,
    /// Row index, 0-based.
    pub y: u32,
}

impl GridPosition {
    /// The top-left cell.
    pub const ORIGIN: GridPosition = GridPosition { x: 0, y: 0 };

    /// Creates a position from column and row.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A footprint in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    /// Number of columns spanned.
    pub width: u32,
    /// Number of rows spanned.
    pub height: u32,
}

impl GridSize {
    /// Creates a size from width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in logical pixels, relative to the dashboard
/// container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    /// Distance from the container's left edge.
    pub left: f32,
    /// Distance from the container's top edge.
    pub top: f32,
    /// Rectangle width.
    pub width: f32,
    /// Rectangle height.
    pub height: f32,
}

impl PixelRect {
    /// Creates a rectangle.
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Returns `true` if the two rectangles overlap or touch.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.left <= other.right()
            && other.left <= self.right()
            && self.top <= other.bottom()
            && other.top <= self.bottom()
    }
}

/// Pixel metrics of the grid for one container width and breakpoint.
///
/// Recomputed on init and on every (debounced) container resize; never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    /// Column count of the active breakpoint.
    pub columns: u32,
    /// Width of a single column, excluding the gap.
    pub column_width: f32,
    /// Height of a single row, excluding the gap.
    pub row_height: f32,
    /// Gap between adjacent cells on both axes.
    pub gap: f32,
}

impl GridMetrics {
    /// Derives metrics from the container width and a column count.
    ///
    /// The width is split into `columns` equal columns separated by
    /// `columns - 1` gaps.
    pub fn compute(container_width: f32, columns: u32, row_height: f32, gap: f32) -> Self {
        let columns = columns.max(1);
        let gutters = gap * (columns - 1) as f32;
        let column_width = ((container_width - gutters) / columns as f32).max(0.0);
        Self {
            columns,
            column_width,
            row_height,
            gap,
        }
    }

    /// Horizontal distance between the origins of two adjacent columns.
    pub fn column_step(&self) -> f32 {
        self.column_width + self.gap
    }

    /// Vertical distance between the origins of two adjacent rows.
    pub fn row_step(&self) -> f32 {
        self.row_height + self.gap
    }

    /// Pixel origin of a grid cell.
    pub fn origin(&self, pos: GridPosition) -> (f32, f32) {
        (
            pos.x as f32 * self.column_step(),
            pos.y as f32 * self.row_step(),
        )
    }

    /// Pixel rectangle covered by a widget at `pos` with `size`.
    pub fn to_pixels(&self, pos: GridPosition, size: GridSize) -> PixelRect {
        let (left, top) = self.origin(pos);
        PixelRect {
            left,
            top,
            width: (size.width as f32 * self.column_step() - self.gap).max(0.0),
            height: (size.height as f32 * self.row_step() - self.gap).max(0.0),
        }
    }

    /// Rounds a pixel origin to the nearest cell on each axis independently.
    ///
    /// The result is signed so callers can clamp positions dragged past the
    /// top or left edge.
    pub fn snap(&self, left: f32, top: f32) -> (i64, i64) {
        (
            snap_axis(left, self.column_step()),
            snap_axis(top, self.row_step()),
        )
    }

    /// Number of whole rows that fit into `height` pixels.
    pub fn rows_in(&self, height: f32) -> u32 {
        let step = self.row_step();
        if step <= 0.0 {
            return 0;
        }
        ((height + self.gap) / step).floor().max(0.0) as u32
    }
}

fn snap_axis(value: f32, step: f32) -> i64 {
    if step <= 0.0 {
        return 0;
    }
    (value / step).round() as i64
}

/// Picks the breakpoint for a container width: the one with the largest
/// `min_width` that `width` meets or exceeds.
///
/// Widths below every threshold fall back to the smallest breakpoint.
/// Returns `None` only for an empty table.
pub fn resolve_breakpoint(breakpoints: &[Breakpoint], width: f32) -> Option<&Breakpoint> {
    breakpoints
        .iter()
        .filter(|bp| width >= bp.min_width as f32)
        .max_by_key(|bp| bp.min_width)
        .or_else(|| breakpoints.iter().min_by_key(|bp| bp.min_width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Breakpoint> {
        vec![
            Breakpoint::new("lg", 1200, 12),
            Breakpoint::new("md", 996, 10),
            Breakpoint::new("sm", 768, 6),
            Breakpoint::new("xs", 0, 4),
        ]
    }

    #[test]
    fn metrics_split_width_into_columns() {
        let m = GridMetrics::compute(1210.0, 12, 80.0, 10.0);
        // 1210 - 11 * 10 = 1100 / 12
        assert!((m.column_width - 91.666_67).abs() < 0.01);
        assert_eq!(m.columns, 12);
    }

    #[test]
    fn metrics_never_negative_for_tiny_containers() {
        let m = GridMetrics::compute(20.0, 12, 80.0, 10.0);
        assert_eq!(m.column_width, 0.0);
    }

    #[test]
    fn to_pixels_excludes_trailing_gap() {
        let m = GridMetrics::compute(1190.0, 12, 80.0, 10.0);
        let rect = m.to_pixels(GridPosition::new(1, 2), GridSize::new(2, 1));
        assert_eq!(rect.left, 100.0);
        assert_eq!(rect.top, 180.0);
        assert_eq!(rect.width, 190.0);
        assert_eq!(rect.height, 80.0);
    }

    #[test]
    fn snap_rounds_to_nearest_not_floor() {
        let m = GridMetrics::compute(1190.0, 12, 80.0, 10.0);
        // column step 100, row step 90
        assert_eq!(m.snap(149.0, 44.0), (1, 0));
        assert_eq!(m.snap(151.0, 46.0), (2, 1));
        assert_eq!(m.snap(-80.0, -10.0), (-1, 0));
    }

    #[test]
    fn rows_in_counts_whole_rows() {
        let m = GridMetrics::compute(1190.0, 12, 80.0, 10.0);
        assert_eq!(m.rows_in(800.0), 9);
        assert_eq!(m.rows_in(0.0), 0);
    }

    #[test]
    fn resolve_breakpoint_picks_largest_threshold_met() {
        let bps = table();
        assert_eq!(resolve_breakpoint(&bps, 1200.0).map(|b| b.columns), Some(12));
        assert_eq!(resolve_breakpoint(&bps, 1199.0).map(|b| b.columns), Some(10));
        assert_eq!(resolve_breakpoint(&bps, 800.0).map(|b| b.columns), Some(6));
        assert_eq!(resolve_breakpoint(&bps, 10.0).map(|b| b.columns), Some(4));
    }

    #[test]
    fn resolve_breakpoint_below_every_threshold_uses_smallest() {
        let bps = vec![Breakpoint::new("lg", 1200, 12), Breakpoint::new("sm", 600, 6)];
        assert_eq!(resolve_breakpoint(&bps, 100.0).map(|b| b.columns), Some(6));
        assert!(resolve_breakpoint(&[], 100.0).is_none());
    }

    #[test]
    fn pixel_rect_intersection() {
        let a = PixelRect::new(0.0, 0.0, 100.0, 100.0);
        assert!(a.intersects(&PixelRect::new(50.0, 50.0, 10.0, 10.0)));
        assert!(!a.intersects(&PixelRect::new(0.0, 200.0, 10.0, 10.0)));
    }
}
