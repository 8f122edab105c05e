//! [`Surface`] implementation backed by terminal cells.
//!
//! The engine works in logical pixels. One terminal column is
//! [`CELL_WIDTH`] pixels and one row is [`CELL_HEIGHT`] pixels; the last
//! terminal row is reserved for the status bar.

use crate::drag::HitTarget;
use crate::grid::PixelRect;
use crate::surface::{ContentState, Surface, Viewport};
use ratatui::layout::Rect;
use std::collections::HashMap;
use std::time::Duration;

/// Logical pixels per terminal column.
pub const CELL_WIDTH: f32 = 10.0;

/// Logical pixels per terminal row.
pub const CELL_HEIGHT: f32 = 20.0;

/// Terminal rows not available to the dashboard.
const STATUS_ROWS: u16 = 1;

/// One container as the terminal draws it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminalContainer {
    /// Header title.
    pub title: String,
    /// Layout position.
    pub rect: PixelRect,
    /// Drag offset.
    pub transform: Option<(f32, f32)>,
    /// Dragging appearance.
    pub dragging: bool,
    /// Content region.
    pub content: ContentState,
}

impl TerminalContainer {
    /// Layout position plus drag offset.
    pub fn visual_rect(&self) -> PixelRect {
        let (dx, dy) = self.transform.unwrap_or((0.0, 0.0));
        PixelRect::new(
            self.rect.left + dx,
            self.rect.top + dy,
            self.rect.width,
            self.rect.height,
        )
    }
}

/// Dashboard surface sized from the terminal.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    columns: u16,
    rows: u16,
    scroll: f32,
    containers: HashMap<String, TerminalContainer>,
    order: Vec<String>,
}

impl TerminalSurface {
    /// A surface for a `columns x rows` terminal.
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            scroll: 0.0,
            containers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Adopts a new terminal size.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.columns = columns;
        self.rows = rows;
    }

    /// Scrolls by `rows` terminal rows; negative scrolls up.
    ///
    /// Returns whether the offset changed.
    pub fn scroll_rows(&mut self, rows: i32) -> bool {
        let bottom = self
            .containers
            .values()
            .map(|c| c.rect.bottom())
            .fold(0.0_f32, f32::max);
        let max = (bottom - self.size().1).max(0.0);
        let next = (self.scroll + rows as f32 * CELL_HEIGHT).clamp(0.0, max);
        let changed = next != self.scroll;
        self.scroll = next;
        changed
    }

    /// Current scroll offset in pixels.
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Containers in creation order.
    pub fn containers(&self) -> impl Iterator<Item = (&str, &TerminalContainer)> {
        self.order
            .iter()
            .filter_map(|id| self.containers.get(id).map(|c| (id.as_str(), c)))
    }

    /// Container state of `id`.
    pub fn container(&self, id: &str) -> Option<&TerminalContainer> {
        self.containers.get(id)
    }

    /// Pixel coordinates of a terminal cell, including scroll.
    pub fn to_pixels(&self, column: u16, row: u16) -> (f32, f32) {
        (
            f32::from(column) * CELL_WIDTH,
            f32::from(row) * CELL_HEIGHT + self.scroll,
        )
    }

    /// Terminal cells covered by `rect`, clipped to the dashboard area.
    pub fn to_cells(&self, rect: PixelRect) -> Option<Rect> {
        let area = self.dashboard_area();
        let left = (rect.left / CELL_WIDTH).round();
        let top = ((rect.top - self.scroll) / CELL_HEIGHT).round();
        let right = (rect.right() / CELL_WIDTH).round();
        let bottom = ((rect.bottom() - self.scroll) / CELL_HEIGHT).round();

        let clip = |v: f32, max: u16| v.clamp(0.0, f32::from(max)) as u16;
        let x0 = clip(left, area.width);
        let y0 = clip(top, area.height);
        let x1 = clip(right, area.width);
        let y1 = clip(bottom, area.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Terminal area containers are drawn into.
    pub fn dashboard_area(&self) -> Rect {
        Rect::new(0, 0, self.columns, self.rows.saturating_sub(STATUS_ROWS))
    }

    /// Which container part sits under a terminal cell.
    ///
    /// The top row of a container is its drag handle. Dragging containers
    /// are checked first since they are drawn on top.
    pub fn hit_test(&self, column: u16, row: u16) -> HitTarget {
        let (x, y) = self.to_pixels(column, row);
        let mut candidates: Vec<(&str, &TerminalContainer)> = self.containers().collect();
        candidates.sort_by_key(|(_, c)| !c.dragging);
        for (id, c) in candidates {
            let r = c.visual_rect();
            if x >= r.left && x < r.right() && y >= r.top && y < r.bottom() {
                return if y < r.top + CELL_HEIGHT {
                    HitTarget::Handle(id.to_string())
                } else {
                    HitTarget::Body(id.to_string())
                };
            }
        }
        HitTarget::None
    }
}

impl Surface for TerminalSurface {
    fn size(&self) -> (f32, f32) {
        let area = self.dashboard_area();
        (
            f32::from(area.width) * CELL_WIDTH,
            f32::from(area.height) * CELL_HEIGHT,
        )
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.scroll, self.size().1)
    }

    fn create_container(&mut self, id: &str, title: &str) {
        let container = TerminalContainer {
            title: title.to_string(),
            ..TerminalContainer::default()
        };
        if self.containers.insert(id.to_string(), container).is_none() {
            self.order.push(id.to_string());
        }
    }

    fn remove_container(&mut self, id: &str) {
        self.containers.remove(id);
        self.order.retain(|o| o != id);
    }

    fn set_position(&mut self, id: &str, rect: PixelRect) {
        if let Some(c) = self.containers.get_mut(id) {
            c.rect = rect;
        }
    }

    fn set_transform(&mut self, id: &str, dx: f32, dy: f32) {
        if let Some(c) = self.containers.get_mut(id) {
            c.transform = Some((dx, dy));
        }
    }

    fn clear_transform(&mut self, id: &str) {
        if let Some(c) = self.containers.get_mut(id) {
            c.transform = None;
        }
    }

    fn set_dragging(&mut self, id: &str, dragging: bool) {
        if let Some(c) = self.containers.get_mut(id) {
            c.dragging = dragging;
        }
    }

    fn set_content(&mut self, id: &str, content: ContentState) {
        if let Some(c) = self.containers.get_mut(id) {
            c.content = content;
        }
    }

    // Cells cannot animate; the container snaps into place.
    fn settle(&mut self, id: &str, rect: PixelRect, _duration: Duration) {
        self.set_position(id, rect);
    }
}
