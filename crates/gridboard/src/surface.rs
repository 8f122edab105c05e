//! Host rendering boundary.
//!
//! The engine never draws. It tells a [`Surface`] which containers exist,
//! where they sit, how they are offset during a drag and what their content
//! region shows. The terminal host implements this trait on top of ratatui;
//! [`RecordingSurface`] keeps everything in memory for tests and headless
//! tooling.

use crate::grid::PixelRect;
use ratatui::text::Text;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// What a container's content region currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContentState {
    /// The widget implementation is loading or not active.
    #[default]
    Loading,
    /// Rendered widget output.
    Ready(Text<'static>),
    /// Activation failed; the message is shown inline.
    Error(String),
}

/// The visible slice of the dashboard, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Scroll offset from the top of the dashboard.
    pub top: f32,
    /// Visible height.
    pub height: f32,
}

impl Viewport {
    /// Creates a viewport.
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    /// Whether `rect` overlaps the viewport grown by `padding` on both
    /// vertical edges.
    pub fn contains(&self, rect: &PixelRect, padding: f32) -> bool {
        let top = self.top - padding;
        let bottom = self.top + self.height + padding;
        rect.bottom() >= top && rect.top <= bottom
    }
}

/// Host surface the layout orchestrator drives.
pub trait Surface {
    /// Container size `(width, height)` in logical pixels.
    fn size(&self) -> (f32, f32);

    /// Currently visible slice.
    fn viewport(&self) -> Viewport;

    /// Creates the container for `id`: a header (drag handle, `title`) and
    /// a content region.
    fn create_container(&mut self, id: &str, title: &str);

    /// Removes the container for `id`.
    fn remove_container(&mut self, id: &str);

    /// Places the container at `rect`.
    fn set_position(&mut self, id: &str, rect: PixelRect);

    /// Offsets the container visually without moving its layout position.
    fn set_transform(&mut self, id: &str, dx: f32, dy: f32);

    /// Removes any visual offset.
    fn clear_transform(&mut self, id: &str);

    /// Toggles the dragging appearance.
    fn set_dragging(&mut self, id: &str, dragging: bool);

    /// Replaces the content region.
    fn set_content(&mut self, id: &str, content: ContentState);

    /// Animates the container into `rect` over `duration`.
    fn settle(&mut self, id: &str, rect: PixelRect, duration: Duration);
}

/// Shared handle to the host surface.
pub type SharedSurface = Rc<RefCell<dyn Surface>>;

/// Everything [`RecordingSurface`] knows about one container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordedContainer {
    /// Header title.
    pub title: String,
    /// Last layout position.
    pub rect: PixelRect,
    /// Current visual offset.
    pub transform: Option<(f32, f32)>,
    /// Dragging appearance.
    pub dragging: bool,
    /// Content region.
    pub content: ContentState,
    /// Number of settle animations started.
    pub settles: usize,
}

/// In-memory [`Surface`].
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: (f32, f32),
    viewport: Viewport,
    containers: HashMap<String, RecordedContainer>,
    transform_writes: usize,
    position_writes: usize,
}

impl RecordingSurface {
    /// A surface of `width x height`, with the viewport covering it.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: (width, height),
            viewport: Viewport::new(0.0, height),
            containers: HashMap::new(),
            transform_writes: 0,
            position_writes: 0,
        }
    }

    /// Changes the container size. The viewport height follows.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = (width, height);
        self.viewport.height = height;
    }

    /// Scrolls to `top`.
    pub fn scroll_to(&mut self, top: f32) {
        self.viewport.top = top;
    }

    /// Replaces the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Recorded state of `id`.
    pub fn container(&self, id: &str) -> Option<&RecordedContainer> {
        self.containers.get(id)
    }

    /// Ids of every container, sorted.
    pub fn container_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.containers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Total `set_transform` calls.
    pub fn transform_writes(&self) -> usize {
        self.transform_writes
    }

    /// Total `set_position` calls.
    pub fn position_writes(&self) -> usize {
        self.position_writes
    }

    fn entry(&mut self, id: &str) -> Option<&mut RecordedContainer> {
        let entry = self.containers.get_mut(id);
        if entry.is_none() {
            tracing::trace!("Surface call for unknown container '{}'", id);
        }
        entry
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        self.size
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn create_container(&mut self, id: &str, title: &str) {
        self.containers.insert(
            id.to_string(),
            RecordedContainer {
                title: title.to_string(),
                ..RecordedContainer::default()
            },
        );
    }

    fn remove_container(&mut self, id: &str) {
        self.containers.remove(id);
    }

    fn set_position(&mut self, id: &str, rect: PixelRect) {
        self.position_writes += 1;
        if let Some(c) = self.entry(id) {
            c.rect = rect;
        }
    }

    fn set_transform(&mut self, id: &str, dx: f32, dy: f32) {
        self.transform_writes += 1;
        if let Some(c) = self.entry(id) {
            c.transform = Some((dx, dy));
        }
    }

    fn clear_transform(&mut self, id: &str) {
        if let Some(c) = self.entry(id) {
            c.transform = None;
        }
    }

    fn set_dragging(&mut self, id: &str, dragging: bool) {
        if let Some(c) = self.entry(id) {
            c.dragging = dragging;
        }
    }

    fn set_content(&mut self, id: &str, content: ContentState) {
        if let Some(c) = self.entry(id) {
            c.content = content;
        }
    }

    fn settle(&mut self, id: &str, rect: PixelRect, _duration: Duration) {
        if let Some(c) = self.entry(id) {
            c.rect = rect;
            c.settles += 1;
        }
    }
}
