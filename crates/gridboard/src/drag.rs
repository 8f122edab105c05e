//! Pointer-driven drag and drop with grid snapping.
//!
//! A drag starts on a pointer-down over a widget's header handle. Moves only
//! record the latest pointer coordinates; the actual work (snap, clamp,
//! visual offset, ephemeral state write) happens once per animation frame,
//! so a burst of pointer events between two frames costs a single update.
//!
//! During the drag the container is moved with a transform only. Its layout
//! position and the committed state stay untouched until the drop.

use crate::grid::{GridMetrics, GridPosition, GridSize};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::state::{Notify, StateManager};
use crate::surface::SharedSurface;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Pointer event phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// Button pressed or finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released or finger lifted.
    Up,
    /// The host aborted the gesture.
    Cancel,
}

/// Input device behind a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerType {
    /// Mouse or pen.
    Mouse,
    /// Touch screen, with the number of active touches.
    Touch {
        /// Fingers currently on the surface.
        touches: usize,
    },
}

/// What the pointer is over, as reported by the host's hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    /// A widget header drag handle.
    Handle(String),
    /// A widget content region.
    Body(String),
    /// Empty space.
    None,
}

/// A pointer event in container-relative logical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    /// Phase.
    pub kind: PointerKind,
    /// Device.
    pub pointer: PointerType,
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Hit-test result at `(x, y)`.
    pub target: HitTarget,
}

impl PointerEvent {
    /// A mouse event.
    pub fn mouse(kind: PointerKind, x: f32, y: f32, target: HitTarget) -> Self {
        Self {
            kind,
            pointer: PointerType::Mouse,
            x,
            y,
            target,
        }
    }

    /// A touch event with `touches` active fingers.
    pub fn touch(kind: PointerKind, touches: usize, x: f32, y: f32, target: HitTarget) -> Self {
        Self {
            kind,
            pointer: PointerType::Touch { touches },
            x,
            y,
            target,
        }
    }
}

/// Reported to the drag-end callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    /// Dragged widget.
    pub id: String,
    /// Committed cell after the drop (the start cell when cancelled).
    pub position: GridPosition,
    /// `false` when the drag was cancelled.
    pub committed: bool,
}

#[derive(Debug, Clone)]
struct DragSession {
    id: String,
    size: GridSize,
    start: GridPosition,
    origin: (f32, f32),
    start_pointer: (f32, f32),
    latest: (f32, f32),
}

type StartCallback = Rc<dyn Fn(&str)>;
type EndCallback = Rc<dyn Fn(&DragEnd)>;

struct DragInner {
    state: StateManager,
    scheduler: Rc<dyn Scheduler>,
    surface: SharedSurface,
    settle_duration: Duration,
    metrics: Cell<GridMetrics>,
    rows: Cell<u32>,
    session: RefCell<Option<DragSession>>,
    pending_frame: Cell<Option<TaskHandle>>,
    on_start: RefCell<Option<StartCallback>>,
    on_end: RefCell<Option<EndCallback>>,
}

/// Drag state machine: idle, or dragging exactly one widget.
#[derive(Clone)]
pub struct DragDropManager {
    inner: Rc<DragInner>,
}

impl fmt::Debug for DragDropManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragDropManager")
            .field("session", &*self.inner.session.borrow())
            .field("pending_frame", &self.inner.pending_frame.get())
            .finish()
    }
}

impl DragDropManager {
    /// Creates an idle drag controller.
    ///
    /// `container_height` bounds vertical snapping together with `metrics`.
    pub fn new(
        state: StateManager,
        scheduler: Rc<dyn Scheduler>,
        surface: SharedSurface,
        metrics: GridMetrics,
        container_height: f32,
        settle_duration: Duration,
    ) -> Self {
        Self {
            inner: Rc::new(DragInner {
                state,
                scheduler,
                surface,
                settle_duration,
                metrics: Cell::new(metrics),
                rows: Cell::new(metrics.rows_in(container_height)),
                session: RefCell::new(None),
                pending_frame: Cell::new(None),
                on_start: RefCell::new(None),
                on_end: RefCell::new(None),
            }),
        }
    }

    /// Sets the callback run when a drag starts.
    pub fn on_drag_start<F: Fn(&str) + 'static>(&self, callback: F) {
        *self.inner.on_start.borrow_mut() = Some(Rc::new(callback));
    }

    /// Sets the callback run when a drag ends, committed or cancelled.
    pub fn on_drag_end<F: Fn(&DragEnd) + 'static>(&self, callback: F) {
        *self.inner.on_end.borrow_mut() = Some(Rc::new(callback));
    }

    /// Replaces the grid metrics used for snapping.
    pub fn update_metrics(&self, metrics: GridMetrics, container_height: f32) {
        self.inner.metrics.set(metrics);
        self.inner.rows.set(metrics.rows_in(container_height));
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.inner.session.borrow().is_some()
    }

    /// Id of the widget being dragged.
    pub fn dragging_id(&self) -> Option<String> {
        self.inner.session.borrow().as_ref().map(|s| s.id.clone())
    }

    /// Feeds a pointer event. Returns whether the event was consumed.
    pub fn handle_event(&self, event: &PointerEvent) -> bool {
        match event.kind {
            PointerKind::Down => self.pointer_down(event),
            PointerKind::Move => self.pointer_move(event),
            PointerKind::Up => self.pointer_up(event),
            PointerKind::Cancel => self.cancel(),
        }
    }

    fn pointer_down(&self, event: &PointerEvent) -> bool {
        if self.is_dragging() {
            return false;
        }
        if let PointerType::Touch { touches } = event.pointer {
            if touches != 1 {
                return false;
            }
        }
        let HitTarget::Handle(id) = &event.target else {
            return false;
        };
        let Some(widget) = self.inner.state.widget_state(id) else {
            return false;
        };

        let start = widget.position();
        let origin = self.inner.metrics.get().origin(start);
        *self.inner.session.borrow_mut() = Some(DragSession {
            id: id.clone(),
            size: widget.size(),
            start,
            origin,
            start_pointer: (event.x, event.y),
            latest: (event.x, event.y),
        });
        tracing::debug!(
            "Drag start '{}' at ({}, {}), pointer offset ({}, {})",
            id,
            start.x,
            start.y,
            event.x - origin.0,
            event.y - origin.1
        );

        let callback = self.inner.on_start.borrow().clone();
        if let Some(callback) = callback {
            callback(id);
        }
        true
    }

    fn pointer_move(&self, event: &PointerEvent) -> bool {
        {
            let mut session = self.inner.session.borrow_mut();
            let Some(session) = session.as_mut() else {
                return false;
            };
            session.latest = (event.x, event.y);
        }
        if self.inner.pending_frame.get().is_none() {
            let weak: Weak<DragInner> = Rc::downgrade(&self.inner);
            let handle = self.inner.scheduler.request_frame(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.pending_frame.set(None);
                    DragDropManager { inner }.frame();
                }
            }));
            self.inner.pending_frame.set(Some(handle));
        }
        true
    }

    /// Applies the latest pointer coordinates: visual offset plus a silent
    /// ephemeral write.
    fn frame(&self) {
        let Some(session) = self.inner.session.borrow().clone() else {
            return;
        };
        let cell = self.snapped_cell(&session);
        let (start_left, start_top) = session.origin;
        let (left, top) = self.inner.metrics.get().origin(cell);
        self.inner
            .surface
            .borrow_mut()
            .set_transform(&session.id, left - start_left, top - start_top);
        if let Err(e) = self
            .inner
            .state
            .set_ephemeral_position(&session.id, cell, Notify::Silent)
        {
            tracing::warn!("Drag frame for '{}' dropped: {}", session.id, e);
        }
        tracing::trace!("Drag frame '{}' -> ({}, {})", session.id, cell.x, cell.y);
    }

    fn pointer_up(&self, event: &PointerEvent) -> bool {
        let Some(mut session) = self.inner.session.borrow_mut().take() else {
            return false;
        };
        self.cancel_frame();
        session.latest = (event.x, event.y);
        let cell = self.snapped_cell(&session);

        let state = &self.inner.state;
        let committed = state
            .set_ephemeral_position(&session.id, cell, Notify::Silent)
            .and_then(|()| state.commit_ephemeral_state(&session.id));
        let (position, committed) = match committed {
            Ok(_) => (cell, true),
            Err(e) => {
                tracing::warn!("Drop of '{}' not committed: {}", session.id, e);
                state.discard_ephemeral_state(&session.id);
                (session.start, false)
            }
        };

        let rect = self.inner.metrics.get().to_pixels(position, session.size);
        {
            let mut surface = self.inner.surface.borrow_mut();
            surface.clear_transform(&session.id);
            surface.settle(&session.id, rect, self.inner.settle_duration);
        }
        tracing::debug!("Drag end '{}' at ({}, {})", session.id, position.x, position.y);

        self.finish(DragEnd {
            id: session.id,
            position,
            committed,
        });
        true
    }

    /// Aborts the drag in progress, reverting to committed state.
    pub fn cancel(&self) -> bool {
        let Some(session) = self.inner.session.borrow_mut().take() else {
            return false;
        };
        self.cancel_frame();
        self.inner.state.discard_ephemeral_state(&session.id);
        self.inner.surface.borrow_mut().clear_transform(&session.id);
        tracing::debug!("Drag cancelled for '{}'", session.id);
        self.finish(DragEnd {
            id: session.id,
            position: session.start,
            committed: false,
        });
        true
    }

    /// Cancels any pending frame and drops an active drag without
    /// callbacks.
    pub fn destroy(&self) {
        self.cancel_frame();
        if let Some(session) = self.inner.session.borrow_mut().take() {
            self.inner.state.discard_ephemeral_state(&session.id);
            self.inner.surface.borrow_mut().clear_transform(&session.id);
        }
        self.inner.on_start.borrow_mut().take();
        self.inner.on_end.borrow_mut().take();
    }

    fn finish(&self, end: DragEnd) {
        let callback = self.inner.on_end.borrow().clone();
        if let Some(callback) = callback {
            callback(&end);
        }
    }

    fn cancel_frame(&self) {
        if let Some(handle) = self.inner.pending_frame.take() {
            self.inner.scheduler.cancel(handle);
        }
    }

    /// Start cell plus pointer delta, rounded per axis and clamped into the
    /// grid.
    fn snapped_cell(&self, session: &DragSession) -> GridPosition {
        let metrics = self.inner.metrics.get();
        let left = session.origin.0 + (session.latest.0 - session.start_pointer.0);
        let top = session.origin.1 + (session.latest.1 - session.start_pointer.1);
        let (x, y) = metrics.snap(left, top);
        let max_x = metrics.columns.saturating_sub(session.size.width);
        let max_y = self.inner.rows.get().saturating_sub(session.size.height);
        GridPosition::new(
            x.clamp(0, i64::from(max_x)) as u32,
            y.clamp(0, i64::from(max_y)) as u32,
        )
    }
}
