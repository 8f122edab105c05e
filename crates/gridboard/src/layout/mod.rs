//! Layout orchestrator.
//!
//! [`LayoutManager`] composes the registry, the state store, the drag
//! controller and the host [`Surface`](crate::surface::Surface). It owns the
//! container bookkeeping and the live widget instances:
//!
//! - every widget in state gets a container on the surface, positioned from
//!   its committed geometry;
//! - a container is *activated* (implementation loaded, constructed,
//!   mounted and rendered) when it is inside the padded viewport, or always
//!   while the number of containers stays at or below the virtualization
//!   threshold;
//! - while virtualized, a type's module is unloaded once no container of
//!   that type is live or loading;
//! - activation runs as a task on the injected [`LocalSpawn`]; completions
//!   that arrive after the widget was removed or deactivated are dropped;
//! - container resizes are throttled into `on_resize` and debounced into a
//!   breakpoint check, reflow and reposition pass.
//!
//! Structural changes flow through the state store: `add_widget` writes to
//! state and the global subscription mounts the container.

mod placement;
mod visibility;

pub use placement::{find_position, Occupancy};
pub use visibility::{VisibilityChange, VisibilityTracker};

use crate::config::Config;
use crate::drag::{DragDropManager, DragEnd, PointerEvent};
use crate::error::{LayoutError, RegistryError, WidgetError};
use crate::grid::{resolve_breakpoint, GridMetrics, PixelRect};
use crate::perf::RenderStats;
use crate::registry::WidgetRegistry;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::state::{
    GlobalChange, Notify, StateLayer, StateManager, Subscription, WidgetConfig, WidgetPatch,
};
use crate::surface::{ContentState, SharedSurface, Viewport};
use crate::widgets::{ContainerInfo, WidgetConstructor, WidgetInstance, WidgetProps};
use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawn, LocalSpawnExt};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

/// Supplies widget data that is not part of the persisted layout.
///
/// Consulted on activation when a widget's `data` is `Null`, which is the
/// case for every widget restored from storage.
pub trait DataSource {
    /// Fetches the payload for widget `id` of `widget_type`.
    fn fetch(&self, id: &str, widget_type: &str) -> LocalBoxFuture<'static, Result<Value, String>>;
}

struct Container {
    widget_type: String,
    /// Set while an activation is in flight or the instance is live.
    generation: Option<u64>,
    /// Last activation failed; retried once the container re-enters the
    /// viewport or on an explicit [`LayoutManager::retry`].
    failed: bool,
    dragging: bool,
    subscription: Option<Subscription>,
}

#[derive(Default)]
struct ResizeState {
    debounce: Option<TaskHandle>,
    last_live: Option<Duration>,
}

struct LayoutInner {
    config: Rc<Config>,
    registry: WidgetRegistry,
    state: StateManager,
    scheduler: Rc<dyn Scheduler>,
    surface: SharedSurface,
    spawner: Rc<dyn LocalSpawn>,
    data_source: RefCell<Option<Rc<dyn DataSource>>>,
    drag: RefCell<Option<DragDropManager>>,
    metrics: Cell<GridMetrics>,
    breakpoint: RefCell<String>,
    viewport: Cell<Viewport>,
    containers: RefCell<HashMap<String, Container>>,
    instances: RefCell<HashMap<String, WidgetInstance>>,
    visibility: RefCell<VisibilityTracker>,
    virtualized: Cell<bool>,
    global_subscription: RefCell<Option<Subscription>>,
    resize: RefCell<ResizeState>,
    stats: RefCell<RenderStats>,
    next_generation: Cell<u64>,
}

/// Dashboard orchestrator.
///
/// Cloning is cheap and yields a handle to the same layout.
#[derive(Clone)]
pub struct LayoutManager {
    inner: Rc<LayoutInner>,
}

impl fmt::Debug for LayoutManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutManager")
            .field("breakpoint", &*self.inner.breakpoint.borrow())
            .field("containers", &self.inner.containers.borrow().len())
            .field("instances", &self.inner.instances.borrow().len())
            .field("virtualized", &self.inner.virtualized.get())
            .finish()
    }
}

impl LayoutManager {
    /// Creates the orchestrator. Nothing is mounted until [`init`](Self::init).
    pub fn new(
        config: Rc<Config>,
        registry: WidgetRegistry,
        state: StateManager,
        scheduler: Rc<dyn Scheduler>,
        surface: SharedSurface,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        let metrics = GridMetrics::compute(
            0.0,
            config.grid.max_columns(),
            config.grid.row_height,
            config.grid.gap,
        );
        let padding = config.performance.viewport_padding;
        let budget = config.performance.max_render_time();
        Self {
            inner: Rc::new(LayoutInner {
                config,
                registry,
                state,
                scheduler,
                surface,
                spawner,
                data_source: RefCell::new(None),
                drag: RefCell::new(None),
                metrics: Cell::new(metrics),
                breakpoint: RefCell::new(String::new()),
                viewport: Cell::new(Viewport::default()),
                containers: RefCell::new(HashMap::new()),
                instances: RefCell::new(HashMap::new()),
                visibility: RefCell::new(VisibilityTracker::new(padding)),
                virtualized: Cell::new(false),
                global_subscription: RefCell::new(None),
                resize: RefCell::new(ResizeState::default()),
                stats: RefCell::new(RenderStats::new(budget)),
                next_generation: Cell::new(0),
            }),
        }
    }

    /// Installs a source for widget data missing from state.
    pub fn set_data_source(&self, source: Rc<dyn DataSource>) {
        *self.inner.data_source.borrow_mut() = Some(source);
    }

    /// Computes the grid, wires up drag handling and state subscriptions,
    /// then mounts every widget in state ordered by row, then column.
    pub fn init(&self) {
        let (width, _) = self.inner.surface.borrow().size();
        self.apply_breakpoint(width);
        let viewport = self.inner.surface.borrow().viewport();
        self.inner.viewport.set(viewport);

        let drag = DragDropManager::new(
            self.inner.state.clone(),
            self.inner.scheduler.clone(),
            self.inner.surface.clone(),
            self.inner.metrics.get(),
            self.content_height(),
            self.inner.config.performance.settle_duration(),
        );
        let weak = Rc::downgrade(&self.inner);
        drag.on_drag_start(move |id| {
            if let Some(layout) = Self::from_weak(&weak) {
                layout.drag_started(id);
            }
        });
        let weak = Rc::downgrade(&self.inner);
        drag.on_drag_end(move |end| {
            if let Some(layout) = Self::from_weak(&weak) {
                layout.drag_ended(end);
            }
        });
        *self.inner.drag.borrow_mut() = Some(drag);

        let weak = Rc::downgrade(&self.inner);
        let subscription = self.inner.state.subscribe_global(move |change| {
            if let Some(layout) = Self::from_weak(&weak) {
                layout.on_global_change(change);
            }
        });
        *self.inner.global_subscription.borrow_mut() = Some(subscription);

        self.mount_all();
        tracing::info!(
            "Layout initialized: {} widgets, breakpoint '{}'",
            self.inner.containers.borrow().len(),
            self.inner.breakpoint.borrow()
        );
    }

    fn from_weak(weak: &Weak<LayoutInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current grid metrics.
    pub fn metrics(&self) -> GridMetrics {
        self.inner.metrics.get()
    }

    /// Name of the active breakpoint.
    pub fn breakpoint(&self) -> String {
        self.inner.breakpoint.borrow().clone()
    }

    /// Whether visibility-driven activation is engaged.
    pub fn is_virtualized(&self) -> bool {
        self.inner.virtualized.get()
    }

    /// Whether `id` has a container.
    pub fn is_mounted(&self, id: &str) -> bool {
        self.inner.containers.borrow().contains_key(id)
    }

    /// Whether `id` has a live widget instance.
    pub fn is_active(&self, id: &str) -> bool {
        self.inner.instances.borrow().contains_key(id)
    }

    /// Whether `id` is inside the padded viewport.
    pub fn is_visible(&self, id: &str) -> bool {
        self.inner.visibility.borrow().is_visible(id)
    }

    /// Number of containers.
    pub fn mounted_count(&self) -> usize {
        self.inner.containers.borrow().len()
    }

    /// Number of live widget instances.
    pub fn active_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }

    /// Snapshot of render timings.
    pub fn render_stats(&self) -> RenderStats {
        self.inner.stats.borrow().clone()
    }

    /// The drag controller, once initialized.
    pub fn drag(&self) -> Option<DragDropManager> {
        self.inner.drag.borrow().clone()
    }

    /// Pixel rectangle of `id` from its committed geometry.
    pub fn widget_rect(&self, id: &str) -> Option<PixelRect> {
        let metrics = self.inner.metrics.get();
        self.inner
            .state
            .widget_state(id)
            .map(|w| metrics.to_pixels(w.position(), w.size()))
    }

    // -----------------------------------------------------------------------
    // Widget operations
    // -----------------------------------------------------------------------

    /// Adds a widget of `config.widget_type` and returns its id.
    ///
    /// The size defaults to the type's registered default size and the
    /// position to the first free spot.
    pub fn add_widget(&self, config: WidgetConfig) -> Result<String, LayoutError> {
        let meta = self
            .inner
            .registry
            .meta(&config.widget_type)
            .ok_or_else(|| RegistryError::NotRegistered(config.widget_type.clone()))?;
        let bounds = &self.inner.config.widgets;
        let size = bounds.clamp(config.size.unwrap_or(meta.default_size));
        let position = match config.position {
            Some(pos) => pos,
            None => {
                let occupancy = Occupancy::from_footprints(
                    self.inner
                        .state
                        .all_widget_states()
                        .iter()
                        .map(|w| (w.position(), w.size())),
                );
                find_position(
                    &occupancy,
                    size,
                    self.inner.metrics.get().columns,
                    self.inner.config.performance.placement_row_limit,
                )
            }
        };
        let id = self.next_id(&config.widget_type);
        self.inner.state.add_widget(
            &id,
            WidgetConfig {
                position: Some(position),
                size: Some(size),
                ..config
            },
        )?;
        Ok(id)
    }

    /// Removes a widget: deactivates it, then drops its container and state.
    pub fn remove_widget(&self, id: &str) -> Result<(), LayoutError> {
        self.inner.state.remove_widget(id)?;
        Ok(())
    }

    /// Replaces the data of `id` and re-renders its live instance if the
    /// widget asks for it.
    pub fn update_widget_data(&self, id: &str, data: Value) -> Result<(), LayoutError> {
        self.inner
            .state
            .set_widget_state(id, WidgetPatch::data(data.clone()), Notify::Silent)?;
        self.render_instance(id, data);
        Ok(())
    }

    /// Re-renders the live instance of `id` with its current data.
    ///
    /// Widgets whose memoization check declines the props keep their output.
    /// A container whose activation failed is activated again instead.
    pub fn refresh(&self, id: &str) {
        if self.retry(id) {
            return;
        }
        if let Some(data) = self.inner.state.widget_state(id).map(|w| w.data) {
            self.render_instance(id, data);
        }
    }

    /// Activates `id` again after a failed activation.
    ///
    /// Returns `false` when the container is missing, live, loading, or did
    /// not fail.
    pub fn retry(&self, id: &str) -> bool {
        {
            let mut containers = self.inner.containers.borrow_mut();
            match containers.get_mut(id) {
                Some(c) if c.failed && c.generation.is_none() => c.failed = false,
                _ => return false,
            }
        }
        tracing::info!("Retrying activation of '{}'", id);
        self.activate(id);
        true
    }

    /// Whether the last activation of `id` failed.
    pub fn is_failed(&self, id: &str) -> bool {
        self.inner.containers.borrow().get(id).is_some_and(|c| c.failed)
    }

    /// Forwards a pointer event to the drag controller.
    pub fn handle_pointer(&self, event: &PointerEvent) -> bool {
        match self.drag() {
            Some(drag) => drag.handle_event(event),
            None => false,
        }
    }

    /// Recomputes visibility for `viewport` and (de)activates accordingly.
    pub fn handle_viewport_change(&self, viewport: Viewport) {
        self.inner.viewport.set(viewport);
        self.reconcile();
    }

    /// Reacts to a change of the surface size.
    ///
    /// Visible instances get throttled `on_resize` calls; the breakpoint
    /// check, reflow and reposition run once resizing has been quiet for
    /// the debounce period.
    pub fn handle_container_resize(&self) {
        let (width, height) = self.inner.surface.borrow().size();
        let now = self.inner.scheduler.now();
        let throttle = self.inner.config.performance.resize_throttle();
        let (pending, live) = {
            let mut resize = self.inner.resize.borrow_mut();
            let live = resize
                .last_live
                .map_or(true, |last| now.saturating_sub(last) >= throttle);
            if live {
                resize.last_live = Some(now);
            }
            (resize.debounce.take(), live)
        };
        if let Some(handle) = pending {
            self.inner.scheduler.cancel(handle);
        }
        if live {
            self.notify_live_resize(width);
        }

        let mut viewport = self.inner.viewport.get();
        viewport.height = height;
        self.inner.viewport.set(viewport);

        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.set_timeout(
            Box::new(move || {
                if let Some(layout) = Self::from_weak(&weak) {
                    layout.inner.resize.borrow_mut().debounce = None;
                    layout.settle_resize();
                }
            }),
            self.inner.config.performance.resize_debounce(),
        );
        self.inner.resize.borrow_mut().debounce = Some(handle);
    }

    /// Tears everything down: cancels timers and drags, deactivates every
    /// widget, drops subscriptions and flushes state.
    pub fn destroy(&self) {
        let drag = self.inner.drag.borrow_mut().take();
        if let Some(drag) = drag {
            drag.destroy();
        }
        let debounce = self.inner.resize.borrow_mut().debounce.take();
        if let Some(handle) = debounce {
            self.inner.scheduler.cancel(handle);
        }
        let global = self.inner.global_subscription.borrow_mut().take();
        if let Some(sub) = global {
            sub.unsubscribe();
        }
        let ids: Vec<String> = self.inner.containers.borrow().keys().cloned().collect();
        for id in &ids {
            self.deactivate(id);
        }
        let subs: Vec<Subscription> = self
            .inner
            .containers
            .borrow_mut()
            .values_mut()
            .filter_map(|c| c.subscription.take())
            .collect();
        for sub in subs {
            sub.unsubscribe();
        }
        if let Err(e) = self.inner.state.flush_now() {
            tracing::warn!("Final layout flush failed: {}", e);
        }
        tracing::debug!("Layout destroyed");
    }

    // -----------------------------------------------------------------------
    // Mounting
    // -----------------------------------------------------------------------

    fn mount_all(&self) {
        let mut widgets = self.inner.state.all_widget_states();
        widgets.sort_by_key(|w| (w.y, w.x));
        for w in &widgets {
            self.mount(&w.id);
        }
        self.refresh_drag_bounds();
        self.reconcile();
    }

    fn mount(&self, id: &str) {
        if self.is_mounted(id) {
            return;
        }
        let Some(widget) = self.inner.state.widget_state(id) else {
            return;
        };
        let title = self
            .inner
            .registry
            .meta(&widget.widget_type)
            .map_or_else(|| widget.widget_type.clone(), |m| m.name);

        let weak = Rc::downgrade(&self.inner);
        let subscription = self.inner.state.subscribe(id, move |w, layer| {
            if layer == StateLayer::Committed {
                if let Some(layout) = Self::from_weak(&weak) {
                    layout.position_container(&w.id);
                }
            }
        });
        self.inner.containers.borrow_mut().insert(
            id.to_string(),
            Container {
                widget_type: widget.widget_type.clone(),
                generation: None,
                failed: false,
                dragging: false,
                subscription: Some(subscription),
            },
        );
        self.inner.visibility.borrow_mut().observe(id);
        {
            let mut surface = self.inner.surface.borrow_mut();
            surface.create_container(id, &title);
            surface.set_content(id, ContentState::Loading);
        }
        self.position_container(id);
        tracing::debug!("Mounted container '{}' ({})", id, widget.widget_type);
    }

    fn unmount(&self, id: &str) {
        self.deactivate(id);
        let Some(container) = self.inner.containers.borrow_mut().remove(id) else {
            return;
        };
        if let Some(sub) = container.subscription {
            sub.unsubscribe();
        }
        self.inner.visibility.borrow_mut().unobserve(id);
        self.inner.surface.borrow_mut().remove_container(id);
        tracing::debug!("Unmounted container '{}'", id);
    }

    fn position_container(&self, id: &str) {
        if !self.is_mounted(id) {
            return;
        }
        if let Some(rect) = self.widget_rect(id) {
            self.inner.surface.borrow_mut().set_position(id, rect);
        }
    }

    fn position_all(&self) {
        let ids: Vec<String> = self.inner.containers.borrow().keys().cloned().collect();
        for id in &ids {
            self.position_container(id);
        }
    }

    fn on_global_change(&self, change: &GlobalChange) {
        match change {
            GlobalChange::Added(id) => self.mount(id),
            GlobalChange::Removed(id) => self.unmount(id),
            GlobalChange::Batch(_) => self.position_all(),
            GlobalChange::Imported => {
                let ids: Vec<String> = self.inner.containers.borrow().keys().cloned().collect();
                for id in &ids {
                    self.unmount(id);
                }
                self.mount_all();
                return;
            }
        }
        self.refresh_drag_bounds();
        self.reconcile();
    }

    // -----------------------------------------------------------------------
    // Virtualization
    // -----------------------------------------------------------------------

    /// Brings activation in line with visibility and the virtualization
    /// threshold.
    fn reconcile(&self) {
        let threshold = self.inner.config.performance.virtualization_threshold;
        let count = self.inner.containers.borrow().len();
        let virtualize = count > threshold;
        if self.inner.virtualized.replace(virtualize) != virtualize {
            tracing::debug!(
                "Virtualization {} ({} containers, threshold {})",
                if virtualize { "on" } else { "off" },
                count,
                threshold
            );
        }

        let metrics = self.inner.metrics.get();
        let rects: Vec<(String, PixelRect)> = self
            .inner
            .containers
            .borrow()
            .keys()
            .filter_map(|id| {
                self.inner
                    .state
                    .widget_state(id)
                    .map(|w| (id.clone(), metrics.to_pixels(w.position(), w.size())))
            })
            .collect();
        let change = self.inner.visibility.borrow_mut().update(
            self.inner.viewport.get(),
            rects.iter().map(|(id, rect)| (id.as_str(), *rect)),
        );

        let (to_activate, to_deactivate) = {
            let visibility = self.inner.visibility.borrow();
            let mut containers = self.inner.containers.borrow_mut();
            for id in &change.entered {
                if let Some(c) = containers.get_mut(id) {
                    c.failed = false;
                }
            }
            let mut activate = Vec::new();
            let mut deactivate = Vec::new();
            for (id, c) in containers.iter() {
                let wanted = !virtualize || visibility.is_visible(id);
                match (wanted, c.generation.is_some()) {
                    (true, false) if !c.failed => activate.push(id.clone()),
                    (false, true) if !c.dragging => deactivate.push(id.clone()),
                    _ => {}
                }
            }
            (activate, deactivate)
        };

        for id in &change.left {
            self.set_instance_visible(id, false);
        }
        for id in &to_deactivate {
            self.deactivate(id);
        }
        for id in &to_activate {
            self.activate(id);
        }
        for id in &change.entered {
            self.set_instance_visible(id, true);
        }
        if virtualize {
            self.release_unused_types(&to_deactivate);
        }
    }

    /// Unloads the modules of types that no longer back any live or loading
    /// container after `deactivated` went offscreen.
    fn release_unused_types(&self, deactivated: &[String]) {
        let unused: BTreeSet<String> = {
            let containers = self.inner.containers.borrow();
            let types: BTreeSet<&str> = deactivated
                .iter()
                .filter_map(|id| containers.get(id))
                .map(|c| c.widget_type.as_str())
                .collect();
            types
                .into_iter()
                .filter(|ty| {
                    !containers
                        .values()
                        .any(|c| c.widget_type == *ty && c.generation.is_some())
                })
                .map(str::to_string)
                .collect()
        };
        for ty in &unused {
            self.inner.registry.unload(ty);
        }
    }

    fn set_instance_visible(&self, id: &str, visible: bool) {
        if let Some(instance) = self.inner.instances.borrow_mut().get_mut(id) {
            if visible {
                instance.show();
            } else {
                instance.hide();
            }
        }
        if let Err(e) = self.inner.state.set_visibility(id, visible) {
            tracing::trace!("Visibility of '{}' not recorded: {}", id, e);
        }
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    fn activate(&self, id: &str) {
        let generation = self.inner.next_generation.get() + 1;
        let widget_type = {
            let mut containers = self.inner.containers.borrow_mut();
            let Some(c) = containers.get_mut(id) else {
                return;
            };
            if c.generation.is_some() {
                return;
            }
            self.inner.next_generation.set(generation);
            c.generation = Some(generation);
            c.widget_type.clone()
        };
        tracing::debug!("Activating '{}' ({})", id, widget_type);
        self.inner
            .surface
            .borrow_mut()
            .set_content(id, ContentState::Loading);

        let task = run_activation(
            Rc::downgrade(&self.inner),
            self.inner.registry.clone(),
            id.to_string(),
            widget_type,
            generation,
        );
        if let Err(e) = self.inner.spawner.spawn_local(task) {
            let err = LayoutError::Spawn(e.to_string());
            self.activation_failed(id, generation, &err);
        }
    }

    fn deactivate(&self, id: &str) {
        let was_active = self
            .inner
            .containers
            .borrow_mut()
            .get_mut(id)
            .and_then(|c| c.generation.take())
            .is_some();
        let instance = self.inner.instances.borrow_mut().remove(id);
        if let Some(mut instance) = instance {
            instance.hide();
            instance.destroy();
        }
        if was_active {
            self.inner
                .surface
                .borrow_mut()
                .set_content(id, ContentState::Loading);
            tracing::debug!("Deactivated '{}'", id);
        }
    }

    /// Whether an activation of `generation` for `id` is still wanted.
    fn is_current(&self, id: &str, generation: u64) -> bool {
        self.inner
            .containers
            .borrow()
            .get(id)
            .is_some_and(|c| c.generation == Some(generation))
    }

    fn finish_activation(
        &self,
        id: &str,
        widget_type: &str,
        generation: u64,
        ctor: WidgetConstructor,
        data: Value,
    ) {
        let Some(rect) = self.widget_rect(id) else {
            return;
        };
        let started = Instant::now();
        let result = build_instance(id, widget_type, &ctor, rect, data);
        let elapsed = started.elapsed();
        match result {
            Ok(mut instance) => {
                self.inner.stats.borrow_mut().record(widget_type, elapsed);
                if !self.is_current(id, generation) {
                    instance.destroy();
                    return;
                }
                if self.is_visible(id) {
                    instance.show();
                }
                let content = instance
                    .output()
                    .cloned()
                    .map_or(ContentState::Loading, ContentState::Ready);
                self.inner.surface.borrow_mut().set_content(id, content);
                self.inner.instances.borrow_mut().insert(id.to_string(), instance);
                tracing::debug!("Activated '{}' in {:?}", id, elapsed);
            }
            Err(e) => self.activation_failed(id, generation, &e),
        }
    }

    fn activation_failed(&self, id: &str, generation: u64, err: &dyn fmt::Display) {
        tracing::warn!("Activation of '{}' failed: {}", id, err);
        {
            let mut containers = self.inner.containers.borrow_mut();
            match containers.get_mut(id) {
                Some(c) if c.generation == Some(generation) => {
                    c.generation = None;
                    c.failed = true;
                }
                _ => return,
            }
        }
        self.inner
            .surface
            .borrow_mut()
            .set_content(id, ContentState::Error(err.to_string()));
    }

    fn render_instance(&self, id: &str, data: Value) {
        let Some(rect) = self.widget_rect(id) else {
            return;
        };
        let (widget_type, result) = {
            let mut instances = self.inner.instances.borrow_mut();
            let Some(instance) = instances.get_mut(id) else {
                return;
            };
            let started = Instant::now();
            let result = instance
                .update(WidgetProps::new(data, rect.width, rect.height))
                .map(|rendered| rendered.then(|| instance.output().cloned()).flatten());
            if matches!(result, Ok(Some(_))) {
                self.inner
                    .stats
                    .borrow_mut()
                    .record(instance.widget_type(), started.elapsed());
            }
            (instance.widget_type().to_string(), result)
        };
        let content = match result {
            Ok(Some(text)) => ContentState::Ready(text),
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Render of '{}' ({}) failed: {}", id, widget_type, e);
                ContentState::Error(e.to_string())
            }
        };
        self.inner.surface.borrow_mut().set_content(id, content);
    }

    // -----------------------------------------------------------------------
    // Resize
    // -----------------------------------------------------------------------

    fn apply_breakpoint(&self, width: f32) -> bool {
        let grid = &self.inner.config.grid;
        let (name, columns) = match resolve_breakpoint(&grid.breakpoints, width) {
            Some(bp) => (bp.name.clone(), bp.columns),
            None => (String::new(), grid.max_columns()),
        };
        self.inner
            .metrics
            .set(GridMetrics::compute(width, columns, grid.row_height, grid.gap));
        let changed = *self.inner.breakpoint.borrow() != name;
        if changed {
            tracing::debug!("Breakpoint '{}' ({} columns)", name, columns);
            *self.inner.breakpoint.borrow_mut() = name;
        }
        changed
    }

    fn notify_live_resize(&self, width: f32) {
        let grid = &self.inner.config.grid;
        let tentative = GridMetrics::compute(
            width,
            self.inner.metrics.get().columns,
            grid.row_height,
            grid.gap,
        );
        let sizes: Vec<(String, PixelRect)> = self.visible_rects(tentative);
        let mut instances = self.inner.instances.borrow_mut();
        for (id, rect) in sizes {
            if let Some(instance) = instances.get_mut(&id) {
                instance.resize(rect.width, rect.height);
            }
        }
    }

    fn settle_resize(&self) {
        let (width, _) = self.inner.surface.borrow().size();
        let reflowed = self.apply_breakpoint(width) && self.reflow();
        self.refresh_drag_bounds();
        // a reflow batch has already repositioned every container
        if !reflowed {
            self.position_all();
        }

        let sizes = self.visible_rects(self.inner.metrics.get());
        {
            let mut instances = self.inner.instances.borrow_mut();
            for (id, rect) in sizes {
                if let Some(instance) = instances.get_mut(&id) {
                    instance.resize_end(rect.width, rect.height);
                }
            }
        }
        self.reconcile();
    }

    /// Pulls widgets that overflow the new column count back inside it.
    ///
    /// Only `x` changes. Widths and rows are kept, so widgets may overlap
    /// vertically afterwards. Returns whether any widget moved.
    fn reflow(&self) -> bool {
        let columns = self.inner.metrics.get().columns;
        let updates: Vec<(String, WidgetPatch)> = self
            .inner
            .state
            .all_widget_states()
            .into_iter()
            .filter(|w| w.x.saturating_add(w.width) > columns)
            .map(|w| {
                let x = columns.saturating_sub(w.width);
                (
                    w.id,
                    WidgetPatch {
                        x: Some(x),
                        ..WidgetPatch::default()
                    },
                )
            })
            .collect();
        if updates.is_empty() {
            return false;
        }
        let changed = self.inner.state.batch_update(updates);
        tracing::debug!("Reflowed {} widgets into {} columns", changed.len(), columns);
        !changed.is_empty()
    }

    fn visible_rects(&self, metrics: GridMetrics) -> Vec<(String, PixelRect)> {
        let visibility = self.inner.visibility.borrow();
        self.inner
            .instances
            .borrow()
            .keys()
            .filter(|id| visibility.is_visible(id))
            .filter_map(|id| {
                self.inner
                    .state
                    .widget_state(id)
                    .map(|w| (id.clone(), metrics.to_pixels(w.position(), w.size())))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Drag integration
    // -----------------------------------------------------------------------

    fn drag_started(&self, id: &str) {
        if let Some(c) = self.inner.containers.borrow_mut().get_mut(id) {
            c.dragging = true;
        }
        self.inner.surface.borrow_mut().set_dragging(id, true);
    }

    fn drag_ended(&self, end: &DragEnd) {
        if let Some(c) = self.inner.containers.borrow_mut().get_mut(&end.id) {
            c.dragging = false;
        }
        self.inner.surface.borrow_mut().set_dragging(&end.id, false);
        self.position_container(&end.id);
        self.refresh_drag_bounds();
        self.reconcile();
    }

    /// Height the drag controller may snap into: the surface, or the
    /// content plus room for one more default-sized widget.
    fn content_height(&self) -> f32 {
        let metrics = self.inner.metrics.get();
        let bottom_row = self
            .inner
            .state
            .all_widget_states()
            .iter()
            .map(|w| w.y + w.height)
            .max()
            .unwrap_or(0)
            + self.inner.config.widgets.default_height;
        let content = bottom_row as f32 * metrics.row_step() - metrics.gap;
        self.inner.surface.borrow().size().1.max(content)
    }

    fn refresh_drag_bounds(&self) {
        let height = self.content_height();
        if let Some(drag) = self.drag() {
            drag.update_metrics(self.inner.metrics.get(), height);
        }
    }

    fn next_id(&self, widget_type: &str) -> String {
        (1u64..)
            .map(|n| format!("{widget_type}-{n}"))
            .find(|id| !self.inner.state.contains(id))
            .unwrap_or_else(|| widget_type.to_string())
    }
}

/// Resolves, constructs and first-renders one widget.
async fn run_activation(
    weak: Weak<LayoutInner>,
    registry: WidgetRegistry,
    id: String,
    widget_type: String,
    generation: u64,
) {
    let resolved = registry.get(&widget_type).await;
    let Some(mut layout) = LayoutManager::from_weak(&weak) else {
        return;
    };
    if !layout.is_current(&id, generation) {
        tracing::trace!("Dropping stale activation of '{}'", id);
        return;
    }
    let ctor = match resolved {
        Ok(ctor) => ctor,
        Err(e) => {
            layout.activation_failed(&id, generation, &LayoutError::from(e));
            return;
        }
    };

    let mut data = layout
        .inner
        .state
        .widget_state(&id)
        .map_or(Value::Null, |w| w.data);
    let source = layout.inner.data_source.borrow().clone();
    if let (true, Some(source)) = (data.is_null(), source) {
        drop(layout);
        let fetched = source.fetch(&id, &widget_type).await;
        layout = match LayoutManager::from_weak(&weak) {
            Some(layout) if layout.is_current(&id, generation) => layout,
            _ => return,
        };
        match fetched {
            Ok(value) => {
                if let Err(e) = layout.inner.state.fill_data(&id, value.clone()) {
                    tracing::warn!("Could not store fetched data for '{}': {}", id, e);
                }
                data = value;
            }
            Err(e) => tracing::warn!("Data fetch for '{}' failed: {}", id, e),
        }
    }

    layout.finish_activation(&id, &widget_type, generation, ctor, data);
}

fn build_instance(
    id: &str,
    widget_type: &str,
    ctor: &WidgetConstructor,
    rect: PixelRect,
    data: Value,
) -> Result<WidgetInstance, WidgetError> {
    let widget = ctor(id, &data)?;
    let mut instance = WidgetInstance::new(id, widget_type, widget);
    instance.mount(&ContainerInfo {
        id: id.to_string(),
        widget_type: widget_type.to_string(),
        rect,
    })?;
    instance.update(WidgetProps::new(data, rect.width, rect.height))?;
    Ok(instance)
}

#[cfg(test)]
mod tests;
