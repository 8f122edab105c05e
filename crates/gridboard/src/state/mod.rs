//! Widget state store.
//!
//! [`StateManager`] is the single source of truth for widget geometry and
//! data. It keeps two layers keyed by widget id:
//!
//! - the **committed** layer ([`WidgetState`]), which is persisted, and
//! - the **ephemeral** layer (a bare [`GridPosition`]), written many times
//!   per second during a drag and never persisted.
//!
//! The layers have distinct write methods so that a drag cannot mark the
//! layout dirty by accident. Committed writes mark the widget dirty and
//! (re)schedule a single idle-time flush through the [`Scheduler`]; rapid
//! writes therefore coalesce into one storage write.
//!
//! Subscribers are plain callbacks. The store never holds an internal
//! borrow while a callback runs, so callbacks may read or write the store.

pub mod layout_format;
pub mod storage;

pub use layout_format::{PersistedLayout, PersistedWidget};
pub use storage::{FileStorage, MemoryStorage, Storage};

use crate::config::Config;
use crate::error::StateError;
use crate::grid::{GridPosition, GridSize};
use crate::scheduler::{Scheduler, TaskHandle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

/// Committed state of one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    /// Unique id.
    pub id: String,
    /// Registry type identifier.
    pub widget_type: String,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Width in columns.
    pub width: u32,
    /// Height in rows.
    pub height: u32,
    /// Opaque payload owned by the widget type.
    pub data: Value,
    /// Whether the widget is currently inside the viewport.
    pub visible: bool,
}

impl WidgetState {
    /// Top-left cell.
    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.x, self.y)
    }

    /// Footprint.
    pub fn size(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }
}

/// A partial update of a [`WidgetState`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    /// New column.
    pub x: Option<u32>,
    /// New row.
    pub y: Option<u32>,
    /// New width.
    pub width: Option<u32>,
    /// New height.
    pub height: Option<u32>,
    /// New payload.
    pub data: Option<Value>,
    /// New visibility flag.
    pub visible: Option<bool>,
}

impl WidgetPatch {
    /// A patch moving the widget to `pos`.
    pub fn position(pos: GridPosition) -> Self {
        Self {
            x: Some(pos.x),
            y: Some(pos.y),
            ..Self::default()
        }
    }

    /// A patch resizing the widget.
    pub fn size(size: GridSize) -> Self {
        Self {
            width: Some(size.width),
            height: Some(size.height),
            ..Self::default()
        }
    }

    /// A patch replacing the payload.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// A patch setting the visibility flag.
    pub fn visible(visible: bool) -> Self {
        Self {
            visible: Some(visible),
            ..Self::default()
        }
    }
}

/// Initial configuration for [`StateManager::add_widget`].
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    /// Registry type identifier.
    pub widget_type: String,
    /// Top-left cell. Defaults to the origin.
    pub position: Option<GridPosition>,
    /// Footprint. Defaults to the configured default size.
    pub size: Option<GridSize>,
    /// Initial payload.
    pub data: Value,
}

impl WidgetConfig {
    /// A config for `widget_type` with every optional field unset.
    pub fn new(widget_type: &str) -> Self {
        Self {
            widget_type: widget_type.to_string(),
            position: None,
            size: None,
            data: Value::Null,
        }
    }

    /// Places the widget at `(x, y)`.
    pub fn at(mut self, x: u32, y: u32) -> Self {
        self.position = Some(GridPosition::new(x, y));
        self
    }

    /// Sizes the widget.
    pub fn sized(mut self, width: u32, height: u32) -> Self {
        self.size = Some(GridSize::new(width, height));
        self
    }

    /// Sets the initial payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Whether a write notifies per-id subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// Notify subscribers.
    Subscribers,
    /// Write without notifying (high-frequency drag updates).
    Silent,
}

/// Which layer a per-id notification reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLayer {
    /// The committed (persisted) state.
    Committed,
    /// The committed state overlaid with the ephemeral drag position.
    Ephemeral,
}

/// A structural change reported to global subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalChange {
    /// A widget was added.
    Added(String),
    /// A widget was removed.
    Removed(String),
    /// Several widgets were updated together.
    Batch(Vec<String>),
    /// The whole layout was replaced.
    Imported,
}

type StateCallback = Rc<dyn Fn(&WidgetState, StateLayer)>;
type GlobalCallback = Rc<dyn Fn(&GlobalChange)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SubscriptionKey {
    Widget(String),
    Global,
}

/// Handle returned by [`StateManager::subscribe`] and
/// [`StateManager::subscribe_global`].
///
/// Dropping the handle keeps the subscription alive; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    inner: Weak<StateInner>,
    key: SubscriptionKey,
    id: u64,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl Subscription {
    /// Removes the callback. Safe to call after the store is gone.
    pub fn unsubscribe(self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        match &self.key {
            SubscriptionKey::Widget(widget_id) => {
                let mut subs = inner.subscribers.borrow_mut();
                if let Some(list) = subs.get_mut(widget_id) {
                    list.retain(|(id, _)| *id != self.id);
                    if list.is_empty() {
                        subs.remove(widget_id);
                    }
                }
            }
            SubscriptionKey::Global => {
                inner.global.borrow_mut().retain(|(id, _)| *id != self.id);
            }
        }
    }
}

struct StateInner {
    config: Rc<Config>,
    scheduler: Rc<dyn Scheduler>,
    storage: Rc<dyn Storage>,
    widgets: RefCell<HashMap<String, WidgetState>>,
    ephemeral: RefCell<HashMap<String, GridPosition>>,
    dirty: RefCell<HashSet<String>>,
    pending_flush: Cell<Option<TaskHandle>>,
    subscribers: RefCell<HashMap<String, Vec<(u64, StateCallback)>>>,
    global: RefCell<Vec<(u64, GlobalCallback)>>,
    next_subscription: Cell<u64>,
}

/// Two-layer widget state store with coalesced persistence.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Clone)]
pub struct StateManager {
    inner: Rc<StateInner>,
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("widgets", &self.inner.widgets.borrow().len())
            .field("ephemeral", &self.inner.ephemeral.borrow().len())
            .field("dirty", &self.inner.dirty.borrow().len())
            .finish()
    }
}

impl StateManager {
    /// Creates an empty store. Call [`restore`](Self::restore) to load the
    /// persisted layout.
    pub fn new(config: Rc<Config>, scheduler: Rc<dyn Scheduler>, storage: Rc<dyn Storage>) -> Self {
        Self {
            inner: Rc::new(StateInner {
                config,
                scheduler,
                storage,
                widgets: RefCell::new(HashMap::new()),
                ephemeral: RefCell::new(HashMap::new()),
                dirty: RefCell::new(HashSet::new()),
                pending_flush: Cell::new(None),
                subscribers: RefCell::new(HashMap::new()),
                global: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Committed state of `id`.
    pub fn widget_state(&self, id: &str) -> Option<WidgetState> {
        self.inner.widgets.borrow().get(id).cloned()
    }

    /// Committed state of every widget, ordered by id.
    pub fn all_widget_states(&self) -> Vec<WidgetState> {
        let mut all: Vec<WidgetState> = self.inner.widgets.borrow().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Whether a widget with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.widgets.borrow().contains_key(id)
    }

    /// Number of widgets.
    pub fn len(&self) -> usize {
        self.inner.widgets.borrow().len()
    }

    /// Whether the store holds no widgets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ephemeral drag position of `id`, if a drag is in progress.
    pub fn ephemeral_position(&self, id: &str) -> Option<GridPosition> {
        self.inner.ephemeral.borrow().get(id).copied()
    }

    /// Ephemeral position if present, else the committed position.
    pub fn current_position(&self, id: &str) -> Option<GridPosition> {
        self.ephemeral_position(id)
            .or_else(|| self.inner.widgets.borrow().get(id).map(WidgetState::position))
    }

    /// Whether `id` changed since the last successful flush.
    pub fn is_dirty(&self, id: &str) -> bool {
        self.inner.dirty.borrow().contains(id)
    }

    /// Whether a flush is scheduled.
    pub fn has_pending_flush(&self) -> bool {
        self.inner.pending_flush.get().is_some()
    }

    // -----------------------------------------------------------------------
    // Committed writes
    // -----------------------------------------------------------------------

    /// Merges `patch` into the committed state of `id`.
    ///
    /// Sizes are clamped into the configured bounds. Marks the widget dirty
    /// and schedules a coalesced flush.
    pub fn set_widget_state(
        &self,
        id: &str,
        patch: WidgetPatch,
        notify: Notify,
    ) -> Result<(), StateError> {
        let updated = self.apply_patch(id, patch)?;
        self.mark_dirty(id);
        self.schedule_flush();
        if notify == Notify::Subscribers {
            self.notify(&updated, StateLayer::Committed);
        }
        Ok(())
    }

    /// Records whether `id` is inside the viewport.
    ///
    /// Visibility is not persisted, so this neither marks the widget dirty
    /// nor notifies subscribers.
    pub fn set_visibility(&self, id: &str, visible: bool) -> Result<(), StateError> {
        self.apply_patch(id, WidgetPatch::visible(visible)).map(|_| ())
    }

    /// Stores data fetched for `id` on activation.
    ///
    /// Data is not persisted, so this neither marks the widget dirty nor
    /// notifies subscribers.
    pub(crate) fn fill_data(&self, id: &str, data: Value) -> Result<(), StateError> {
        self.apply_patch(id, WidgetPatch::data(data)).map(|_| ())
    }

    /// Applies several patches as one change.
    ///
    /// Unknown ids are skipped. Issues one flush schedule and one global
    /// [`GlobalChange::Batch`] notification carrying the changed ids; per-id
    /// subscribers are not called. Returns the ids that changed.
    pub fn batch_update(&self, updates: Vec<(String, WidgetPatch)>) -> Vec<String> {
        let mut changed = Vec::with_capacity(updates.len());
        for (id, patch) in updates {
            match self.apply_patch(&id, patch) {
                Ok(_) => {
                    self.mark_dirty(&id);
                    changed.push(id);
                }
                Err(e) => tracing::warn!("Skipping batch update: {}", e),
            }
        }
        if changed.is_empty() {
            return changed;
        }
        self.schedule_flush();
        self.notify_global(&GlobalChange::Batch(changed.clone()));
        changed
    }

    /// Adds a widget. Missing geometry falls back to the origin and the
    /// configured default size.
    pub fn add_widget(&self, id: &str, config: WidgetConfig) -> Result<WidgetState, StateError> {
        let state = {
            let mut widgets = self.inner.widgets.borrow_mut();
            if widgets.contains_key(id) {
                return Err(StateError::WidgetExists(id.to_string()));
            }
            let bounds = &self.inner.config.widgets;
            let pos = config.position.unwrap_or(GridPosition::ORIGIN);
            let size = bounds.clamp(config.size.unwrap_or_else(|| bounds.default_size()));
            let state = WidgetState {
                id: id.to_string(),
                widget_type: config.widget_type,
                x: pos.x,
                y: pos.y,
                width: size.width,
                height: size.height,
                data: config.data,
                visible: false,
            };
            widgets.insert(id.to_string(), state.clone());
            state
        };
        tracing::debug!("Added widget '{}' ({})", id, state.widget_type);
        self.mark_dirty(id);
        self.schedule_flush();
        self.notify_global(&GlobalChange::Added(id.to_string()));
        Ok(state)
    }

    /// Removes a widget together with any ephemeral position.
    pub fn remove_widget(&self, id: &str) -> Result<WidgetState, StateError> {
        let removed = self
            .inner
            .widgets
            .borrow_mut()
            .remove(id)
            .ok_or_else(|| StateError::WidgetNotFound(id.to_string()))?;
        self.inner.ephemeral.borrow_mut().remove(id);
        tracing::debug!("Removed widget '{}'", id);
        self.mark_dirty(id);
        self.schedule_flush();
        self.notify_global(&GlobalChange::Removed(id.to_string()));
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Ephemeral layer
    // -----------------------------------------------------------------------

    /// Replaces the ephemeral position of `id`.
    ///
    /// Never marks the widget dirty and never schedules persistence.
    pub fn set_ephemeral_position(
        &self,
        id: &str,
        pos: GridPosition,
        notify: Notify,
    ) -> Result<(), StateError> {
        let mut overlay = self
            .widget_state(id)
            .ok_or_else(|| StateError::WidgetNotFound(id.to_string()))?;
        self.inner.ephemeral.borrow_mut().insert(id.to_string(), pos);
        tracing::trace!("Ephemeral position of '{}' -> ({}, {})", id, pos.x, pos.y);
        if notify == Notify::Subscribers {
            overlay.x = pos.x;
            overlay.y = pos.y;
            self.notify(&overlay, StateLayer::Ephemeral);
        }
        Ok(())
    }

    /// Promotes the ephemeral position of `id` into committed state.
    ///
    /// Returns `false` (and does nothing) when there is no ephemeral entry.
    pub fn commit_ephemeral_state(&self, id: &str) -> Result<bool, StateError> {
        let Some(pos) = self.inner.ephemeral.borrow_mut().remove(id) else {
            return Ok(false);
        };
        self.set_widget_state(id, WidgetPatch::position(pos), Notify::Subscribers)?;
        Ok(true)
    }

    /// Drops the ephemeral position of `id` and notifies subscribers of the
    /// reversion to committed state.
    pub fn discard_ephemeral_state(&self, id: &str) -> bool {
        if self.inner.ephemeral.borrow_mut().remove(id).is_none() {
            return false;
        }
        if let Some(state) = self.widget_state(id) {
            self.notify(&state, StateLayer::Committed);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Export / import
    // -----------------------------------------------------------------------

    /// Compact, versioned snapshot of the committed geometry.
    pub fn export_layout(&self) -> PersistedLayout {
        let mut layout = PersistedLayout::empty(self.inner.config.storage.schema_version);
        for (id, w) in self.inner.widgets.borrow().iter() {
            layout.widgets.insert(
                id.clone(),
                PersistedWidget {
                    widget_type: w.widget_type.clone(),
                    x: w.x,
                    y: w.y,
                    width: w.width,
                    height: w.height,
                },
            );
        }
        layout
    }

    /// Replaces every widget with the contents of `layout`.
    ///
    /// Fails with [`StateError::VersionMismatch`] before touching any state
    /// when the layout was written by another schema version. Imported
    /// widgets start with `Null` data.
    pub fn import_layout(&self, layout: PersistedLayout) -> Result<(), StateError> {
        let ids = self.replace_layout(layout)?;
        self.inner.dirty.borrow_mut().extend(ids);
        self.schedule_flush();
        Ok(())
    }

    /// [`export_layout`](Self::export_layout) as compact JSON.
    pub fn export_json(&self) -> Result<String, StateError> {
        Ok(self.export_layout().to_json()?)
    }

    /// [`import_layout`](Self::import_layout) from JSON text.
    ///
    /// The version stamp is checked before the body is parsed, so a layout
    /// from another schema yields [`StateError::VersionMismatch`] even when
    /// its shape no longer matches.
    pub fn import_json(&self, text: &str) -> Result<(), StateError> {
        self.import_layout(self.parse_layout(text)?)
    }

    fn parse_layout(&self, text: &str) -> Result<PersistedLayout, StateError> {
        let found = PersistedLayout::read_version(text)?;
        let expected = self.inner.config.storage.schema_version;
        if found != expected {
            return Err(StateError::VersionMismatch { found, expected });
        }
        Ok(PersistedLayout::from_json(text)?)
    }

    fn replace_layout(&self, layout: PersistedLayout) -> Result<Vec<String>, StateError> {
        let expected = self.inner.config.storage.schema_version;
        if layout.version != expected {
            return Err(StateError::VersionMismatch {
                found: layout.version,
                expected,
            });
        }
        let bounds = &self.inner.config.widgets;
        let widgets: HashMap<String, WidgetState> = layout
            .widgets
            .into_iter()
            .map(|(id, w)| {
                let size = bounds.clamp(GridSize::new(w.width, w.height));
                let state = WidgetState {
                    id: id.clone(),
                    widget_type: w.widget_type,
                    x: w.x,
                    y: w.y,
                    width: size.width,
                    height: size.height,
                    data: Value::Null,
                    visible: false,
                };
                (id, state)
            })
            .collect();
        let ids: Vec<String> = widgets.keys().cloned().collect();
        *self.inner.widgets.borrow_mut() = widgets;
        self.inner.ephemeral.borrow_mut().clear();
        tracing::info!("Imported layout with {} widgets", ids.len());
        self.notify_global(&GlobalChange::Imported);
        Ok(ids)
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Calls `callback` after every notifying write to `id`.
    pub fn subscribe<F>(&self, id: &str, callback: F) -> Subscription
    where
        F: Fn(&WidgetState, StateLayer) + 'static,
    {
        let sub = self.next_subscription_id();
        self.inner
            .subscribers
            .borrow_mut()
            .entry(id.to_string())
            .or_default()
            .push((sub, Rc::new(callback)));
        Subscription {
            inner: Rc::downgrade(&self.inner),
            key: SubscriptionKey::Widget(id.to_string()),
            id: sub,
        }
    }

    /// Calls `callback` on every structural change.
    pub fn subscribe_global<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&GlobalChange) + 'static,
    {
        let sub = self.next_subscription_id();
        self.inner.global.borrow_mut().push((sub, Rc::new(callback)));
        Subscription {
            inner: Rc::downgrade(&self.inner),
            key: SubscriptionKey::Global,
            id: sub,
        }
    }

    /// Number of per-id subscribers for `id`.
    pub fn subscriber_count(&self, id: &str) -> usize {
        self.inner
            .subscribers
            .borrow()
            .get(id)
            .map_or(0, Vec::len)
    }

    fn next_subscription_id(&self) -> u64 {
        let id = self.inner.next_subscription.get() + 1;
        self.inner.next_subscription.set(id);
        id
    }

    fn notify(&self, state: &WidgetState, layer: StateLayer) {
        let callbacks: Vec<StateCallback> = self
            .inner
            .subscribers
            .borrow()
            .get(&state.id)
            .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();
        for callback in callbacks {
            callback(state, layer);
        }
    }

    fn notify_global(&self, change: &GlobalChange) {
        let callbacks: Vec<GlobalCallback> = self
            .inner
            .global
            .borrow()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(change);
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Loads the persisted layout from storage.
    ///
    /// A missing entry, unreadable storage, corrupt JSON or a version
    /// mismatch all fall back to an empty layout with a warning. Returns the
    /// number of widgets restored.
    pub fn restore(&self) -> usize {
        let key = &self.inner.config.storage.layout_key;
        let text = match self.inner.storage.load(key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::debug!("No saved layout under '{}'", key);
                return 0;
            }
            Err(e) => {
                tracing::warn!("Could not read saved layout: {}", e);
                return 0;
            }
        };
        let result = self
            .parse_layout(&text)
            .and_then(|layout| self.replace_layout(layout));
        match result {
            Ok(ids) => ids.len(),
            Err(e) => {
                tracing::warn!("Ignoring saved layout: {}", e);
                0
            }
        }
    }

    /// Writes the layout to storage immediately, cancelling any scheduled
    /// flush.
    pub fn flush_now(&self) -> Result<(), StateError> {
        if let Some(handle) = self.inner.pending_flush.take() {
            self.inner.scheduler.cancel(handle);
        }
        self.flush()
    }

    fn flush(&self) -> Result<(), StateError> {
        let json = self.export_json()?;
        let key = &self.inner.config.storage.layout_key;
        match self.inner.storage.save(key, &json) {
            Ok(()) => {
                let count = std::mem::take(&mut *self.inner.dirty.borrow_mut()).len();
                tracing::debug!("Persisted layout ({} dirty widgets)", count);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to persist layout: {}", e);
                Err(e.into())
            }
        }
    }

    fn mark_dirty(&self, id: &str) {
        self.inner.dirty.borrow_mut().insert(id.to_string());
    }

    fn schedule_flush(&self) {
        if let Some(handle) = self.inner.pending_flush.take() {
            self.inner.scheduler.cancel(handle);
        }
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.request_idle(
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.pending_flush.set(None);
                    // failures are logged; dirty ids stay for the next write
                    let _ = StateManager { inner }.flush();
                }
            }),
            self.inner.config.performance.persist_timeout(),
        );
        self.inner.pending_flush.set(Some(handle));
    }

    fn apply_patch(&self, id: &str, patch: WidgetPatch) -> Result<WidgetState, StateError> {
        let mut widgets = self.inner.widgets.borrow_mut();
        let state = widgets
            .get_mut(id)
            .ok_or_else(|| StateError::WidgetNotFound(id.to_string()))?;
        if let Some(x) = patch.x {
            state.x = x;
        }
        if let Some(y) = patch.y {
            state.y = y;
        }
        let size = GridSize::new(
            patch.width.unwrap_or(state.width),
            patch.height.unwrap_or(state.height),
        );
        let size = self.inner.config.widgets.clamp(size);
        state.width = size.width;
        state.height = size.height;
        if let Some(data) = patch.data {
            state.data = data;
        }
        if let Some(visible) = patch.visible {
            state.visible = visible;
        }
        Ok(state.clone())
    }
}

#[cfg(test)]
mod tests;
