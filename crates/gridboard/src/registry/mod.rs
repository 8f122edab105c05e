//! Widget registry: maps type identifiers to deferred module loaders.
//!
//! A widget type is registered once at startup with a [`WidgetDescriptor`]
//! holding an async loader. Nothing is loaded until the first
//! [`get`](WidgetRegistry::get) for that type; the resolved constructor is
//! then cached for the life of the registry (or until
//! [`unload`](WidgetRegistry::unload) evicts it).
//!
//! At most one load per type is in flight at any time. Concurrent callers
//! share the pending load through [`futures::future::Shared`] and all observe
//! the same outcome.
//!
//! # Example
//!
//! ```
//! use gridboard::registry::{WidgetDescriptor, WidgetModule, WidgetRegistry};
//! use gridboard::grid::GridSize;
//! use gridboard::widgets::note::NoteWidget;
//! use futures::executor::block_on;
//!
//! let registry = WidgetRegistry::new();
//! registry.register(
//!     "note",
//!     WidgetDescriptor::new("Note", "text", GridSize::new(4, 3), 1, || async {
//!         Ok(WidgetModule::with_default(NoteWidget::create))
//!     }),
//! );
//! assert!(!registry.is_loaded("note"));
//! let ctor = block_on(registry.get("note")).expect("note loads");
//! assert!(registry.is_loaded("note"));
//! assert!(ctor("note-1", &serde_json::Value::Null).is_ok());
//! ```

use crate::error::{RegistryError, WidgetError};
use crate::grid::GridSize;
use crate::widgets::{Widget, WidgetConstructor};
use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Async factory producing a widget module.
///
/// Errors are plain strings; the registry wraps them in
/// [`RegistryError::LoadFailed`].
pub type WidgetLoader = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<WidgetModule, String>>>;

type PendingLoad = Shared<LocalBoxFuture<'static, Result<WidgetConstructor, RegistryError>>>;

/// The export table of a loaded widget module.
///
/// Resolution order for a type: the default export, then a named export
/// equal to the type string, then the first named export.
#[derive(Clone, Default)]
pub struct WidgetModule {
    default: Option<WidgetConstructor>,
    exports: Vec<(String, WidgetConstructor)>,
}

impl fmt::Debug for WidgetModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetModule")
            .field("default", &self.default.is_some())
            .field(
                "exports",
                &self.exports.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl WidgetModule {
    /// An empty module (no usable export).
    pub fn new() -> Self {
        Self::default()
    }

    /// A module whose default export is `ctor`.
    pub fn with_default<F>(ctor: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Box<dyn Widget>, WidgetError> + 'static,
    {
        Self::new().default_export(ctor)
    }

    /// Sets the default export.
    pub fn default_export<F>(mut self, ctor: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Box<dyn Widget>, WidgetError> + 'static,
    {
        self.default = Some(Rc::new(ctor));
        self
    }

    /// Adds a named export.
    pub fn export<F>(mut self, name: &str, ctor: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Box<dyn Widget>, WidgetError> + 'static,
    {
        self.exports.push((name.to_string(), Rc::new(ctor)));
        self
    }

    /// Picks the constructor for `widget_type`.
    pub fn resolve(&self, widget_type: &str) -> Option<WidgetConstructor> {
        self.default
            .clone()
            .or_else(|| {
                self.exports
                    .iter()
                    .find(|(name, _)| name == widget_type)
                    .map(|(_, ctor)| ctor.clone())
            })
            .or_else(|| self.exports.first().map(|(_, ctor)| ctor.clone()))
    }
}

/// Registration data for one widget type.
#[derive(Clone)]
pub struct WidgetDescriptor {
    /// Human-readable name, shown in container headers.
    pub name: String,
    /// Grouping used by widget pickers.
    pub category: String,
    /// Size used when a new widget of this type gives none.
    pub default_size: GridSize,
    /// Preload priority; lower loads earlier.
    pub priority: u32,
    loader: WidgetLoader,
}

impl WidgetDescriptor {
    /// Creates a descriptor from an async loader.
    pub fn new<F, Fut>(
        name: &str,
        category: &str,
        default_size: GridSize,
        priority: u32,
        loader: F,
    ) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<WidgetModule, String>> + 'static,
    {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            default_size,
            priority,
            loader: Rc::new(move || loader().boxed_local()),
        }
    }
}

/// Synchronous view of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetMeta {
    /// Type identifier.
    pub widget_type: String,
    /// Human-readable name.
    pub name: String,
    /// Category.
    pub category: String,
    /// Default grid size.
    pub default_size: GridSize,
    /// Preload priority.
    pub priority: u32,
    /// Whether the implementation is cached.
    pub loaded: bool,
    /// Number of successful `get` calls.
    pub usage: u64,
}

struct RegistryEntry {
    descriptor: WidgetDescriptor,
    loaded: Option<WidgetConstructor>,
    usage: u64,
    order: usize,
}

impl RegistryEntry {
    fn meta(&self, widget_type: &str) -> WidgetMeta {
        WidgetMeta {
            widget_type: widget_type.to_string(),
            name: self.descriptor.name.clone(),
            category: self.descriptor.category.clone(),
            default_size: self.descriptor.default_size,
            priority: self.descriptor.priority,
            loaded: self.loaded.is_some(),
            usage: self.usage,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<String, RegistryEntry>,
    pending: HashMap<String, PendingLoad>,
    next_order: usize,
}

/// Registry mapping widget type identifiers to memoized async loaders.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("WidgetRegistry")
            .field("types", &inner.entries.len())
            .field("pending", &inner.pending.len())
            .finish()
    }
}

impl WidgetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a widget type.
    ///
    /// The first registration of a type wins; later ones are ignored with a
    /// warning. Returns whether the descriptor was stored.
    pub fn register(&self, widget_type: &str, descriptor: WidgetDescriptor) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.entries.contains_key(widget_type) {
            tracing::warn!(
                "Widget type '{}' already registered, ignoring duplicate",
                widget_type
            );
            return false;
        }
        let order = inner.next_order;
        inner.next_order += 1;
        inner.entries.insert(
            widget_type.to_string(),
            RegistryEntry {
                descriptor,
                loaded: None,
                usage: 0,
                order,
            },
        );
        tracing::debug!("Registered widget type '{}'", widget_type);
        true
    }

    /// Resolves the implementation for `widget_type`, loading it if needed.
    ///
    /// Increments the type's usage counter on success.
    pub async fn get(&self, widget_type: &str) -> Result<WidgetConstructor, RegistryError> {
        let ctor = self.load(widget_type).await?;
        if let Some(entry) = self.inner.borrow_mut().entries.get_mut(widget_type) {
            entry.usage += 1;
        }
        Ok(ctor)
    }

    /// Returns a future for the type's constructor without touching usage.
    fn load(
        &self,
        widget_type: &str,
    ) -> LocalBoxFuture<'static, Result<WidgetConstructor, RegistryError>> {
        let mut inner = self.inner.borrow_mut();
        let loader = match inner.entries.get(widget_type) {
            None => {
                return future::ready(Err(RegistryError::NotRegistered(
                    widget_type.to_string(),
                )))
                .boxed_local()
            }
            Some(entry) => match &entry.loaded {
                Some(ctor) => return future::ready(Ok(ctor.clone())).boxed_local(),
                None => entry.descriptor.loader.clone(),
            },
        };
        if let Some(pending) = inner.pending.get(widget_type) {
            return pending.clone().boxed_local();
        }

        let weak = Rc::downgrade(&self.inner);
        let ty = widget_type.to_string();
        let pending = async move {
            tracing::debug!("Loading widget module '{}'", ty);
            let result = match loader().await {
                Ok(module) => module.resolve(&ty).ok_or_else(|| RegistryError::LoadFailed {
                    widget_type: ty.clone(),
                    reason: "module has no usable export".to_string(),
                }),
                Err(reason) => Err(RegistryError::LoadFailed {
                    widget_type: ty.clone(),
                    reason,
                }),
            };
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.borrow_mut();
                inner.pending.remove(&ty);
                if let (Ok(ctor), Some(entry)) = (&result, inner.entries.get_mut(&ty)) {
                    entry.loaded = Some(ctor.clone());
                }
            }
            if let Err(e) = &result {
                tracing::warn!("{}", e);
            }
            result
        }
        .boxed_local()
        .shared();
        inner.pending.insert(widget_type.to_string(), pending.clone());
        pending.boxed_local()
    }

    /// Whether `widget_type` is registered.
    pub fn has(&self, widget_type: &str) -> bool {
        self.inner.borrow().entries.contains_key(widget_type)
    }

    /// Whether the implementation of `widget_type` is cached.
    pub fn is_loaded(&self, widget_type: &str) -> bool {
        self.inner
            .borrow()
            .entries
            .get(widget_type)
            .is_some_and(|e| e.loaded.is_some())
    }

    /// Whether a load of `widget_type` is in flight.
    pub fn is_loading(&self, widget_type: &str) -> bool {
        self.inner.borrow().pending.contains_key(widget_type)
    }

    /// Metadata for `widget_type`, without loading it.
    pub fn meta(&self, widget_type: &str) -> Option<WidgetMeta> {
        self.inner
            .borrow()
            .entries
            .get(widget_type)
            .map(|e| e.meta(widget_type))
    }

    /// All registered types in registration order.
    pub fn types(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        let mut types: Vec<(&String, usize)> =
            inner.entries.iter().map(|(t, e)| (t, e.order)).collect();
        types.sort_by_key(|(_, order)| *order);
        types.into_iter().map(|(t, _)| t.clone()).collect()
    }

    /// Metadata grouped by category.
    pub fn by_category(&self) -> BTreeMap<String, Vec<WidgetMeta>> {
        let inner = self.inner.borrow();
        let mut groups: BTreeMap<String, Vec<WidgetMeta>> = BTreeMap::new();
        for (ty, entry) in &inner.entries {
            groups
                .entry(entry.descriptor.category.clone())
                .or_default()
                .push(entry.meta(ty));
        }
        groups
    }

    /// Loads every unloaded type with priority `<= max_priority`.
    ///
    /// Loads start in ascending priority order and run concurrently. A
    /// failing type does not affect its siblings. Returns how many loaded.
    pub async fn preload_priority(&self, max_priority: u32) -> usize {
        let mut targets: Vec<(u32, usize, String)> = {
            let inner = self.inner.borrow();
            inner
                .entries
                .iter()
                .filter(|(_, e)| e.loaded.is_none() && e.descriptor.priority <= max_priority)
                .map(|(t, e)| (e.descriptor.priority, e.order, t.clone()))
                .collect()
        };
        targets.sort();
        self.preload(targets.into_iter().map(|(_, _, t)| t).collect())
            .await
    }

    /// Loads the `count` unloaded types with the highest usage counters.
    pub async fn preload_most_used(&self, count: usize) -> usize {
        let mut targets: Vec<(u64, usize, String)> = {
            let inner = self.inner.borrow();
            inner
                .entries
                .iter()
                .filter(|(_, e)| e.loaded.is_none())
                .map(|(t, e)| (e.usage, e.order, t.clone()))
                .collect()
        };
        targets.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        targets.truncate(count);
        self.preload(targets.into_iter().map(|(_, _, t)| t).collect())
            .await
    }

    async fn preload(&self, types: Vec<String>) -> usize {
        let loads: Vec<_> = types.iter().map(|t| self.load(t)).collect();
        let results = future::join_all(loads).await;
        let mut loaded = 0;
        for (ty, result) in types.iter().zip(results) {
            match result {
                Ok(_) => loaded += 1,
                Err(e) => tracing::debug!("Preload of '{}' skipped: {}", ty, e),
            }
        }
        loaded
    }

    /// Drops the cached implementation of `widget_type`.
    ///
    /// An in-flight load is not cancelled; it caches its result when done.
    pub fn unload(&self, widget_type: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.entries.get_mut(widget_type) {
            Some(entry) if entry.loaded.is_some() => {
                entry.loaded = None;
                tracing::debug!("Unloaded widget module '{}'", widget_type);
                true
            }
            _ => false,
        }
    }
}
