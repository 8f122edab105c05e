//! gridboard: a dashboard layout engine.
//!
//! Widgets live on a responsive column grid. Their implementations load
//! lazily through a [`registry::WidgetRegistry`], their geometry lives in a
//! [`state::StateManager`] with a committed layer and a transient drag
//! layer, and a [`layout::LayoutManager`] keeps containers in sync with
//! state while only activating widgets near the viewport.
//!
//! The engine is single-threaded: services are cheap `Rc` handles driven
//! by a host-owned [`scheduler::Scheduler`] and a local executor. The
//! terminal host in [`tui`] is one such host; tests use
//! [`surface::RecordingSurface`].

/// Configuration schema, loading and XDG paths.
pub mod config;

/// Drag and drop state machine.
pub mod drag;

/// Error types shared across the engine.
pub mod error;

/// Grid geometry and breakpoint resolution.
pub mod grid;

/// Layout orchestrator.
pub mod layout;

/// Tracing subscriber setup.
pub mod logging;

/// Render timing statistics.
pub mod perf;

/// Widget type registry with deferred loading.
pub mod registry;

/// Frame, idle and timer scheduling.
pub mod scheduler;

/// Layout state store and persistence.
pub mod state;

/// Host rendering boundary.
pub mod surface;

/// Terminal host.
pub mod tui;

/// Widget contract and built-in widgets.
pub mod widgets;

pub use config::Config;
pub use error::{LayoutError, RegistryError, StateError, StorageError, WidgetError};
pub use layout::LayoutManager;
pub use registry::WidgetRegistry;
pub use state::StateManager;
