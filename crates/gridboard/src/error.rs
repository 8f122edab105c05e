//! Error types for the dashboard engine.
//!
//! One enum per service boundary. Registry and widget errors are `Clone`
//! because a single in-flight module load hands the same outcome to every
//! caller waiting on it.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the widget registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The type identifier was never registered.
    #[error("Widget type not registered: {0}")]
    NotRegistered(String),

    /// The loader failed or produced a module without a usable export.
    #[error("Failed to load widget type '{widget_type}': {reason}")]
    LoadFailed {
        /// Type whose loader failed.
        widget_type: String,
        /// Loader failure description.
        reason: String,
    },
}

/// Errors raised by a widget implementation during its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    /// The widget does not implement the requested rendering.
    #[error("Render not implemented for widget type '{0}'")]
    NotImplemented(String),

    /// The constructor rejected the initial data.
    #[error("Widget construction failed: {0}")]
    Construct(String),

    /// Mounting into the container failed.
    #[error("Widget mount failed: {0}")]
    Mount(String),

    /// Rendering failed.
    #[error("Widget render failed: {0}")]
    Render(String),
}

/// Errors from a layout storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading a stored layout failed.
    #[error("Failed to read layout storage at {path}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a layout failed.
    #[error("Failed to write layout storage at {path}")]
    Write {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The backend refused the operation (quota, read-only, ...).
    #[error("Layout storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the state manager.
#[derive(Debug, Error)]
pub enum StateError {
    /// A persisted layout was written by another schema version.
    #[error("Layout schema version mismatch: found {found}, expected {expected}")]
    VersionMismatch {
        /// Version found in the persisted layout.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// Persisted layout text is not valid layout JSON.
    #[error("Invalid layout data: {0}")]
    Malformed(#[from] serde_json::Error),

    /// No widget with this id exists.
    #[error("Widget not found: {0}")]
    WidgetNotFound(String),

    /// A widget with this id already exists.
    #[error("Widget already exists: {0}")]
    WidgetExists(String),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors surfaced by the layout orchestrator.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Registry lookup or module load failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// State store rejected the operation.
    #[error(transparent)]
    State(#[from] StateError),

    /// Widget activation failed.
    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// The executor refused the activation task.
    #[error("Failed to spawn widget activation: {0}")]
    Spawn(String),
}
