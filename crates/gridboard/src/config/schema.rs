//! TOML configuration schema for gridboard.
//!
//! All structs derive `Deserialize` and `Serialize` with defaults via
//! `#[serde(default)]`, so a partial (or empty) file is always valid.
//!
//! Duration fields use human-readable strings (e.g. `"150ms"`, `"1s"`)
//! parsed by the `humantime` crate through the accessor methods. A
//! configuration is loaded once at startup and then shared read-only behind
//! an `Rc`; nothing in the engine mutates it.

use crate::config::error::ConfigError;
use crate::grid::GridSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Schema version written into every persisted layout.
///
/// Bump when the persisted layout shape changes; older layouts are then
/// discarded on restore instead of being misread.
pub const LAYOUT_SCHEMA_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// ```toml
/// [grid]
/// [performance]
/// [widgets]
/// [storage]
/// [logging]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Grid geometry and responsive breakpoints.
    pub grid: GridConfig,
    /// Timing budgets and virtualization tuning.
    pub performance: PerformanceConfig,
    /// Widget size bounds and defaults.
    pub widgets: WidgetSizeConfig,
    /// Layout persistence settings.
    pub storage: StorageConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Checks cross-field constraints that serde cannot express.
    ///
    /// Returns the first problem found as [`ConfigError::Invalid`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.breakpoints.is_empty() {
            return Err(invalid("grid.breakpoints", "at least one breakpoint is required"));
        }
        if let Some(bp) = self.grid.breakpoints.iter().find(|bp| bp.columns == 0) {
            return Err(invalid(
                "grid.breakpoints",
                &format!("breakpoint '{}' has zero columns", bp.name),
            ));
        }
        if self.grid.row_height <= 0.0 {
            return Err(invalid("grid.row_height", "must be positive"));
        }
        if self.grid.gap < 0.0 {
            return Err(invalid("grid.gap", "must not be negative"));
        }

        let p = &self.performance;
        for (field, value) in [
            ("performance.max_render_time", &p.max_render_time),
            ("performance.resize_debounce", &p.resize_debounce),
            ("performance.resize_throttle", &p.resize_throttle),
            ("performance.persist_timeout", &p.persist_timeout),
            ("performance.settle_duration", &p.settle_duration),
        ] {
            humantime::parse_duration(value)
                .map_err(|e| invalid(field, &format!("'{value}': {e}")))?;
        }

        let w = &self.widgets;
        if w.min_width == 0 || w.min_height == 0 {
            return Err(invalid("widgets", "minimum sizes must be at least 1"));
        }
        if !(w.min_width <= w.default_width && w.default_width <= w.max_width) {
            return Err(invalid(
                "widgets",
                "expected min_width <= default_width <= max_width",
            ));
        }
        if !(w.min_height <= w.default_height && w.default_height <= w.max_height) {
            return Err(invalid(
                "widgets",
                "expected min_height <= default_height <= max_height",
            ));
        }
        if self.storage.layout_key.trim().is_empty() {
            return Err(invalid("storage.layout_key", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A named mapping from a minimum container width to a column count.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Breakpoint {
    /// Display name (e.g. `"lg"`).
    pub name: String,
    /// Minimum container width in logical pixels.
    pub min_width: u32,
    /// Number of grid columns at this breakpoint.
    pub columns: u32,
}

impl Breakpoint {
    /// Creates a breakpoint.
    pub fn new(name: &str, min_width: u32, columns: u32) -> Self {
        Self {
            name: name.to_string(),
            min_width,
            columns,
        }
    }
}

/// Grid geometry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Height of one grid row in logical pixels.
    pub row_height: f32,
    /// Gap between cells in logical pixels.
    pub gap: f32,
    /// Breakpoint table. Order does not matter.
    pub breakpoints: Vec<Breakpoint>,
}

impl GridConfig {
    /// Column count of the widest breakpoint, used when no container width
    /// is known yet.
    pub fn max_columns(&self) -> u32 {
        self.breakpoints
            .iter()
            .map(|bp| bp.columns)
            .max()
            .unwrap_or(12)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: 80.0,
            gap: 10.0,
            breakpoints: vec![
                Breakpoint::new("lg", 1200, 12),
                Breakpoint::new("md", 996, 10),
                Breakpoint::new("sm", 768, 6),
                Breakpoint::new("xs", 0, 4),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

/// Timing budgets and virtualization tuning.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Render time above which a widget render is reported as over budget.
    pub max_render_time: String,
    /// Quiet period after the last container resize before reflow runs.
    pub resize_debounce: String,
    /// Minimum interval between live `on_resize` notifications.
    pub resize_throttle: String,
    /// Upper bound on how long a pending layout flush may wait for idle time.
    pub persist_timeout: String,
    /// Duration of the settle animation after a drop.
    pub settle_duration: String,
    /// Number of mounted widgets above which viewport virtualization engages.
    pub virtualization_threshold: usize,
    /// Extra margin around the viewport, in logical pixels, within which a
    /// widget counts as visible.
    pub viewport_padding: f32,
    /// Rows scanned by automatic placement before giving up.
    pub placement_row_limit: u32,
}

impl PerformanceConfig {
    /// Parsed [`max_render_time`](Self::max_render_time).
    pub fn max_render_time(&self) -> Duration {
        parse_or(&self.max_render_time, Duration::from_millis(16))
    }

    /// Parsed [`resize_debounce`](Self::resize_debounce).
    pub fn resize_debounce(&self) -> Duration {
        parse_or(&self.resize_debounce, Duration::from_millis(150))
    }

    /// Parsed [`resize_throttle`](Self::resize_throttle).
    pub fn resize_throttle(&self) -> Duration {
        parse_or(&self.resize_throttle, Duration::from_millis(50))
    }

    /// Parsed [`persist_timeout`](Self::persist_timeout).
    pub fn persist_timeout(&self) -> Duration {
        parse_or(&self.persist_timeout, Duration::from_secs(1))
    }

    /// Parsed [`settle_duration`](Self::settle_duration).
    pub fn settle_duration(&self) -> Duration {
        parse_or(&self.settle_duration, Duration::from_millis(200))
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_render_time: "16ms".to_string(),
            resize_debounce: "150ms".to_string(),
            resize_throttle: "50ms".to_string(),
            persist_timeout: "1s".to_string(),
            settle_duration: "200ms".to_string(),
            virtualization_threshold: 20,
            viewport_padding: 200.0,
            placement_row_limit: 100,
        }
    }
}

fn parse_or(value: &str, fallback: Duration) -> Duration {
    humantime::parse_duration(value).unwrap_or_else(|e| {
        tracing::warn!("invalid duration {:?} ({}), using {:?}", value, e, fallback);
        fallback
    })
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

/// Widget size bounds in grid units.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WidgetSizeConfig {
    /// Smallest allowed width.
    pub min_width: u32,
    /// Largest allowed width.
    pub max_width: u32,
    /// Smallest allowed height.
    pub min_height: u32,
    /// Largest allowed height.
    pub max_height: u32,
    /// Width used when neither the caller nor the registry supplies one.
    pub default_width: u32,
    /// Height used when neither the caller nor the registry supplies one.
    pub default_height: u32,
}

impl WidgetSizeConfig {
    /// Fallback widget size.
    pub fn default_size(&self) -> GridSize {
        GridSize::new(self.default_width, self.default_height)
    }

    /// Clamps a size into the configured bounds.
    pub fn clamp(&self, size: GridSize) -> GridSize {
        let max_width = self.max_width.max(self.min_width);
        let max_height = self.max_height.max(self.min_height);
        GridSize::new(
            size.width.clamp(self.min_width, max_width),
            size.height.clamp(self.min_height, max_height),
        )
    }
}

impl Default for WidgetSizeConfig {
    fn default() -> Self {
        Self {
            min_width: 1,
            max_width: 12,
            min_height: 1,
            max_height: 12,
            default_width: 4,
            default_height: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Layout persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Key under which the layout is stored.
    pub layout_key: String,
    /// Schema version stamped on exported layouts.
    pub schema_version: u32,
    /// Directory for file-backed storage. Defaults to the XDG data dir.
    pub directory: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            layout_key: "gridboard.layout".to_string(),
            schema_version: LAYOUT_SCHEMA_VERSION,
            directory: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log output settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file path. When unset the terminal host discards logs and the
    /// CLI writes to stderr.
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
