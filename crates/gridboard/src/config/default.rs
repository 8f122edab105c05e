//! Default configuration template and file creation utilities.
//!
//! Provides a commented TOML template that matches `Config::default()` and
//! functions to write it to the XDG config path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

// ---------------------------------------------------------------------------
// Default TOML template
// ---------------------------------------------------------------------------

/// A commented TOML template with all default values.
///
/// Every value here must match `Config::default()` from `schema.rs`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# gridboard configuration
#
# All values shown below are the built-in defaults.
# Location: $XDG_CONFIG_HOME/gridboard/config.toml

# ==============================================================================
# Grid
# ==============================================================================

[grid]

# Height of one grid row, in logical pixels.
row_height = 80.0

# Gap between cells, in logical pixels.
gap = 10.0

# Responsive breakpoints: the widest breakpoint whose min_width the container
# meets or exceeds decides the column count.
breakpoints = [
    { name = "lg", min_width = 1200, columns = 12 },
    { name = "md", min_width = 996, columns = 10 },
    { name = "sm", min_width = 768, columns = 6 },
    { name = "xs", min_width = 0, columns = 4 },
]

# ==============================================================================
# Performance budgets
# ==============================================================================

[performance]

# Renders slower than this are logged as over budget.
max_render_time = "16ms"

# Quiet period after the last resize before widgets are reflowed.
resize_debounce = "150ms"

# Minimum interval between live resize notifications to widgets.
resize_throttle = "50ms"

# Longest a pending layout save may wait for idle time.
persist_timeout = "1s"

# Length of the settle animation after dropping a widget.
settle_duration = "200ms"

# Widgets are activated and deactivated by visibility only when more than
# this many are mounted.
virtualization_threshold = 20

# Margin around the viewport (logical pixels) that still counts as visible.
viewport_padding = 200.0

# Rows scanned when looking for a free spot for a new widget.
placement_row_limit = 100

# ==============================================================================
# Widget size bounds (grid units)
# ==============================================================================

[widgets]

min_width = 1
max_width = 12
min_height = 1
max_height = 12
default_width = 4
default_height = 3

# ==============================================================================
# Storage
# ==============================================================================

[storage]

# Key (file name stem) under which the layout is saved.
layout_key = "gridboard.layout"

# Persisted layout schema version. Layouts with another version are ignored.
schema_version = 2

# Directory for saved layouts. Defaults to $XDG_DATA_HOME/gridboard.
# directory = "/path/to/layouts"

# ==============================================================================
# Logging
# ==============================================================================

[logging]

# Write logs to this file. The terminal dashboard discards logs when unset.
# file = "/tmp/gridboard.log"
"#;

// ---------------------------------------------------------------------------
// File creation functions
// ---------------------------------------------------------------------------

/// Creates (or force-overwrites) the default config file.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, backs it up to `.toml.backup` first.
/// - Returns the path where the config was written.
pub fn create_default_config(force: bool) -> Result<PathBuf, ConfigError> {
    let path = xdg::config_path();

    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists { path });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(&path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(&path)?;
    Ok(path)
}

/// Writes the default template to `path`, creating parent dirs.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    xdg::ensure_config_dir().map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Config;
    use serial_test::serial;

    /// Run closure with `XDG_CONFIG_HOME` temporarily pointed at `dir`.
    fn with_xdg_config<F: FnOnce()>(dir: &str, f: F) {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        std::env::set_var("XDG_CONFIG_HOME", dir);
        f();
        match original {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    #[test]
    fn template_values_match_config_default() {
        let from_template: Config =
            toml::from_str(DEFAULT_CONFIG_TEMPLATE).expect("template should parse");
        assert_eq!(from_template, Config::default());
    }

    #[test]
    fn template_contains_all_section_headers() {
        for header in ["[grid]", "[performance]", "[widgets]", "[storage]", "[logging]"] {
            assert!(
                DEFAULT_CONFIG_TEMPLATE.contains(header),
                "missing {header} section"
            );
        }
    }

    #[test]
    #[serial]
    fn create_default_config_writes_then_refuses_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dir_str = dir.path().to_string_lossy().to_string();
        with_xdg_config(&dir_str, || {
            let path = create_default_config(false).expect("first write");
            assert!(path.exists());

            let err = create_default_config(false).expect_err("second write refused");
            assert!(matches!(err, ConfigError::AlreadyExists { .. }));
        });
    }

    #[test]
    #[serial]
    fn create_default_config_force_backs_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dir_str = dir.path().to_string_lossy().to_string();
        with_xdg_config(&dir_str, || {
            let path = create_default_config(false).expect("first write");
            fs::write(&path, "# edited").expect("edit");

            create_default_config(true).expect("forced write");
            let backup = path.with_extension("toml.backup");
            assert_eq!(fs::read_to_string(backup).expect("backup"), "# edited");
            assert_eq!(
                fs::read_to_string(&path).expect("config"),
                DEFAULT_CONFIG_TEMPLATE
            );
        });
    }
}
