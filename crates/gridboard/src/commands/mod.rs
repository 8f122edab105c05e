//! Command implementations for the gridboard CLI.
//!
//! This module contains all command handler functions, organized by domain:
//! - `config` - Configuration file management (init, path, validate)
//! - `layout` - Saved layout inspection (show, reset)
//! - `tui` - Terminal dashboard launch
//! - `widgets` - Widget catalogue listing

pub(crate) mod config;
pub(crate) mod layout;
pub(crate) mod tui;
pub(crate) mod widgets;

pub(crate) use config::*;
pub(crate) use layout::*;
pub(crate) use tui::*;
pub(crate) use widgets::*;

use gridboard::config::{Config, ConfigLoader};
use std::path::Path;

/// Loads the configuration, printing the error when it cannot be used.
pub(crate) fn load_config(path: Option<&Path>) -> Option<Config> {
    match ConfigLoader::load(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Config error: {e}");
            None
        }
    }
}
