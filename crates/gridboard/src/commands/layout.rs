//! Saved layout commands.
//!
//! These read and delete the stored layout directly through the storage
//! backend; no layout engine is started.

use super::load_config;
use gridboard::state::{FileStorage, PersistedLayout, Storage};
use std::path::Path;
use std::process::ExitCode;

/// Prints the saved layout as a table, or as stored JSON with `json`.
pub(crate) fn run_layout_show(config_path: Option<&Path>, json: bool) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };
    let storage = FileStorage::from_config(&config.storage);
    let key = &config.storage.layout_key;

    let text = match storage.load(key) {
        Ok(Some(text)) => text,
        Ok(None) => {
            println!("No saved layout at {}", storage.path_for(key).display());
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Storage error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let layout = match PersistedLayout::from_json(&text) {
        Ok(layout) => layout,
        Err(e) => {
            if let Ok(found) = PersistedLayout::read_version(&text) {
                if found != config.storage.schema_version {
                    println!(
                        "Saved layout has schema v{}, expected v{}; it will be ignored on startup",
                        found, config.storage.schema_version
                    );
                    return ExitCode::SUCCESS;
                }
            }
            eprintln!("Saved layout is unreadable: {e}");
            return ExitCode::FAILURE;
        }
    };

    if json {
        match layout.to_pretty_json() {
            Ok(pretty) => println!("{pretty}"),
            Err(e) => {
                eprintln!("Error: failed to format layout: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if layout.version != config.storage.schema_version {
        println!(
            "Warning: layout has schema v{}, expected v{}; it will be ignored on startup",
            layout.version, config.storage.schema_version
        );
    }
    print!("{}", format_layout(&layout));
    ExitCode::SUCCESS
}

/// Deletes the saved layout.
pub(crate) fn run_layout_reset(config_path: Option<&Path>) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };
    let storage = FileStorage::from_config(&config.storage);
    let key = &config.storage.layout_key;
    match storage.remove(key) {
        Ok(true) => {
            println!("Removed saved layout at {}", storage.path_for(key).display());
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("No saved layout to remove");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Storage error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Table of widgets in reading order: row, then column.
pub(crate) fn format_layout(layout: &PersistedLayout) -> String {
    let mut widgets: Vec<_> = layout.widgets.iter().collect();
    widgets.sort_by_key(|(id, w)| (w.y, w.x, id.as_str()));

    let mut out = format!("{} widgets (schema v{})\n", widgets.len(), layout.version);
    if widgets.is_empty() {
        return out;
    }
    out.push_str(&format!(
        "{:<16} {:<10} {:>4} {:>4} {:>4} {:>4}\n",
        "ID", "TYPE", "X", "Y", "W", "H"
    ));
    for (id, w) in widgets {
        out.push_str(&format!(
            "{:<16} {:<10} {:>4} {:>4} {:>4} {:>4}\n",
            id, w.widget_type, w.x, w.y, w.width, w.height
        ));
    }
    out
}
