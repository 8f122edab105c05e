//! Formatting of command output.

use crate::commands::{format_catalogue, format_layout};
use gridboard::registry::WidgetRegistry;
use gridboard::state::{PersistedLayout, PersistedWidget};
use gridboard::widgets::register_builtin;

fn widget(widget_type: &str, x: u32, y: u32) -> PersistedWidget {
    PersistedWidget {
        widget_type: widget_type.into(),
        x,
        y,
        width: 3,
        height: 2,
    }
}

#[test]
fn test_layout_table_is_in_reading_order() {
    let mut layout = PersistedLayout::empty(2);
    layout.widgets.insert("note-1".into(), widget("note", 0, 4));
    layout.widgets.insert("clock-1".into(), widget("clock", 5, 0));
    layout.widgets.insert("clock-2".into(), widget("clock", 0, 0));

    let out = format_layout(&layout);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "3 widgets (schema v2)");
    assert!(lines[1].starts_with("ID"));
    assert!(lines[2].starts_with("clock-2"));
    assert!(lines[3].starts_with("clock-1"));
    assert!(lines[4].starts_with("note-1"));
}

#[test]
fn test_empty_layout_has_no_header() {
    let out = format_layout(&PersistedLayout::empty(2));
    assert_eq!(out, "0 widgets (schema v2)\n");
}

#[test]
fn test_catalogue_groups_by_category() {
    let registry = WidgetRegistry::new();
    register_builtin(&registry);
    let out = format_catalogue(&registry);
    assert!(out.contains("text:\n"), "{out}");
    assert!(out.contains("time:\n"), "{out}");
    assert!(out.contains("clock"), "{out}");
    assert!(out.contains("4x3"), "{out}");
}
