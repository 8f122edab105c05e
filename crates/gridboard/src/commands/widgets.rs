//! Widget catalogue listing.

use gridboard::registry::WidgetRegistry;
use gridboard::widgets::register_builtin;
use std::process::ExitCode;

/// Prints every registered widget type grouped by category.
pub(crate) fn run_widgets_command() -> ExitCode {
    let registry = WidgetRegistry::new();
    register_builtin(&registry);
    print!("{}", format_catalogue(&registry));
    ExitCode::SUCCESS
}

pub(crate) fn format_catalogue(registry: &WidgetRegistry) -> String {
    let mut out = String::new();
    for (category, mut metas) in registry.by_category() {
        metas.sort_by_key(|m| (m.priority, m.widget_type.clone()));
        out.push_str(&format!("{category}:\n"));
        for meta in metas {
            out.push_str(&format!(
                "  {:<8} {:<8} {}x{}  priority {}\n",
                meta.widget_type,
                meta.name,
                meta.default_size.width,
                meta.default_size.height,
                meta.priority
            ));
        }
    }
    out
}
