//! Clock widget: renders the local time.
//!
//! Data: `{"format": "<strftime>"}`, default `"%H:%M:%S"`.

use super::{ContainerInfo, Widget, WidgetProps};
use crate::error::WidgetError;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use serde_json::Value;
use std::fmt::Write;

/// Registry type identifier.
pub const TYPE: &str = "clock";

const DEFAULT_FORMAT: &str = "%H:%M:%S";

/// Displays the current local time, refreshed on every update.
#[derive(Debug)]
pub struct ClockWidget {
    format: String,
}

impl ClockWidget {
    /// Constructor registered with the widget registry.
    pub fn create(_id: &str, data: &Value) -> Result<Box<dyn Widget>, WidgetError> {
        Ok(Box::new(Self::from_data(data)))
    }

    fn from_data(data: &Value) -> Self {
        let format = data
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_FORMAT)
            .to_string();
        Self { format }
    }
}

impl Widget for ClockWidget {
    fn mount(&mut self, _container: &ContainerInfo) -> Result<(), WidgetError> {
        Ok(())
    }

    fn render(&mut self, props: &WidgetProps) -> Result<Text<'static>, WidgetError> {
        if let Some(fmt) = props.data.get("format").and_then(Value::as_str) {
            self.format = fmt.to_string();
        }
        let mut now = String::new();
        write!(now, "{}", chrono::Local::now().format(&self.format))
            .map_err(|_| WidgetError::Render(format!("invalid time format '{}'", self.format)))?;
        Ok(Text::from(Line::from(Span::styled(
            now,
            Style::default().add_modifier(Modifier::BOLD),
        ))))
    }

    // Time moves even when data does not.
    fn should_update(&self, _prev: Option<&WidgetProps>, _next: &WidgetProps) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_with_custom_format() {
        let mut w = ClockWidget::from_data(&json!({"format": "%Y"}));
        let text = w.render(&WidgetProps::default()).expect("render");
        let year = chrono::Local::now().format("%Y").to_string();
        assert_eq!(text.lines[0].to_string(), year);
    }

    #[test]
    fn invalid_format_is_a_render_error() {
        let mut w = ClockWidget::from_data(&json!({"format": "%Q%"}));
        assert!(matches!(
            w.render(&WidgetProps::default()),
            Err(WidgetError::Render(_))
        ));
    }

    #[test]
    fn always_updates() {
        let w = ClockWidget::from_data(&Value::Null);
        let props = WidgetProps::default();
        assert!(w.should_update(Some(&props), &props));
        assert_eq!(w.format, DEFAULT_FORMAT);
    }
}
