//! Note widget: renders a block of static text.
//!
//! Data: `{"text": "..."}`.

use super::{ContainerInfo, Widget, WidgetProps};
use crate::error::WidgetError;
use ratatui::text::Text;
use serde_json::Value;

/// Registry type identifier.
pub const TYPE: &str = "note";

/// Plain text note.
#[derive(Debug, Default)]
pub struct NoteWidget {
    mounted_width: f32,
}

impl NoteWidget {
    /// Constructor registered with the widget registry.
    ///
    /// Rejects non-object data so a corrupted payload surfaces as an inline
    /// error instead of an empty note.
    pub fn create(_id: &str, data: &Value) -> Result<Box<dyn Widget>, WidgetError> {
        match data {
            Value::Null | Value::Object(_) => Ok(Box::new(Self::default())),
            other => Err(WidgetError::Construct(format!(
                "note data must be an object, got {other}"
            ))),
        }
    }
}

impl Widget for NoteWidget {
    fn mount(&mut self, container: &ContainerInfo) -> Result<(), WidgetError> {
        self.mounted_width = container.rect.width;
        Ok(())
    }

    fn render(&mut self, props: &WidgetProps) -> Result<Text<'static>, WidgetError> {
        let text = props
            .data
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("(empty note)");
        Ok(Text::raw(text.to_string()))
    }

    fn on_resize_end(&mut self, width: f32, _height: f32) {
        self.mounted_width = width;
    }
}
