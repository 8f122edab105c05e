use super::*;
use crate::drag::{HitTarget, PointerKind};
use crate::surface::Surface;

impl App {
    /// Applies one action from the key or mouse mapping.
    pub fn apply_action(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Quit => self.should_quit = true,
            Action::Add(widget_type) => {
                match self.layout.add_widget(WidgetConfig::new(widget_type)) {
                    Ok(id) => {
                        self.set_status(format!("Added {id}"));
                        self.selected = Some(id);
                    }
                    Err(e) => {
                        tracing::warn!("Add {} failed: {}", widget_type, e);
                        self.set_status(format!("Add failed: {e}"));
                    }
                }
            }
            Action::RemoveSelected => self.remove_selected(),
            Action::RetrySelected => self.retry_selected(),
            Action::SelectNext => self.select_next(),
            Action::SelectPrevious => self.select_previous(),
            Action::Deselect => self.selected = None,
            Action::Scroll(rows) => {
                let changed = self.surface.borrow_mut().scroll_rows(rows);
                if changed {
                    let viewport = self.surface.borrow().viewport();
                    self.layout.handle_viewport_change(viewport);
                }
            }
            Action::Pointer(event) => {
                if event.kind == PointerKind::Down {
                    if let HitTarget::Handle(id) | HitTarget::Body(id) = &event.target {
                        self.selected = Some(id.clone());
                    }
                }
                self.layout.handle_pointer(&event);
            }
        }
    }

    /// Widget ids in reading order: row, then column.
    pub fn reading_order(&self) -> Vec<String> {
        let mut widgets = self.state.all_widget_states();
        widgets.sort_by(|a, b| (a.y, a.x, &a.id).cmp(&(b.y, b.x, &b.id)));
        widgets.into_iter().map(|w| w.id).collect()
    }

    /// Selects the widget after the current one, wrapping around.
    pub fn select_next(&mut self) {
        let order = self.reading_order();
        if order.is_empty() {
            self.selected = None;
            return;
        }
        let next = match self.selected_index(&order) {
            Some(i) => (i + 1) % order.len(),
            None => 0,
        };
        self.selected = Some(order[next].clone());
    }

    /// Selects the widget before the current one, wrapping around.
    pub fn select_previous(&mut self) {
        let order = self.reading_order();
        if order.is_empty() {
            self.selected = None;
            return;
        }
        let previous = match self.selected_index(&order) {
            Some(0) | None => order.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(order[previous].clone());
    }

    fn selected_index(&self, order: &[String]) -> Option<usize> {
        let selected = self.selected.as_deref()?;
        order.iter().position(|id| id == selected)
    }

    fn retry_selected(&mut self) {
        let Some(id) = self.selected.clone() else {
            self.set_status("Nothing selected");
            return;
        };
        if self.layout.retry(&id) {
            self.set_status(format!("Retrying {id}"));
        } else {
            self.set_status(format!("{id} has not failed"));
        }
    }

    fn remove_selected(&mut self) {
        let Some(id) = self.selected.take() else {
            self.set_status("Nothing selected");
            return;
        };
        match self.layout.remove_widget(&id) {
            Ok(()) => self.set_status(format!("Removed {id}")),
            Err(e) => {
                tracing::warn!("Remove {} failed: {}", id, e);
                self.set_status(format!("Remove failed: {e}"));
            }
        }
    }
}
