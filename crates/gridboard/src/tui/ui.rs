//! Frame rendering for the terminal host.

use crate::surface::ContentState;
use crate::tui::surface::{TerminalContainer, TerminalSurface};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

const KEY_HINTS: &str = "q quit  a note  c clock  d delete  r retry  tab select  drag title to move";

/// Draws every container and the status bar.
///
/// Dragging containers are drawn last so they stay on top.
pub fn render(frame: &mut Frame, surface: &TerminalSurface, selected: Option<&str>, status: &str) {
    let area = frame.area();
    let mut containers: Vec<(&str, &TerminalContainer)> = surface.containers().collect();
    containers.sort_by_key(|(_, c)| c.dragging);

    for (id, container) in containers {
        let Some(cells) = surface.to_cells(container.visual_rect()) else {
            continue;
        };
        let cells = cells.intersection(area);
        if cells.is_empty() {
            continue;
        }
        render_container(frame, cells, container, selected == Some(id));
    }

    let bar = Rect::new(0, area.height.saturating_sub(1), area.width, 1.min(area.height));
    let text = if status.is_empty() { KEY_HINTS } else { status };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(Color::Black).bg(Color::Gray),
        ))),
        bar,
    );
}

fn render_container(frame: &mut Frame, cells: Rect, container: &TerminalContainer, selected: bool) {
    let border = if container.dragging {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(
            format!(" {} ", container.title),
            Style::default().add_modifier(Modifier::BOLD),
        ));

    let body = match &container.content {
        ContentState::Loading => Text::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::DarkGray),
        )),
        ContentState::Ready(text) => text.clone(),
        ContentState::Error(message) => Text::from(Span::styled(
            format!("! {message}"),
            Style::default().fg(Color::Red),
        )),
    };

    frame.render_widget(Clear, cells);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        cells,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::PixelRect;
    use crate::surface::Surface;
    use crate::tui::test_utils::{buffer_to_string, render_to_buffer};

    fn surface() -> TerminalSurface {
        let mut s = TerminalSurface::new(40, 11);
        s.create_container("note-1", "Note");
        s.set_position("note-1", PixelRect::new(0.0, 0.0, 200.0, 100.0));
        s.set_content("note-1", ContentState::Ready(Text::raw("hello")));
        s
    }

    #[test]
    fn test_renders_title_and_content() {
        let s = surface();
        let buffer = render_to_buffer(40, 11, |f| render(f, &s, None, ""));
        let out = buffer_to_string(&buffer);
        assert!(out.contains(" Note "), "{out}");
        assert!(out.contains("hello"), "{out}");
        assert!(out.contains("q quit"), "{out}");
    }

    #[test]
    fn test_renders_error_inline() {
        let mut s = surface();
        s.set_content("note-1", ContentState::Error("bad data".into()));
        let buffer = render_to_buffer(40, 11, |f| render(f, &s, None, "saved"));
        let out = buffer_to_string(&buffer);
        assert!(out.contains("! bad data"), "{out}");
        assert!(out.contains("saved"), "{out}");
    }

    #[test]
    fn test_skips_containers_outside_viewport() {
        let mut s = surface();
        s.set_position("note-1", PixelRect::new(0.0, 2000.0, 200.0, 100.0));
        let buffer = render_to_buffer(40, 11, |f| render(f, &s, None, ""));
        assert!(!buffer_to_string(&buffer).contains("Note"));
    }
}
