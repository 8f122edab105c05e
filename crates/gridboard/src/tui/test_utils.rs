//! Shared test utilities for rendering with ratatui's TestBackend.

#![cfg(test)]

use ratatui::{backend::TestBackend, buffer::Buffer, Frame, Terminal};

/// Creates a Terminal with TestBackend at the specified dimensions.
pub fn test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).expect("failed to create test terminal")
}

/// Draws one frame with `draw` and returns the resulting buffer.
pub fn render_to_buffer<F>(width: u16, height: u16, draw: F) -> Buffer
where
    F: FnOnce(&mut Frame),
{
    let mut terminal = test_terminal(width, height);
    terminal.draw(draw).expect("draw failed");
    terminal.backend().buffer().clone()
}

/// Extracts all text from a specific row in the buffer as a single String.
pub fn row_text(buffer: &Buffer, row: u16) -> String {
    let area = buffer.area();
    if row >= area.height {
        return String::new();
    }
    (0..area.width)
        .map(|col| {
            buffer
                .cell((col, row))
                .map(|cell| cell.symbol())
                .unwrap_or(" ")
        })
        .collect()
}

/// Every row of the buffer joined by newlines.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    (0..buffer.area().height)
        .map(|row| row_text(buffer, row))
        .collect::<Vec<_>>()
        .join("\n")
}
