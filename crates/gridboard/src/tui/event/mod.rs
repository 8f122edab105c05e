//! Event handling for the terminal host.
//!
//! Wraps crossterm events, adds a tick variant that drives the scheduler,
//! and maps keys and mouse input onto dashboard actions.


use crate::drag::{PointerEvent, PointerKind};
use crate::tui::surface::TerminalSurface;
use crate::widgets::{clock, note};
use crossterm::event::{
    Event as CrosstermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Rows scrolled per mouse wheel step.
pub const SCROLL_STEP: i32 = 3;

/// Application-level event variants.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// A mouse event occurred.
    Mouse(MouseEvent),
    /// Terminal was resized.
    Resize(u16, u16),
    /// Periodic tick.
    Tick,
}

/// Merges terminal input events with periodic ticks.
pub struct EventHandler {
    tick: Interval,
}

impl EventHandler {
    /// Creates a handler ticking every `tick_rate`.
    pub fn new(tick_rate: Duration) -> Self {
        let mut tick = interval(tick_rate);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { tick }
    }

    /// Waits for the next event, returning either a terminal event or a tick.
    pub async fn next(&mut self, reader: &mut EventStream) -> std::io::Result<Event> {
        loop {
            tokio::select! {
                maybe_event = reader.next() => {
                    match maybe_event {
                        Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                            return Ok(Event::Key(key));
                        }
                        Some(Ok(CrosstermEvent::Mouse(mouse))) => return Ok(Event::Mouse(mouse)),
                        Some(Ok(CrosstermEvent::Resize(w, h))) => return Ok(Event::Resize(w, h)),
                        Some(Err(e)) => return Err(e),
                        // Ignore key releases, focus and paste events
                        Some(Ok(_)) => continue,
                        None => return Err(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "event stream ended",
                        )),
                    }
                }
                _ = self.tick.tick() => {
                    return Ok(Event::Tick);
                }
            }
        }
    }
}

/// Action produced by a key or mouse event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// No action to take.
    None,
    /// Quit the application.
    Quit,
    /// Add a widget of the given type at the first free spot.
    Add(&'static str),
    /// Remove the selected widget.
    RemoveSelected,
    /// Retry loading the selected widget after a failure.
    RetrySelected,
    /// Select the next widget in reading order.
    SelectNext,
    /// Select the previous widget in reading order.
    SelectPrevious,
    /// Clear the selection.
    Deselect,
    /// Scroll by this many terminal rows.
    Scroll(i32),
    /// Forward a pointer event to the layout.
    Pointer(PointerEvent),
}

/// Maps a key press to an action.
pub fn handle_key_event(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('c') => Action::Add(clock::TYPE),
        KeyCode::Char('a') | KeyCode::Char('n') => Action::Add(note::TYPE),
        KeyCode::Char('d') | KeyCode::Delete => Action::RemoveSelected,
        KeyCode::Char('r') => Action::RetrySelected,
        KeyCode::Tab | KeyCode::Char('j') => Action::SelectNext,
        KeyCode::BackTab | KeyCode::Char('k') => Action::SelectPrevious,
        KeyCode::Esc => Action::Deselect,
        KeyCode::PageDown => Action::Scroll(SCROLL_STEP * 4),
        KeyCode::PageUp => Action::Scroll(-SCROLL_STEP * 4),
        KeyCode::Down => Action::Scroll(1),
        KeyCode::Up => Action::Scroll(-1),
        _ => Action::None,
    }
}

/// Maps a mouse event to an action, hit-testing against `surface`.
///
/// Left button press, drag and release become pointer down, move and up.
/// The wheel scrolls.
pub fn handle_mouse_event(mouse: MouseEvent, surface: &TerminalSurface) -> Action {
    let kind = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
        MouseEventKind::Drag(MouseButton::Left) => PointerKind::Move,
        MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
        MouseEventKind::ScrollDown => return Action::Scroll(SCROLL_STEP),
        MouseEventKind::ScrollUp => return Action::Scroll(-SCROLL_STEP),
        _ => return Action::None,
    };
    let (x, y) = surface.to_pixels(mouse.column, mouse.row);
    let target = surface.hit_test(mouse.column, mouse.row);
    Action::Pointer(PointerEvent::mouse(kind, x, y, target))
}
