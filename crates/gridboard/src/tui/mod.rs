//! Terminal host for the dashboard engine.
//!
//! Renders containers as bordered ratatui blocks, maps crossterm mouse
//! input onto pointer events and drives the engine's scheduler from the
//! event loop tick.

pub mod app;
pub mod event;
pub mod surface;
pub mod ui;

mod test_utils;
