//! Terminal dashboard launch.

use super::load_config;
use gridboard::logging::{self, LogTarget};
use gridboard::state::FileStorage;
use gridboard::tui::app::App;
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

/// Fallback terminal size when the real one cannot be queried.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Runs the dashboard until the user quits.
///
/// Logs go to the configured file, or nowhere: the dashboard owns the
/// screen.
pub(crate) fn run_tui(config_path: Option<&Path>) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };
    match config.logging.file.as_deref() {
        Some(path) => logging::init(LogTarget::File(path)),
        None => logging::init(LogTarget::Discard),
    }

    let storage = Rc::new(FileStorage::from_config(&config.storage));
    let (columns, rows) = crossterm::terminal::size().unwrap_or(FALLBACK_SIZE);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("TUI error: failed to create runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = rt.block_on(async {
        let mut app = App::new(config, storage, columns, rows);
        app.start();
        app.run().await
    });
    if let Err(e) = result {
        eprintln!("TUI error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
