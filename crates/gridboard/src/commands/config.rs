//! Configuration file commands.

use gridboard::config::{default, xdg, ConfigLoader};
use std::path::Path;
use std::process::ExitCode;

/// Writes the commented default configuration file.
pub(crate) fn run_config_init(force: bool) -> ExitCode {
    match default::create_default_config(force) {
        Ok(path) => {
            println!("Created configuration at {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints where the configuration file is looked up.
pub(crate) fn run_config_path() -> ExitCode {
    println!("{}", xdg::config_path().display());
    ExitCode::SUCCESS
}

/// Parses and validates the configuration, then prints it.
pub(crate) fn run_config_validate(path: Option<&Path>) -> ExitCode {
    match ConfigLoader::load(path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("{config:#?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}
