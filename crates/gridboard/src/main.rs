//! gridboard - CLI entry point
//!
//! Launches the terminal dashboard and provides one-shot commands for the
//! saved layout, the widget catalogue and the configuration file.

mod commands;

#[cfg(test)]
mod cli_tests;

use clap::{Parser, Subcommand};
use gridboard::logging::{self, LogTarget};
use std::path::PathBuf;
use std::process::ExitCode;

/// Draggable, lazily-loaded dashboard in the terminal
#[derive(Parser)]
#[command(name = "gridboard")]
#[command(version, about = "Draggable, lazily-loaded dashboard in the terminal")]
struct Cli {
    /// Configuration file (defaults to the XDG config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the gridboard CLI
#[derive(Subcommand)]
enum Commands {
    /// Launch the terminal dashboard
    Tui,

    /// Inspect or reset the saved layout
    Layout {
        #[command(subcommand)]
        action: LayoutAction,
    },

    /// List the available widget types by category
    Widgets,

    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `layout` subcommand.
#[derive(Subcommand)]
enum LayoutAction {
    /// Print the saved layout
    Show {
        /// Print the stored JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete the saved layout
    Reset,
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Tui => commands::run_tui(config_path),
        Commands::Layout { action } => {
            logging::init(LogTarget::Stderr);
            match action {
                LayoutAction::Show { json } => commands::run_layout_show(config_path, json),
                LayoutAction::Reset => commands::run_layout_reset(config_path),
            }
        }
        Commands::Widgets => commands::run_widgets_command(),
        Commands::Config { action } => {
            logging::init(LogTarget::Stderr);
            match action {
                ConfigAction::Init { force } => commands::run_config_init(force),
                ConfigAction::Path => commands::run_config_path(),
                ConfigAction::Validate => commands::run_config_validate(config_path),
            }
        }
    }
}
