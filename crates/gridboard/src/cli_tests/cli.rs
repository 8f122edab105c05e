//! CLI argument parsing tests.

use crate::{Cli, Commands, ConfigAction, LayoutAction};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

#[test]
fn verify_cli() {
    Cli::command().debug_assert();
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["gridboard"]).is_err());
}

#[test]
fn test_tui_without_config_uses_default_path() {
    let cli = Cli::try_parse_from(["gridboard", "tui"]).unwrap();
    assert!(matches!(cli.command, Commands::Tui));
    assert!(cli.config.is_none());
}

#[test]
fn test_config_flag_is_global() {
    let cli = Cli::try_parse_from(["gridboard", "layout", "show", "--config", "/tmp/g.toml"])
        .unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.toml")));
    assert!(matches!(
        cli.command,
        Commands::Layout {
            action: LayoutAction::Show { json: false }
        }
    ));
}

#[test]
fn test_layout_show_json_flag() {
    let cli = Cli::try_parse_from(["gridboard", "layout", "show", "--json"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Layout {
            action: LayoutAction::Show { json: true }
        }
    ));
}

#[test]
fn test_layout_without_action_fails() {
    assert!(Cli::try_parse_from(["gridboard", "layout"]).is_err());
}

#[test]
fn test_layout_reset_parses() {
    let cli = Cli::try_parse_from(["gridboard", "layout", "reset"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Layout {
            action: LayoutAction::Reset
        }
    ));
}

#[test]
fn test_config_init_force_flag() {
    let cli = Cli::try_parse_from(["gridboard", "config", "init", "--force"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Init { force: true }
        }
    ));

    let cli = Cli::try_parse_from(["gridboard", "config", "init"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Init { force: false }
        }
    ));
}

#[test]
fn test_config_path_and_validate_parse() {
    for (arg, expect_path) in [("path", true), ("validate", false)] {
        let cli = Cli::try_parse_from(["gridboard", "config", arg]).unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Path,
            } => assert!(expect_path),
            Commands::Config {
                action: ConfigAction::Validate,
            } => assert!(!expect_path),
            _ => panic!("unexpected command variant"),
        }
    }
}

#[test]
fn test_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["gridboard", "daemon"]).is_err());
}
