// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numis - authentication request lifecycle and expert session coordinator.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use numis_config::{ConfigError, NumisConfig};

/// Numis - expert authentication sessions.
#[derive(Parser, Debug)]
#[command(name = "numis", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the coordinator and its HTTP/WebSocket gateway.
    Serve,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML (secrets redacted).
    Show,
    /// Validate configuration and exit.
    Validate,
}

fn load(path: Option<&PathBuf>) -> Result<NumisConfig, Vec<ConfigError>> {
    match path {
        Some(path) => numis_config::load_and_validate_path(path),
        None => numis_config::load_and_validate(),
    }
}

/// Effective configuration rendered for display.
fn render_config(config: &NumisConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.gateway.bearer_token.is_some() {
        shown.gateway.bearer_token = Some("[redacted]".to_string());
    }
    toml::to_string_pretty(&shown)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            numis_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("numis: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config {
            action: ConfigAction::Show,
        }) => match render_config(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("numis: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
        Some(Commands::Config {
            action: ConfigAction::Validate,
        }) => {
            println!("numis: configuration is valid");
        }
        None => {
            println!("numis: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_show_redacts_bearer_token() {
        let mut config = NumisConfig::default();
        config.gateway.bearer_token = Some("hunter2".to_string());
        let rendered = render_config(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    #[serial_test::serial]
    fn explicit_config_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numis.toml");
        std::fs::write(&path, "[session]\nduration_secs = 120\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.session.duration_secs, 120);
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numis.toml");
        std::fs::write(&path, "[session]\nduration_secs = 120\n").unwrap();

        // SAFETY: serialized with every other test that reads the environment.
        unsafe { std::env::set_var("NUMIS_SESSION_DURATION_SECS", "90") };
        let loaded = load(Some(&path));
        unsafe { std::env::remove_var("NUMIS_SESSION_DURATION_SECS") };

        assert_eq!(loaded.unwrap().session.duration_secs, 90);
    }
}
