// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - a self-hosted coordination hub for cooperating agents.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier_config::{ConfigError, CourierConfig};

/// Courier - reliable message delivery for cooperating agents.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the store and run the expiry sweeper until interrupted.
    Serve,
    /// Delete expired messages once and exit.
    Purge,
    /// Show delivery counters.
    Status {
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Validate and print the effective configuration.
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<CourierConfig, Vec<ConfigError>> {
    match path {
        Some(path) if !path.exists() => Err(vec![ConfigError::Other(format!(
            "config file {} does not exist",
            path.display()
        ))]),
        Some(path) => courier_config::load_and_validate_path(path),
        None => courier_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Purge) => status::run_purge(&config).await.map(|_| ()),
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                println!("{rendered}");
                Ok(())
            }
            Err(e) => Err(courier_core::CourierError::Config(e.to_string())),
        },
        None => {
            println!("courier: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("courier: {e}");
        std::process::exit(1);
    }
}
