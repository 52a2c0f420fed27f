// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cadence - conversational outreach review and scheduled-delivery engine.
//!
//! This is the binary entry point for the Cadence daemon.

use clap::{Parser, Subcommand};

mod serve;
mod status;

/// Cadence - conversational outreach review and scheduled-delivery engine.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Cadence engine.
    Serve,
    /// Show queue depths and contact counts from the store.
    Status {
        /// Output structured JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cadence_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            for error in &errors {
                eprintln!("cadence: config error: {error}");
            }
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("cadence: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("cadence: {e}");
        std::process::exit(1);
    }
}
