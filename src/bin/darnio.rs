// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Darnio CLI
//!
//! Command-line tool for locating and reading SuperDARN record files.
//!
//! ## Usage
//!
//! ```sh
//! # Stage the fitacf data for a window and print where it landed
//! darnio resolve --start 2012-11-01T00:00:00Z --end 2012-11-01T04:00:00Z --station fhe
//!
//! # Print beam 7 records as JSON
//! darnio read --start 20121101.0000 --station fhe --beam 7 --json
//!
//! # Summarize each scan
//! darnio scan --start 20121101.0000 --station fhe.a
//!
//! # Summarize a file
//! darnio info 20121101.0001.00.fhe.fitacf
//! ```

mod cmd;
mod common;

use std::process;

use clap::{Parser, Subcommand};
use cmd::{IndexCmd, InfoCmd, ReadCmd, ResolveCmd, ScanCmd};
use common::Result;

/// Darnio - SuperDARN record file toolkit
///
/// Finds the files holding a time window of radar soundings, stages them
/// locally and reads records or whole scans out of them.
#[derive(Parser, Clone)]
#[command(name = "darnio")]
#[command(about = "SuperDARN record acquisition and reading toolkit", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Locate and stage data, print the staged file
    Resolve(ResolveCmd),

    /// Print records in the requested window
    Read(ReadCmd),

    /// Print one summary line per scan
    Scan(ScanCmd),

    /// Build the time index and print its statistics
    Index(IndexCmd),

    /// Summarize a record file
    Info(InfoCmd),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("darnio=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "darnio=info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Resolve(cmd) => cmd.run(),
        Commands::Read(cmd) => cmd.run(),
        Commands::Scan(cmd) => cmd.run(),
        Commands::Index(cmd) => cmd.run(),
        Commands::Info(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
