//! `encstr` command-line tool.
//!
//! Thin wrapper around the encstr crates that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Runs the selected command

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Parse(reference) => commands::parse(reference, cli.json),
        Command::Decode { reference, source } => commands::decode(reference, source, cli.json),
        Command::Dump {
            source,
            start,
            limit,
        } => commands::dump(source, *start, *limit, cli.json),
    }
}
