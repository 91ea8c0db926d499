//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and decode encoded string references
#[derive(Debug, Parser)]
#[command(name = "encstr", version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a reference into its table index and cipher key
    Parse(ReferenceArgs),

    /// Decode a reference against string tables on disk
    Decode {
        #[command(flatten)]
        reference: ReferenceArgs,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the records of a language's string table
    Dump {
        #[command(flatten)]
        source: SourceArgs,

        /// First index to list
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Maximum number of records to list
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

/// A reference given as tokens or raw bytes
#[derive(Debug, Args)]
pub struct ReferenceArgs {
    /// Tokens as hex words, e.g. `8101 47D8`
    #[arg(value_parser = parse_token, required_unless_present = "bytes")]
    pub tokens: Vec<u16>,

    /// Raw little-endian reference bytes as one hex string
    #[arg(long, conflicts_with = "tokens")]
    pub bytes: Option<String>,
}

impl ReferenceArgs {
    /// Raw reference bytes
    pub fn raw(&self) -> anyhow::Result<Vec<u8>> {
        match &self.bytes {
            Some(bytes) => Ok(hex::decode(bytes.trim_start_matches("0x"))?),
            None => Ok(self.tokens.iter().flat_map(|t| t.to_le_bytes()).collect()),
        }
    }
}

/// Where string tables come from
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Directory holding the resource files
    #[arg(long, env = "ENCSTR_ROOT")]
    pub root: PathBuf,

    /// JSON layout manifest
    #[arg(long, env = "ENCSTR_LAYOUT")]
    pub layout: PathBuf,

    /// Language to use instead of the manifest's current language
    #[arg(long)]
    pub language: Option<u32>,

    /// JSON decoder configuration
    #[arg(long, env = "ENCSTR_CONFIG")]
    pub config: Option<PathBuf>,
}

fn parse_token(value: &str) -> Result<u16, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid token '{value}': {e}"))
}
