//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// bitrise-cache - Key-based build cache for CI pipelines
///
/// Restores a cache entry before the build and saves one after it. Run
/// once with `restore` and once with `save`; without an argument the phase
/// is inferred from the step state left by restore.
#[derive(Parser, Debug)]
#[command(name = "bitrise-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Phase to run: restore or save
    pub phase: Option<String>,

    /// Enable debug logging (same as the `verbose` input)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "BITRISE_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding cache archives
    #[arg(long, env = "BITRISE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep step state in this JSON file instead of the CI host
    #[arg(long, env = "BITRISE_CACHE_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}
