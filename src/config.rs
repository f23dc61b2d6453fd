//! Configuration types for frio-bench
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Backend selection

use crate::error::ConfigError;
use crate::filter::FilterSpec;
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum reasonable reader thread count
pub const MAX_THREADS: usize = 512;

/// Default reader thread count
pub const DEFAULT_THREADS: usize = 1;

/// Default wall-clock budget in seconds
pub const DEFAULT_DURATION_SECS: u64 = 10;

/// Filesystem read-throughput benchmark
#[derive(Parser, Debug, Clone)]
#[command(
    name = "frio-bench",
    version,
    about = "Filesystem read-throughput benchmark",
    long_about = "Scans a local directory tree deterministically, then reads every file with \
                  either the streaming native reader or the in-process worker pool until the \
                  file list is exhausted or the time budget runs out.\n\n\
                  Prints one machine-readable line:\n  \
                  RESULT|<backend>|<threads>|<shuffled>|<mb_per_sec>|<files_per_sec>",
    after_help = "EXAMPLES:\n    \
        frio-bench run /data\n    \
        frio-bench run /data --backend native --threads 8 --duration 30\n    \
        frio-bench run /data --shuffle --chunk-size 4096 --blacklist '*.png' --blacklist .git\n    \
        frio-bench scan /data --whitelist '*.dcm'"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode - suppress header, progress bar and summary
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Subcommands
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan a directory and measure read throughput
    Run(RunArgs),

    /// Print the scan order without reading anything
    Scan(ScanArgs),
}

/// Arguments for `run`
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Root directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Read backend
    #[arg(long, value_enum, default_value_t = BackendKind::InProcess)]
    pub backend: BackendKind,

    /// Number of reader threads
    #[arg(long, default_value_t = DEFAULT_THREADS, value_name = "NUM")]
    pub threads: usize,

    /// Time budget in seconds
    #[arg(long, default_value_t = DEFAULT_DURATION_SECS, value_name = "SECONDS")]
    pub duration: u64,

    /// Randomize file order
    #[arg(long)]
    pub shuffle: bool,

    /// Bytes to read per file (0 reads whole files)
    #[arg(long, default_value = "0", value_name = "BYTES")]
    pub chunk_size: u64,

    /// Skip entries whose name matches this glob (can be repeated)
    #[arg(long = "blacklist", value_name = "GLOB", action = ArgAction::Append)]
    pub blacklist: Vec<String>,

    /// Also print the result as a JSON object
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `scan`
#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// Root directory to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Randomize file order
    #[arg(long)]
    pub shuffle: bool,

    /// Skip entries whose name matches this glob (can be repeated)
    #[arg(long = "blacklist", value_name = "GLOB", action = ArgAction::Append)]
    pub blacklist: Vec<String>,

    /// Keep only files whose name matches this glob (can be repeated)
    #[arg(long = "whitelist", value_name = "GLOB", action = ArgAction::Append)]
    pub whitelist: Vec<String>,
}

/// Read strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize)]
pub enum BackendKind {
    /// Streaming multi-threaded reader that returns file content
    #[value(alias = "rust")]
    #[serde(rename = "native")]
    Native,

    /// Worker pool that reports read lengths only
    #[value(name = "inprocess", alias = "python")]
    #[serde(rename = "inprocess")]
    InProcess,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::InProcess => "inprocess",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated configuration for one benchmark run
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Directory to scan
    pub root: PathBuf,

    /// Read strategy
    pub backend: BackendKind,

    /// Reader threads
    pub threads: usize,

    /// Wall-clock budget for the read phase
    pub duration: Duration,

    /// Shuffle the file list
    pub shuffle: bool,

    /// Bytes per file, 0 for whole files
    pub chunk_size: u64,

    /// Name filters
    pub filter: FilterSpec,

    /// Show header, progress bar and summary
    pub show_progress: bool,

    /// Print JSON after the RESULT line
    pub json: bool,
}

impl BenchConfig {
    /// Defaults matching the CLI
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backend: BackendKind::InProcess,
            threads: DEFAULT_THREADS,
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            shuffle: false,
            chunk_size: 0,
            filter: FilterSpec::default(),
            show_progress: false,
            json: false,
        }
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: RunArgs, quiet: bool) -> Result<Self, ConfigError> {
        let config = Self {
            root: args.root,
            backend: args.backend,
            threads: args.threads,
            duration: Duration::from_secs(args.duration),
            shuffle: args.shuffle,
            chunk_size: args.chunk_size,
            filter: FilterSpec::deny(args.blacklist),
            show_progress: !quiet,
            json: args.json,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges; patterns are checked when compiled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(ConfigError::InvalidThreadCount {
                count: self.threads,
                max: MAX_THREADS,
            });
        }

        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidRoot {
                path: self.root.clone(),
                reason: "root path is empty".into(),
            });
        }

        Ok(())
    }
}

/// Validated configuration for `scan`
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub shuffle: bool,
    pub filter: FilterSpec,
}

impl ScanConfig {
    pub fn from_args(args: ScanArgs) -> Result<Self, ConfigError> {
        if args.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidRoot {
                path: args.root,
                reason: "root path is empty".into(),
            });
        }

        Ok(Self {
            root: args.root,
            shuffle: args.shuffle,
            filter: FilterSpec::deny(args.blacklist).with_allow(args.whitelist),
        })
    }
}
