//! CLI argument definitions for logtide-daemon.

use std::path::PathBuf;

use clap::Parser;

/// logtide security log normalization daemon.
///
/// Reads the configured inputs, normalizes every record against its
/// log type schema and writes partitioned batches to the output directory.
#[derive(Parser, Debug)]
#[command(name = "logtide-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logtide.toml configuration file.
    #[arg(short, long, default_value = "/etc/logtide/logtide.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and log type declarations, then exit.
    #[arg(long)]
    pub validate: bool,
}
