//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// logtide -- security log normalization toolkit.
///
/// Use `logtide <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logtide", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logtide.toml configuration file.
    #[arg(short, long, default_value = "logtide.toml", global = true)]
    pub config: PathBuf,

    /// Log level for diagnostics on stderr (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect registered log types.
    Logtypes(LogtypesArgs),

    /// Normalize a file against one log type and print events as JSON lines.
    Parse(ParseArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- logtypes ----

#[derive(Args, Debug)]
pub struct LogtypesArgs {
    #[command(subcommand)]
    pub action: LogtypesAction,
}

#[derive(Subcommand, Debug)]
pub enum LogtypesAction {
    /// List every built-in log type.
    List,
    /// Show the table description of one log type.
    Show {
        /// Log type name (e.g. Zeek.DNS).
        name: String,
    },
}

// ---- parse ----

/// Normalize one file. Events go to stdout, the summary to stderr.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Log type to parse the input as.
    #[arg(short = 't', long)]
    pub log_type: String,

    /// Input file, one raw record per line. `-` reads stdin.
    pub file: PathBuf,

    /// Maximum raw record size in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_record_size: usize,

    /// Exit with a non-zero status if any record is dropped.
    #[arg(long)]
    pub strict: bool,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file, its log types and classification rules.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, pipeline, output, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_logtypes_show() {
        let cli = Cli::try_parse_from(["logtide", "logtypes", "show", "Zeek.DNS"])
            .expect("should parse");
        match cli.command {
            Commands::Logtypes(LogtypesArgs {
                action: LogtypesAction::Show { name },
            }) => assert_eq!(name, "Zeek.DNS"),
            other => panic!("expected logtypes show, got {other:?}"),
        }
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn parses_parse_with_options() {
        let cli = Cli::try_parse_from([
            "logtide",
            "--output",
            "json",
            "parse",
            "--log-type",
            "AWS.VPCFlow",
            "--strict",
            "flows.log",
        ])
        .expect("should parse");
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Parse(args) => {
                assert_eq!(args.log_type, "AWS.VPCFlow");
                assert_eq!(args.file, PathBuf::from("flows.log"));
                assert_eq!(args.max_record_size, 1024 * 1024);
                assert!(args.strict);
            }
            other => panic!("expected parse, got {other:?}"),
        }
    }

    #[test]
    fn parse_requires_log_type() {
        assert!(Cli::try_parse_from(["logtide", "parse", "input.log"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "logtide",
            "config",
            "show",
            "--section",
            "pipeline",
            "--config",
            "/etc/logtide/logtide.toml",
        ])
        .expect("should parse");
        assert_eq!(cli.config, PathBuf::from("/etc/logtide/logtide.toml"));
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("pipeline")),
            other => panic!("expected config show, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["logtide", "--output", "yaml", "logtypes", "list"]).is_err());
    }
}
