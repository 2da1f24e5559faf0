//! CLI-specific error types and exit code mapping

use logtide_core::error::LogtideError;
use logtide_log_pipeline::LogPipelineError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The requested log type is not registered.
    #[error("unknown log type: {0}")]
    UnknownLogType(String),

    /// `parse --strict` dropped at least one record.
    #[error("{0} records dropped")]
    RecordsDropped(u64),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logtide-core.
    #[error("{0}")]
    Core(#[from] LogtideError),

    /// Log pipeline domain error.
    #[error("pipeline error: {0}")]
    Pipeline(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                         |
    /// |------|---------------------------------|
    /// | 0    | Success                         |
    /// | 1    | General / command error         |
    /// | 2    | Configuration error             |
    /// | 3    | Unknown log type                |
    /// | 4    | Records dropped (`--strict`)    |
    /// | 10   | IO error                        |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LogtideError::Config(_)) => 2,
            Self::UnknownLogType(_) => 3,
            Self::RecordsDropped(_) => 4,
            Self::Io(_) | Self::Core(LogtideError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Pipeline(_) => 1,
        }
    }
}

impl From<LogPipelineError> for CliError {
    fn from(e: LogPipelineError) -> Self {
        match e {
            LogPipelineError::LogTypeNotFound(name) => Self::UnknownLogType(name),
            LogPipelineError::Config { .. } => Self::Config(e.to_string()),
            LogPipelineError::Io(io) => Self::Io(io),
            other => Self::Pipeline(other.to_string()),
        }
    }
}
