//! CLI module for jsonspec
//!
//! Validates documents against a schema and describes compiled schemas.

pub mod commands;
pub mod output;

pub use commands::{Commands, JsonspecCli};
pub use output::{OutputFormat, SchemaOutput, ValidationOutput};

use crate::error::CliError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution, every document is valid
    Success = 0,
    /// At least one document failed validation
    ValidationError = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Schema could not be loaded
    SchemaError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&CliError> for ExitCode {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::InvalidInput(_) => ExitCode::InvalidInput,
            CliError::FileError(_) => ExitCode::FileError,
            CliError::SchemaError(_) => ExitCode::SchemaError,
            CliError::SerializationError(_) | CliError::InternalError(_) => ExitCode::InternalError,
        }
    }
}

impl ExitCode {
    /// Determine exit code from validation outcome
    pub fn from_validation_result(has_failures: bool) -> Self {
        if has_failures {
            ExitCode::ValidationError
        } else {
            ExitCode::Success
        }
    }
}

/// Log level for the given verbosity flags
pub fn log_level(verbose: u8, quiet: bool) -> tracing::Level {
    if quiet {
        return tracing::Level::ERROR;
    }
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: JsonspecCli) -> Result<ExitCode, CliError> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Validate {
            schema,
            documents,
            format,
            all_errors,
            max_depth,
        } => commands::execute_validate(&schema, &documents, format, all_errors, max_depth, quiet),
        Commands::Check { schema, format } => commands::execute_check(&schema, format),
    }
}
