//! jsonspec CLI
//!
//! Command-line front end for `jsonspec-core`.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Validate documents against a schema
//! jsonspec validate --schema schema.json order-1.json order-2.yaml
//!
//! # Print every error as JSON
//! jsonspec validate --schema schema.json order.json --all-errors --format json
//!
//! # Check that a schema is well formed and describe its types
//! jsonspec check --schema schema.json
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Success - every document is valid
//! - 1: At least one document failed validation
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Schema could not be loaded
//! - 10: Internal error

pub mod cli;
pub mod error;

pub use cli::{ExitCode, JsonspecCli, OutputFormat};
pub use error::{CliError, Result};

use colored::Colorize;

/// Run the CLI and map any error onto its exit code
///
/// # Example
///
/// ```rust,no_run
/// use clap::Parser;
/// use jsonspec_cli::{run_cli, JsonspecCli};
///
/// fn main() {
///     let cli = JsonspecCli::parse();
///     let exit_code = run_cli(cli);
///     std::process::exit(exit_code.into());
/// }
/// ```
pub fn run_cli(cli: JsonspecCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if !e.is_user_error() {
                tracing::error!(error = %e, "Command failed");
            }
            ExitCode::from(&e)
        }
    }
}
