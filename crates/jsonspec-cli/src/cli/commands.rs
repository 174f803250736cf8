//! CLI command definitions for jsonspec
//!
//! Provides Clap-based command definitions for validating documents and
//! checking schemas.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use jsonspec_core::engine::{ErrorRecord, ROOT_PATH};
use jsonspec_core::{Schema, ValidationReport, Validator, ValidatorConfig, DEFAULT_MAX_DEPTH};

use super::output::{DocumentOutput, OutputFormat, SchemaOutput, ValidationOutput};
use super::ExitCode;
use crate::error::CliError;

/// jsonspec CLI
///
/// Validate JSON and YAML documents against jsonspec schemas.
#[derive(Parser, Debug)]
#[command(name = "jsonspec")]
#[command(about = "jsonspec - Validate JSON documents against named-type schemas", long_about = None)]
#[command(version)]
pub struct JsonspecCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate documents against a schema
    ///
    /// Documents ending in `.yaml` or `.yml` are read as YAML, everything
    /// else as JSON.
    Validate {
        /// Path to the schema file
        #[arg(short, long, env = "JSONSPEC_SCHEMA")]
        schema: PathBuf,

        /// Paths of the documents to validate
        #[arg(required = true, num_args = 1..)]
        documents: Vec<PathBuf>,

        /// Output format for validation results
        #[arg(long, value_enum, env = "JSONSPEC_FORMAT", default_value = "table")]
        format: OutputFormat,

        /// Report every error instead of only the deepest cause
        #[arg(long)]
        all_errors: bool,

        /// Maximum number of nested type checks per document
        #[arg(long, env = "JSONSPEC_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Load a schema and describe its types
    ///
    /// Fails with the schema error when the schema is not well formed.
    Check {
        /// Path to the schema file
        #[arg(short, long, env = "JSONSPEC_SCHEMA")]
        schema: PathBuf,

        /// Output format for the schema description
        #[arg(long, value_enum, env = "JSONSPEC_FORMAT", default_value = "table")]
        format: OutputFormat,
    },
}

/// Execute the validate command
pub fn execute_validate(
    schema: &Path,
    documents: &[PathBuf],
    format: OutputFormat,
    all_errors: bool,
    max_depth: usize,
    quiet: bool,
) -> Result<ExitCode, CliError> {
    if max_depth == 0 {
        return Err(CliError::invalid_input("--max-depth must be greater than zero"));
    }
    if documents.is_empty() {
        return Err(CliError::invalid_input("At least one document is required"));
    }

    let config = ValidatorConfig::new().with_max_depth(max_depth);
    let validator = Validator::with_config(Schema::from_path(schema)?, config);
    tracing::info!(schema = %schema.display(), documents = documents.len(), "Validating documents");

    let mut results = Vec::with_capacity(documents.len());
    for document in documents {
        let report = validate_document(&validator, document)?;
        if !report.ok {
            tracing::info!(document = %document.display(), errors = report.error_count(), "Document is not valid");
        }
        results.push(DocumentOutput::from_report(document, &report, all_errors));
    }

    let output = ValidationOutput::new(results);
    output.render(format, quiet)?;

    Ok(ExitCode::from_validation_result(!output.valid))
}

/// Execute the check command
pub fn execute_check(schema: &Path, format: OutputFormat) -> Result<ExitCode, CliError> {
    let loaded = Schema::from_path(schema)?;
    tracing::info!(schema = %schema.display(), types = loaded.len(), "Schema is well formed");

    let output = SchemaOutput::from_schema(schema, &loaded);
    output.render(format)?;

    Ok(ExitCode::Success)
}

/// Validate one document file, choosing the parser from its extension
pub fn validate_document(validator: &Validator, path: &Path) -> Result<ValidationReport, CliError> {
    if !is_yaml(path) {
        return Ok(validator.validate_path(path)?);
    }

    if !path.is_file() {
        return Err(CliError::file_error(format!(
            "Path '{}' is not a file.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::file_error(format!(
            "Failed to read document '{}': {}",
            path.display(),
            e
        ))
    })?;

    match serde_yaml::from_str::<serde_json::Value>(&content) {
        Ok(value) => Ok(validator.validate_value(&value)),
        Err(e) => Ok(ValidationReport::from_errors(
            false,
            vec![ErrorRecord::new(
                format!("The given YAML is not valid. {}", e),
                ROOT_PATH,
            )],
        )),
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false)
}
