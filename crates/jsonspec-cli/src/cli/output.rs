//! Output formatting for the jsonspec CLI
//!
//! Provides structured output formatting in JSON, YAML, and human-readable table formats.

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::Path;

use jsonspec_core::{
    ErrorRecord, Modifier, PolicyRule, Schema, TypeDescriptor, TypePolicies, ValidationReport,
};

use crate::error::CliError;

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format for configuration output
    Yaml,
}

/// Validation output for a batch of documents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutput {
    /// Whether every document is valid
    pub valid: bool,
    /// Number of documents validated
    pub document_count: usize,
    /// Number of documents that failed
    pub failed_count: usize,
    /// Per-document results
    pub documents: Vec<DocumentOutput>,
    /// Summary message
    pub summary: String,
}

/// Result for a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutput {
    /// Document path as given on the command line
    pub document: String,
    pub ok: bool,
    /// Number of errors in the full report
    pub error_count: usize,
    /// Deepest cause of the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<ErrorRecord>,
    /// Every error, only filled with `--all-errors`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,
}

impl DocumentOutput {
    /// Create output from a validation report
    pub fn from_report(document: &Path, report: &ValidationReport, all_errors: bool) -> Self {
        Self {
            document: document.display().to_string(),
            ok: report.ok,
            error_count: report.error_count(),
            first_error: report.first_error.clone(),
            errors: if all_errors {
                report.errors.clone()
            } else {
                Vec::new()
            },
        }
    }
}

impl ValidationOutput {
    /// Summarize per-document results
    pub fn new(documents: Vec<DocumentOutput>) -> Self {
        let document_count = documents.len();
        let failed_count = documents.iter().filter(|d| !d.ok).count();
        let valid = failed_count == 0;

        let summary = if valid {
            format!("All {} document(s) are valid", document_count)
        } else {
            format!(
                "{} of {} document(s) failed validation",
                failed_count, document_count
            )
        };

        Self {
            valid,
            document_count,
            failed_count,
            documents,
            summary,
        }
    }

    /// Render output in the specified format
    pub fn render(&self, format: OutputFormat, quiet: bool) -> Result<(), CliError> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(self)?),
            OutputFormat::Table => {
                let mut stdout = io::stdout();
                self.write_table(&mut stdout, quiet)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    /// Write the human-readable table.
    ///
    /// With `quiet`, valid documents and the header are left out.
    pub fn write_table<W: Write>(&self, out: &mut W, quiet: bool) -> io::Result<()> {
        if !quiet {
            writeln!(out)?;
            writeln!(out, "{}", "Validation Results".cyan().bold())?;
            writeln!(out, "{}", "=".repeat(60))?;
            writeln!(out)?;
        }

        for document in &self.documents {
            if document.ok {
                if !quiet {
                    writeln!(out, "{} {}", "+".green(), document.document)?;
                }
                continue;
            }

            writeln!(
                out,
                "{} {} ({} error(s))",
                "x".red(),
                document.document,
                document.error_count.to_string().red()
            )?;

            if document.errors.is_empty() {
                if let Some(first) = &document.first_error {
                    write_error(out, first, 1)?;
                }
            } else {
                for error in &document.errors {
                    write_error(out, error, 1)?;
                }
            }
        }

        if !quiet {
            writeln!(out)?;
            let status = if self.valid { "+".green() } else { "x".red() };
            writeln!(out, "{} {}", status, self.summary)?;
        }

        Ok(())
    }
}

fn write_error<W: Write>(out: &mut W, error: &ErrorRecord, indent: usize) -> io::Result<()> {
    let pad = "  ".repeat(indent);
    writeln!(out, "{}{} {}", pad, "-".red(), error.message)?;
    writeln!(out, "{}  {} {}", pad, "Path:".dimmed(), error.path.cyan())?;
    for sub in &error.sub_errors {
        write_error(out, sub, indent + 2)?;
    }
    Ok(())
}

/// Description of a compiled schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOutput {
    /// Schema path
    pub schema: String,
    /// Root reference
    pub root: String,
    /// Policies attached to the root through `ROOT`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_policies: Vec<String>,
    /// Types in declaration order
    pub types: Vec<TypeOutput>,
}

/// Description of one named type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeOutput {
    pub name: String,
    /// structure, union, alias or pattern
    pub kind: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
}

impl SchemaOutput {
    /// Describe a schema loaded from `path`
    pub fn from_schema(path: &Path, schema: &Schema) -> Self {
        let types = schema
            .types()
            .map(|(name, descriptor)| TypeOutput {
                name: name.to_string(),
                kind: descriptor.kind().to_string(),
                definition: describe(descriptor),
                policies: schema.policies(name).map(describe_policies).unwrap_or_default(),
            })
            .collect();

        Self {
            schema: path.display().to_string(),
            root: schema.root().to_string(),
            root_policies: schema
                .root_policies()
                .map(describe_policies)
                .unwrap_or_default(),
            types,
        }
    }

    /// Render output in the specified format
    pub fn render(&self, format: OutputFormat) -> Result<(), CliError> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(self)?),
            OutputFormat::Table => {
                let mut stdout = io::stdout();
                self.write_table(&mut stdout)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    /// Write the human-readable table
    pub fn write_table<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", "Schema".cyan().bold())?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "{} {}", "File:".dimmed(), self.schema)?;
        write!(out, "{} {}", "Root:".dimmed(), self.root.cyan())?;
        if !self.root_policies.is_empty() {
            write!(out, " [{}]", self.root_policies.join(", "))?;
        }
        writeln!(out)?;
        writeln!(out)?;

        writeln!(out, "{}", "Types:".cyan().bold())?;
        writeln!(out, "{}", "-".repeat(60))?;
        for ty in &self.types {
            write!(
                out,
                "{:<20} {:<10} {}",
                ty.name.bold(),
                ty.kind.dimmed(),
                ty.definition
            )?;
            if !ty.policies.is_empty() {
                write!(out, " [{}]", ty.policies.join(", ").yellow())?;
            }
            writeln!(out)?;
        }

        Ok(())
    }
}

/// One-line definition of a type, in schema notation
pub fn describe(descriptor: &TypeDescriptor) -> String {
    match descriptor {
        TypeDescriptor::Structure { fields } => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(name, field)| format!("{}: {}", name, field))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
        TypeDescriptor::Union { alternatives } => alternatives.join(" | "),
        TypeDescriptor::Alias { target } => target.to_string(),
        TypeDescriptor::Pattern { pattern } => format!("/{}/", pattern.as_str()),
    }
}

fn describe_policies(policies: &TypePolicies) -> Vec<String> {
    policies.rules.iter().map(describe_rule).collect()
}

fn describe_rule(rule: &PolicyRule) -> String {
    let modifier = match &rule.modifier {
        Modifier::Bound(bound) => bound.to_string(),
        Modifier::Values(values) => serde_json::Value::Array(values.clone()).to_string(),
        Modifier::Flag(flag) => flag.to_string(),
    };
    format!("{}({})", rule.kind, modifier)
}
