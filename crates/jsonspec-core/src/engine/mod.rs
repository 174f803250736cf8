//! Validation engine
//!
//! Walks a JSON value against a [`Schema`] and collects path-qualified
//! errors. Each level that fails appends its own error after the errors of
//! whatever failed beneath it, so `errors[0]` is always the deepest cause.

pub mod report;

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::ValidatorConfig;
use crate::error::{Result, SchemaError};
use crate::grammar::{AliasSpec, Container, FieldRef, Pattern, Primitive};
use crate::policy::PolicyOutcome;
use crate::schema::{Schema, TypeDescriptor, TypePolicies};

pub use report::{child_path, index_path, ErrorRecord, ValidationReport, ROOT_PATH};

/// A compiled schema ready to validate documents
#[derive(Debug, Clone)]
pub struct Validator {
    schema: Schema,
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with the default configuration
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, ValidatorConfig::default())
    }

    /// Create a validator with a custom configuration
    pub fn with_config(schema: Schema, config: ValidatorConfig) -> Self {
        Self { schema, config }
    }

    /// Load the schema from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Schema::from_path(path).map(Self::new)
    }

    /// Load the schema from JSON text
    pub fn from_str(text: &str) -> Result<Self> {
        Schema::from_str(text).map(Self::new)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate JSON text.
    ///
    /// Text that is not JSON produces a single error at `/` and no walk.
    pub fn validate(&self, text: &str) -> ValidationReport {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.validate_value(&value),
            Err(e) => {
                tracing::debug!(error = %e, "Document is not valid JSON");
                ValidationReport::invalid_json(&e)
            }
        }
    }

    /// Validate an already parsed document
    pub fn validate_value(&self, value: &Value) -> ValidationReport {
        let mut errors = Vec::new();
        let ok = self.validate_root(value, &mut errors);

        if !ok {
            tracing::debug!(
                errors = errors.len(),
                path = errors.first().map(|e| e.path.as_str()).unwrap_or(ROOT_PATH),
                "Document failed validation"
            );
        }

        ValidationReport::from_errors(ok, errors)
    }

    /// Validate a JSON file. A missing or unreadable file is an error, not a report.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<ValidationReport> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SchemaError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(self.validate(&text))
    }

    /// Check a value against a named type at a given path, appending errors.
    ///
    /// This is the recursive step the whole engine is built on; it is public
    /// so callers can validate fragments of a document.
    pub fn validate_against(
        &self,
        value: &Value,
        type_name: &str,
        path: &str,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        self.validate_type(value, path, type_name, 0, errors)
    }

    fn validate_root(&self, value: &Value, errors: &mut Vec<ErrorRecord>) -> bool {
        let root = self.schema.root();

        let (matched, wrapped) = match root {
            AliasSpec::Type(target) => match target.container {
                None => (self.validate_type(value, ROOT_PATH, &target.type_name, 0, errors), true),
                Some(container) => (
                    self.validate_container(value, ROOT_PATH, container, &target.type_name, 0, errors),
                    false,
                ),
            },
            AliasSpec::Pattern(pattern) => (self.validate_pattern(value, ROOT_PATH, pattern, errors), false),
        };

        let ok = matched && self.check_policies(self.schema.root_policies(), value, ROOT_PATH, errors);
        if !ok && (matched || !wrapped) {
            errors.push(type_mismatch(ROOT_PATH, &root.to_string()));
        }
        ok
    }

    fn validate_type(
        &self,
        value: &Value,
        path: &str,
        type_name: &str,
        depth: usize,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        let matched = if depth > self.config.max_depth {
            errors.push(ErrorRecord::new(
                format!(
                    "Maximum validation depth of {} exceeded at '{}'.",
                    self.config.max_depth, path
                ),
                path,
            ));
            false
        } else if let Some(primitive) = Primitive::from_name(type_name) {
            primitive.matches(value)
        } else {
            match self.schema.get(type_name) {
                Some(TypeDescriptor::Structure { fields }) => {
                    self.validate_structure(value, path, fields, depth, errors)
                }
                Some(TypeDescriptor::Union { alternatives }) => {
                    self.validate_union(value, path, alternatives, depth, errors)
                }
                Some(TypeDescriptor::Alias { target }) => {
                    self.validate_alias(value, path, target, depth, errors)
                }
                Some(TypeDescriptor::Pattern { pattern }) => {
                    self.validate_pattern(value, path, pattern, errors)
                }
                None => {
                    errors.push(ErrorRecord::new(
                        format!("Type '{}' is used but not defined.", type_name),
                        path,
                    ));
                    false
                }
            }
        };

        let ok = matched && self.check_policies(self.schema.policies(type_name), value, path, errors);
        if !ok {
            errors.push(type_mismatch(path, type_name));
        }
        ok
    }

    fn validate_structure(
        &self,
        value: &Value,
        path: &str,
        fields: &[(String, FieldRef)],
        depth: usize,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        let Some(object) = value.as_object() else {
            errors.push(ErrorRecord::new(
                format!("Field at '{}' is not a structure.", path),
                path,
            ));
            return false;
        };

        for (name, field) in fields {
            let field_path = child_path(path, name);
            // a null member counts as absent
            match object.get(name) {
                Some(child) if !child.is_null() => {
                    if !self.validate_type(child, &field_path, &field.type_name, depth + 1, errors) {
                        return false;
                    }
                }
                _ if field.required => {
                    errors.push(ErrorRecord::new(
                        format!("Required field at '{}' is not present.", field_path),
                        field_path,
                    ));
                    return false;
                }
                _ => {}
            }
        }

        true
    }

    fn validate_union(
        &self,
        value: &Value,
        path: &str,
        alternatives: &[String],
        depth: usize,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        let mut sub_errors = Vec::new();

        for alternative in alternatives {
            let mut attempt = Vec::new();
            if self.validate_type(value, path, alternative, depth + 1, &mut attempt) {
                return true;
            }
            sub_errors.append(&mut attempt);
        }

        errors.push(
            ErrorRecord::new(
                format!(
                    "Wrong type at '{}' (allowed types '{}').",
                    path,
                    alternatives.join("', '")
                ),
                path,
            )
            .with_sub_errors(sub_errors),
        );
        false
    }

    fn validate_alias(
        &self,
        value: &Value,
        path: &str,
        target: &FieldRef,
        depth: usize,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        match target.container {
            Some(container) => {
                self.validate_container(value, path, container, &target.type_name, depth, errors)
            }
            None => self.validate_type(value, path, &target.type_name, depth + 1, errors),
        }
    }

    fn validate_container(
        &self,
        value: &Value,
        path: &str,
        container: Container,
        entry_type: &str,
        depth: usize,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        match (container, value) {
            (Container::ArrayOf, Value::Array(items)) => items.iter().enumerate().all(|(i, item)| {
                self.validate_type(item, &index_path(path, i), entry_type, depth + 1, errors)
            }),
            (Container::ObjectOf, Value::Object(entries)) => entries.iter().all(|(key, item)| {
                self.validate_type(item, &child_path(path, key), entry_type, depth + 1, errors)
            }),
            (_, Value::Array(_) | Value::Object(_)) => {
                errors.push(ErrorRecord::new(
                    format!(
                        "Field at '{}' is a container but not an {}.",
                        path,
                        container.kind()
                    ),
                    path,
                ));
                false
            }
            _ => {
                errors.push(ErrorRecord::new(
                    format!("Field at '{}' is not a container.", path),
                    path,
                ));
                false
            }
        }
    }

    fn validate_pattern(
        &self,
        value: &Value,
        path: &str,
        pattern: &Pattern,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        let Some(text) = value.as_str() else {
            errors.push(ErrorRecord::new(
                format!("Field at '{}' is not a string.", path),
                path,
            ));
            return false;
        };

        if pattern.is_match(text) {
            true
        } else {
            errors.push(ErrorRecord::new(
                format!(
                    "Value at '{}' does not match pattern '{}'.",
                    path,
                    pattern.as_str()
                ),
                path,
            ));
            false
        }
    }

    fn check_policies(
        &self,
        policies: Option<&TypePolicies>,
        value: &Value,
        path: &str,
        errors: &mut Vec<ErrorRecord>,
    ) -> bool {
        let Some(policies) = policies else {
            return true;
        };

        for rule in &policies.rules {
            let outcome = self.schema.registry().check(
                policies.category,
                rule,
                value,
                &policies.declared_fields,
            );

            let message = match outcome {
                Ok(PolicyOutcome::Passed) => continue,
                Ok(PolicyOutcome::Failed(message)) => format!(
                    "Field at '{}' violates policy '{}': {}",
                    path, rule.kind, message
                ),
                Err(e) => e.to_string(),
            };

            errors.push(ErrorRecord::new(message, path));
            return false;
        }

        true
    }
}

fn type_mismatch(path: &str, type_name: &str) -> ErrorRecord {
    ErrorRecord::new(
        format!("The type of field at {} is not {}.", path, type_name),
        path,
    )
}
