//! jsonspec core
//!
//! Schema compiler and validation engine for JSON documents.
//!
//! ## Features
//!
//! - **Named Types**: Structures with required/optional fields, unions,
//!   aliases and regex-matched strings
//! - **Containers**: `Type[]` and `Type{}` decorations for homogeneous arrays and maps
//! - **Policies**: Bounds, allow/deny lists and strict structures, checked after a
//!   value has matched its type
//! - **Load-Time Integrity**: Undefined, unused and self-referencing types are
//!   rejected before any document is validated
//! - **Path-Qualified Errors**: Every failure names the location of the offending
//!   value, deepest cause first
//! - **Schema Cache**: Compiled validators memoized by schema path
//!
//! ## Architecture
//!
//! 1. **Grammar** (`grammar`): Field and alias specification strings.
//!
//! 2. **Schema** (`schema`): Type graph, integrity checks and policy loading.
//!
//! 3. **Policy** (`policy`): Registry of `(category, policy)` checks.
//!
//! 4. **Engine** (`engine`): Recursive matcher and validation reports.
//!
//! 5. **Cache** (`cache`): Validators keyed by schema path.
//!
//! ## Example
//!
//! ```rust
//! use jsonspec_core::{Schema, Validator};
//! use serde_json::json;
//!
//! let schema = Schema::from_value(&json!({
//!     "types": { "Pos": { "x": "+int", "y": "+int" } },
//!     "root": "Pos"
//! }))
//! .unwrap();
//! let validator = Validator::new(schema);
//!
//! assert!(validator.validate(r#"{"x": 1, "y": 2}"#).ok);
//!
//! let report = validator.validate(r#"{"x": 1}"#);
//! assert!(!report.ok);
//! assert_eq!(report.first_error.unwrap().path, "/y");
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod policy;
pub mod schema;

pub use cache::SchemaCache;
pub use config::{ValidatorConfig, DEFAULT_MAX_DEPTH};
pub use engine::{ErrorRecord, ValidationReport, Validator};
pub use error::{Result, SchemaError};
pub use grammar::{AliasSpec, Container, FieldRef, Pattern, Primitive, TypeGrammar};
pub use policy::{Category, Modifier, PolicyKind, PolicyOutcome, PolicyRegistry, PolicyRule};
pub use schema::{Schema, TypeDescriptor, TypePolicies};
