//! Type grammar
//!
//! Turns the strings used inside a schema into structured references.
//!
//! Two contexts exist:
//!
//! - **field context** (`"+int"`, `"-Address"`, `"name"`): an optional
//!   required/optional marker followed by a bare type name.
//! - **alias context** (`"Item[]"`, `"string{}"`, `"Pos"`, `"^[a-z]+$"`): a
//!   bare name with an optional container suffix. Anything else is compiled
//!   as a regular expression.
//!
//! Every name seen during expansion is recorded in the grammar's used-types
//! list, which the schema loader later checks against the defined types.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, SchemaError};

static FIELD_SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<required>[+-]?)(?P<type>[a-zA-Z0-9]+)$").expect("field grammar is a valid regex")
});

static ALIAS_SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[a-zA-Z0-9]+)(?P<mods>\{\}|\[\])?$").expect("alias grammar is a valid regex")
});

/// Built-in terminal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Array,
    Boolean,
    Float,
    Int,
    Mixed,
    Object,
    String,
}

impl Primitive {
    /// All primitives, in their canonical order
    pub const ALL: [Primitive; 7] = [
        Primitive::Array,
        Primitive::Boolean,
        Primitive::Float,
        Primitive::Int,
        Primitive::Mixed,
        Primitive::Object,
        Primitive::String,
    ];

    /// Look up a primitive by its schema name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "array" => Some(Primitive::Array),
            "boolean" => Some(Primitive::Boolean),
            "float" => Some(Primitive::Float),
            "int" => Some(Primitive::Int),
            "mixed" => Some(Primitive::Mixed),
            "object" => Some(Primitive::Object),
            "string" => Some(Primitive::String),
            _ => None,
        }
    }

    /// Name used for this primitive in schemas
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Array => "array",
            Primitive::Boolean => "boolean",
            Primitive::Float => "float",
            Primitive::Int => "int",
            Primitive::Mixed => "mixed",
            Primitive::Object => "object",
            Primitive::String => "string",
        }
    }

    /// Direct kind check of a JSON value.
    ///
    /// `int` and `float` follow the JSON literal: `1` is an int, `1.0` is a
    /// float, and neither is accepted for the other.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Primitive::Array => value.is_array(),
            Primitive::Boolean => value.is_boolean(),
            Primitive::Float => value.is_f64(),
            Primitive::Int => value.is_i64() || value.is_u64(),
            Primitive::Mixed => true,
            Primitive::Object => value.is_object(),
            Primitive::String => value.is_string(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check whether a type name is one of the built-in primitives
pub fn is_primitive(name: &str) -> bool {
    Primitive::from_name(name).is_some()
}

/// Container decoration of an alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// `Name[]`: a JSON array whose entries are all `Name`
    ArrayOf,
    /// `Name{}`: a JSON object whose values are all `Name`
    ObjectOf,
}

impl Container {
    /// JSON kind the container decorates
    pub fn kind(&self) -> &'static str {
        match self {
            Container::ArrayOf => "array",
            Container::ObjectOf => "object",
        }
    }

    /// Suffix used in alias context
    pub fn suffix(&self) -> &'static str {
        match self {
            Container::ArrayOf => "[]",
            Container::ObjectOf => "{}",
        }
    }
}

/// Reference to a type from a field, alias or root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Referenced type name (primitive or defined)
    pub type_name: String,
    /// Whether the field must be present; only meaningful for structure fields
    pub required: bool,
    /// Container decoration, if any
    pub container: Option<Container>,
}

impl FieldRef {
    /// Create a plain, optional, non-container reference
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            required: false,
            container: None,
        }
    }

    /// Mark the reference as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Decorate the reference with a container
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Primitive referenced by this field, if any
    pub fn primitive(&self) -> Option<Primitive> {
        Primitive::from_name(&self.type_name)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.required {
            f.write_str("+")?;
        }
        f.write_str(&self.type_name)?;
        if let Some(container) = self.container {
            f.write_str(container.suffix())?;
        }
        Ok(())
    }
}

/// A compiled string pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    /// Pattern text as written in the schema
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether the string matches
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

/// Result of an alias-context expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasSpec {
    /// Reference to another type, possibly as a container
    Type(FieldRef),
    /// A string pattern
    Pattern(Pattern),
}

impl fmt::Display for AliasSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasSpec::Type(target) => write!(f, "{}", target),
            AliasSpec::Pattern(pattern) => f.write_str(pattern.as_str()),
        }
    }
}

/// Expander for field and alias specifications.
///
/// Keeps the ordered set of every type name it has seen.
#[derive(Debug, Default)]
pub struct TypeGrammar {
    used: Vec<String>,
    seen: HashSet<String>,
}

impl TypeGrammar {
    /// Create a grammar with an empty used-types list
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand a structure field specification such as `+int` or `Address`
    pub fn expand_field(&mut self, owner: &str, field: &str, spec: &str) -> Result<FieldRef> {
        let caps = FIELD_SPEC_RE
            .captures(spec)
            .ok_or_else(|| SchemaError::MalformedFieldSpec {
                owner: owner.to_string(),
                field: field.to_string(),
                spec: spec.to_string(),
            })?;

        let type_name = &caps["type"];
        self.record(type_name);

        Ok(FieldRef {
            type_name: type_name.to_string(),
            required: &caps["required"] == "+",
            container: None,
        })
    }

    /// Expand an alias specification such as `Item[]`, `string` or a regex
    pub fn expand_alias(&mut self, owner: &str, spec: &str) -> Result<AliasSpec> {
        if let Some(caps) = ALIAS_SPEC_RE.captures(spec) {
            let type_name = &caps["name"];
            let container = match caps.name("mods").map(|m| m.as_str()) {
                Some("[]") => Some(Container::ArrayOf),
                Some("{}") => Some(Container::ObjectOf),
                _ => None,
            };
            self.record(type_name);

            return Ok(AliasSpec::Type(FieldRef {
                type_name: type_name.to_string(),
                required: false,
                container,
            }));
        }

        if spec.is_empty() {
            return Err(SchemaError::malformed_type(owner));
        }

        Pattern::new(spec)
            .map(AliasSpec::Pattern)
            .map_err(|e| SchemaError::MalformedTypeSpec {
                name: owner.to_string(),
                detail: Some(format!("'{}' is neither a type reference nor a valid pattern: {}", spec, e)),
            })
    }

    /// Record a type name as used
    pub fn record(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.used.push(name.to_string());
        }
    }

    /// Used non-primitive type names, in first-seen order
    pub fn used_types(&self) -> impl Iterator<Item = &str> {
        self.used
            .iter()
            .map(String::as_str)
            .filter(|name| !is_primitive(name))
    }

    /// Check whether a name has been recorded
    pub fn is_used(&self, name: &str) -> bool {
        self.seen.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_required_markers() {
        let mut grammar = TypeGrammar::new();

        let field = grammar.expand_field("Pos", "x", "+int").unwrap();
        assert_eq!(field, FieldRef::named("int").required());

        let field = grammar.expand_field("Pos", "y", "-int").unwrap();
        assert!(!field.required);

        let field = grammar.expand_field("Pos", "label", "Label").unwrap();
        assert!(!field.required);
        assert_eq!(field.type_name, "Label");
    }

    #[test]
    fn test_field_rejects_containers_and_garbage() {
        let mut grammar = TypeGrammar::new();

        for spec in ["int[]", "+-int", "", "+", "str ing", "Item{}"] {
            let err = grammar.expand_field("Owner", "f", spec).unwrap_err();
            assert!(
                matches!(err, SchemaError::MalformedFieldSpec { ref owner, .. } if owner == "Owner"),
                "spec {:?} should be rejected",
                spec
            );
        }
    }

    #[test]
    fn test_alias_containers() {
        let mut grammar = TypeGrammar::new();

        assert_eq!(
            grammar.expand_alias("List", "Item[]").unwrap(),
            AliasSpec::Type(FieldRef::named("Item").with_container(Container::ArrayOf))
        );
        assert_eq!(
            grammar.expand_alias("Map", "string{}").unwrap(),
            AliasSpec::Type(FieldRef::named("string").with_container(Container::ObjectOf))
        );
        assert_eq!(
            grammar.expand_alias("Id", "int").unwrap(),
            AliasSpec::Type(FieldRef::named("int"))
        );
    }

    #[test]
    fn test_alias_falls_back_to_pattern() {
        let mut grammar = TypeGrammar::new();

        match grammar.expand_alias("Code", "^[A-Z]{3}-[0-9]+$").unwrap() {
            AliasSpec::Pattern(pattern) => {
                assert_eq!(pattern.as_str(), "^[A-Z]{3}-[0-9]+$");
                assert!(pattern.is_match("ABC-12"));
                assert!(!pattern.is_match("abc-12"));
            }
            other => panic!("expected a pattern, got {:?}", other),
        }
        assert_eq!(grammar.used_types().count(), 0);
    }

    #[test]
    fn test_alias_invalid_pattern() {
        let mut grammar = TypeGrammar::new();

        let err = grammar.expand_alias("Broken", "([a-z]").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedTypeSpec { ref name, .. } if name == "Broken"));

        let err = grammar.expand_alias("ROOT", "").unwrap_err();
        assert_eq!(err.to_string(), "Type 'ROOT' is not well defined.");
    }

    #[test]
    fn test_used_types_are_recorded_in_order() {
        let mut grammar = TypeGrammar::new();
        grammar.expand_field("A", "b", "+B").unwrap();
        grammar.expand_field("A", "n", "int").unwrap();
        grammar.expand_alias("C", "D[]").unwrap();
        grammar.expand_field("A", "again", "B").unwrap();
        grammar.record("E");

        let used: Vec<&str> = grammar.used_types().collect();
        assert_eq!(used, vec!["B", "D", "E"]);
        assert!(grammar.is_used("int"));
    }

    #[test]
    fn test_primitive_matches() {
        assert!(Primitive::Int.matches(&json!(1)));
        assert!(Primitive::Int.matches(&json!(-7)));
        assert!(!Primitive::Int.matches(&json!(1.5)));
        assert!(Primitive::Float.matches(&json!(1.5)));
        assert!(!Primitive::Float.matches(&json!(2)));
        assert!(Primitive::Object.matches(&json!({})));
        assert!(!Primitive::Object.matches(&json!([])));
        assert!(Primitive::Array.matches(&json!([])));
        assert!(Primitive::Boolean.matches(&json!(false)));
        assert!(Primitive::String.matches(&json!("")));
        assert!(Primitive::Mixed.matches(&json!(null)));
    }

    #[test]
    fn test_float_literal_is_not_int() {
        let value: Value = serde_json::from_str("1.0").unwrap();
        assert!(Primitive::Float.matches(&value));
        assert!(!Primitive::Int.matches(&value));
    }

    #[test]
    fn test_field_ref_display() {
        assert_eq!(FieldRef::named("int").required().to_string(), "+int");
        assert_eq!(
            FieldRef::named("Item").with_container(Container::ObjectOf).to_string(),
            "Item{}"
        );
    }
}
