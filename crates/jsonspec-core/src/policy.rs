//! Policy registry
//!
//! Policies are refinements applied after a value has structurally matched its
//! type: bounds, allow/deny lists and strict structure keys. Which policies a
//! type may carry depends on its [`Category`].
//!
//! The registry is an explicit table from `(Category, PolicyKind)` to a check
//! function. Schemas are checked against it at load time, so a lookup miss
//! while validating means the schema was built against a different registry.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::grammar::{Container, Primitive};

/// Classification used to decide which policies apply to a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Scalar alias of a primitive type
    Primitive(Primitive),
    /// Alias decorated with `[]`
    ArrayContainer,
    /// Alias decorated with `{}`
    ObjectContainer,
    /// Structure type
    Structure,
}

impl Category {
    /// Category of a container alias
    pub fn for_container(container: Container) -> Self {
        match container {
            Container::ArrayOf => Category::ArrayContainer,
            Container::ObjectOf => Category::ObjectContainer,
        }
    }

    /// Name of the category as used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Category::Primitive(primitive) => primitive.name(),
            Category::ArrayContainer => "array-container",
            Category::ObjectContainer => "object-container",
            Category::Structure => "structure",
        }
    }

    /// Whether `max`/`min` on this category measure a length or element count
    fn counts_elements(&self) -> bool {
        matches!(
            self,
            Category::Primitive(Primitive::Array)
                | Category::Primitive(Primitive::String)
                | Category::ArrayContainer
                | Category::ObjectContainer
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Known policy names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyKind {
    /// Value must not be one of the listed values
    Except,
    /// Upper bound (inclusive)
    Max,
    /// Lower bound (inclusive)
    Min,
    /// Value must be one of the listed values
    Only,
    /// Structure objects may only contain declared fields
    Strict,
}

impl PolicyKind {
    /// Look up a policy by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "except" => Some(PolicyKind::Except),
            "max" => Some(PolicyKind::Max),
            "min" => Some(PolicyKind::Min),
            "only" => Some(PolicyKind::Only),
            "strict" => Some(PolicyKind::Strict),
            _ => None,
        }
    }

    /// Policy name as written in schemas
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Except => "except",
            PolicyKind::Max => "max",
            PolicyKind::Min => "min",
            PolicyKind::Only => "only",
            PolicyKind::Strict => "strict",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compiled policy argument
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// Numeric bound for `max`/`min`
    Bound(f64),
    /// Value list for `except`/`only`
    Values(Vec<Value>),
    /// Switch for `strict`
    Flag(bool),
}

/// A policy attached to a type, ready to be checked
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRule {
    pub kind: PolicyKind,
    pub modifier: Modifier,
}

/// Outcome of a single policy check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    Passed,
    /// The check did not hold; carries a human-readable reason
    Failed(String),
}

impl PolicyOutcome {
    /// Whether the check held
    pub fn is_passed(&self) -> bool {
        matches!(self, PolicyOutcome::Passed)
    }
}

/// Everything a check function can look at
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    /// The value that matched the type
    pub value: &'a Value,
    /// Compiled policy argument
    pub modifier: &'a Modifier,
    /// Declared field names, for structure categories
    pub declared_fields: &'a [String],
}

/// Signature of a policy check
pub type CheckFn = fn(&CheckInput<'_>) -> PolicyOutcome;

/// Table of allowed `(category, policy)` pairs and their implementations
#[derive(Clone)]
pub struct PolicyRegistry {
    checks: HashMap<(Category, PolicyKind), CheckFn>,
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self
            .checks
            .keys()
            .map(|(category, kind)| format!("{}.{}", category, kind))
            .collect();
        pairs.sort();
        f.debug_struct("PolicyRegistry").field("checks", &pairs).finish()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyRegistry {
    /// Create a registry with the standard policy table
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_standard_checks();
        registry
    }

    /// Create a registry that allows no policies at all
    pub fn empty() -> Self {
        Self {
            checks: HashMap::new(),
        }
    }

    fn register_standard_checks(&mut self) {
        use Category::{ArrayContainer, Structure};
        use PolicyKind::{Except, Max, Min, Only, Strict};

        let array = Category::Primitive(Primitive::Array);
        self.register(array, Except, checks::array_except);
        self.register(array, Max, checks::count_max);
        self.register(array, Min, checks::count_min);
        self.register(array, Only, checks::array_only);

        for number in [Primitive::Float, Primitive::Int] {
            let category = Category::Primitive(number);
            self.register(category, Except, checks::scalar_except);
            self.register(category, Max, checks::number_max);
            self.register(category, Min, checks::number_min);
            self.register(category, Only, checks::scalar_only);
        }

        let string = Category::Primitive(Primitive::String);
        self.register(string, Except, checks::scalar_except);
        self.register(string, Max, checks::length_max);
        self.register(string, Min, checks::length_min);
        self.register(string, Only, checks::scalar_only);

        self.register(ArrayContainer, Max, checks::count_max);
        self.register(ArrayContainer, Min, checks::count_min);

        self.register(Structure, Strict, checks::structure_strict);
    }

    /// Register (or replace) a check
    pub fn register(&mut self, category: Category, kind: PolicyKind, check: CheckFn) {
        self.checks.insert((category, kind), check);
    }

    /// Whether a policy is allowed on a category
    pub fn allows(&self, category: Category, kind: PolicyKind) -> bool {
        self.checks.contains_key(&(category, kind))
    }

    /// Policies allowed on a category, sorted by name
    pub fn allowed(&self, category: Category) -> Vec<PolicyKind> {
        let mut kinds: Vec<PolicyKind> = self
            .checks
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, kind)| *kind)
            .collect();
        kinds.sort();
        kinds
    }

    /// Compile a policy entry of a schema into a [`PolicyRule`].
    ///
    /// Fails when the policy is not allowed on the category or when the
    /// modifier does not have the shape the policy needs.
    pub fn compile(
        &self,
        type_name: &str,
        category: Category,
        policy: &str,
        modifier: &Value,
    ) -> Result<PolicyRule> {
        let kind = PolicyKind::from_name(policy)
            .filter(|kind| self.allows(category, *kind))
            .ok_or_else(|| SchemaError::UnknownPolicy {
                category: category.to_string(),
                policy: policy.to_string(),
            })?;

        let modifier = match kind {
            PolicyKind::Max | PolicyKind::Min => {
                let bound = modifier.as_f64().ok_or_else(|| {
                    SchemaError::malformed_policy(type_name, policy, "expected a number")
                })?;
                if category.counts_elements() && bound < 0.0 {
                    return Err(SchemaError::malformed_policy(
                        type_name,
                        policy,
                        "a length bound cannot be negative",
                    ));
                }
                Modifier::Bound(bound)
            }
            PolicyKind::Except | PolicyKind::Only => match modifier {
                Value::Array(values) => Modifier::Values(values.clone()),
                _ => {
                    return Err(SchemaError::malformed_policy(
                        type_name,
                        policy,
                        "expected a list of values",
                    ))
                }
            },
            PolicyKind::Strict => match modifier {
                Value::Bool(flag) => Modifier::Flag(*flag),
                _ => {
                    return Err(SchemaError::malformed_policy(
                        type_name,
                        policy,
                        "expected true or false",
                    ))
                }
            },
        };

        Ok(PolicyRule { kind, modifier })
    }

    /// Run one policy against a value
    pub fn check(
        &self,
        category: Category,
        rule: &PolicyRule,
        value: &Value,
        declared_fields: &[String],
    ) -> Result<PolicyOutcome> {
        let check = self
            .checks
            .get(&(category, rule.kind))
            .ok_or_else(|| SchemaError::UnknownPolicy {
                category: category.to_string(),
                policy: rule.kind.to_string(),
            })?;

        Ok(check(&CheckInput {
            value,
            modifier: &rule.modifier,
            declared_fields,
        }))
    }
}

/// Standard check implementations
mod checks {
    use serde_json::Value;

    use super::{CheckInput, Modifier, PolicyOutcome};

    fn bound(input: &CheckInput<'_>) -> f64 {
        match input.modifier {
            Modifier::Bound(bound) => *bound,
            _ => f64::NAN,
        }
    }

    fn values<'a>(input: &CheckInput<'a>) -> &'a [Value] {
        match input.modifier {
            Modifier::Values(values) => values,
            _ => &[],
        }
    }

    /// Numbers compare by value so that `3` and `3.0` are the same entry
    fn same_value(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => x == y,
            },
            _ => a == b,
        }
    }

    fn listed(value: &Value, list: &[Value]) -> bool {
        list.iter().any(|entry| same_value(value, entry))
    }

    fn display(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn not_allowed(value: &Value) -> PolicyOutcome {
        PolicyOutcome::Failed(format!("Value '{}' is not allowed.", display(value)))
    }

    fn element_count(value: &Value) -> Option<usize> {
        match value {
            Value::Array(items) => Some(items.len()),
            Value::Object(map) => Some(map.len()),
            _ => None,
        }
    }

    pub(super) fn scalar_except(input: &CheckInput<'_>) -> PolicyOutcome {
        if listed(input.value, values(input)) {
            not_allowed(input.value)
        } else {
            PolicyOutcome::Passed
        }
    }

    pub(super) fn scalar_only(input: &CheckInput<'_>) -> PolicyOutcome {
        if listed(input.value, values(input)) {
            PolicyOutcome::Passed
        } else {
            not_allowed(input.value)
        }
    }

    pub(super) fn array_except(input: &CheckInput<'_>) -> PolicyOutcome {
        let list = values(input);
        let items = input.value.as_array().map(Vec::as_slice).unwrap_or_default();
        match items.iter().find(|item| listed(item, list)) {
            Some(item) => not_allowed(item),
            None => PolicyOutcome::Passed,
        }
    }

    pub(super) fn array_only(input: &CheckInput<'_>) -> PolicyOutcome {
        let list = values(input);
        let items = input.value.as_array().map(Vec::as_slice).unwrap_or_default();
        match items.iter().find(|item| !listed(item, list)) {
            Some(item) => not_allowed(item),
            None => PolicyOutcome::Passed,
        }
    }

    pub(super) fn number_max(input: &CheckInput<'_>) -> PolicyOutcome {
        let max = bound(input);
        match input.value.as_f64() {
            Some(n) if n <= max => PolicyOutcome::Passed,
            Some(_) => PolicyOutcome::Failed(format!("Value is greater than {}.", max)),
            None => PolicyOutcome::Failed("Value is not a number.".to_string()),
        }
    }

    pub(super) fn number_min(input: &CheckInput<'_>) -> PolicyOutcome {
        let min = bound(input);
        match input.value.as_f64() {
            Some(n) if n >= min => PolicyOutcome::Passed,
            Some(_) => PolicyOutcome::Failed(format!("Value is lower than {}.", min)),
            None => PolicyOutcome::Failed("Value is not a number.".to_string()),
        }
    }

    pub(super) fn length_max(input: &CheckInput<'_>) -> PolicyOutcome {
        let max = bound(input);
        match input.value.as_str() {
            Some(s) if s.chars().count() as f64 <= max => PolicyOutcome::Passed,
            Some(_) => PolicyOutcome::Failed(format!("Value is longer than {}.", max)),
            None => PolicyOutcome::Failed("Value is not a string.".to_string()),
        }
    }

    pub(super) fn length_min(input: &CheckInput<'_>) -> PolicyOutcome {
        let min = bound(input);
        match input.value.as_str() {
            Some(s) if s.chars().count() as f64 >= min => PolicyOutcome::Passed,
            Some(_) => PolicyOutcome::Failed(format!("Value is shorter than {}.", min)),
            None => PolicyOutcome::Failed("Value is not a string.".to_string()),
        }
    }

    pub(super) fn count_max(input: &CheckInput<'_>) -> PolicyOutcome {
        let max = bound(input);
        match element_count(input.value) {
            Some(count) if count as f64 <= max => PolicyOutcome::Passed,
            Some(_) => PolicyOutcome::Failed(format!("The number of elements is greater than {}.", max)),
            None => PolicyOutcome::Failed("Value has no elements to count.".to_string()),
        }
    }

    pub(super) fn count_min(input: &CheckInput<'_>) -> PolicyOutcome {
        let min = bound(input);
        match element_count(input.value) {
            Some(count) if count as f64 >= min => PolicyOutcome::Passed,
            Some(_) => PolicyOutcome::Failed(format!("The number of elements is lower than {}.", min)),
            None => PolicyOutcome::Failed("Value has no elements to count.".to_string()),
        }
    }

    pub(super) fn structure_strict(input: &CheckInput<'_>) -> PolicyOutcome {
        if !matches!(input.modifier, Modifier::Flag(true)) {
            return PolicyOutcome::Passed;
        }

        let Some(object) = input.value.as_object() else {
            return PolicyOutcome::Passed;
        };

        let unknown: Vec<&str> = object
            .keys()
            .filter(|key| !input.declared_fields.iter().any(|field| field == *key))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            PolicyOutcome::Passed
        } else {
            PolicyOutcome::Failed(format!("Unknown fields: '{}'.", unknown.join("', '")))
        }
    }
}
