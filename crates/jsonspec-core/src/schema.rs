//! Schema graph
//!
//! A [`Schema`] is the compiled form of a schema document:
//!
//! ```json
//! {
//!     "types": {
//!         "Pos": { "x": "+int", "y": "+int" },
//!         "Path": "Pos[]"
//!     },
//!     "root": "Path",
//!     "policies": {
//!         "Path": { "max": 16 }
//!     }
//! }
//! ```
//!
//! Loading checks the whole graph up front. Once a schema exists every name
//! it mentions is defined, every definition is reachable, no type is defined
//! in terms of itself without descending into a child value, and every policy
//! has been compiled against the [`PolicyRegistry`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::grammar::{is_primitive, AliasSpec, FieldRef, Pattern, TypeGrammar};
use crate::policy::{Category, PolicyRegistry, PolicyRule};

/// Owner name used for the root reference in errors and policies
pub const ROOT: &str = "ROOT";

/// Shape of one named type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// JSON object with named fields, in declaration order
    Structure { fields: Vec<(String, FieldRef)> },
    /// First matching alternative wins
    Union { alternatives: Vec<String> },
    /// Another type, possibly decorated as a container
    Alias { target: FieldRef },
    /// String matching a regular expression
    Pattern { pattern: Pattern },
}

impl TypeDescriptor {
    /// Descriptor kind as used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            TypeDescriptor::Structure { .. } => "structure",
            TypeDescriptor::Union { .. } => "union",
            TypeDescriptor::Alias { .. } => "alias",
            TypeDescriptor::Pattern { .. } => "pattern",
        }
    }

    /// Declared field names of a structure, empty for everything else
    pub fn field_names(&self) -> Vec<String> {
        match self {
            TypeDescriptor::Structure { fields } => {
                fields.iter().map(|(name, _)| name.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Types reached at the same path, without descending into a child value
    fn same_level_refs(&self) -> Vec<&str> {
        match self {
            TypeDescriptor::Union { alternatives } => {
                alternatives.iter().map(String::as_str).collect()
            }
            TypeDescriptor::Alias { target } if target.container.is_none() => {
                vec![target.type_name.as_str()]
            }
            _ => Vec::new(),
        }
    }
}

/// Policies compiled for one type
#[derive(Debug, Clone, PartialEq)]
pub struct TypePolicies {
    /// Category the rules were checked against
    pub category: Category,
    /// Rules in declaration order
    pub rules: Vec<PolicyRule>,
    /// Declared fields, for structure policies
    pub declared_fields: Vec<String>,
}

/// Compiled, immutable type graph
#[derive(Debug, Clone)]
pub struct Schema {
    root: AliasSpec,
    types: HashMap<String, TypeDescriptor>,
    order: Vec<String>,
    policies: HashMap<String, TypePolicies>,
    root_policies: Option<TypePolicies>,
    registry: PolicyRegistry,
}

impl Schema {
    /// Build a schema from an already parsed document
    pub fn from_value(document: &Value) -> Result<Self> {
        Self::from_value_with_registry(document, PolicyRegistry::new())
    }

    /// Build a schema from JSON text
    pub fn from_str(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text).map_err(SchemaError::InvalidJson)?;
        Self::from_value(&document)
    }

    /// Build a schema from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = read_json_file(path)?;
        tracing::debug!(path = %path.display(), "Loading schema file");
        Self::from_value(&document)
    }

    /// Build a schema, compiling policies against a custom registry
    pub fn from_value_with_registry(document: &Value, registry: PolicyRegistry) -> Result<Self> {
        let spec = document
            .as_object()
            .ok_or_else(|| SchemaError::malformed("Specification is not an object."))?;

        let types_value = spec
            .get("types")
            .ok_or_else(|| SchemaError::malformed("Specification has no field 'types'."))?;
        let types_object = types_value
            .as_object()
            .ok_or_else(|| SchemaError::malformed("Specification field 'types' is not an object."))?;
        let root_value = spec
            .get("root")
            .ok_or_else(|| SchemaError::malformed("Specification has no field 'root'."))?;
        let root_spec = root_value
            .as_str()
            .ok_or_else(|| SchemaError::malformed("Specification field 'root' is not a string."))?;

        let mut grammar = TypeGrammar::new();
        let mut types = HashMap::with_capacity(types_object.len());
        let mut order = Vec::with_capacity(types_object.len());

        for (name, type_spec) in types_object {
            let descriptor = load_type(&mut grammar, name, type_spec)?;
            order.push(name.clone());
            types.insert(name.clone(), descriptor);
        }

        let root = grammar.expand_alias(ROOT, root_spec)?;

        check_integrity(&grammar, &types, &order)?;
        check_cycles(&types, &order)?;

        let mut schema = Self {
            root,
            types,
            order,
            policies: HashMap::new(),
            root_policies: None,
            registry,
        };

        match spec.get("policies") {
            None => {}
            Some(Value::Object(entries)) => schema.load_policies(entries)?,
            Some(_) => {
                return Err(SchemaError::malformed(
                    "Specification field 'policies' is not an object.",
                ))
            }
        }

        tracing::debug!(
            types = schema.order.len(),
            policies = schema.policies.len() + usize::from(schema.root_policies.is_some()),
            root = %schema.root,
            "Schema loaded"
        );

        Ok(schema)
    }

    fn load_policies(&mut self, entries: &Map<String, Value>) -> Result<()> {
        for (owner, rules) in entries {
            let rules = rules.as_object().ok_or_else(|| {
                SchemaError::malformed(format!("Policies of type '{}' are not an object.", owner))
            })?;

            let (category, declared_fields) = if let Some(descriptor) = self.types.get(owner) {
                (category_of(owner, descriptor)?, descriptor.field_names())
            } else if owner == ROOT {
                (root_category(&self.root)?, Vec::new())
            } else {
                return Err(SchemaError::UndefinedType {
                    name: owner.clone(),
                });
            };

            let compiled = rules
                .iter()
                .map(|(policy, modifier)| self.registry.compile(owner, category, policy, modifier))
                .collect::<Result<Vec<_>>>()?;

            let policies = TypePolicies {
                category,
                rules: compiled,
                declared_fields,
            };

            if self.types.contains_key(owner) {
                self.policies.insert(owner.clone(), policies);
            } else {
                self.root_policies = Some(policies);
            }
        }
        Ok(())
    }

    /// Root reference
    pub fn root(&self) -> &AliasSpec {
        &self.root
    }

    /// Look up a defined type
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Check if a type is defined
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Defined type names in declaration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Defined types in declaration order
    pub fn types(&self) -> impl Iterator<Item = (&str, &TypeDescriptor)> {
        self.order
            .iter()
            .filter_map(|name| self.types.get(name).map(|d| (name.as_str(), d)))
    }

    /// Number of defined types
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no types are defined
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Policies attached to a defined type
    pub fn policies(&self, name: &str) -> Option<&TypePolicies> {
        self.policies.get(name)
    }

    /// Policies attached to an anonymous root through the `ROOT` key
    pub fn root_policies(&self) -> Option<&TypePolicies> {
        self.root_policies.as_ref()
    }

    /// Registry the policies were compiled against
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }
}

/// Read and parse a JSON file, distinguishing missing, unreadable and invalid files
pub(crate) fn read_json_file(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(SchemaError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| SchemaError::InvalidJsonFile {
        path: path.to_path_buf(),
        source,
    })
}

fn load_type(grammar: &mut TypeGrammar, name: &str, spec: &Value) -> Result<TypeDescriptor> {
    if is_primitive(name) {
        return Err(SchemaError::MalformedTypeSpec {
            name: name.to_string(),
            detail: Some(format!("'{}' is a primitive type and cannot be redefined.", name)),
        });
    }

    match spec {
        Value::Object(fields) => {
            let fields = fields
                .iter()
                .map(|(field, field_spec)| {
                    let field_spec = field_spec.as_str().ok_or_else(|| SchemaError::MalformedFieldSpec {
                        owner: name.to_string(),
                        field: field.clone(),
                        spec: field_spec.to_string(),
                    })?;
                    Ok((field.clone(), grammar.expand_field(name, field, field_spec)?))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TypeDescriptor::Structure { fields })
        }
        Value::Array(members) => {
            if members.is_empty() {
                return Err(SchemaError::MalformedTypeSpec {
                    name: name.to_string(),
                    detail: Some("A union needs at least one alternative.".to_string()),
                });
            }

            let alternatives = members
                .iter()
                .map(|member| {
                    let member = member.as_str().ok_or_else(|| SchemaError::MalformedTypeSpec {
                        name: name.to_string(),
                        detail: Some(format!("Union alternative {} is not a type name.", member)),
                    })?;
                    grammar.record(member);
                    Ok(member.to_string())
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TypeDescriptor::Union { alternatives })
        }
        Value::String(alias) => match grammar.expand_alias(name, alias)? {
            AliasSpec::Type(target) => Ok(TypeDescriptor::Alias { target }),
            AliasSpec::Pattern(pattern) => Ok(TypeDescriptor::Pattern { pattern }),
        },
        _ => Err(SchemaError::malformed_type(name)),
    }
}

fn check_integrity(
    grammar: &TypeGrammar,
    types: &HashMap<String, TypeDescriptor>,
    order: &[String],
) -> Result<()> {
    if let Some(name) = grammar.used_types().find(|name| !types.contains_key(*name)) {
        return Err(SchemaError::UndefinedType {
            name: name.to_string(),
        });
    }

    let used: HashSet<&str> = grammar.used_types().collect();
    if let Some(name) = order.iter().find(|name| !used.contains(name.as_str())) {
        return Err(SchemaError::UnusedType { name: name.clone() });
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn check_cycles(types: &HashMap<String, TypeDescriptor>, order: &[String]) -> Result<()> {
    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    for name in order {
        visit(name, types, &mut marks, &mut stack)?;
    }
    Ok(())
}

fn visit<'a>(
    name: &'a str,
    types: &'a HashMap<String, TypeDescriptor>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
) -> Result<()> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut chain: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
            chain.push(name.to_string());
            return Err(SchemaError::CyclicType {
                name: name.to_string(),
                chain,
            });
        }
        None => {}
    }

    marks.insert(name, Mark::Visiting);
    stack.push(name);
    if let Some(descriptor) = types.get(name) {
        for next in descriptor.same_level_refs() {
            visit(next, types, marks, stack)?;
        }
    }
    stack.pop();
    marks.insert(name, Mark::Done);

    Ok(())
}

fn category_of(name: &str, descriptor: &TypeDescriptor) -> Result<Category> {
    match descriptor {
        TypeDescriptor::Structure { .. } => Ok(Category::Structure),
        TypeDescriptor::Alias { target } => target_category(name, target),
        TypeDescriptor::Union { .. } | TypeDescriptor::Pattern { .. } => {
            Err(SchemaError::PolicyUnsupported {
                name: name.to_string(),
                kind: descriptor.kind().to_string(),
            })
        }
    }
}

fn root_category(root: &AliasSpec) -> Result<Category> {
    match root {
        AliasSpec::Type(target) => target_category(ROOT, target),
        AliasSpec::Pattern(_) => Err(SchemaError::PolicyUnsupported {
            name: ROOT.to_string(),
            kind: "pattern".to_string(),
        }),
    }
}

fn target_category(name: &str, target: &FieldRef) -> Result<Category> {
    if let Some(container) = target.container {
        return Ok(Category::for_container(container));
    }

    target
        .primitive()
        .map(Category::Primitive)
        .ok_or_else(|| SchemaError::PolicyTarget {
            name: name.to_string(),
            target: target.type_name.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Container, Primitive};
    use crate::policy::{Modifier, PolicyKind};
    use serde_json::json;

    fn load(document: Value) -> Result<Schema> {
        Schema::from_value(&document)
    }

    #[test]
    fn test_load_structure() {
        let schema = load(json!({
            "types": { "Pos": { "x": "+int", "y": "-int", "label": "string" } },
            "root": "Pos"
        }))
        .unwrap();

        assert_eq!(schema.len(), 1);
        assert_eq!(schema.root(), &AliasSpec::Type(FieldRef::named("Pos")));

        match schema.get("Pos").unwrap() {
            TypeDescriptor::Structure { fields } => {
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["x", "y", "label"]);
                assert!(fields[0].1.required);
                assert!(!fields[1].1.required);
                assert!(!fields[2].1.required);
            }
            other => panic!("expected a structure, got {:?}", other),
        }
    }

    #[test]
    fn test_descriptor_variants() {
        let schema = load(json!({
            "types": {
                "Doc": { "shape": "+Shape", "code": "Code", "tags": "Tags" },
                "Shape": ["Circle", "string"],
                "Circle": { "r": "+float" },
                "Code": "^[A-Z]{3}$",
                "Tags": "string[]"
            },
            "root": "Doc"
        }))
        .unwrap();

        assert_eq!(schema.get("Shape").unwrap().kind(), "union");
        assert_eq!(schema.get("Code").unwrap().kind(), "pattern");
        assert_eq!(
            schema.get("Tags").unwrap(),
            &TypeDescriptor::Alias {
                target: FieldRef::named("string").with_container(Container::ArrayOf)
            }
        );

        let names: Vec<&str> = schema.type_names().collect();
        assert_eq!(names, vec!["Doc", "Shape", "Circle", "Code", "Tags"]);
    }

    #[test]
    fn test_top_level_shape() {
        let err = load(json!({ "root": "int" })).unwrap_err();
        assert_eq!(err.to_string(), "Malformed schema: Specification has no field 'types'.");

        let err = load(json!({ "types": [], "root": "int" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed schema: Specification field 'types' is not an object."
        );

        let err = load(json!({ "types": {} })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedSchema(_)));

        let err = load(json!({ "types": {}, "root": 7 })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedSchema(_)));

        let err = load(json!([1, 2])).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedSchema(_)));

        let err = load(json!({ "types": {}, "root": "int", "policies": [] })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedSchema(_)));
    }

    #[test]
    fn test_primitive_root() {
        let schema = load(json!({ "types": {}, "root": "mixed" })).unwrap();
        assert!(schema.is_empty());
        assert_eq!(schema.root().to_string(), "mixed");
    }

    #[test]
    fn test_malformed_root() {
        let err = load(json!({ "types": {}, "root": "" })).unwrap_err();
        assert_eq!(err.to_string(), "Type 'ROOT' is not well defined.");

        let err = load(json!({ "types": {}, "root": "(" })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedTypeSpec { ref name, .. } if name == "ROOT"));
    }

    #[test]
    fn test_malformed_types() {
        let err = load(json!({ "types": { "A": 12 }, "root": "A" })).unwrap_err();
        assert_eq!(err.to_string(), "Type 'A' is not well defined.");

        let err = load(json!({ "types": { "A": { "x": 1 } }, "root": "A" })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedFieldSpec { ref field, .. } if field == "x"));

        let err = load(json!({ "types": { "A": { "x": "int[]" } }, "root": "A" })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedFieldSpec { .. }));

        let err = load(json!({ "types": { "A": [] }, "root": "A" })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedTypeSpec { .. }));

        let err = load(json!({ "types": { "A": ["int", 3] }, "root": "A" })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedTypeSpec { .. }));

        let err = load(json!({ "types": { "int": "string" }, "root": "int" })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedTypeSpec { ref name, .. } if name == "int"));
    }

    #[test]
    fn test_undefined_and_unused() {
        let err = load(json!({
            "types": { "A": { "b": "UndefinedType" } },
            "root": "A"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Type 'UndefinedType' is used but not defined.");

        let err = load(json!({
            "types": { "A": { "n": "int" }, "UnusedType": "string" },
            "root": "A"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Type 'UnusedType' is defined but not used.");

        let err = load(json!({ "types": {}, "root": "Missing[]" })).unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedType { ref name } if name == "Missing"));
    }

    #[test]
    fn test_undefined_reported_before_unused() {
        let err = load(json!({
            "types": { "A": { "b": "Nope" }, "Lonely": "int" },
            "root": "A"
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedType { ref name } if name == "Nope"));
    }

    #[test]
    fn test_non_descending_cycles_are_rejected() {
        let err = load(json!({
            "types": { "A": ["B", "int"], "B": "A" },
            "root": "A"
        }))
        .unwrap_err();
        match err {
            SchemaError::CyclicType { name, chain } => {
                assert_eq!(name, "A");
                assert_eq!(chain, vec!["A", "B", "A"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }

        let err = load(json!({ "types": { "Loop": "Loop" }, "root": "Loop" })).unwrap_err();
        assert_eq!(err.to_string(), "Type 'Loop' is defined in terms of itself (Loop -> Loop).");
    }

    #[test]
    fn test_recursive_shapes_are_allowed() {
        let schema = load(json!({
            "types": {
                "Node": { "value": "+int", "children": "Children" },
                "Children": "Node[]"
            },
            "root": "Node"
        }));
        assert!(schema.is_ok());

        let schema = load(json!({
            "types": { "Tree": ["int", "Branches"], "Branches": "Tree{}" },
            "root": "Tree"
        }));
        assert!(schema.is_ok());
    }

    #[test]
    fn test_policies_compile() {
        let schema = load(json!({
            "types": {
                "Pos": { "f1": "int", "f2": "int" },
                "Age": "int",
                "Ages": "Age[]",
                "Doc": { "pos": "Pos", "age": "Age", "ages": "Ages" }
            },
            "root": "Doc",
            "policies": {
                "Pos": { "strict": true },
                "Age": { "min": 0, "max": 150 },
                "Ages": { "max": 3 }
            }
        }))
        .unwrap();

        let pos = schema.policies("Pos").unwrap();
        assert_eq!(pos.category, Category::Structure);
        assert_eq!(pos.declared_fields, vec!["f1", "f2"]);

        let age = schema.policies("Age").unwrap();
        assert_eq!(age.category, Category::Primitive(Primitive::Int));
        let kinds: Vec<PolicyKind> = age.rules.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![PolicyKind::Min, PolicyKind::Max]);

        let ages = schema.policies("Ages").unwrap();
        assert_eq!(ages.category, Category::ArrayContainer);
        assert_eq!(ages.rules[0].modifier, Modifier::Bound(3.0));

        assert!(schema.policies("Doc").is_none());
    }

    #[test]
    fn test_policy_errors() {
        let load_policies = |policies: Value| {
            load(json!({
                "types": {
                    "Doc": { "a": "Age", "s": "Shape", "c": "Code", "p": "Pos", "m": "Map", "o": "Other" },
                    "Age": "int",
                    "Shape": ["int", "string"],
                    "Code": "^[a-z]+$",
                    "Pos": { "x": "int" },
                    "Map": "int{}",
                    "Other": "Pos"
                },
                "root": "Doc",
                "policies": policies
            }))
        };

        let err = load_policies(json!({ "Nope": { "max": 1 } })).unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedType { ref name } if name == "Nope"));

        let err = load_policies(json!({ "Age": { "strict": true } })).unwrap_err();
        assert_eq!(err.to_string(), "Unknown policy 'strict' for type category 'int'.");

        let err = load_policies(json!({ "Map": { "max": 1 } })).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownPolicy { ref category, .. } if category == "object-container"));

        let err = load_policies(json!({ "Shape": { "max": 1 } })).unwrap_err();
        assert_eq!(err.to_string(), "Type 'Shape' is a union and cannot carry policies.");

        let err = load_policies(json!({ "Code": { "max": 1 } })).unwrap_err();
        assert!(matches!(err, SchemaError::PolicyUnsupported { ref kind, .. } if kind == "pattern"));

        let err = load_policies(json!({ "Other": { "strict": true } })).unwrap_err();
        assert!(matches!(err, SchemaError::PolicyTarget { ref target, .. } if target == "Pos"));

        let err = load_policies(json!({ "Age": 3 })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedSchema(_)));

        let err = load_policies(json!({ "Age": { "max": "many" } })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedPolicy { .. }));
    }

    #[test]
    fn test_root_policies() {
        let schema = load(json!({
            "types": {},
            "root": "int[]",
            "policies": { "ROOT": { "max": 3 } }
        }))
        .unwrap();

        let root = schema.root_policies().unwrap();
        assert_eq!(root.category, Category::ArrayContainer);
        assert!(schema.policies(ROOT).is_none());

        let err = load(json!({
            "types": { "Pos": { "x": "int" } },
            "root": "Pos",
            "policies": { "ROOT": { "strict": true } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::PolicyTarget { ref name, .. } if name == "ROOT"));
    }

    #[test]
    fn test_from_str_invalid_json() {
        let err = Schema::from_str("{\"types\": {").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson(_)));
    }
}
