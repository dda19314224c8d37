//! JSON Schema graph
//!
//! A tagged-variant view of a draft-07 JSON Schema document as produced and
//! consumed by the converters. Named types live in [`Definitions`] and are
//! reached through `$ref`, which keeps self-referential schemas finite.

use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;

use super::keywords::XsdKeywords;
use crate::error::{Error, Result};
use crate::namespaces::NamespaceContext;
use crate::xsd::{BuiltinType, JsonType};

/// A complete JSON Schema document
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    /// `$schema`
    pub schema_uri: Option<String>,
    /// `$id`
    pub id: Option<String>,
    /// `@xsdNamespaces`
    pub namespaces: NamespaceContext,
    /// `@xsdSchemaAttributes` (`targetNamespace`, form defaults)
    pub schema_attributes: IndexMap<String, String>,
    /// Root node: an object whose properties are the global declarations
    pub root: JsonSchemaNode,
    /// `definitions`: named types
    pub definitions: Definitions,
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self {
            schema_uri: Some(crate::JSON_SCHEMA_DRAFT_07.to_string()),
            id: None,
            namespaces: NamespaceContext::new(),
            schema_attributes: IndexMap::new(),
            root: JsonSchemaNode::object(ObjectNode::default()),
            definitions: Definitions::new(),
        }
    }
}

impl JsonSchema {
    /// Create an empty draft-07 document
    pub fn new() -> Self {
        Self::default()
    }

    /// Root properties (global elements and attributes)
    pub fn root_properties(&self) -> Option<&IndexMap<String, JsonSchemaNode>> {
        match &self.root.kind {
            NodeKind::Object(object) => Some(&object.properties),
            _ => None,
        }
    }

    /// Resolve a `$ref` string to the node it points at
    pub fn resolve_ref(&self, reference: &str) -> Result<&JsonSchemaNode> {
        self.resolve_target(&RefTarget::parse(reference)?)
    }

    /// Resolve a parsed reference target
    pub fn resolve_target(&self, target: &RefTarget) -> Result<&JsonSchemaNode> {
        match target {
            RefTarget::Definition(name) => self.definitions.resolve(name),
            RefTarget::Property(name) => self
                .root_properties()
                .and_then(|properties| properties.get(name))
                .ok_or_else(|| Error::unresolved(name.clone())),
        }
    }
}

/// Named definitions addressed by `#/definitions/<name>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions {
    entries: IndexMap<String, JsonSchemaNode>,
}

impl Definitions {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a definition by name
    pub fn resolve(&self, name: &str) -> Result<&JsonSchemaNode> {
        self.entries.get(name).ok_or_else(|| Error::unresolved(name))
    }

    /// Look up a definition
    pub fn get(&self, name: &str) -> Option<&JsonSchemaNode> {
        self.entries.get(name)
    }

    /// Look up a definition together with its stored name
    pub fn get_key_value(&self, name: &str) -> Option<(&str, &JsonSchemaNode)> {
        self.entries.get_key_value(name).map(|(k, v)| (k.as_str(), v))
    }

    /// Whether a definition exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Add or replace a definition
    pub fn insert(&mut self, name: impl Into<String>, node: JsonSchemaNode) {
        self.entries.insert(name.into(), node);
    }

    /// Remove a definition, keeping the order of the others
    pub fn remove(&mut self, name: &str) -> Option<JsonSchemaNode> {
        self.entries.shift_remove(name)
    }

    /// Iterate definitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonSchemaNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate definitions mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut JsonSchemaNode)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Definition at an insertion index
    pub fn get_index(&self, index: usize) -> Option<(&str, &JsonSchemaNode)> {
        self.entries.get_index(index).map(|(k, v)| (k.as_str(), v))
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no definitions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, JsonSchemaNode)> for Definitions {
    fn from_iter<I: IntoIterator<Item = (String, JsonSchemaNode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Target of a `$ref`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// `#/definitions/<name>` (or `#/$defs/<name>`): a named type
    Definition(String),
    /// `#/properties/<name>`: a global element or attribute
    Property(String),
}

impl RefTarget {
    /// Parse a `$ref` value
    pub fn parse(reference: &str) -> Result<RefTarget> {
        let unescape = |s: &str| s.replace("~1", "/").replace("~0", "~");

        if let Some(name) = reference
            .strip_prefix("#/definitions/")
            .or_else(|| reference.strip_prefix("#/$defs/"))
        {
            if !name.is_empty() && !name.contains('/') {
                return Ok(RefTarget::Definition(unescape(name)));
            }
        }
        if let Some(name) = reference.strip_prefix("#/properties/") {
            if !name.is_empty() && !name.contains('/') {
                return Ok(RefTarget::Property(unescape(name)));
            }
        }
        Err(Error::malformed(format!("unsupported $ref '{}'", reference)))
    }

    /// JSON pointer form
    pub fn to_pointer(&self) -> String {
        let escape = |s: &str| s.replace('~', "~0").replace('/', "~1");
        match self {
            RefTarget::Definition(name) => format!("#/definitions/{}", escape(name)),
            RefTarget::Property(name) => format!("#/properties/{}", escape(name)),
        }
    }

    /// Referenced name
    pub fn name(&self) -> &str {
        match self {
            RefTarget::Definition(name) | RefTarget::Property(name) => name,
        }
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

/// One node of the JSON Schema graph
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchemaNode {
    /// Shape of the node
    pub kind: NodeKind,
    /// XSD-preserving keywords
    pub keywords: XsdKeywords,
    /// `default`
    pub default: Option<Value>,
    /// `const`
    pub constant: Option<Value>,
    /// Keywords with no XSD counterpart, kept verbatim
    pub extra: IndexMap<String, Value>,
}

impl JsonSchemaNode {
    /// Create a node of the given shape
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            keywords: XsdKeywords::default(),
            default: None,
            constant: None,
            extra: IndexMap::new(),
        }
    }

    /// `{}`
    pub fn any() -> Self {
        Self::new(NodeKind::Any)
    }

    /// Object node
    pub fn object(object: ObjectNode) -> Self {
        Self::new(NodeKind::Object(object))
    }

    /// Array node
    pub fn array(array: ArrayNode) -> Self {
        Self::new(NodeKind::Array(array))
    }

    /// Primitive node
    pub fn primitive(primitive: PrimitiveNode) -> Self {
        Self::new(NodeKind::Primitive(primitive))
    }

    /// Combinator node
    pub fn combinator(kind: CombinatorKind, branches: Vec<JsonSchemaNode>) -> Self {
        Self::new(NodeKind::Combinator(CombinatorNode { kind, branches }))
    }

    /// `$ref` node
    pub fn reference(target: &RefTarget) -> Self {
        Self::new(NodeKind::Reference(target.to_pointer()))
    }

    /// Builder-style keywords
    pub fn with_keywords(mut self, keywords: XsdKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    /// Parsed `$ref` target for reference nodes
    pub fn ref_target(&self) -> Option<Result<RefTarget>> {
        match &self.kind {
            NodeKind::Reference(reference) => Some(RefTarget::parse(reference)),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Child nodes in traversal order: properties, then array items, then
    /// combinator branches
    pub fn children(&self) -> Vec<(String, &JsonSchemaNode)> {
        match &self.kind {
            NodeKind::Object(object) => object
                .properties
                .iter()
                .map(|(key, node)| (format!("properties/{}", key), node))
                .collect(),
            NodeKind::Array(array) => match &array.items {
                Some(Items::Single(node)) => vec![("items".to_string(), node.as_ref())],
                Some(Items::Tuple(nodes)) => nodes
                    .iter()
                    .enumerate()
                    .map(|(i, node)| (format!("items/{}", i), node))
                    .collect(),
                None => Vec::new(),
            },
            NodeKind::Combinator(combinator) => combinator
                .branches
                .iter()
                .enumerate()
                .map(|(i, node)| (format!("{}/{}", combinator.kind.keyword(), i), node))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Mutable child nodes in traversal order
    pub fn children_mut(&mut self) -> Vec<&mut JsonSchemaNode> {
        match &mut self.kind {
            NodeKind::Object(object) => object.properties.values_mut().collect(),
            NodeKind::Array(array) => match &mut array.items {
                Some(Items::Single(node)) => vec![node.as_mut()],
                Some(Items::Tuple(nodes)) => nodes.iter_mut().collect(),
                None => Vec::new(),
            },
            NodeKind::Combinator(combinator) => combinator.branches.iter_mut().collect(),
            _ => Vec::new(),
        }
    }
}

/// Shape of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `"type": "object"`
    Object(ObjectNode),
    /// `"type": "array"`
    Array(ArrayNode),
    /// `"type"` is a primitive type
    Primitive(PrimitiveNode),
    /// `allOf`, `anyOf` or `oneOf`
    Combinator(CombinatorNode),
    /// `$ref` (verbatim pointer)
    Reference(String),
    /// No type constraint
    Any,
}

/// Object payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectNode {
    /// `properties`, in document order
    pub properties: IndexMap<String, JsonSchemaNode>,
    /// `required`
    pub required: Vec<String>,
    /// `additionalProperties` when given as a boolean
    pub additional_properties: Option<bool>,
}

impl ObjectNode {
    /// Whether a property is listed in `required`
    pub fn is_required(&self, key: &str) -> bool {
        self.required.iter().any(|r| r == key)
    }
}

/// `items` of an array
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    /// One schema for every item
    Single(Box<JsonSchemaNode>),
    /// Positional schemas
    Tuple(Vec<JsonSchemaNode>),
}

/// Array payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayNode {
    /// `items`
    pub items: Option<Items>,
    /// `minItems`
    pub min_items: Option<u64>,
    /// `maxItems`
    pub max_items: Option<u64>,
}

/// Primitive payload
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveNode {
    /// `type`
    pub json_type: JsonType,
    /// `format`
    pub format: Option<String>,
    /// `minLength`
    pub min_length: Option<u64>,
    /// `maxLength`
    pub max_length: Option<u64>,
    /// `pattern`
    pub pattern: Option<String>,
    /// `enum`
    pub enumeration: Vec<Value>,
    /// `minimum`
    pub minimum: Option<Number>,
    /// `maximum`
    pub maximum: Option<Number>,
    /// `exclusiveMinimum`
    pub exclusive_minimum: Option<Number>,
    /// `exclusiveMaximum`
    pub exclusive_maximum: Option<Number>,
    /// `multipleOf`
    pub multiple_of: Option<Number>,
}

impl PrimitiveNode {
    /// Primitive of a JSON type without constraints
    pub fn new(json_type: JsonType) -> Self {
        Self {
            json_type,
            format: None,
            min_length: None,
            max_length: None,
            pattern: None,
            enumeration: Vec::new(),
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            multiple_of: None,
        }
    }

    /// Primitive carrying the `type`/`format` pair of a built-in
    pub fn for_builtin(builtin: BuiltinType) -> Self {
        let mut node = Self::new(builtin.json_type().unwrap_or(JsonType::String));
        node.format = builtin.json_format().map(str::to_string);
        node
    }

    /// The built-in implied by `type` and `format`
    pub fn implied_builtin(&self) -> BuiltinType {
        BuiltinType::implied_by(self.json_type, self.format.as_deref())
    }

    /// Whether any value constraint is present
    pub fn has_constraints(&self) -> bool {
        self.min_length.is_some()
            || self.max_length.is_some()
            || self.pattern.is_some()
            || !self.enumeration.is_empty()
            || self.minimum.is_some()
            || self.maximum.is_some()
            || self.exclusive_minimum.is_some()
            || self.exclusive_maximum.is_some()
            || self.multiple_of.is_some()
    }
}

/// Combinator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    /// `allOf`
    AllOf,
    /// `anyOf`
    AnyOf,
    /// `oneOf`
    OneOf,
}

impl CombinatorKind {
    /// Keyword name
    pub fn keyword(&self) -> &'static str {
        match self {
            CombinatorKind::AllOf => "allOf",
            CombinatorKind::AnyOf => "anyOf",
            CombinatorKind::OneOf => "oneOf",
        }
    }

    /// All kinds in keyword lookup order
    pub const ALL: [CombinatorKind; 3] = [CombinatorKind::AllOf, CombinatorKind::OneOf, CombinatorKind::AnyOf];
}

/// Combinator payload
#[derive(Debug, Clone, PartialEq)]
pub struct CombinatorNode {
    /// Which combinator
    pub kind: CombinatorKind,
    /// Branches in order
    pub branches: Vec<JsonSchemaNode>,
}
