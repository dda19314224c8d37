//! JSON (de)serialization of the JSON Schema graph
//!
//! Keys are written in a fixed order (`$ref`/`type` first, custom keywords
//! last) so that output is reproducible and diffs stay small.

use std::path::Path;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use super::keywords::{names, XsdKeywords};
use super::model::{
    ArrayNode, CombinatorKind, Definitions, Items, JsonSchema, JsonSchemaNode, NodeKind,
    ObjectNode, PrimitiveNode,
};
use crate::error::{Error, Result};
use crate::namespaces::NamespaceContext;
use crate::xsd::JsonType;

impl JsonSchemaNode {
    /// Serialize into a JSON value
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();

        match &self.kind {
            NodeKind::Reference(reference) => {
                map.insert("$ref".into(), Value::from(reference.as_str()));
            }
            NodeKind::Object(object) => {
                map.insert("type".into(), Value::from("object"));
                let properties: Map<String, Value> = object
                    .properties
                    .iter()
                    .map(|(key, node)| (key.clone(), node.to_value()))
                    .collect();
                map.insert("properties".into(), Value::Object(properties));
                if !object.required.is_empty() {
                    map.insert(
                        "required".into(),
                        Value::Array(object.required.iter().map(|r| Value::from(r.as_str())).collect()),
                    );
                }
                if let Some(additional) = object.additional_properties {
                    map.insert("additionalProperties".into(), Value::Bool(additional));
                }
            }
            NodeKind::Array(array) => {
                map.insert("type".into(), Value::from("array"));
                match &array.items {
                    Some(Items::Single(node)) => {
                        map.insert("items".into(), node.to_value());
                    }
                    Some(Items::Tuple(nodes)) => {
                        map.insert("items".into(), Value::Array(nodes.iter().map(|n| n.to_value()).collect()));
                    }
                    None => {}
                }
                if let Some(min) = array.min_items {
                    map.insert("minItems".into(), Value::from(min));
                }
                if let Some(max) = array.max_items {
                    map.insert("maxItems".into(), Value::from(max));
                }
            }
            NodeKind::Primitive(primitive) => write_primitive(primitive, &mut map),
            NodeKind::Combinator(combinator) => {
                map.insert(
                    combinator.kind.keyword().into(),
                    Value::Array(combinator.branches.iter().map(|b| b.to_value()).collect()),
                );
            }
            NodeKind::Any => {}
        }

        if let Some(default) = &self.default {
            map.insert("default".into(), default.clone());
        }
        if let Some(constant) = &self.constant {
            map.insert("const".into(), constant.clone());
        }
        self.keywords.write(&mut map);
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }

        Value::Object(map)
    }

    /// Parse a JSON value
    pub fn from_value(value: &Value) -> Result<JsonSchemaNode> {
        match value {
            Value::Object(map) => Self::from_map(map.clone()),
            Value::Bool(true) => Ok(JsonSchemaNode::any()),
            _ => Err(Error::malformed(format!("expected a schema object, got {}", value))),
        }
    }

    fn from_map(mut map: Map<String, Value>) -> Result<JsonSchemaNode> {
        let keywords = XsdKeywords::read(&mut map)?;
        let default = map.remove("default");
        let constant = map.remove("const");

        let kind = if let Some(reference) = map.remove("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| Error::malformed("$ref must be a string"))?;
            NodeKind::Reference(reference.to_string())
        } else if let Some(kind) = CombinatorKind::ALL
            .into_iter()
            .find(|k| map.contains_key(k.keyword()))
        {
            let branches = match map.remove(kind.keyword()) {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(JsonSchemaNode::from_value)
                    .collect::<Result<Vec<_>>>()?,
                _ => return Err(Error::malformed(format!("{} must be an array", kind.keyword()))),
            };
            if branches.is_empty() {
                return Err(Error::malformed(format!("{} must not be empty", kind.keyword())));
            }
            NodeKind::Combinator(super::model::CombinatorNode { kind, branches })
        } else {
            let declared = match map.get("type") {
                Some(Value::String(t)) => Some(t.clone()),
                _ => None,
            };
            match declared.as_deref() {
                Some("object") => {
                    map.remove("type");
                    NodeKind::Object(read_object(&mut map)?)
                }
                Some("array") => {
                    map.remove("type");
                    NodeKind::Array(read_array(&mut map)?)
                }
                Some(other) => match JsonType::from_str(other) {
                    Some(json_type) => {
                        map.remove("type");
                        NodeKind::Primitive(read_primitive(&mut map, json_type)?)
                    }
                    // "null" and type arrays stay behind as extra keywords
                    None => NodeKind::Any,
                },
                None if map.contains_key("properties") => NodeKind::Object(read_object(&mut map)?),
                None if map.contains_key("items") => NodeKind::Array(read_array(&mut map)?),
                None => match map.get("enum").and_then(Value::as_array).and_then(|v| infer_type(v)) {
                    Some(json_type) => NodeKind::Primitive(read_primitive(&mut map, json_type)?),
                    None => NodeKind::Any,
                },
            }
        };

        Ok(JsonSchemaNode {
            kind,
            keywords,
            default,
            constant,
            extra: map.into_iter().collect(),
        })
    }
}

fn write_primitive(primitive: &PrimitiveNode, map: &mut Map<String, Value>) {
    map.insert("type".into(), Value::from(primitive.json_type.as_str()));
    if let Some(format) = &primitive.format {
        map.insert("format".into(), Value::from(format.as_str()));
    }
    if let Some(n) = primitive.min_length {
        map.insert("minLength".into(), Value::from(n));
    }
    if let Some(n) = primitive.max_length {
        map.insert("maxLength".into(), Value::from(n));
    }
    if let Some(pattern) = &primitive.pattern {
        map.insert("pattern".into(), Value::from(pattern.as_str()));
    }
    if !primitive.enumeration.is_empty() {
        map.insert("enum".into(), Value::Array(primitive.enumeration.clone()));
    }
    let numbers = [
        ("minimum", &primitive.minimum),
        ("exclusiveMinimum", &primitive.exclusive_minimum),
        ("maximum", &primitive.maximum),
        ("exclusiveMaximum", &primitive.exclusive_maximum),
        ("multipleOf", &primitive.multiple_of),
    ];
    for (key, number) in numbers {
        if let Some(n) = number {
            map.insert(key.into(), Value::Number(n.clone()));
        }
    }
}

fn infer_type(values: &[Value]) -> Option<JsonType> {
    let first = values.first()?;
    let json_type = match first {
        Value::String(_) => JsonType::String,
        Value::Bool(_) => JsonType::Boolean,
        Value::Number(n) if n.is_f64() => JsonType::Number,
        Value::Number(_) => JsonType::Integer,
        _ => return None,
    };
    let uniform = values.iter().all(|v| match json_type {
        JsonType::String => v.is_string(),
        JsonType::Boolean => v.is_boolean(),
        JsonType::Integer | JsonType::Number => v.is_number(),
    });
    uniform.then_some(json_type)
}

fn take_u64(map: &mut Map<String, Value>, key: &str) -> Result<Option<u64>> {
    match map.remove(key) {
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| Error::malformed(format!("{} must be a non-negative integer", key))),
        None => Ok(None),
    }
}

fn take_number(map: &mut Map<String, Value>, key: &str) -> Result<Option<Number>> {
    match map.remove(key) {
        Some(Value::Number(n)) => Ok(Some(n)),
        Some(_) => Err(Error::malformed(format!("{} must be a number", key))),
        None => Ok(None),
    }
}

fn read_object(map: &mut Map<String, Value>) -> Result<ObjectNode> {
    let mut object = ObjectNode::default();

    if let Some(properties) = map.remove("properties") {
        let properties = match properties {
            Value::Object(p) => p,
            _ => return Err(Error::malformed("properties must be an object")),
        };
        for (key, value) in properties {
            let node = JsonSchemaNode::from_value(&value)?;
            object.properties.insert(key, node);
        }
    }

    if let Some(required) = map.remove("required") {
        let required = required
            .as_array()
            .ok_or_else(|| Error::malformed("required must be an array"))?;
        for name in required {
            let name = name
                .as_str()
                .ok_or_else(|| Error::malformed("required entries must be strings"))?;
            object.required.push(name.to_string());
        }
    }

    // A schema-valued additionalProperties stays behind as an extra keyword
    if let Some(Value::Bool(additional)) = map.get("additionalProperties") {
        object.additional_properties = Some(*additional);
        map.remove("additionalProperties");
    }

    Ok(object)
}

fn read_array(map: &mut Map<String, Value>) -> Result<ArrayNode> {
    let items = match map.remove("items") {
        Some(Value::Array(values)) => Some(Items::Tuple(
            values
                .iter()
                .map(JsonSchemaNode::from_value)
                .collect::<Result<Vec<_>>>()?,
        )),
        Some(value) => Some(Items::Single(Box::new(JsonSchemaNode::from_value(&value)?))),
        None => None,
    };
    Ok(ArrayNode {
        items,
        min_items: take_u64(map, "minItems")?,
        max_items: take_u64(map, "maxItems")?,
    })
}

fn read_primitive(map: &mut Map<String, Value>, json_type: JsonType) -> Result<PrimitiveNode> {
    let mut primitive = PrimitiveNode::new(json_type);

    if let Some(format) = map.remove("format") {
        primitive.format = Some(
            format
                .as_str()
                .ok_or_else(|| Error::malformed("format must be a string"))?
                .to_string(),
        );
    }
    primitive.min_length = take_u64(map, "minLength")?;
    primitive.max_length = take_u64(map, "maxLength")?;
    if let Some(pattern) = map.remove("pattern") {
        primitive.pattern = Some(
            pattern
                .as_str()
                .ok_or_else(|| Error::malformed("pattern must be a string"))?
                .to_string(),
        );
    }
    if let Some(values) = map.remove("enum") {
        match values {
            Value::Array(values) => primitive.enumeration = values,
            _ => return Err(Error::malformed("enum must be an array")),
        }
    }
    primitive.minimum = take_number(map, "minimum")?;
    primitive.maximum = take_number(map, "maximum")?;
    // Draft-04 boolean exclusive bounds stay behind as extra keywords
    if map.get("exclusiveMinimum").map(Value::is_number).unwrap_or(false) {
        primitive.exclusive_minimum = take_number(map, "exclusiveMinimum")?;
    }
    if map.get("exclusiveMaximum").map(Value::is_number).unwrap_or(false) {
        primitive.exclusive_maximum = take_number(map, "exclusiveMaximum")?;
    }
    primitive.multiple_of = take_number(map, "multipleOf")?;

    Ok(primitive)
}

impl JsonSchema {
    /// Serialize into a JSON value
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();

        if let Some(uri) = &self.schema_uri {
            map.insert("$schema".into(), Value::from(uri.as_str()));
        }
        if let Some(id) = &self.id {
            map.insert("$id".into(), Value::from(id.as_str()));
        }
        if !self.namespaces.is_empty() {
            let mut namespaces = Map::new();
            if let Some(default_ns) = self.namespaces.get_default_namespace() {
                namespaces.insert(String::new(), Value::from(default_ns));
            }
            for (prefix, uri) in self.namespaces.iter() {
                namespaces.insert(prefix.to_string(), Value::from(uri));
            }
            map.insert(names::NAMESPACES.into(), Value::Object(namespaces));
        }
        if !self.schema_attributes.is_empty() {
            let attributes: Map<String, Value> = self
                .schema_attributes
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            map.insert(names::SCHEMA_ATTRIBUTES.into(), Value::Object(attributes));
        }

        if let Value::Object(root) = self.root.to_value() {
            map.extend(root);
        }

        if !self.definitions.is_empty() {
            let definitions: Map<String, Value> = self
                .definitions
                .iter()
                .map(|(name, node)| (name.to_string(), node.to_value()))
                .collect();
            map.insert("definitions".into(), Value::Object(definitions));
        }

        Value::Object(map)
    }

    /// Parse a JSON value
    pub fn from_value(value: &Value) -> Result<JsonSchema> {
        let mut map = value
            .as_object()
            .cloned()
            .ok_or_else(|| Error::malformed("a JSON Schema document must be an object"))?;

        let schema_uri = match map.remove("$schema") {
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(Error::malformed("$schema must be a string")),
            None => None,
        };
        let id = match map.remove("$id") {
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(Error::malformed("$id must be a string")),
            None => None,
        };

        let mut namespaces = NamespaceContext::new();
        if let Some(value) = map.remove(names::NAMESPACES) {
            let entries = value
                .as_object()
                .ok_or_else(|| Error::malformed(format!("{} must be an object", names::NAMESPACES)))?;
            for (prefix, uri) in entries {
                let uri = uri
                    .as_str()
                    .ok_or_else(|| Error::malformed("namespace URIs must be strings"))?;
                if prefix.is_empty() {
                    namespaces.set_default_namespace(uri);
                } else {
                    namespaces.add_prefix(prefix.clone(), uri);
                }
            }
        }

        let mut schema_attributes = IndexMap::new();
        if let Some(value) = map.remove(names::SCHEMA_ATTRIBUTES) {
            let entries = value.as_object().ok_or_else(|| {
                Error::malformed(format!("{} must be an object", names::SCHEMA_ATTRIBUTES))
            })?;
            for (key, value) in entries {
                let value = value
                    .as_str()
                    .ok_or_else(|| Error::malformed("schema attributes must be strings"))?;
                schema_attributes.insert(key.clone(), value.to_string());
            }
        }

        let mut definitions = Definitions::new();
        for key in ["definitions", "$defs"] {
            if let Some(value) = map.remove(key) {
                let entries = match value {
                    Value::Object(entries) => entries,
                    _ => return Err(Error::malformed(format!("{} must be an object", key))),
                };
                for (name, value) in entries {
                    definitions.insert(name, JsonSchemaNode::from_value(&value)?);
                }
            }
        }

        let root = JsonSchemaNode::from_map(map)?;

        Ok(JsonSchema {
            schema_uri,
            id,
            namespaces,
            schema_attributes,
            root,
            definitions,
        })
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// Parse a JSON Schema document from a string
    pub fn from_json_str(json: &str) -> Result<JsonSchema> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a JSON Schema document from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<JsonSchema> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Write the document as pretty-printed JSON
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

impl Serialize for JsonSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        JsonSchema::from_value(&value).map_err(de::Error::custom)
    }
}

impl Serialize for JsonSchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
