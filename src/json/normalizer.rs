//! JSON Schema normalization
//!
//! Brings a JSON Schema graph into the canonical shape the reverse converter
//! expects:
//!
//! - every `$ref` must resolve; definition pointers are rewritten to the
//!   `#/definitions/<name>` form
//! - single-branch combinators without an `@xsdStructure` marker are
//!   replaced by their branch
//! - unmarked `allOf` branches nested in an unmarked `allOf` are spliced
//!   into the parent
//! - `required` lists are sorted and deduplicated (property order is kept)
//! - chains of alias definitions (a definition that is only a `$ref`) are
//!   checked for cycles and, when enabled, collapsed onto their target
//!
//! Normalization is idempotent: normalizing a normalized graph is a no-op.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::model::{CombinatorKind, JsonSchema, JsonSchemaNode, NodeKind, RefTarget};
use crate::error::{Converted, Error, LossyConversionWarning, Result};

/// Normalizer options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizerConfig {
    collapse_aliases: bool,
}

impl NormalizerConfig {
    /// Default options (aliases are kept)
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether alias definitions are collapsed onto their targets
    pub fn collapse_aliases(&self) -> bool {
        self.collapse_aliases
    }

    /// Collapse alias definitions (drops named simple types, lossy)
    pub fn with_collapse_aliases(mut self, collapse: bool) -> Self {
        self.collapse_aliases = collapse;
        self
    }
}

/// Canonicalizes JSON Schema graphs
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    /// Create a normalizer
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// The options in use
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Produce the canonical form of `schema`
    pub fn normalize(&self, schema: &JsonSchema) -> Result<Converted<JsonSchema>> {
        check_references(schema)?;

        let mut normalized = schema.clone();
        canonicalize(&mut normalized.root);
        for (_, node) in normalized.definitions.iter_mut() {
            canonicalize(node);
        }
        // Flattening can turn a definition into an alias, so look afterwards
        let aliases = alias_targets(&normalized)?;

        let mut warnings = Vec::new();
        if self.config.collapse_aliases && !aliases.is_empty() {
            for (alias, target) in &aliases {
                let warning = LossyConversionWarning::new(
                    format!("#/definitions/{}", alias),
                    format!("alias of '{}' collapsed", target),
                );
                warn!(%warning, "lossy normalization");
                warnings.push(warning);
            }
            retarget(&mut normalized.root, &aliases);
            for (_, node) in normalized.definitions.iter_mut() {
                retarget(node, &aliases);
            }
            for (alias, _) in &aliases {
                normalized.definitions.remove(alias);
            }
        }

        debug!(
            definitions = normalized.definitions.len(),
            aliases = aliases.len(),
            "normalized JSON Schema"
        );
        Ok(Converted::new(normalized, warnings))
    }
}

/// Normalize with default options
pub fn normalize(schema: &JsonSchema) -> Result<JsonSchema> {
    Ok(Normalizer::default().normalize(schema)?.value)
}

pub(crate) fn check_references(schema: &JsonSchema) -> Result<()> {
    for (pointer, node) in schema.walk() {
        let Some(target) = node.ref_target() else {
            continue;
        };
        let target = target?;
        if let Err(Error::UnresolvedReference { name }) = schema.resolve_target(&target) {
            return Err(Error::malformed(format!(
                "$ref '{}' at {} does not resolve: '{}' is not defined",
                target, pointer, name
            )));
        }
    }
    Ok(())
}

/// Definition a bare alias points at, if the node is one
fn alias_of(node: &JsonSchemaNode) -> Option<String> {
    if !node.keywords.is_empty() || !node.extra.is_empty() || node.default.is_some() || node.constant.is_some() {
        return None;
    }
    match node.ref_target() {
        Some(Ok(RefTarget::Definition(name))) => Some(name),
        _ => None,
    }
}

/// Map every alias definition to the first non-alias definition of its chain
fn alias_targets(schema: &JsonSchema) -> Result<Vec<(String, String)>> {
    let mut targets = Vec::new();

    for (name, node) in schema.definitions.iter() {
        let Some(mut next) = alias_of(node) else {
            continue;
        };
        let mut chain = vec![name.to_string()];
        let mut seen: HashSet<String> = HashSet::from([name.to_string()]);

        loop {
            if !seen.insert(next.clone()) {
                chain.push(next);
                return Err(Error::malformed(format!(
                    "definition alias cycle: {}",
                    chain.join(" -> ")
                )));
            }
            chain.push(next.clone());
            match alias_of(schema.definitions.resolve(&next)?) {
                Some(further) => next = further,
                None => break,
            }
        }
        targets.push((name.to_string(), next));
    }

    Ok(targets)
}

fn canonicalize(node: &mut JsonSchemaNode) {
    for child in node.children_mut() {
        canonicalize(child);
    }

    if let NodeKind::Reference(reference) = &node.kind {
        if let Ok(target @ RefTarget::Definition(_)) = RefTarget::parse(reference) {
            node.kind = NodeKind::Reference(target.to_pointer());
        }
    }

    while let Some(flat) = flatten_single_branch(node) {
        *node = flat;
    }

    splice_nested_all_of(node);

    if let NodeKind::Object(object) = &mut node.kind {
        object.required.sort();
        object.required.dedup();
    }
}

/// `{"allOf": [X]}` without a structure marker becomes X, provided the outer
/// keywords do not contradict the branch
fn flatten_single_branch(node: &JsonSchemaNode) -> Option<JsonSchemaNode> {
    if node.keywords.structure.is_some() {
        return None;
    }
    let NodeKind::Combinator(combinator) = &node.kind else {
        return None;
    };
    if combinator.branches.len() != 1 {
        return None;
    }
    let branch = &combinator.branches[0];

    let keywords = node.keywords.merge(&branch.keywords)?;
    let default = merge_value(&node.default, &branch.default)?;
    let constant = merge_value(&node.constant, &branch.constant)?;
    let mut extra = branch.extra.clone();
    for (key, value) in &node.extra {
        match extra.get(key) {
            Some(existing) if existing != value => return None,
            _ => {
                extra.insert(key.clone(), value.clone());
            }
        }
    }

    Some(JsonSchemaNode {
        kind: branch.kind.clone(),
        keywords,
        default,
        constant,
        extra,
    })
}

fn merge_value(
    outer: &Option<serde_json::Value>,
    inner: &Option<serde_json::Value>,
) -> Option<Option<serde_json::Value>> {
    match (outer, inner) {
        (Some(a), Some(b)) if a != b => None,
        (Some(a), _) => Some(Some(a.clone())),
        (None, b) => Some(b.clone()),
    }
}

fn is_plain_all_of(node: &JsonSchemaNode) -> bool {
    matches!(&node.kind, NodeKind::Combinator(c) if c.kind == CombinatorKind::AllOf)
        && node.keywords.is_empty()
        && node.extra.is_empty()
        && node.default.is_none()
        && node.constant.is_none()
}

fn splice_nested_all_of(node: &mut JsonSchemaNode) {
    if node.keywords.structure.is_some() {
        return;
    }
    let NodeKind::Combinator(combinator) = &mut node.kind else {
        return;
    };
    if combinator.kind != CombinatorKind::AllOf
        || !combinator.branches.iter().any(is_plain_all_of)
    {
        return;
    }

    let branches = std::mem::take(&mut combinator.branches);
    for branch in branches {
        if is_plain_all_of(&branch) {
            if let NodeKind::Combinator(inner) = branch.kind {
                combinator.branches.extend(inner.branches);
            }
        } else {
            combinator.branches.push(branch);
        }
    }
}

fn retarget(node: &mut JsonSchemaNode, aliases: &[(String, String)]) {
    if let Some(Ok(RefTarget::Definition(name))) = node.ref_target() {
        if let Some((_, target)) = aliases.iter().find(|(alias, _)| *alias == name) {
            node.kind = NodeKind::Reference(RefTarget::Definition(target.clone()).to_pointer());
        }
    }
    for child in node.children_mut() {
        retarget(child, aliases);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> JsonSchema {
        JsonSchema::from_value(&value).unwrap()
    }

    #[test]
    fn test_unresolved_reference_is_malformed() {
        let schema = parse(json!({
            "type": "object",
            "properties": {"a": {"$ref": "#/definitions/missing"}}
        }));
        match normalize(&schema) {
            Err(Error::MalformedSchema(message)) => assert!(message.contains("missing")),
            other => panic!("expected malformed schema, got {:?}", other),
        }
    }

    #[test]
    fn test_single_branch_flattening() {
        let schema = parse(json!({
            "type": "object",
            "properties": {
                "a": {"allOf": [{"type": "string", "maxLength": 3}], "@xsdAttribute": true},
                "b": {"oneOf": [{"type": "object", "properties": {}}], "@xsdStructure": "choice"}
            }
        }));
        let normalized = normalize(&schema).unwrap();
        let value = normalized.to_value();
        assert_eq!(
            value["properties"]["a"],
            json!({"type": "string", "maxLength": 3, "@xsdAttribute": true})
        );
        assert!(value["properties"]["b"].get("oneOf").is_some());
    }

    #[test]
    fn test_nested_all_of_is_spliced() {
        let schema = parse(json!({
            "allOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}},
                {"allOf": [
                    {"type": "object", "properties": {"b": {"type": "string"}}},
                    {"type": "object", "properties": {"c": {"type": "string"}}}
                ]}
            ]
        }));
        let normalized = normalize(&schema).unwrap();
        assert_eq!(normalized.to_value()["allOf"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_required_sorted_and_properties_kept() {
        let schema = parse(json!({
            "type": "object",
            "properties": {"z": {"type": "string"}, "a": {"type": "string"}},
            "required": ["z", "a", "z"]
        }));
        let value = normalize(&schema).unwrap().to_value();
        assert_eq!(value["required"], json!(["a", "z"]));
        let keys: Vec<&String> = value["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_alias_cycle_is_malformed() {
        let schema = parse(json!({
            "type": "object",
            "properties": {},
            "definitions": {
                "A": {"$ref": "#/definitions/B"},
                "B": {"$ref": "#/definitions/A"}
            }
        }));
        assert!(matches!(normalize(&schema), Err(Error::MalformedSchema(_))));
    }

    #[test]
    fn test_self_reference_is_allowed() {
        let schema = parse(json!({
            "type": "object",
            "properties": {"n": {"$ref": "#/$defs/Node"}},
            "$defs": {
                "Node": {"type": "object", "properties": {"next": {"$ref": "#/$defs/Node"}}}
            }
        }));
        let normalized = normalize(&schema).unwrap();
        assert_eq!(
            normalized.to_value()["properties"]["n"]["$ref"],
            json!("#/definitions/Node")
        );
    }

    #[test]
    fn test_collapse_aliases_warns() {
        let schema = parse(json!({
            "type": "object",
            "properties": {"a": {"$ref": "#/definitions/Alias"}},
            "definitions": {
                "Alias": {"$ref": "#/definitions/Base"},
                "Base": {"type": "string", "maxLength": 4}
            }
        }));

        let kept = Normalizer::default().normalize(&schema).unwrap();
        assert!(kept.is_lossless());
        assert!(kept.value.definitions.contains("Alias"));

        let collapsed = Normalizer::new(NormalizerConfig::new().with_collapse_aliases(true))
            .normalize(&schema)
            .unwrap();
        assert_eq!(collapsed.warnings.len(), 1);
        assert!(!collapsed.value.definitions.contains("Alias"));
        assert_eq!(
            collapsed.value.to_value()["properties"]["a"]["$ref"],
            json!("#/definitions/Base")
        );
    }

    #[test]
    fn test_idempotent_on_fixture() {
        let schema = parse(json!({
            "type": "object",
            "properties": {
                "x": {"allOf": [{"allOf": [{"$ref": "#/definitions/T"}]}]}
            },
            "required": ["x", "x"],
            "definitions": {"T": {"type": "integer", "minimum": 0}}
        }));
        let once = normalize(&schema).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }
}
