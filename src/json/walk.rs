//! Depth-first traversal of a JSON Schema document
//!
//! Nodes are visited in document order starting at the root. A `$ref` to a
//! definition continues into that definition the first time it is seen;
//! definitions never referenced from the root are visited afterwards, in
//! declaration order. Every definition is entered exactly once, so cyclic
//! schemas terminate.

use std::collections::HashSet;

use super::model::{JsonSchema, JsonSchemaNode, RefTarget};

/// Iterator over `(pointer, node)` pairs
#[derive(Debug, Clone)]
pub struct SchemaWalk<'a> {
    schema: &'a JsonSchema,
    stack: Vec<(String, &'a JsonSchemaNode)>,
    visited: HashSet<&'a str>,
    next_definition: usize,
}

impl<'a> SchemaWalk<'a> {
    fn new(schema: &'a JsonSchema) -> Self {
        Self {
            schema,
            stack: vec![("#".to_string(), &schema.root)],
            visited: HashSet::new(),
            next_definition: 0,
        }
    }

    fn enter_definition(&mut self, name: &str) {
        let schema = self.schema;
        if let Some((key, node)) = schema.definitions.get_key_value(name) {
            if self.visited.insert(key) {
                self.stack.push((RefTarget::Definition(key.to_string()).to_pointer(), node));
            }
        }
    }
}

impl<'a> Iterator for SchemaWalk<'a> {
    type Item = (String, &'a JsonSchemaNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((pointer, node)) = self.stack.pop() {
                let children = node.children();
                for (segment, child) in children.into_iter().rev() {
                    self.stack.push((format!("{}/{}", pointer, segment), child));
                }
                if let Some(Ok(RefTarget::Definition(name))) = node.ref_target() {
                    self.enter_definition(&name);
                }
                return Some((pointer, node));
            }

            // Root exhausted: pick up the next unvisited definition
            let schema = self.schema;
            let (name, _) = schema.definitions.get_index(self.next_definition)?;
            self.next_definition += 1;
            self.enter_definition(name);
        }
    }
}

impl JsonSchema {
    /// Walk every node of the document; call again to restart
    pub fn walk(&self) -> SchemaWalk<'_> {
        SchemaWalk::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cyclic() -> JsonSchema {
        JsonSchema::from_value(&json!({
            "type": "object",
            "properties": {"root": {"$ref": "#/definitions/Node"}},
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "child": {"type": "array", "items": {"$ref": "#/definitions/Node"}},
                        "label": {"type": "string"}
                    }
                },
                "Unused": {"type": "boolean"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_walk_terminates_on_cycles() {
        let schema = cyclic();
        let pointers: Vec<String> = schema.walk().map(|(p, _)| p).collect();
        assert_eq!(
            pointers,
            vec![
                "#",
                "#/properties/root",
                "#/definitions/Node",
                "#/definitions/Node/properties/child",
                "#/definitions/Node/properties/child/items",
                "#/definitions/Node/properties/label",
                "#/definitions/Unused",
            ]
        );
    }

    #[test]
    fn test_walk_follows_long_reference_chains() {
        let mut definitions = serde_json::Map::new();
        for i in 0..500 {
            let next = if i == 499 {
                json!({"type": "string"})
            } else {
                json!({"type": "object", "properties": {"next": {"$ref": format!("#/definitions/D{}", i + 1)}}})
            };
            definitions.insert(format!("D{}", i), next);
        }
        let schema = JsonSchema::from_value(&json!({
            "type": "object",
            "properties": {"head": {"$ref": "#/definitions/D0"}},
            "definitions": definitions
        }))
        .unwrap();

        let entered: Vec<String> = schema
            .walk()
            .map(|(p, _)| p)
            .filter(|p| p.starts_with("#/definitions/") && p.matches('/').count() == 2)
            .collect();
        assert_eq!(entered.len(), 500);
        assert_eq!(entered[0], "#/definitions/D0");
        assert_eq!(entered[499], "#/definitions/D499");
    }

    #[test]
    fn test_walk_is_restartable() {
        let schema = cyclic();
        assert_eq!(schema.walk().count(), schema.walk().count());
    }
}
