//! Normalizer integration tests
//!
//! Property tests check that normalization is idempotent and keeps the
//! declared property order; the rest covers reference checking through the
//! public entry points.

use proptest::prelude::*;
use serde_json::{json, Value};
use xsd_jsonschema::converters::json_to_xsd;
use xsd_jsonschema::json::{normalize, JsonSchema, Normalizer, NormalizerConfig};
use xsd_jsonschema::Error;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({"type": "string"})),
        (0i64..100).prop_map(|n| json!({"type": "integer", "minimum": n})),
        Just(json!({"$ref": "#/definitions/Name"})),
        Just(json!({"$ref": "#/definitions/Count"})),
    ]
}

fn object_from(children: Vec<Value>, required_mask: u8) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for (index, child) in children.into_iter().enumerate() {
        let key = format!("p{}", index);
        if required_mask & (1 << index) != 0 {
            // Listed twice and back to front so sorting and dedup have work to do
            required.insert(0, Value::from(key.clone()));
            required.push(Value::from(key.clone()));
        }
        properties.insert(key, child);
    }
    json!({"type": "object", "properties": properties, "required": required})
}

fn node_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(|branches| json!({"allOf": branches})),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|branches| json!({"oneOf": branches})),
            (prop::collection::vec(inner, 1..5), any::<u8>())
                .prop_map(|(children, mask)| object_from(children, mask)),
        ]
    })
}

fn document_strategy() -> impl Strategy<Value = Value> {
    (node_strategy(), node_strategy()).prop_map(|(root_child, definition)| {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {"root": root_child},
            "definitions": {
                "Name": {"type": "string", "maxLength": 35},
                "Count": {"allOf": [{"type": "integer", "minimum": 0}]},
                "Alias": {"$ref": "#/definitions/Name"},
                "Generated": definition
            }
        })
    })
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    /// normalize(normalize(x)) == normalize(x)
    #[test]
    fn normalization_is_idempotent(document in document_strategy()) {
        let schema = JsonSchema::from_value(&document).unwrap();
        let once = normalize(&schema).unwrap();
        let twice = normalize(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Idempotence also holds when alias definitions are collapsed
    #[test]
    fn collapsing_normalization_is_idempotent(document in document_strategy()) {
        let schema = JsonSchema::from_value(&document).unwrap();
        let normalizer = Normalizer::new(NormalizerConfig::new().with_collapse_aliases(true));
        let once = normalizer.normalize(&schema).unwrap().value;
        let twice = normalizer.normalize(&once).unwrap();
        prop_assert!(twice.warnings.is_empty());
        prop_assert_eq!(once, twice.value);
    }

    /// Property order is significant (sequence order) and never changes
    #[test]
    fn property_order_is_kept(children in prop::collection::vec(leaf_strategy(), 1..8), mask in any::<u8>()) {
        let document = json!({
            "type": "object",
            "properties": {"wrapper": object_from(children.clone(), mask)},
            "definitions": {"Name": {"type": "string"}, "Count": {"type": "integer"}}
        });
        let schema = JsonSchema::from_value(&document).unwrap();
        let normalized = normalize(&schema).unwrap().to_value();

        let keys: Vec<String> = normalized["properties"]["wrapper"]["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        let expected: Vec<String> = (0..children.len()).map(|i| format!("p{}", i)).collect();
        prop_assert_eq!(keys, expected);
    }
}

// =============================================================================
// REFERENCES
// =============================================================================

#[test]
fn test_unresolved_reference_names_the_target() {
    let schema = JsonSchema::from_value(&json!({
        "type": "object",
        "properties": {"order": {"$ref": "#/definitions/missing"}},
        "definitions": {}
    }))
    .unwrap();

    match normalize(&schema) {
        Err(Error::MalformedSchema(message)) => assert!(message.contains("missing"), "{}", message),
        other => panic!("expected malformed schema, got {:?}", other),
    }
}

#[test]
fn test_reverse_conversion_rejects_unresolved_reference() {
    let schema = JsonSchema::from_value(&json!({
        "type": "object",
        "properties": {"order": {"$ref": "#/definitions/OrderType"}},
        "definitions": {
            "OrderType": {"type": "object", "properties": {"item": {"$ref": "#/definitions/missing"}}}
        }
    }))
    .unwrap();

    assert!(matches!(json_to_xsd(&schema), Err(Error::MalformedSchema(_))));
}

#[test]
fn test_required_is_sorted_and_deduplicated() {
    let schema = JsonSchema::from_value(&json!({
        "type": "object",
        "properties": {"b": {"type": "string"}, "a": {"type": "string"}},
        "required": ["b", "a", "b"]
    }))
    .unwrap();

    let normalized = normalize(&schema).unwrap().to_value();
    assert_eq!(normalized["required"], json!(["a", "b"]));
    let keys: Vec<&String> = normalized["properties"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["b", "a"]);
}

#[test]
fn test_collapsed_alias_is_retargeted_with_warning() {
    let schema = JsonSchema::from_value(&json!({
        "type": "object",
        "properties": {"name": {"$ref": "#/definitions/Alias"}},
        "definitions": {
            "Name": {"type": "string"},
            "Alias": {"$ref": "#/definitions/Name"}
        }
    }))
    .unwrap();

    let converted = Normalizer::new(NormalizerConfig::new().with_collapse_aliases(true))
        .normalize(&schema)
        .unwrap();
    assert!(!converted.warnings.is_empty());
    let value = converted.value.to_value();
    assert_eq!(value["properties"]["name"]["$ref"], json!("#/definitions/Name"));
}
