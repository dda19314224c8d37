//! Converter integration tests: hand-written JSON Schema input, lossy
//! warnings and unsupported constructs

use serde_json::json;
use xsd_jsonschema::converters::{xsd_to_json, ConverterConfig, JsonToXsdConverter};
use xsd_jsonschema::error::ConstructKind;
use xsd_jsonschema::json::{normalize, JsonSchema};
use xsd_jsonschema::xsd::{
    BuiltinType, ComplexType, ElementContent, Facet, Occurs, Particle, Schema, SimpleType, TypeDefinition, TypeRef,
};
use xsd_jsonschema::Error;

fn person_json() -> JsonSchema {
    JsonSchema::from_value(&json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {"person": {"$ref": "#/definitions/Person"}},
        "definitions": {
            "Person": {
                "type": "object",
                "properties": {
                    "name": {"type": "string", "maxLength": 50},
                    "age": {"type": "integer", "minimum": 0},
                    "tags": {"type": "array", "items": {"type": "string"}, "maxItems": 3}
                },
                "required": ["name"],
                "additionalProperties": true
            },
            "Email": {"type": "string", "format": "email"}
        }
    }))
    .unwrap()
}

fn complex<'s>(schema: &'s Schema, name: &str) -> &'s ComplexType {
    match schema.resolve(name).unwrap() {
        TypeDefinition::Complex(ct) => ct,
        other => panic!("expected complex type, got {:?}", other),
    }
}

fn anonymous_simple(particle: &Particle) -> &SimpleType {
    match particle {
        Particle::Element(element) => match &element.content {
            ElementContent::Simple(st) => st,
            other => panic!("expected anonymous simple type, got {:?}", other),
        },
        other => panic!("expected element, got {:?}", other),
    }
}

#[test]
fn test_plain_json_schema_becomes_xsd() {
    let converted = JsonToXsdConverter::default()
        .convert(&normalize(&person_json()).unwrap())
        .unwrap();
    let schema = converted.value;

    let person = schema.resolve_element("person").unwrap();
    assert_eq!(person.content, ElementContent::Type(TypeRef::Named("Person".into())));

    let group = complex(&schema, "Person").group().unwrap().clone();
    assert_eq!(group.particles.len(), 3);
    assert_eq!(group.particles[0].occurs(), Occurs::once());
    assert_eq!(anonymous_simple(&group.particles[0]).facets, vec![Facet::MaxLength(50)]);

    assert_eq!(group.particles[1].occurs(), Occurs::optional());
    let age = anonymous_simple(&group.particles[1]);
    assert_eq!(age.base, TypeRef::Builtin(BuiltinType::Integer));
    assert_eq!(age.facets, vec![Facet::MinInclusive("0".into())]);

    assert_eq!(group.particles[2].occurs(), Occurs::new(0, Some(3)));
    assert!(matches!(schema.resolve("Email").unwrap(), TypeDefinition::Simple(_)));
}

#[test]
fn test_plain_json_schema_reports_what_it_drops() {
    let converted = JsonToXsdConverter::default()
        .convert(&normalize(&person_json()).unwrap())
        .unwrap();
    assert!(!converted.is_lossless());

    let messages: Vec<String> = converted.warnings.iter().map(|w| w.to_string()).collect();
    assert!(messages.iter().any(|m| m.contains("additionalProperties")), "{:?}", messages);
    assert!(messages.iter().any(|m| m.contains("email")), "{:?}", messages);
}

#[test]
fn test_plain_json_schema_is_written_as_xsd() {
    let config = ConverterConfig::new().with_xsd_prefix("xsd");
    let options = config.write_options();
    let schema = JsonToXsdConverter::new(config)
        .convert(&normalize(&person_json()).unwrap())
        .unwrap()
        .value;

    let xml = schema.to_xml_string(&options).unwrap();
    assert!(xml.contains("<xsd:complexType name=\"Person\">"));
    assert!(xml.contains("<xsd:maxLength value=\"50\"/>"));
    assert!(xml.contains("maxOccurs=\"3\""));

    let reread: Schema = xml.parse().unwrap();
    assert!(reread.check().is_ok());
}

#[test]
fn test_wildcard_is_a_conversion_error() {
    let schema: Schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:element name="envelope">
        <xs:complexType>
          <xs:sequence><xs:any/></xs:sequence>
        </xs:complexType>
      </xs:element>
    </xs:schema>"#
        .parse()
        .unwrap();

    match xsd_to_json(&schema) {
        Err(Error::Conversion(e)) => assert_eq!(e.kind, ConstructKind::Wildcard),
        other => panic!("expected conversion error, got {:?}", other),
    }
}

#[test]
fn test_scalar_document_root_is_rejected() {
    let json = JsonSchema::from_value(&json!({"type": "string"})).unwrap();
    assert!(matches!(
        JsonToXsdConverter::default().convert(&json),
        Err(Error::Conversion(_))
    ));
}

#[test]
fn test_forward_output_is_draft_07() {
    let schema: Schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:element name="count" type="xs:nonNegativeInteger" default="0"/>
    </xs:schema>"#
        .parse()
        .unwrap();
    let value = xsd_to_json(&schema).unwrap().value.to_value();

    assert_eq!(value["$schema"], json!(xsd_jsonschema::JSON_SCHEMA_DRAFT_07));
    assert_eq!(value["type"], json!("object"));
    assert_eq!(value["properties"]["count"]["type"], json!("integer"));
    assert_eq!(value["properties"]["count"]["@xsdType"], json!("nonNegativeInteger"));
    assert_eq!(value["properties"]["count"]["default"], json!(0));
}
