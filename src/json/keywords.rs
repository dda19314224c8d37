//! XSD-preserving custom keywords
//!
//! Plain JSON Schema has no notion of compositors, attributes, facet
//! provenance or annotations. The converters carry that information in
//! `@xsd*` keywords so that the reverse direction can rebuild the XSD graph.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::xsd::{Annotation, AnnotationEntry, BuiltinType, Compositor, Documentation, Facet, Occurs};

/// Keyword names as they appear in JSON documents
pub mod names {
    /// Origin compositor: `"sequence"`, `"choice"` or `"all"`
    pub const STRUCTURE: &str = "@xsdStructure";
    /// Property is an XSD attribute
    pub const ATTRIBUTE: &str = "@xsdAttribute";
    /// XML name when the property key had to be disambiguated
    pub const NAME: &str = "@xsdName";
    /// Property holds the simple content of a complex type
    pub const TEXT: &str = "@xsdText";
    /// Built-in XSD type not implied by `type` and `format`
    pub const TYPE: &str = "@xsdType";
    /// `nillable="true"`
    pub const NILLABLE: &str = "@xsdNillable";
    /// `minLength`/`maxLength` came from a single `length` facet
    pub const LENGTH: &str = "@xsdLength";
    /// `pattern` stands for a `totalDigits` facet and is not an XSD pattern
    pub const DERIVED_PATTERN: &str = "@xsdDerivedPattern";
    /// Facets without a JSON Schema keyword
    pub const RESTRICTIONS: &str = "@xsdRestrictions";
    /// minOccurs of a model group
    pub const MIN_OCCURS: &str = "@xsdMinOccurs";
    /// maxOccurs of a model group
    pub const MAX_OCCURS: &str = "@xsdMaxOccurs";
    /// Annotation of a declaration or named type
    pub const ANNOTATION: &str = "@xsdAnnotation";
    /// Annotation of an anonymous type
    pub const TYPE_ANNOTATION: &str = "@xsdTypeAnnotation";
    /// Namespace declarations of the schema (root only)
    pub const NAMESPACES: &str = "@xsdNamespaces";
    /// `targetNamespace` and form defaults (root only)
    pub const SCHEMA_ATTRIBUTES: &str = "@xsdSchemaAttributes";
}

/// XSD information attached to a JSON Schema node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XsdKeywords {
    /// `@xsdStructure`
    pub structure: Option<Compositor>,
    /// `@xsdAttribute`
    pub attribute: bool,
    /// `@xsdName`
    pub name: Option<String>,
    /// `@xsdText`
    pub text: bool,
    /// `@xsdType`
    pub xsd_type: Option<BuiltinType>,
    /// `@xsdNillable`
    pub nillable: bool,
    /// `@xsdLength`
    pub length: bool,
    /// `@xsdDerivedPattern`
    pub derived_pattern: bool,
    /// `@xsdRestrictions`
    pub restrictions: Vec<Facet>,
    /// `@xsdMinOccurs` / `@xsdMaxOccurs`
    pub occurs: Option<Occurs>,
    /// `@xsdAnnotation`
    pub annotation: Option<Annotation>,
    /// `@xsdTypeAnnotation`
    pub type_annotation: Option<Annotation>,
}

impl XsdKeywords {
    /// Whether no keyword is set
    pub fn is_empty(&self) -> bool {
        *self == XsdKeywords::default()
    }

    /// Whether only declaration-level keywords are set, i.e. nothing that
    /// describes the value space or the content model of the node
    pub fn is_declaration_only(&self) -> bool {
        self.structure.is_none()
            && self.xsd_type.is_none()
            && !self.length
            && !self.derived_pattern
            && self.restrictions.is_empty()
            && self.occurs.is_none()
            && self.type_annotation.is_none()
    }

    /// Combine two keyword sets, `None` when both set a keyword differently
    pub fn merge(&self, other: &XsdKeywords) -> Option<XsdKeywords> {
        fn pick<T: Clone + PartialEq>(a: &Option<T>, b: &Option<T>) -> Option<Option<T>> {
            match (a, b) {
                (Some(x), Some(y)) if x != y => None,
                (Some(x), _) => Some(Some(x.clone())),
                (None, y) => Some(y.clone()),
            }
        }

        if !self.restrictions.is_empty() && !other.restrictions.is_empty() {
            return None;
        }
        Some(XsdKeywords {
            structure: pick(&self.structure, &other.structure)?,
            attribute: self.attribute || other.attribute,
            name: pick(&self.name, &other.name)?,
            text: self.text || other.text,
            xsd_type: pick(&self.xsd_type, &other.xsd_type)?,
            nillable: self.nillable || other.nillable,
            length: self.length || other.length,
            derived_pattern: self.derived_pattern || other.derived_pattern,
            restrictions: if self.restrictions.is_empty() {
                other.restrictions.clone()
            } else {
                self.restrictions.clone()
            },
            occurs: pick(&self.occurs, &other.occurs)?,
            annotation: pick(&self.annotation, &other.annotation)?,
            type_annotation: pick(&self.type_annotation, &other.type_annotation)?,
        })
    }

    /// Append the set keywords to a JSON object
    pub fn write(&self, map: &mut Map<String, Value>) {
        if let Some(structure) = self.structure {
            map.insert(names::STRUCTURE.into(), Value::from(structure.as_str()));
        }
        if let Some(occurs) = self.occurs {
            map.insert(names::MIN_OCCURS.into(), Value::from(occurs.min));
            map.insert(
                names::MAX_OCCURS.into(),
                match occurs.max {
                    Some(max) => Value::from(max),
                    None => Value::from("unbounded"),
                },
            );
        }
        if self.attribute {
            map.insert(names::ATTRIBUTE.into(), Value::Bool(true));
        }
        if self.text {
            map.insert(names::TEXT.into(), Value::Bool(true));
        }
        if let Some(name) = &self.name {
            map.insert(names::NAME.into(), Value::from(name.as_str()));
        }
        if let Some(builtin) = self.xsd_type {
            map.insert(names::TYPE.into(), Value::from(builtin.local_name()));
        }
        if self.nillable {
            map.insert(names::NILLABLE.into(), Value::Bool(true));
        }
        if self.length {
            map.insert(names::LENGTH.into(), Value::Bool(true));
        }
        if self.derived_pattern {
            map.insert(names::DERIVED_PATTERN.into(), Value::Bool(true));
        }
        if !self.restrictions.is_empty() {
            map.insert(names::RESTRICTIONS.into(), restrictions_to_value(&self.restrictions));
        }
        if let Some(annotation) = &self.annotation {
            map.insert(names::ANNOTATION.into(), annotation_to_value(annotation));
        }
        if let Some(annotation) = &self.type_annotation {
            map.insert(names::TYPE_ANNOTATION.into(), annotation_to_value(annotation));
        }
    }

    /// Remove and parse the custom keywords of a JSON object
    pub fn read(map: &mut Map<String, Value>) -> Result<XsdKeywords> {
        let mut keywords = XsdKeywords::default();

        if let Some(value) = map.remove(names::STRUCTURE) {
            let text = expect_str(&value, names::STRUCTURE)?;
            keywords.structure = Some(Compositor::from_str(text).ok_or_else(|| {
                Error::malformed(format!("unknown {} value '{}'", names::STRUCTURE, text))
            })?);
        }

        let min = map.remove(names::MIN_OCCURS);
        let max = map.remove(names::MAX_OCCURS);
        if min.is_some() || max.is_some() {
            let min = match min {
                Some(v) => expect_u32(&v, names::MIN_OCCURS)?,
                None => 1,
            };
            let max = match max {
                Some(Value::String(s)) if s == "unbounded" => None,
                Some(v) => Some(expect_u32(&v, names::MAX_OCCURS)?),
                None => Some(1),
            };
            let occurs = Occurs::new(min, max);
            if !occurs.is_valid() {
                return Err(Error::malformed(format!("invalid group occurs {}", occurs)));
            }
            keywords.occurs = Some(occurs);
        }

        keywords.attribute = take_flag(map, names::ATTRIBUTE)?;
        keywords.text = take_flag(map, names::TEXT)?;
        keywords.nillable = take_flag(map, names::NILLABLE)?;
        keywords.length = take_flag(map, names::LENGTH)?;
        keywords.derived_pattern = take_flag(map, names::DERIVED_PATTERN)?;

        if let Some(value) = map.remove(names::NAME) {
            keywords.name = Some(expect_str(&value, names::NAME)?.to_string());
        }
        if let Some(value) = map.remove(names::TYPE) {
            let text = expect_str(&value, names::TYPE)?;
            // Accept prefixed forms such as "xs:int"
            let local = text.rsplit(':').next().unwrap_or(text);
            keywords.xsd_type = Some(BuiltinType::from_local_name(local).ok_or_else(|| {
                Error::malformed(format!("unknown {} value '{}'", names::TYPE, text))
            })?);
        }
        if let Some(value) = map.remove(names::RESTRICTIONS) {
            keywords.restrictions = restrictions_from_value(&value)?;
        }
        if let Some(value) = map.remove(names::ANNOTATION) {
            keywords.annotation = Some(annotation_from_value(&value)?);
        }
        if let Some(value) = map.remove(names::TYPE_ANNOTATION) {
            keywords.type_annotation = Some(annotation_from_value(&value)?);
        }

        Ok(keywords)
    }
}

fn take_flag(map: &mut Map<String, Value>, key: &str) -> Result<bool> {
    match map.remove(key) {
        Some(Value::Bool(b)) => Ok(b),
        Some(_) => Err(Error::malformed(format!("{} must be a boolean", key))),
        None => Ok(false),
    }
}

fn expect_str<'v>(value: &'v Value, key: &str) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| Error::malformed(format!("{} must be a string", key)))
}

fn expect_u32(value: &Value, key: &str) -> Result<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| Error::malformed(format!("{} must be a non-negative integer", key)))
}

/// `@xsdRestrictions`: facet name to value, repeated facets as arrays
fn restrictions_to_value(facets: &[Facet]) -> Value {
    let mut map = Map::new();
    for facet in facets {
        let value = match facet {
            Facet::Length(n) | Facet::MinLength(n) | Facet::MaxLength(n) => Value::from(*n),
            Facet::TotalDigits(n) | Facet::FractionDigits(n) => Value::from(*n),
            other => Value::from(other.lexical_value()),
        };
        match map.get_mut(facet.name()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(facet.name().to_string(), value);
            }
        }
    }
    Value::Object(map)
}

fn restrictions_from_value(value: &Value) -> Result<Vec<Facet>> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::malformed(format!("{} must be an object", names::RESTRICTIONS)))?;

    let mut facets = Vec::new();
    for (name, value) in map {
        let values = match value {
            Value::Array(values) => values.iter().collect::<Vec<_>>(),
            single => vec![single],
        };
        for value in values {
            let lexical = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => {
                    return Err(Error::malformed(format!(
                        "restriction '{}' must be a string or a number",
                        name
                    )))
                }
            };
            let facet = Facet::from_name_value(name, &lexical)?
                .ok_or_else(|| Error::malformed(format!("unknown restriction '{}'", name)))?;
            facets.push(facet);
        }
    }
    Ok(facets)
}

/// Opaque annotation payload:
/// `{"attributes": {"{uri}local": "value"}, "documentation": [{"lang", "text", "markers"}]}`
pub fn annotation_to_value(annotation: &Annotation) -> Value {
    let mut map = Map::new();

    if !annotation.attributes.is_empty() {
        let attributes: Map<String, Value> = annotation
            .attributes
            .iter()
            .map(|entry| (entry.name.to_string(), Value::from(entry.value.as_str())))
            .collect();
        map.insert("attributes".into(), Value::Object(attributes));
    }

    if !annotation.documentation.is_empty() {
        let documentation = annotation
            .documentation
            .iter()
            .map(|doc| {
                let mut entry = Map::new();
                if let Some(lang) = &doc.lang {
                    entry.insert("lang".into(), Value::from(lang.as_str()));
                }
                if let Some(text) = &doc.text {
                    entry.insert("text".into(), Value::from(text.as_str()));
                }
                if !doc.markers.is_empty() {
                    let markers = doc
                        .markers
                        .iter()
                        .map(|m| {
                            let mut marker = Map::new();
                            marker.insert("name".into(), Value::from(m.name.to_string()));
                            marker.insert("value".into(), Value::from(m.value.as_str()));
                            Value::Object(marker)
                        })
                        .collect();
                    entry.insert("markers".into(), Value::Array(markers));
                }
                Value::Object(entry)
            })
            .collect();
        map.insert("documentation".into(), Value::Array(documentation));
    }

    Value::Object(map)
}

/// Parse an opaque annotation payload
pub fn annotation_from_value(value: &Value) -> Result<Annotation> {
    let malformed = || Error::malformed(format!("{} has an unexpected shape", names::ANNOTATION));
    let map = value.as_object().ok_or_else(malformed)?;

    let mut annotation = Annotation::default();

    if let Some(attributes) = map.get("attributes") {
        for (key, value) in attributes.as_object().ok_or_else(malformed)? {
            let text = value.as_str().ok_or_else(malformed)?;
            annotation
                .attributes
                .push(AnnotationEntry::new(QName::from_clark(key)?, text));
        }
    }

    if let Some(documentation) = map.get("documentation") {
        for doc in documentation.as_array().ok_or_else(malformed)? {
            let doc = doc.as_object().ok_or_else(malformed)?;
            let mut entry = Documentation {
                lang: doc.get("lang").and_then(Value::as_str).map(str::to_string),
                text: doc.get("text").and_then(Value::as_str).map(str::to_string),
                markers: Vec::new(),
            };
            if let Some(markers) = doc.get("markers") {
                for marker in markers.as_array().ok_or_else(malformed)? {
                    let name = marker.get("name").and_then(Value::as_str).ok_or_else(malformed)?;
                    let value = marker.get("value").and_then(Value::as_str).unwrap_or_default();
                    entry
                        .markers
                        .push(AnnotationEntry::new(QName::from_clark(name)?, value));
                }
            }
            annotation.documentation.push(entry);
        }
    }

    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keywords_write_then_read() {
        let keywords = XsdKeywords {
            structure: Some(Compositor::Choice),
            occurs: Some(Occurs::zero_or_more()),
            attribute: true,
            xsd_type: Some(BuiltinType::Int),
            derived_pattern: true,
            restrictions: vec![
                Facet::TotalDigits(5),
                Facet::Pattern("a".into()),
                Facet::Pattern("b".into()),
            ],
            ..XsdKeywords::default()
        };

        let mut map = Map::new();
        keywords.write(&mut map);
        assert_eq!(map[names::MAX_OCCURS], json!("unbounded"));
        assert_eq!(map[names::RESTRICTIONS], json!({"totalDigits": 5, "pattern": ["a", "b"]}));

        let read = XsdKeywords::read(&mut map).unwrap();
        assert_eq!(read, keywords);
        assert!(map.is_empty());
    }

    #[test]
    fn test_merge_conflicts() {
        let a = XsdKeywords {
            name: Some("a".into()),
            ..XsdKeywords::default()
        };
        let b = XsdKeywords {
            name: Some("b".into()),
            ..XsdKeywords::default()
        };
        assert!(a.merge(&b).is_none());
        assert_eq!(a.merge(&XsdKeywords::default()), Some(a.clone()));
    }

    #[test]
    fn test_annotation_payload() {
        let value = json!({
            "attributes": {"{http://seres.no/xsd/forvaltningsdata}guid": "AT-1"},
            "documentation": [{
                "lang": "nb",
                "markers": [{"name": "{http://www.w3.org/2001/XMLSchema}XSLT-skriptnavn", "value": "SERES_XSD_GEN"}]
            }]
        });
        let annotation = annotation_from_value(&value).unwrap();
        assert_eq!(annotation.attributes[0].value, "AT-1");
        assert_eq!(annotation.documentation[0].lang.as_deref(), Some("nb"));
        assert_eq!(annotation_to_value(&annotation), value);
    }

    #[test]
    fn test_bad_structure_is_malformed() {
        let mut map = Map::new();
        map.insert(names::STRUCTURE.into(), json!("bag"));
        assert!(matches!(XsdKeywords::read(&mut map), Err(Error::MalformedSchema(_))));
    }
}
