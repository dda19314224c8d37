//! XSD type graph to JSON Schema
//!
//! Named types become `definitions`, global declarations become root
//! properties. Everything plain JSON Schema cannot express (compositor
//! kinds, attributes, facet provenance, annotations) is carried in `@xsd*`
//! keywords so the reverse converter can rebuild the same graph.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::values::{lexical_to_json, number_from_lexical, total_digits_pattern, ultimate_builtin};
use super::ConverterConfig;
use crate::error::{ConstructKind, ConversionError, Converted, LossyConversionWarning, Result};
use crate::json::{
    ArrayNode, CombinatorKind, Items, JsonSchema, JsonSchemaNode, NodeKind, ObjectNode,
    PrimitiveNode, RefTarget, XsdKeywords,
};
use crate::xsd::{
    Annotation, AttributeUse, AttributeUseKind, BuiltinType, ComplexContent, ComplexType,
    Compositor, Element, ElementContent, Facet, JsonType, ModelGroup, Occurs, Particle, Schema,
    SimpleContent, SimpleType, TypeDefinition, TypeRef,
};

/// Converts XSD type graphs to JSON Schema documents
#[derive(Debug, Clone, Default)]
pub struct XsdToJsonConverter {
    config: ConverterConfig,
}

impl XsdToJsonConverter {
    /// Create a converter
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one schema.
    ///
    /// Fails with a [`ConversionError`] for the first construct the reader
    /// recorded as unsupported, before anything is emitted.
    pub fn convert(&self, schema: &Schema) -> Result<Converted<JsonSchema>> {
        if let Some(construct) = schema.unsupported.first() {
            let mut error = ConversionError::new(construct.kind).with_detail(construct.detail.clone());
            if let Some(component) = &construct.component {
                error = error.with_type_name(component.clone());
            }
            return Err(error.into());
        }
        schema.check()?;
        self.config.limits().check_schema_components(
            schema.types.len() + schema.elements.len() + schema.attributes.len(),
        )?;

        let mut run = ForwardRun {
            config: &self.config,
            schema,
            warnings: Vec::new(),
            dropped_annotations: 0,
        };
        let json = run.document()?;

        if run.dropped_annotations > 0 {
            let warning = LossyConversionWarning::new(
                "(schema)",
                format!("{} annotation(s) not emitted", run.dropped_annotations),
            );
            warn!(%warning, "lossy conversion");
            run.warnings.push(warning);
        }

        info!(
            definitions = json.definitions.len(),
            warnings = run.warnings.len(),
            "converted XSD to JSON Schema"
        );
        Ok(Converted::new(json, run.warnings))
    }
}

/// Attribute properties of one complex type
#[derive(Default)]
struct AttributeSet {
    properties: IndexMap<String, JsonSchemaNode>,
    required: Vec<String>,
}

impl AttributeSet {
    fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn into_object(self) -> ObjectNode {
        ObjectNode {
            properties: self.properties,
            required: self.required,
            additional_properties: None,
        }
    }
}

struct ForwardRun<'a> {
    config: &'a ConverterConfig,
    schema: &'a Schema,
    warnings: Vec<LossyConversionWarning>,
    dropped_annotations: usize,
}

impl<'a> ForwardRun<'a> {
    fn document(&mut self) -> Result<JsonSchema> {
        let schema = self.schema;
        let mut json = JsonSchema::new();
        json.schema_uri = Some(self.config.schema_uri().to_string());
        json.id = self.config.schema_id().map(str::to_string);
        json.namespaces = schema.namespaces.clone();

        let schema_attributes = [
            ("targetNamespace", &schema.target_namespace),
            ("elementFormDefault", &schema.element_form_default),
            ("attributeFormDefault", &schema.attribute_form_default),
        ];
        for (key, value) in schema_attributes {
            if let Some(value) = value {
                json.schema_attributes.insert(key.to_string(), value.clone());
            }
        }

        let mut root = ObjectNode::default();
        for (name, element) in &schema.elements {
            root.properties
                .insert(name.clone(), self.element_property(element, "(schema)", 0)?);
        }
        for (name, attribute) in &schema.attributes {
            let key = self.global_attribute_key(name);
            let mut node = self.attribute_property(attribute)?;
            if key != *name {
                node.keywords.name = Some(name.clone());
            }
            root.properties.insert(key, node);
        }
        json.root = JsonSchemaNode::object(root);
        json.root.keywords.annotation = self.annotation(&schema.annotation);

        for (name, definition) in &schema.types {
            debug!(type_name = %name, simple = definition.is_simple(), "converting named type");
            let (mut node, annotation) = match definition {
                TypeDefinition::Complex(ct) => (self.complex_type_node(ct, 0)?, &ct.annotation),
                TypeDefinition::Simple(st) => (self.simple_type_node(st)?, &st.annotation),
            };
            node.keywords.annotation = self.annotation(annotation);
            json.definitions.insert(name.clone(), node);
        }

        Ok(json)
    }

    fn annotation(&mut self, annotation: &Option<Annotation>) -> Option<Annotation> {
        let annotation = annotation.clone()?.non_empty()?;
        if self.config.emit_annotations() {
            Some(annotation)
        } else {
            self.dropped_annotations += 1;
            None
        }
    }

    /// Root key of a global attribute; prefixed when an element has its name
    fn global_attribute_key(&self, name: &str) -> String {
        if self.schema.elements.contains_key(name) {
            format!("{}{}", self.config.attr_prefix(), name)
        } else {
            name.to_string()
        }
    }

    fn element_property(&mut self, element: &Element, owner: &str, depth: usize) -> Result<JsonSchemaNode> {
        let builtin = self.content_builtin(&element.content);
        let mut value = match &element.content {
            ElementContent::Unspecified => JsonSchemaNode::any(),
            ElementContent::Type(type_ref) => type_ref_node(type_ref),
            ElementContent::Complex(ct) => {
                let mut node = self.complex_type_node(ct, depth + 1)?;
                node.keywords.type_annotation = self.annotation(&ct.annotation);
                node
            }
            ElementContent::Simple(st) => {
                let mut node = self.simple_type_node(st)?;
                node.keywords.type_annotation = self.annotation(&st.annotation);
                node
            }
        };
        if let Some(default) = &element.default {
            value.default = Some(lexical_to_json(builtin, default));
        }
        if let Some(fixed) = &element.fixed {
            value.constant = Some(lexical_to_json(builtin, fixed));
        }

        let mut node = with_occurs(value, element.occurs);
        node.keywords.nillable = element.nillable;
        node.keywords.annotation = self.annotation(&element.annotation);
        debug!(element = %element.name, owner, occurs = %element.occurs, "converted element");
        Ok(node)
    }

    /// Built-in used to type default and fixed values
    fn content_builtin(&self, content: &ElementContent) -> BuiltinType {
        match content {
            ElementContent::Type(type_ref) => {
                ultimate_builtin(self.schema, type_ref).unwrap_or(BuiltinType::String)
            }
            ElementContent::Simple(st) => {
                ultimate_builtin(self.schema, &st.base).unwrap_or(BuiltinType::String)
            }
            ElementContent::Complex(ct) => match &ct.content {
                ComplexContent::Simple(sc) => self.simple_content_builtin(sc),
                _ => BuiltinType::String,
            },
            ElementContent::Unspecified => BuiltinType::String,
        }
    }

    fn simple_content_builtin(&self, content: &SimpleContent) -> BuiltinType {
        let resolved = match content {
            SimpleContent::Type(type_ref) => ultimate_builtin(self.schema, type_ref).ok(),
            SimpleContent::Anonymous(st) => ultimate_builtin(self.schema, &st.base).ok(),
            SimpleContent::Unspecified => None,
        };
        resolved.unwrap_or(BuiltinType::String)
    }

    fn complex_type_node(&mut self, ct: &ComplexType, depth: usize) -> Result<JsonSchemaNode> {
        self.config.limits().check_nesting_depth(depth)?;
        let owner = ct.display_name().to_string();

        let mut reserved: HashSet<String> = HashSet::new();
        if let Some(group) = ct.group() {
            collect_element_names(group, &mut reserved);
        }
        if matches!(ct.content, ComplexContent::Simple(_)) {
            reserved.insert(self.config.text_key().to_string());
        }
        let attributes = self.attribute_properties(&ct.attributes, &reserved, &owner)?;

        let node = match &ct.content {
            ComplexContent::Empty => JsonSchemaNode::object(attributes.into_object()),
            ComplexContent::Group(group) => {
                let content = self.group_node(group, false, &owner, depth)?;
                attach_attributes(content, attributes)
            }
            ComplexContent::Extension { base, group } => {
                let mut parts = vec![JsonSchemaNode::reference(&RefTarget::Definition(base.clone()))];
                match group {
                    Some(group) => {
                        let content = self.group_node(group, false, &owner, depth)?;
                        match attach_attributes(content, attributes) {
                            JsonSchemaNode {
                                kind: NodeKind::Combinator(combinator),
                                keywords,
                                ..
                            } if combinator.kind == CombinatorKind::AllOf && keywords.is_empty() => {
                                parts.extend(combinator.branches)
                            }
                            content => parts.push(content),
                        }
                    }
                    // Always a second part, so the type never reads as an alias
                    None => parts.push(JsonSchemaNode::object(attributes.into_object())),
                }
                JsonSchemaNode::combinator(CombinatorKind::AllOf, parts)
            }
            ComplexContent::Simple(content) => {
                let mut text = self.simple_content_node(content)?;
                text.keywords.text = true;
                let key = self.config.text_key().to_string();
                let mut object = attributes.into_object();
                object.properties.shift_insert(0, key.clone(), text);
                object.required.insert(0, key);
                JsonSchemaNode::object(object)
            }
        };
        Ok(node)
    }

    fn attribute_properties(
        &mut self,
        attributes: &[AttributeUse],
        reserved: &HashSet<String>,
        owner: &str,
    ) -> Result<AttributeSet> {
        let mut set = AttributeSet::default();
        for attribute in attributes {
            if attribute.use_kind == AttributeUseKind::Prohibited {
                return Err(ConversionError::new(ConstructKind::Attribute)
                    .with_type_name(owner)
                    .with_detail(format!("prohibited attribute '{}'", attribute.name))
                    .into());
            }
            let key = if reserved.contains(&attribute.name) {
                format!("{}{}", self.config.attr_prefix(), attribute.name)
            } else {
                attribute.name.clone()
            };
            let mut node = self.attribute_property(attribute)?;
            if key != attribute.name {
                node.keywords.name = Some(attribute.name.clone());
            }
            if attribute.is_required() {
                set.required.push(key.clone());
            }
            set.properties.insert(key, node);
        }
        Ok(set)
    }

    fn attribute_property(&mut self, attribute: &AttributeUse) -> Result<JsonSchemaNode> {
        let (mut node, builtin) = if attribute.is_ref {
            let builtin = self
                .schema
                .attributes
                .get(&attribute.name)
                .map(|global| self.simple_content_builtin(&global.content))
                .unwrap_or(BuiltinType::String);
            let target = RefTarget::Property(self.global_attribute_key(&attribute.name));
            (JsonSchemaNode::reference(&target), builtin)
        } else {
            (
                self.simple_content_node(&attribute.content)?,
                self.simple_content_builtin(&attribute.content),
            )
        };

        if let Some(default) = &attribute.default {
            node.default = Some(lexical_to_json(builtin, default));
        }
        if let Some(fixed) = &attribute.fixed {
            node.constant = Some(lexical_to_json(builtin, fixed));
        }
        node.keywords.attribute = true;
        node.keywords.annotation = self.annotation(&attribute.annotation);
        Ok(node)
    }

    fn simple_content_node(&mut self, content: &SimpleContent) -> Result<JsonSchemaNode> {
        Ok(match content {
            SimpleContent::Unspecified => JsonSchemaNode::any(),
            SimpleContent::Type(type_ref) => type_ref_node(type_ref),
            SimpleContent::Anonymous(st) => {
                let mut node = self.simple_type_node(st)?;
                node.keywords.type_annotation = self.annotation(&st.annotation);
                node
            }
        })
    }

    fn simple_type_node(&mut self, st: &SimpleType) -> Result<JsonSchemaNode> {
        match &st.base {
            TypeRef::Builtin(builtin) => {
                let mut primitive = builtin_primitive(*builtin);
                let mut keywords = XsdKeywords::default();
                if !builtin.is_implied_by_json() {
                    keywords.xsd_type = Some(*builtin);
                }
                apply_facets(&mut primitive, &mut keywords, &st.facets, *builtin);
                Ok(JsonSchemaNode::primitive(primitive).with_keywords(keywords))
            }
            TypeRef::Named(name) => {
                let base = JsonSchemaNode::reference(&RefTarget::Definition(name.clone()));
                if st.facets.is_empty() {
                    return Ok(base);
                }
                let builtin = ultimate_builtin(self.schema, &st.base)?;
                let mut primitive = builtin_primitive(builtin);
                let mut keywords = XsdKeywords::default();
                apply_facets(&mut primitive, &mut keywords, &st.facets, builtin);
                let restriction = JsonSchemaNode::primitive(primitive).with_keywords(keywords);
                Ok(JsonSchemaNode::combinator(CombinatorKind::AllOf, vec![base, restriction]))
            }
        }
    }

    fn group_node(
        &mut self,
        group: &ModelGroup,
        nested: bool,
        owner: &str,
        depth: usize,
    ) -> Result<JsonSchemaNode> {
        self.config.limits().check_nesting_depth(depth)?;

        let mut keywords = XsdKeywords::default();
        if group.occurs != Occurs::once() {
            keywords.occurs = Some(group.occurs);
        }

        match group.compositor {
            Compositor::Sequence if group.is_flat() && !has_duplicate_names(group) => {
                let mut object = ObjectNode::default();
                for particle in &group.particles {
                    self.add_element_particle(&mut object, particle, owner, depth)?;
                }
                if nested || group.particles.is_empty() || keywords.occurs.is_some() {
                    keywords.structure = Some(Compositor::Sequence);
                }
                Ok(JsonSchemaNode::object(object).with_keywords(keywords))
            }
            Compositor::Sequence => {
                // Runs of consecutive elements become objects, a repeated
                // element name starts a new run
                let mut branches = Vec::new();
                let mut run = ObjectNode::default();
                for particle in &group.particles {
                    match particle {
                        Particle::Group(inner) => {
                            flush_run(&mut run, &mut branches);
                            branches.push(self.group_node(inner, true, owner, depth + 1)?);
                        }
                        _ => {
                            let repeated = particle
                                .element_name()
                                .map(|name| run.properties.contains_key(name))
                                .unwrap_or(false);
                            if repeated {
                                flush_run(&mut run, &mut branches);
                            }
                            self.add_element_particle(&mut run, particle, owner, depth)?;
                        }
                    }
                }
                flush_run(&mut run, &mut branches);
                keywords.structure = Some(Compositor::Sequence);
                Ok(JsonSchemaNode::combinator(CombinatorKind::AllOf, branches).with_keywords(keywords))
            }
            Compositor::Choice => {
                if group.particles.is_empty() {
                    return Err(ConversionError::new(ConstructKind::Compositor)
                        .with_type_name(owner)
                        .with_detail("empty choice")
                        .into());
                }
                let mut branches = Vec::new();
                for particle in &group.particles {
                    let branch = match particle {
                        Particle::Group(inner) => self.group_node(inner, true, owner, depth + 1)?,
                        _ => {
                            let mut object = ObjectNode::default();
                            self.add_element_particle(&mut object, particle, owner, depth)?;
                            JsonSchemaNode::object(object)
                        }
                    };
                    branches.push(branch);
                }
                keywords.structure = Some(Compositor::Choice);
                Ok(JsonSchemaNode::combinator(CombinatorKind::OneOf, branches).with_keywords(keywords))
            }
            Compositor::All => {
                if !group.is_flat() || has_duplicate_names(group) {
                    return Err(ConversionError::new(ConstructKind::Compositor)
                        .with_type_name(owner)
                        .with_detail("xs:all may only hold distinct elements")
                        .into());
                }
                let mut object = ObjectNode::default();
                for particle in &group.particles {
                    self.add_element_particle(&mut object, particle, owner, depth)?;
                }
                keywords.structure = Some(Compositor::All);
                Ok(JsonSchemaNode::object(object).with_keywords(keywords))
            }
        }
    }

    fn add_element_particle(
        &mut self,
        object: &mut ObjectNode,
        particle: &Particle,
        owner: &str,
        depth: usize,
    ) -> Result<()> {
        let (key, node, occurs) = match particle {
            Particle::Element(element) => (
                element.name.clone(),
                self.element_property(element, owner, depth + 1)?,
                element.occurs,
            ),
            Particle::ElementRef(reference) => {
                let target = JsonSchemaNode::reference(&RefTarget::Property(reference.name.clone()));
                let mut node = with_occurs(target, reference.occurs);
                node.keywords.annotation = self.annotation(&reference.annotation);
                (reference.name.clone(), node, reference.occurs)
            }
            Particle::Group(_) => return Ok(()),
        };
        if occurs.min >= 1 {
            object.required.push(key.clone());
        }
        object.properties.insert(key, node);
        Ok(())
    }
}

fn type_ref_node(type_ref: &TypeRef) -> JsonSchemaNode {
    match type_ref {
        TypeRef::Builtin(builtin) => builtin_node(*builtin),
        TypeRef::Named(name) => JsonSchemaNode::reference(&RefTarget::Definition(name.clone())),
    }
}

fn builtin_node(builtin: BuiltinType) -> JsonSchemaNode {
    let mut node = match builtin.json_type() {
        Some(_) => JsonSchemaNode::primitive(PrimitiveNode::for_builtin(builtin)),
        None => JsonSchemaNode::any(),
    };
    if !builtin.is_implied_by_json() {
        node.keywords.xsd_type = Some(builtin);
    }
    node
}

fn builtin_primitive(builtin: BuiltinType) -> PrimitiveNode {
    match builtin.json_type() {
        Some(_) => PrimitiveNode::for_builtin(builtin),
        None => PrimitiveNode::new(JsonType::String),
    }
}

fn with_occurs(value: JsonSchemaNode, occurs: Occurs) -> JsonSchemaNode {
    if occurs.is_single() {
        return value;
    }
    JsonSchemaNode::array(ArrayNode {
        items: Some(Items::Single(Box::new(value))),
        min_items: (occurs.min > 0).then_some(u64::from(occurs.min)),
        max_items: occurs.max.map(u64::from),
    })
}

fn attach_attributes(content: JsonSchemaNode, attributes: AttributeSet) -> JsonSchemaNode {
    if attributes.is_empty() {
        return content;
    }
    match content {
        JsonSchemaNode {
            kind: NodeKind::Object(mut object),
            keywords,
            default,
            constant,
            extra,
        } => {
            object.properties.extend(attributes.properties);
            object.required.extend(attributes.required);
            JsonSchemaNode {
                kind: NodeKind::Object(object),
                keywords,
                default,
                constant,
                extra,
            }
        }
        content => JsonSchemaNode::combinator(
            CombinatorKind::AllOf,
            vec![content, JsonSchemaNode::object(attributes.into_object())],
        ),
    }
}

fn flush_run(run: &mut ObjectNode, branches: &mut Vec<JsonSchemaNode>) {
    if !run.properties.is_empty() {
        branches.push(JsonSchemaNode::object(std::mem::take(run)));
    }
}

fn has_duplicate_names(group: &ModelGroup) -> bool {
    let mut seen = HashSet::new();
    group
        .particles
        .iter()
        .filter_map(Particle::element_name)
        .any(|name| !seen.insert(name))
}

fn collect_element_names(group: &ModelGroup, names: &mut HashSet<String>) {
    for particle in &group.particles {
        match particle {
            Particle::Group(inner) => collect_element_names(inner, names),
            _ => {
                if let Some(name) = particle.element_name() {
                    names.insert(name.to_string());
                }
            }
        }
    }
}

/// Place facets on JSON keywords; facets without a free keyword slot go to
/// `@xsdRestrictions`
fn apply_facets(
    primitive: &mut PrimitiveNode,
    keywords: &mut XsdKeywords,
    facets: &[Facet],
    builtin: BuiltinType,
) {
    fn place_number(slot: &mut Option<serde_json::Number>, builtin: BuiltinType, lexical: &str) -> bool {
        if !builtin.is_numeric() || slot.is_some() {
            return false;
        }
        match number_from_lexical(lexical) {
            Some(number) => {
                *slot = Some(number);
                true
            }
            None => false,
        }
    }

    for facet in facets {
        let placed = match facet {
            Facet::Length(n) => {
                if primitive.min_length.is_none() && primitive.max_length.is_none() {
                    primitive.min_length = Some(*n);
                    primitive.max_length = Some(*n);
                    keywords.length = true;
                    true
                } else {
                    false
                }
            }
            Facet::MinLength(n) if primitive.min_length.is_none() && !keywords.length => {
                primitive.min_length = Some(*n);
                true
            }
            Facet::MaxLength(n) if primitive.max_length.is_none() && !keywords.length => {
                primitive.max_length = Some(*n);
                true
            }
            Facet::Pattern(pattern) if primitive.pattern.is_none() => {
                primitive.pattern = Some(pattern.clone());
                true
            }
            Facet::Enumeration(value) => {
                primitive.enumeration.push(lexical_to_json(builtin, value));
                true
            }
            Facet::MinInclusive(v) => place_number(&mut primitive.minimum, builtin, v),
            Facet::MaxInclusive(v) => place_number(&mut primitive.maximum, builtin, v),
            Facet::MinExclusive(v) => place_number(&mut primitive.exclusive_minimum, builtin, v),
            Facet::MaxExclusive(v) => place_number(&mut primitive.exclusive_maximum, builtin, v),
            _ => false,
        };
        if !placed {
            keywords.restrictions.push(facet.clone());
        }
    }

    if builtin.is_integer() && primitive.pattern.is_none() {
        let total_digits = facets.iter().find_map(|facet| match facet {
            Facet::TotalDigits(n) => Some(*n),
            _ => None,
        });
        if let Some(digits) = total_digits {
            primitive.pattern = Some(total_digits_pattern(digits));
            keywords.derived_pattern = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::ElementRef;
    use serde_json::json;

    fn convert(xsd: &str) -> serde_json::Value {
        let schema = Schema::from_string(xsd).unwrap();
        XsdToJsonConverter::default()
            .convert(&schema)
            .unwrap()
            .value
            .to_value()
    }

    const HEAD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">"#;

    #[test]
    fn test_sequence_keeps_order_and_required() {
        let value = convert(&format!(
            r#"{HEAD}
              <xs:element name="person" type="PersonType"/>
              <xs:complexType name="PersonType">
                <xs:sequence>
                  <xs:element name="name" type="xs:string"/>
                  <xs:element name="age" type="xs:int" minOccurs="0"/>
                  <xs:element name="nick" type="xs:string" maxOccurs="unbounded"/>
                </xs:sequence>
                <xs:attribute name="id" type="xs:ID" use="required"/>
              </xs:complexType>
            </xs:schema>"#
        ));

        let person = &value["definitions"]["PersonType"];
        let keys: Vec<&String> = person["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "age", "nick", "id"]);
        assert_eq!(person["required"], json!(["name", "nick", "id"]));
        assert_eq!(person["properties"]["age"], json!({"type": "integer", "@xsdType": "int"}));
        assert_eq!(person["properties"]["nick"]["type"], json!("array"));
        assert_eq!(person["properties"]["nick"]["minItems"], json!(1));
        assert_eq!(person["properties"]["id"]["@xsdAttribute"], json!(true));
        assert!(person.get("@xsdStructure").is_none());
        assert_eq!(value["properties"]["person"], json!({"$ref": "#/definitions/PersonType"}));
    }

    #[test]
    fn test_choice_becomes_marked_one_of() {
        let value = convert(&format!(
            r#"{HEAD}
              <xs:complexType name="Shape">
                <xs:choice>
                  <xs:element name="a" type="xs:string"/>
                  <xs:element name="b" type="xs:string"/>
                  <xs:element name="c" type="xs:string"/>
                </xs:choice>
              </xs:complexType>
            </xs:schema>"#
        ));

        let shape = &value["definitions"]["Shape"];
        assert_eq!(shape["@xsdStructure"], json!("choice"));
        let branches = shape["oneOf"].as_array().unwrap();
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[0]["properties"]["a"], json!({"type": "string"}));
        assert_eq!(branches[2]["required"], json!(["c"]));
    }

    #[test]
    fn test_length_facet_keeps_marker() {
        let value = convert(&format!(
            r#"{HEAD}
              <xs:simpleType name="Code">
                <xs:restriction base="xs:string"><xs:length value="5"/></xs:restriction>
              </xs:simpleType>
            </xs:schema>"#
        ));
        assert_eq!(
            value["definitions"]["Code"],
            json!({"type": "string", "minLength": 5, "maxLength": 5, "@xsdLength": true})
        );
    }

    #[test]
    fn test_attribute_element_collision() {
        let value = convert(&format!(
            r#"{HEAD}
              <xs:complexType name="T">
                <xs:sequence><xs:element name="foo" type="xs:string"/></xs:sequence>
                <xs:attribute name="foo" type="xs:string"/>
              </xs:complexType>
            </xs:schema>"#
        ));
        let properties = &value["definitions"]["T"]["properties"];
        assert_eq!(properties["foo"], json!({"type": "string"}));
        assert_eq!(
            properties["@foo"],
            json!({"type": "string", "@xsdAttribute": true, "@xsdName": "foo"})
        );
    }

    #[test]
    fn test_numeric_facets_and_restrictions() {
        let value = convert(&format!(
            r#"{HEAD}
              <xs:simpleType name="Amount">
                <xs:restriction base="xs:decimal">
                  <xs:minInclusive value="0"/>
                  <xs:maxExclusive value="1000.50"/>
                  <xs:totalDigits value="6"/>
                  <xs:fractionDigits value="2"/>
                </xs:restriction>
              </xs:simpleType>
              <xs:simpleType name="Year">
                <xs:restriction base="xs:integer"><xs:totalDigits value="4"/></xs:restriction>
              </xs:simpleType>
            </xs:schema>"#
        ));
        let amount = &value["definitions"]["Amount"];
        assert_eq!(amount["minimum"], json!(0));
        assert_eq!(amount["exclusiveMaximum"], json!(1000.5));
        assert_eq!(amount["@xsdRestrictions"], json!({"totalDigits": 6, "fractionDigits": 2}));
        assert_eq!(value["definitions"]["Year"]["pattern"], json!("^-?[0-9]{1,4}$"));
        assert_eq!(value["definitions"]["Year"]["@xsdDerivedPattern"], json!(true));
        assert!(amount.get("@xsdDerivedPattern").is_none());
    }

    #[test]
    fn test_inexact_numbers_stay_lexical() {
        let value = convert(&format!(
            r#"{HEAD}
              <xs:simpleType name="Huge">
                <xs:restriction base="xs:decimal">
                  <xs:minInclusive value="0"/>
                  <xs:maxInclusive value="12345678901234567.89"/>
                  <xs:enumeration value="12345678901234567.89"/>
                </xs:restriction>
              </xs:simpleType>
            </xs:schema>"#
        ));
        let huge = &value["definitions"]["Huge"];
        assert_eq!(huge["minimum"], json!(0));
        assert!(huge.get("maximum").is_none());
        assert_eq!(huge["@xsdRestrictions"], json!({"maxInclusive": "12345678901234567.89"}));
        assert_eq!(huge["enum"], json!(["12345678901234567.89"]));
    }

    #[test]
    fn test_unsupported_construct_fails_conversion() {
        let schema = Schema::from_string(&format!(
            r#"{HEAD}
              <xs:complexType name="Open">
                <xs:sequence><xs:any/></xs:sequence>
              </xs:complexType>
            </xs:schema>"#
        ))
        .unwrap();
        let err = XsdToJsonConverter::default().convert(&schema).unwrap_err();
        match err {
            crate::Error::Conversion(e) => {
                assert_eq!(e.kind, ConstructKind::Wildcard);
                assert_eq!(e.type_name.as_deref(), Some("Open"));
            }
            other => panic!("expected conversion error, got {:?}", other),
        }
    }

    #[test]
    fn test_prohibited_attribute_is_rejected() {
        let mut schema = Schema::new();
        let mut ct = ComplexType::new(Some("T".into()), ComplexContent::Empty);
        ct.attributes.push(
            AttributeUse::new("x", SimpleContent::Unspecified).with_use(AttributeUseKind::Prohibited),
        );
        schema.add_complex_type(ct).unwrap();
        let err = XsdToJsonConverter::default().convert(&schema).unwrap_err();
        assert!(matches!(err, crate::Error::Conversion(ref e) if e.kind == ConstructKind::Attribute));
    }

    #[test]
    fn test_element_ref_and_duplicate_sequence_names() {
        let mut schema = Schema::new();
        schema
            .add_element(Element::typed("note", TypeRef::Builtin(BuiltinType::String)))
            .unwrap();
        let group = ModelGroup::new(Compositor::Sequence)
            .with_particle(Particle::Element(Element::typed("a", TypeRef::Builtin(BuiltinType::String))))
            .with_particle(Particle::ElementRef(ElementRef {
                name: "note".into(),
                occurs: Occurs::zero_or_more(),
                annotation: None,
            }))
            .with_particle(Particle::Element(Element::typed("a", TypeRef::Builtin(BuiltinType::String))));
        schema
            .add_complex_type(ComplexType::new(Some("T".into()), ComplexContent::Group(group)))
            .unwrap();

        let value = XsdToJsonConverter::default().convert(&schema).unwrap().value.to_value();
        let t = &value["definitions"]["T"];
        assert_eq!(t["@xsdStructure"], json!("sequence"));
        let runs = t["allOf"].as_array().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(
            runs[0]["properties"]["note"]["items"],
            json!({"$ref": "#/properties/note"})
        );
    }

    #[test]
    fn test_annotations_can_be_suppressed() {
        let xsd = format!(
            r#"{HEAD}
              <xs:annotation><xs:documentation>root doc</xs:documentation></xs:annotation>
              <xs:element name="a" type="xs:string"/>
            </xs:schema>"#
        );
        let schema = Schema::from_string(&xsd).unwrap();
        let converter = XsdToJsonConverter::new(ConverterConfig::new().with_emit_annotations(false));
        let converted = converter.convert(&schema).unwrap();
        assert_eq!(converted.warnings.len(), 1);
        assert!(converted.value.root.keywords.annotation.is_none());
    }
}
