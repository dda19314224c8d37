//! JSON Schema to XSD type graph
//!
//! Works on normalized documents: every `$ref` is checked to resolve before
//! anything is built. Definitions become named types, simple or complex
//! depending on what they describe; root properties become global elements
//! and attributes. The `@xsd*` keywords written by the forward direction
//! restore compositors, attributes and facets exactly; plain JSON Schema is
//! mapped onto the closest XSD construct with a warning when the mapping
//! loses information.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::values::{fraction_digits_of, json_to_lexical};
use super::ConverterConfig;
use crate::error::{ConstructKind, ConversionError, Converted, Error, LossyConversionWarning, Result};
use crate::json::normalizer::check_references;
use crate::json::{CombinatorKind, Items, JsonSchema, JsonSchemaNode, NodeKind, ObjectNode, PrimitiveNode, RefTarget, XsdKeywords};
use crate::names::validate_ncname;
use crate::xsd::{
    Annotation, AttributeUse, AttributeUseKind, BuiltinType, ComplexContent, ComplexType,
    Compositor, Element, ElementContent, ElementRef, Facet, ModelGroup, Occurs,
    Particle, Schema, SimpleContent, SimpleType, TypeRef,
};

const SCHEMA_COMPONENT: &str = "(schema)";

/// Converts JSON Schema documents to XSD type graphs
#[derive(Debug, Clone, Default)]
pub struct JsonToXsdConverter {
    config: ConverterConfig,
}

impl JsonToXsdConverter {
    /// Create a converter
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one document
    pub fn convert(&self, json: &JsonSchema) -> Result<Converted<Schema>> {
        check_references(json)?;
        self.config
            .limits()
            .check_schema_components(json.definitions.len() + json.root_properties().map_or(0, |p| p.len()))?;

        let mut run = ReverseRun {
            config: &self.config,
            json,
            warnings: Vec::new(),
            complexity: HashMap::new(),
        };
        run.scan_dropped_keywords();
        let schema = run.document()?;
        schema.check()?;

        info!(
            types = schema.types.len(),
            elements = schema.elements.len(),
            warnings = run.warnings.len(),
            "converted JSON Schema to XSD"
        );
        Ok(Converted::new(schema, run.warnings))
    }
}

/// Pieces of a complex type collected from (possibly nested) `allOf` parts
#[derive(Default)]
struct Parts {
    base: Option<String>,
    text: Option<SimpleContent>,
    attributes: Vec<AttributeUse>,
    /// Model groups and whether they may be spliced into a wrapping sequence
    groups: Vec<(ModelGroup, bool)>,
}

impl Parts {
    fn into_content(self, owner: &str) -> Result<(ComplexContent, Vec<AttributeUse>)> {
        let Parts {
            base,
            text,
            attributes,
            mut groups,
        } = self;

        let content = match (text, base) {
            (Some(_), _) if !groups.is_empty() => {
                return Err(ConversionError::new(ConstructKind::Compositor)
                    .with_type_name(owner)
                    .with_detail("text content next to element content")
                    .into())
            }
            (Some(_), Some(base)) => {
                return Err(ConversionError::new(ConstructKind::Derivation)
                    .with_type_name(owner)
                    .with_detail(format!("simple content extending complex type '{}'", base))
                    .into())
            }
            (Some(text), None) => ComplexContent::Simple(text),
            (None, base) => {
                let group = match groups.len() {
                    0 => None,
                    1 => groups.pop().map(|(group, _)| group),
                    _ => {
                        let mut wrapper = ModelGroup::new(Compositor::Sequence);
                        for (group, spliceable) in groups {
                            if spliceable && group.occurs == Occurs::once() {
                                wrapper.particles.extend(group.particles);
                            } else {
                                wrapper.particles.push(Particle::Group(group));
                            }
                        }
                        Some(wrapper)
                    }
                };
                match (base, group) {
                    (Some(base), group) => ComplexContent::Extension { base, group },
                    (None, Some(group)) => ComplexContent::Group(group),
                    (None, None) => ComplexContent::Empty,
                }
            }
        };
        Ok((content, attributes))
    }
}

struct ReverseRun<'a> {
    config: &'a ConverterConfig,
    json: &'a JsonSchema,
    warnings: Vec<LossyConversionWarning>,
    complexity: HashMap<String, bool>,
}

impl<'a> ReverseRun<'a> {
    fn lossy(&mut self, component: impl Into<String>, message: impl Into<String>) {
        let warning = LossyConversionWarning::new(component, message);
        warn!(%warning, "lossy conversion");
        self.warnings.push(warning);
    }

    fn scan_dropped_keywords(&mut self) {
        let json = self.json;
        for (pointer, node) in json.walk() {
            for key in node.extra.keys() {
                self.lossy(pointer.clone(), format!("keyword '{}' has no XSD equivalent", key));
            }
            if let NodeKind::Object(ObjectNode {
                additional_properties: Some(true),
                ..
            }) = node.kind
            {
                self.lossy(pointer, "additionalProperties: true has no XSD equivalent");
            }
        }
    }

    fn document(&mut self) -> Result<Schema> {
        let json = self.json;
        let mut schema = Schema::new();
        schema.namespaces = json.namespaces.clone();
        for (key, value) in &json.schema_attributes {
            match key.as_str() {
                "targetNamespace" => schema.target_namespace = Some(value.clone()),
                "elementFormDefault" => schema.element_form_default = Some(value.clone()),
                "attributeFormDefault" => schema.attribute_form_default = Some(value.clone()),
                other => self.lossy(SCHEMA_COMPONENT, format!("schema attribute '{}' dropped", other)),
            }
        }
        schema.annotation = json.root.keywords.annotation.clone();

        let empty = ObjectNode::default();
        let root = match &json.root.kind {
            NodeKind::Object(object) => object,
            NodeKind::Any => &empty,
            _ => {
                return Err(ConversionError::new(ConstructKind::Node)
                    .with_type_name(SCHEMA_COMPONENT)
                    .with_detail("the document root must describe an object")
                    .into())
            }
        };

        for (key, node) in &root.properties {
            if node.keywords.attribute {
                let attribute = self.attribute_from_property(key, node, false, SCHEMA_COMPONENT)?;
                if attribute.is_ref {
                    return Err(ConversionError::new(ConstructKind::Attribute)
                        .with_type_name(SCHEMA_COMPONENT)
                        .with_detail(format!("global attribute '{}' is a reference", key))
                        .into());
                }
                if schema.attributes.contains_key(&attribute.name) {
                    return Err(Error::malformed(format!(
                        "attribute '{}' is declared more than once",
                        attribute.name
                    )));
                }
                schema.attributes.insert(attribute.name.clone(), attribute);
                continue;
            }

            if matches!(node.kind, NodeKind::Array(_)) {
                self.lossy(key.clone(), "occurrence bounds of a global element dropped");
            }
            match self.particle_from_property(key, node, true, SCHEMA_COMPONENT, 0)? {
                Particle::Element(mut element) => {
                    element.occurs = Occurs::once();
                    schema.add_element(element)?;
                }
                _ => {
                    return Err(ConversionError::new(ConstructKind::Element)
                        .with_type_name(SCHEMA_COMPONENT)
                        .with_detail(format!("global element '{}' is a reference", key))
                        .into())
                }
            }
        }

        for (name, node) in json.definitions.iter() {
            validate_ncname(name)?;
            let annotation = node.keywords.annotation.clone();
            if self.definition_is_complex(name)? {
                debug!(type_name = name, "building complex type");
                let ct = self.complex_type_from_node(Some(name.to_string()), node, annotation, name, 0)?;
                schema.add_complex_type(ct)?;
            } else {
                debug!(type_name = name, "building simple type");
                let st = self.simple_type_from_node(Some(name.to_string()), node, annotation, name)?;
                schema.add_simple_type(st)?;
            }
        }

        Ok(schema)
    }

    fn definition_is_complex(&mut self, name: &str) -> Result<bool> {
        if let Some(complex) = self.complexity.get(name) {
            return Ok(*complex);
        }
        let node = self.json.definitions.resolve(name)?;
        let mut visiting = HashSet::new();
        visiting.insert(name.to_string());
        let complex = self.node_is_complex(node, &mut visiting)?;
        self.complexity.insert(name.to_string(), complex);
        Ok(complex)
    }

    /// Whether a node describes element content or attributes
    fn node_is_complex(&self, node: &JsonSchemaNode, visiting: &mut HashSet<String>) -> Result<bool> {
        match &node.kind {
            NodeKind::Object(_) => Ok(true),
            NodeKind::Primitive(_) | NodeKind::Any => Ok(false),
            NodeKind::Array(_) => Err(ConversionError::new(ConstructKind::Node)
                .with_detail("an array cannot be used as a type")
                .into()),
            NodeKind::Reference(_) => match self.target_of(node)? {
                RefTarget::Definition(name) => {
                    if !visiting.insert(name.clone()) {
                        return Ok(false);
                    }
                    let target = self.json.definitions.resolve(&name)?;
                    self.node_is_complex(target, visiting)
                }
                RefTarget::Property(name) => Err(ConversionError::new(ConstructKind::Node)
                    .with_detail(format!("property reference '{}' used as a type", name))
                    .into()),
            },
            NodeKind::Combinator(combinator) => {
                if node.keywords.structure.is_some() {
                    return Ok(true);
                }
                for branch in &combinator.branches {
                    if self.node_is_complex(branch, visiting)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn target_of(&self, node: &JsonSchemaNode) -> Result<RefTarget> {
        match node.ref_target() {
            Some(target) => target,
            None => Err(Error::malformed("expected a $ref")),
        }
    }

    fn simple_type_from_node(
        &mut self,
        name: Option<String>,
        node: &JsonSchemaNode,
        annotation: Option<Annotation>,
        owner: &str,
    ) -> Result<SimpleType> {
        let mut simple = match &node.kind {
            NodeKind::Primitive(primitive) => {
                let base = simple_base(node.keywords.xsd_type.unwrap_or_else(|| primitive.implied_builtin()));
                let mut simple = SimpleType::new(name, TypeRef::Builtin(base));
                simple.facets = self.facets_from_primitive(primitive, &node.keywords, owner)?;
                simple
            }
            NodeKind::Any => {
                let base = simple_base(node.keywords.xsd_type.unwrap_or(BuiltinType::AnySimpleType));
                SimpleType::new(name, TypeRef::Builtin(base))
            }
            NodeKind::Reference(_) => SimpleType::new(name, TypeRef::Named(self.simple_definition(node, owner)?)),
            NodeKind::Combinator(combinator)
                if combinator.kind == CombinatorKind::AllOf && combinator.branches.len() == 2 =>
            {
                let (reference, restriction) = match (&combinator.branches[0].kind, &combinator.branches[1].kind) {
                    (NodeKind::Reference(_), NodeKind::Primitive(p)) => (&combinator.branches[0], (p, &combinator.branches[1])),
                    (NodeKind::Primitive(p), NodeKind::Reference(_)) => (&combinator.branches[1], (p, &combinator.branches[0])),
                    _ => return Err(not_simple(owner)),
                };
                let base = self.simple_definition(reference, owner)?;
                let mut simple = SimpleType::new(name, TypeRef::Named(base));
                simple.facets = self.facets_from_primitive(restriction.0, &restriction.1.keywords, owner)?;
                simple
            }
            _ => return Err(not_simple(owner)),
        };
        simple.annotation = annotation;
        Ok(simple)
    }

    /// Name of the simple definition a `$ref` points at
    fn simple_definition(&mut self, node: &JsonSchemaNode, owner: &str) -> Result<String> {
        match self.target_of(node)? {
            RefTarget::Definition(name) => {
                if self.definition_is_complex(&name)? {
                    return Err(ConversionError::new(ConstructKind::Derivation)
                        .with_type_name(owner)
                        .with_detail(format!("simple value restricts complex type '{}'", name))
                        .into());
                }
                Ok(name)
            }
            RefTarget::Property(name) => Err(ConversionError::new(ConstructKind::Node)
                .with_type_name(owner)
                .with_detail(format!("property reference '{}' used as a type", name))
                .into()),
        }
    }

    fn facets_from_primitive(
        &mut self,
        primitive: &PrimitiveNode,
        keywords: &XsdKeywords,
        owner: &str,
    ) -> Result<Vec<Facet>> {
        let mut facets = Vec::new();

        match (primitive.min_length, primitive.max_length) {
            (Some(min), Some(max)) if keywords.length && min == max => facets.push(Facet::Length(min)),
            (min, max) => {
                if keywords.length {
                    self.lossy(owner, "@xsdLength without equal minLength and maxLength ignored");
                }
                facets.extend(min.map(Facet::MinLength));
                facets.extend(max.map(Facet::MaxLength));
            }
        }

        if let Some(pattern) = &primitive.pattern {
            if !keywords.derived_pattern {
                facets.push(Facet::Pattern(pattern.clone()));
            } else if !keywords.restrictions.iter().any(|f| matches!(f, Facet::TotalDigits(_))) {
                self.lossy(owner, format!("@xsdDerivedPattern without totalDigits, pattern '{}' dropped", pattern));
            }
        }

        for value in &primitive.enumeration {
            let lexical = json_to_lexical(value).ok_or_else(|| {
                ConversionError::new(ConstructKind::Facet)
                    .with_type_name(owner)
                    .with_detail(format!("enumeration value {} is not a scalar", value))
            })?;
            facets.push(Facet::Enumeration(lexical));
        }

        facets.extend(primitive.minimum.as_ref().map(|n| Facet::MinInclusive(n.to_string())));
        facets.extend(primitive.maximum.as_ref().map(|n| Facet::MaxInclusive(n.to_string())));
        facets.extend(primitive.exclusive_minimum.as_ref().map(|n| Facet::MinExclusive(n.to_string())));
        facets.extend(primitive.exclusive_maximum.as_ref().map(|n| Facet::MaxExclusive(n.to_string())));

        if let Some(multiple_of) = &primitive.multiple_of {
            match fraction_digits_of(multiple_of) {
                Some(digits) if primitive.json_type.is_numeric() => facets.push(Facet::FractionDigits(digits)),
                _ => self.lossy(owner, format!("multipleOf {} has no XSD facet", multiple_of)),
            }
        }

        if let Some(format) = &primitive.format {
            let consumed = BuiltinType::implied_by(primitive.json_type, Some(format)).json_format();
            if consumed != Some(format.as_str()) {
                self.lossy(owner, format!("format '{}' has no XSD type", format));
            }
        }

        facets.extend(keywords.restrictions.iter().cloned());
        Ok(facets)
    }

    fn complex_type_from_node(
        &mut self,
        name: Option<String>,
        node: &JsonSchemaNode,
        annotation: Option<Annotation>,
        owner: &str,
        depth: usize,
    ) -> Result<ComplexType> {
        let mut parts = Parts::default();
        self.collect_parts(node, owner, &mut parts, depth)?;
        let (content, attributes) = parts.into_content(owner)?;
        let mut complex = ComplexType::new(name, content);
        complex.attributes = attributes;
        complex.annotation = annotation;
        Ok(complex)
    }

    fn collect_parts(&mut self, node: &JsonSchemaNode, owner: &str, parts: &mut Parts, depth: usize) -> Result<()> {
        self.config.limits().check_nesting_depth(depth)?;

        match &node.kind {
            NodeKind::Combinator(combinator)
                if combinator.kind == CombinatorKind::AllOf && node.keywords.structure.is_none() =>
            {
                for branch in &combinator.branches {
                    self.collect_parts(branch, owner, parts, depth + 1)?;
                }
            }
            NodeKind::Combinator(_) => {
                let group = self.group_from_node(node, owner, depth + 1)?;
                parts.groups.push((group, false));
            }
            NodeKind::Reference(_) => match self.target_of(node)? {
                RefTarget::Definition(name) => {
                    if !self.definition_is_complex(&name)? {
                        return Err(ConversionError::new(ConstructKind::Derivation)
                            .with_type_name(owner)
                            .with_detail(format!("complex type built on simple type '{}'", name))
                            .into());
                    }
                    if let Some(base) = parts.base.clone() {
                        self.lossy(owner, format!("multiple $ref bases, keeping '{}'", base));
                    } else {
                        parts.base = Some(name);
                    }
                }
                RefTarget::Property(name) => {
                    return Err(ConversionError::new(ConstructKind::Node)
                        .with_type_name(owner)
                        .with_detail(format!("property reference '{}' used as a type", name))
                        .into())
                }
            },
            NodeKind::Object(object) => {
                let mut particles = Vec::new();
                for (key, property) in &object.properties {
                    if property.keywords.attribute {
                        let attribute = self.attribute_from_property(key, property, object.is_required(key), owner)?;
                        parts.attributes.push(attribute);
                    } else if property.keywords.text {
                        if parts.text.is_some() {
                            return Err(ConversionError::new(ConstructKind::Compositor)
                                .with_type_name(owner)
                                .with_detail("more than one text property")
                                .into());
                        }
                        parts.text = Some(self.simple_content_from_node(property, ConstructKind::Compositor, owner)?);
                    } else {
                        particles.push(self.particle_from_property(key, property, object.is_required(key), owner, depth)?);
                    }
                }

                let occurs = node.keywords.occurs.unwrap_or_default();
                match node.keywords.structure {
                    Some(Compositor::Choice) => {
                        return Err(ConversionError::new(ConstructKind::Compositor)
                            .with_type_name(owner)
                            .with_detail("choice marker on an object")
                            .into())
                    }
                    Some(compositor) => {
                        let mut group = ModelGroup::new(compositor).with_occurs(occurs);
                        group.particles = particles;
                        parts.groups.push((group, false));
                    }
                    None if !particles.is_empty() || occurs != Occurs::once() => {
                        let mut group = ModelGroup::new(Compositor::Sequence).with_occurs(occurs);
                        group.particles = particles;
                        parts.groups.push((group, true));
                    }
                    None => {}
                }
            }
            NodeKind::Any => self.lossy(owner, "unconstrained part of a complex type ignored"),
            NodeKind::Primitive(_) | NodeKind::Array(_) => {
                return Err(ConversionError::new(ConstructKind::Node)
                    .with_type_name(owner)
                    .with_detail("scalar or array part in a complex type")
                    .into())
            }
        }
        Ok(())
    }

    fn group_from_node(&mut self, node: &JsonSchemaNode, owner: &str, depth: usize) -> Result<ModelGroup> {
        self.config.limits().check_nesting_depth(depth)?;
        let occurs = node.keywords.occurs.unwrap_or_default();
        let marker = node.keywords.structure;

        let mismatch = |found: &str| -> Error {
            ConversionError::new(ConstructKind::Compositor)
                .with_type_name(owner)
                .with_detail(format!(
                    "{} marked as {}",
                    found,
                    marker.map(|m| m.as_str()).unwrap_or("nothing")
                ))
                .into()
        };

        let group = match &node.kind {
            NodeKind::Object(object) => {
                let compositor = match marker {
                    Some(Compositor::Choice) => return Err(mismatch("object")),
                    Some(compositor) => compositor,
                    None => Compositor::Sequence,
                };
                let mut group = ModelGroup::new(compositor).with_occurs(occurs);
                group.particles = self.nested_particles(object, owner, depth)?;
                group
            }
            NodeKind::Combinator(combinator) => match (combinator.kind, marker) {
                (CombinatorKind::AllOf, None | Some(Compositor::Sequence)) => {
                    let mut group = ModelGroup::new(Compositor::Sequence).with_occurs(occurs);
                    for branch in &combinator.branches {
                        match &branch.kind {
                            NodeKind::Object(object)
                                if branch.keywords.structure.is_none() && branch.keywords.occurs.is_none() =>
                            {
                                let particles = self.nested_particles(object, owner, depth)?;
                                group.particles.extend(particles);
                            }
                            _ => group
                                .particles
                                .push(Particle::Group(self.group_from_node(branch, owner, depth + 1)?)),
                        }
                    }
                    group
                }
                (CombinatorKind::OneOf | CombinatorKind::AnyOf, None | Some(Compositor::Choice)) => {
                    if combinator.kind == CombinatorKind::AnyOf {
                        self.lossy(owner, "anyOf read as xs:choice");
                    }
                    let mut group = ModelGroup::new(Compositor::Choice).with_occurs(occurs);
                    for branch in &combinator.branches {
                        let particle = match &branch.kind {
                            NodeKind::Object(object)
                                if branch.keywords.structure.is_none()
                                    && branch.keywords.occurs.is_none()
                                    && object.properties.len() == 1 =>
                            {
                                let mut particles = self.nested_particles(object, owner, depth)?;
                                match particles.pop() {
                                    Some(particle) => particle,
                                    None => continue,
                                }
                            }
                            _ => Particle::Group(self.group_from_node(branch, owner, depth + 1)?),
                        };
                        group.particles.push(particle);
                    }
                    group
                }
                (kind, _) => return Err(mismatch(kind.keyword())),
            },
            NodeKind::Reference(_) => {
                return Err(ConversionError::new(ConstructKind::Node)
                    .with_type_name(owner)
                    .with_detail("$ref used as a model group")
                    .into())
            }
            _ => {
                return Err(ConversionError::new(ConstructKind::Node)
                    .with_type_name(owner)
                    .with_detail("model group must be an object or a combinator")
                    .into())
            }
        };
        Ok(group)
    }

    /// Element particles of an object nested inside a model group
    fn nested_particles(&mut self, object: &ObjectNode, owner: &str, depth: usize) -> Result<Vec<Particle>> {
        let mut particles = Vec::new();
        for (key, property) in &object.properties {
            if property.keywords.attribute || property.keywords.text {
                return Err(ConversionError::new(ConstructKind::Attribute)
                    .with_type_name(owner)
                    .with_detail(format!("'{}' cannot appear inside a nested model group", key))
                    .into());
            }
            particles.push(self.particle_from_property(key, property, object.is_required(key), owner, depth)?);
        }
        Ok(particles)
    }

    fn particle_from_property(
        &mut self,
        key: &str,
        node: &JsonSchemaNode,
        required: bool,
        owner: &str,
        depth: usize,
    ) -> Result<Particle> {
        let any = JsonSchemaNode::any();
        let (value, occurs) = match &node.kind {
            NodeKind::Array(array) => {
                let min = array.min_items.unwrap_or(if required { 1 } else { 0 });
                let occurs = Occurs::new(
                    u32::try_from(min).unwrap_or(u32::MAX),
                    array.max_items.map(|max| u32::try_from(max).unwrap_or(u32::MAX)),
                );
                if !occurs.is_valid() {
                    return Err(Error::malformed(format!("property '{}' has invalid bounds {}", key, occurs)));
                }
                let mut value = self.array_items(key, array.items.as_ref(), &any, owner);
                if let NodeKind::Array(inner) = &value.kind {
                    self.lossy(owner, format!("nested array in '{}' flattened", key));
                    value = self.array_items(key, inner.items.as_ref(), &any, owner);
                }
                (value, occurs)
            }
            _ => (node, Occurs::new(u32::from(required), Some(1))),
        };

        if let Some(Ok(RefTarget::Property(target))) = value.ref_target() {
            let name = self.global_name(&target, false, owner)?;
            return Ok(Particle::ElementRef(ElementRef {
                name,
                occurs,
                annotation: node.keywords.annotation.clone(),
            }));
        }

        let name = node.keywords.name.clone().unwrap_or_else(|| key.to_string());
        validate_ncname(&name)?;
        let content = self.element_content(value, owner, depth)?;
        let mut element = Element::new(name, content).with_occurs(occurs);
        element.nillable = node.keywords.nillable;
        element.default = self.lexical(value.default.as_ref(), key, "default");
        element.fixed = self.lexical(value.constant.as_ref(), key, "const");
        element.annotation = node.keywords.annotation.clone();
        Ok(Particle::Element(element))
    }

    fn array_items<'n>(
        &mut self,
        key: &str,
        items: Option<&'n Items>,
        any: &'n JsonSchemaNode,
        owner: &str,
    ) -> &'n JsonSchemaNode {
        match items {
            Some(Items::Single(item)) => item,
            Some(Items::Tuple(items)) => {
                self.lossy(owner, format!("tuple items of '{}' read as its first item", key));
                items.first().unwrap_or(any)
            }
            None => any,
        }
    }

    fn lexical(&mut self, value: Option<&serde_json::Value>, key: &str, keyword: &str) -> Option<String> {
        let value = value?;
        let lexical = json_to_lexical(value);
        if lexical.is_none() {
            self.lossy(key, format!("non-scalar {} dropped", keyword));
        }
        lexical
    }

    fn element_content(&mut self, value: &JsonSchemaNode, owner: &str, depth: usize) -> Result<ElementContent> {
        Ok(match &value.kind {
            NodeKind::Reference(_) => match self.target_of(value)? {
                RefTarget::Definition(name) => ElementContent::Type(TypeRef::Named(name)),
                RefTarget::Property(name) => {
                    return Err(ConversionError::new(ConstructKind::Node)
                        .with_type_name(owner)
                        .with_detail(format!("property reference '{}' used as a type", name))
                        .into())
                }
            },
            NodeKind::Any => match value.keywords.xsd_type {
                Some(builtin) => ElementContent::Type(TypeRef::Builtin(builtin)),
                None => ElementContent::Unspecified,
            },
            NodeKind::Primitive(primitive) if is_plain(primitive, &value.keywords) => ElementContent::Type(
                TypeRef::Builtin(value.keywords.xsd_type.unwrap_or_else(|| primitive.implied_builtin())),
            ),
            _ => {
                let annotation = value.keywords.type_annotation.clone();
                if self.node_is_complex(value, &mut HashSet::new())? {
                    let ct = self.complex_type_from_node(None, value, annotation, owner, depth + 1)?;
                    ElementContent::Complex(Box::new(ct))
                } else {
                    let st = self.simple_type_from_node(None, value, annotation, owner)?;
                    ElementContent::Simple(Box::new(st))
                }
            }
        })
    }

    fn simple_content_from_node(
        &mut self,
        node: &JsonSchemaNode,
        construct: ConstructKind,
        owner: &str,
    ) -> Result<SimpleContent> {
        let complex = || -> Error {
            ConversionError::new(construct)
                .with_type_name(owner)
                .with_detail("value must be a simple type")
                .into()
        };
        Ok(match &node.kind {
            NodeKind::Reference(_) => match self.target_of(node)? {
                RefTarget::Definition(name) => {
                    if self.definition_is_complex(&name)? {
                        return Err(complex());
                    }
                    SimpleContent::Type(TypeRef::Named(name))
                }
                RefTarget::Property(_) => return Err(complex()),
            },
            NodeKind::Any => match node.keywords.xsd_type {
                Some(builtin) => SimpleContent::Type(TypeRef::Builtin(simple_base(builtin))),
                None => SimpleContent::Unspecified,
            },
            NodeKind::Primitive(primitive) if is_plain(primitive, &node.keywords) => SimpleContent::Type(
                TypeRef::Builtin(node.keywords.xsd_type.unwrap_or_else(|| primitive.implied_builtin())),
            ),
            _ => {
                if self.node_is_complex(node, &mut HashSet::new())? {
                    return Err(complex());
                }
                let annotation = node.keywords.type_annotation.clone();
                SimpleContent::Anonymous(Box::new(self.simple_type_from_node(None, node, annotation, owner)?))
            }
        })
    }

    fn attribute_from_property(
        &mut self,
        key: &str,
        node: &JsonSchemaNode,
        required: bool,
        owner: &str,
    ) -> Result<AttributeUse> {
        let any = JsonSchemaNode::any();
        let value = match &node.kind {
            NodeKind::Array(array) => {
                self.lossy(owner, format!("repeated attribute '{}' read as a single value", key));
                self.array_items(key, array.items.as_ref(), &any, owner)
            }
            _ => node,
        };

        let mut attribute = match value.ref_target() {
            Some(Ok(RefTarget::Property(target))) => {
                let mut attribute = AttributeUse::new(self.global_name(&target, true, owner)?, SimpleContent::Unspecified);
                attribute.is_ref = true;
                attribute
            }
            _ => {
                let name = self.attribute_name(key, node);
                validate_ncname(&name)?;
                let content = self.simple_content_from_node(value, ConstructKind::Attribute, owner)?;
                AttributeUse::new(name, content)
            }
        };
        if required {
            attribute = attribute.with_use(AttributeUseKind::Required);
        }
        attribute.default = self.lexical(value.default.as_ref(), key, "default");
        attribute.fixed = self.lexical(value.constant.as_ref(), key, "const");
        attribute.annotation = node.keywords.annotation.clone();
        Ok(attribute)
    }

    fn attribute_name(&self, key: &str, node: &JsonSchemaNode) -> String {
        if let Some(name) = &node.keywords.name {
            return name.clone();
        }
        key.strip_prefix(self.config.attr_prefix())
            .filter(|name| !name.is_empty() && !self.config.attr_prefix().is_empty())
            .unwrap_or(key)
            .to_string()
    }

    /// XML name of the global declaration a `#/properties/<key>` points at
    fn global_name(&self, key: &str, attribute: bool, owner: &str) -> Result<String> {
        let node = self
            .json
            .root_properties()
            .and_then(|properties| properties.get(key))
            .ok_or_else(|| Error::unresolved(key))?;
        if node.keywords.attribute != attribute {
            let expected = if attribute { "attribute" } else { "element" };
            return Err(ConversionError::new(ConstructKind::Node)
                .with_type_name(owner)
                .with_detail(format!("'{}' is not a global {}", key, expected))
                .into());
        }
        Ok(if attribute {
            self.attribute_name(key, node)
        } else {
            node.keywords.name.clone().unwrap_or_else(|| key.to_string())
        })
    }
}

/// A primitive that is a bare built-in reference
fn is_plain(primitive: &PrimitiveNode, keywords: &XsdKeywords) -> bool {
    let format_consumed = match &primitive.format {
        Some(format) => {
            BuiltinType::implied_by(primitive.json_type, Some(format)).json_format() == Some(format.as_str())
        }
        None => true,
    };
    !primitive.has_constraints()
        && format_consumed
        && !keywords.length
        && keywords.restrictions.is_empty()
        && keywords.type_annotation.is_none()
}

/// `xs:anyType` is not a simple type
fn simple_base(builtin: BuiltinType) -> BuiltinType {
    match builtin {
        BuiltinType::AnyType => BuiltinType::AnySimpleType,
        other => other,
    }
}

fn not_simple(owner: &str) -> Error {
    ConversionError::new(ConstructKind::Node)
        .with_type_name(owner)
        .with_detail("cannot derive a simple type from this node")
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reverse(value: serde_json::Value) -> Converted<Schema> {
        let json = JsonSchema::from_value(&value).unwrap();
        JsonToXsdConverter::default().convert(&json).unwrap()
    }

    fn complex<'s>(schema: &'s Schema, name: &str) -> &'s ComplexType {
        match schema.resolve(name).unwrap() {
            crate::xsd::TypeDefinition::Complex(ct) => ct,
            other => panic!("expected complex type, got {:?}", other),
        }
    }

    fn simple<'s>(schema: &'s Schema, name: &str) -> &'s SimpleType {
        match schema.resolve(name).unwrap() {
            crate::xsd::TypeDefinition::Simple(st) => st,
            other => panic!("expected simple type, got {:?}", other),
        }
    }

    #[test]
    fn test_length_marker_decides_facet() {
        let schema = reverse(json!({
            "definitions": {
                "Marked": {"type": "string", "minLength": 5, "maxLength": 5, "@xsdLength": true},
                "Plain": {"type": "string", "minLength": 5, "maxLength": 5}
            }
        }))
        .value;
        assert_eq!(simple(&schema, "Marked").facets, vec![Facet::Length(5)]);
        assert_eq!(
            simple(&schema, "Plain").facets,
            vec![Facet::MinLength(5), Facet::MaxLength(5)]
        );
    }

    #[test]
    fn test_choice_keeps_branch_order() {
        let schema = reverse(json!({
            "definitions": {
                "Shape": {
                    "@xsdStructure": "choice",
                    "oneOf": [
                        {"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]},
                        {"type": "object", "properties": {"b": {"type": "string"}}, "required": ["b"]},
                        {"type": "object", "properties": {"c": {"type": "string"}}, "required": ["c"]}
                    ]
                }
            }
        }))
        .value;
        let group = complex(&schema, "Shape").group().unwrap();
        assert_eq!(group.compositor, Compositor::Choice);
        let names: Vec<_> = group.particles.iter().filter_map(Particle::element_name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_attribute_and_element_share_name() {
        let schema = reverse(json!({
            "definitions": {
                "T": {
                    "type": "object",
                    "properties": {
                        "foo": {"type": "string"},
                        "@foo": {"type": "string", "@xsdAttribute": true, "@xsdName": "foo"}
                    },
                    "required": ["foo"]
                }
            }
        }))
        .value;
        let t = complex(&schema, "T");
        assert_eq!(t.attributes.len(), 1);
        assert_eq!(t.attributes[0].name, "foo");
        assert_eq!(t.group().unwrap().particles[0].element_name(), Some("foo"));
    }

    #[test]
    fn test_extension_and_simple_content() {
        let schema = reverse(json!({
            "properties": {"price": {"$ref": "#/definitions/Price"}},
            "definitions": {
                "Base": {"type": "object", "properties": {"id": {"type": "string"}}},
                "Derived": {"allOf": [
                    {"$ref": "#/definitions/Base"},
                    {"type": "object", "properties": {"extra": {"type": "integer"}}}
                ]},
                "Price": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "number", "@xsdText": true},
                        "currency": {"type": "string", "@xsdAttribute": true}
                    },
                    "required": ["value", "currency"]
                }
            }
        }))
        .value;

        match &complex(&schema, "Derived").content {
            ComplexContent::Extension { base, group: Some(group) } => {
                assert_eq!(base, "Base");
                assert_eq!(group.particles[0].element_name(), Some("extra"));
            }
            other => panic!("expected extension, got {:?}", other),
        }
        let price = complex(&schema, "Price");
        assert_eq!(
            price.content,
            ComplexContent::Simple(SimpleContent::Type(TypeRef::Builtin(BuiltinType::Decimal)))
        );
        assert!(price.attributes[0].is_required());
        assert!(schema.elements.contains_key("price"));
    }

    #[test]
    fn test_repeated_element_and_element_ref() {
        let schema = reverse(json!({
            "properties": {"note": {"type": "string"}},
            "definitions": {
                "T": {
                    "type": "object",
                    "properties": {
                        "items": {"type": "array", "items": {"type": "integer"}, "minItems": 1, "maxItems": 3},
                        "note": {"$ref": "#/properties/note"}
                    },
                    "required": ["items"]
                }
            }
        }))
        .value;
        let particles = &complex(&schema, "T").group().unwrap().particles;
        assert_eq!(particles[0].occurs(), Occurs::new(1, Some(3)));
        match &particles[1] {
            Particle::ElementRef(r) => {
                assert_eq!(r.name, "note");
                assert_eq!(r.occurs, Occurs::optional());
            }
            other => panic!("expected element ref, got {:?}", other),
        }
    }

    #[test]
    fn test_dropped_keywords_warn() {
        let converted = reverse(json!({
            "properties": {"a": {"type": "string", "title": "A", "format": "email"}}
        }));
        let messages: Vec<String> = converted.warnings.iter().map(|w| w.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("'title'")));
        assert!(messages.iter().any(|m| m.contains("format 'email'")));
        assert!(!converted.is_lossless());
    }

    #[test]
    fn test_any_of_is_lossy_choice() {
        let converted = reverse(json!({
            "definitions": {
                "T": {"anyOf": [
                    {"type": "object", "properties": {"a": {"type": "string"}}},
                    {"type": "object", "properties": {"b": {"type": "string"}}}
                ]}
            }
        }));
        assert_eq!(converted.warnings.len(), 1);
        assert_eq!(
            complex(&converted.value, "T").compositor(),
            Some(Compositor::Choice)
        );
    }

    #[test]
    fn test_unresolved_reference_is_malformed() {
        let json = JsonSchema::from_value(&json!({
            "properties": {"a": {"$ref": "#/definitions/Missing"}}
        }))
        .unwrap();
        let err = JsonToXsdConverter::default().convert(&json).unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));
    }

    #[test]
    fn test_scalar_root_is_rejected() {
        let json = JsonSchema::from_value(&json!({"type": "string"})).unwrap();
        let err = JsonToXsdConverter::default().convert(&json).unwrap_err();
        assert!(matches!(err, Error::Conversion(ref e) if e.kind == ConstructKind::Node));
    }

    #[test]
    fn test_total_digits_pattern_is_not_a_facet() {
        let schema = reverse(json!({
            "definitions": {
                "Year": {
                    "type": "integer",
                    "pattern": "^-?[0-9]{1,4}$",
                    "@xsdDerivedPattern": true,
                    "@xsdRestrictions": {"totalDigits": 4}
                }
            }
        }))
        .value;
        assert_eq!(simple(&schema, "Year").facets, vec![Facet::TotalDigits(4)]);
    }

    #[test]
    fn test_written_pattern_matching_total_digits_is_kept() {
        let schema = reverse(json!({
            "definitions": {
                "Year": {
                    "type": "integer",
                    "pattern": "^-?[0-9]{1,4}$",
                    "@xsdRestrictions": {"totalDigits": 4}
                }
            }
        }))
        .value;
        assert_eq!(
            simple(&schema, "Year").facets,
            vec![Facet::Pattern("^-?[0-9]{1,4}$".into()), Facet::TotalDigits(4)]
        );
    }
}
