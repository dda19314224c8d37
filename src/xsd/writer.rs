//! XSD document writing
//!
//! Lowers a [`Schema`] into an XML element tree and serializes it as an
//! indented UTF-8 document with an `xs` (configurable) prefix.

use std::path::Path;

use super::model::{
    Annotation, AttributeUse, AttributeUseKind, ComplexContent, ComplexType, Documentation,
    Element, ElementContent, ElementRef, ModelGroup, Occurs, Particle, Schema, SimpleContent,
    SimpleType, TypeDefinition, TypeRef,
};
use crate::documents::{Attribute, Document, Element as XmlElement};
use crate::error::Result;
use crate::namespaces::{NamespaceContext, QName};
use crate::{XML_NAMESPACE, XSD_NAMESPACE};

/// Serialization options for XSD output
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Indentation width in spaces (0 writes everything on one line)
    pub indent: usize,
    /// Prefix bound to the XSD namespace
    pub xsd_prefix: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            xsd_prefix: "xs".to_string(),
        }
    }
}

impl WriteOptions {
    /// Create default write options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set indentation width
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set the XSD prefix
    pub fn with_xsd_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.xsd_prefix = prefix.into();
        self
    }
}

impl Schema {
    /// Lower the schema into an XML document tree
    pub fn to_document(&self, options: &WriteOptions) -> Document {
        let mut writer = SchemaWriter::new(self, options);
        let root = writer.write_schema();
        Document::with_root(root)
    }

    /// Serialize the schema as an XSD document
    pub fn to_xml_string(&self, options: &WriteOptions) -> Result<String> {
        self.to_document(options).to_xml_string(options.indent)
    }

    /// Serialize the schema into a file
    pub fn write_to_file(&self, path: impl AsRef<Path>, options: &WriteOptions) -> Result<()> {
        std::fs::write(path, self.to_xml_string(options)?)?;
        Ok(())
    }
}

struct SchemaWriter<'a> {
    schema: &'a Schema,
    prefix: String,
    declarations: NamespaceContext,
    generated: usize,
}

impl<'a> SchemaWriter<'a> {
    fn new(schema: &'a Schema, options: &WriteOptions) -> Self {
        let mut declarations = NamespaceContext::new();
        if let Some(default_ns) = schema.namespaces.get_default_namespace() {
            declarations.set_default_namespace(default_ns);
        }
        for (prefix, uri) in schema.namespaces.iter() {
            if prefix != options.xsd_prefix {
                declarations.add_prefix(prefix, uri);
            }
        }
        declarations.add_prefix(options.xsd_prefix.clone(), XSD_NAMESPACE);

        Self {
            schema,
            prefix: options.xsd_prefix.clone(),
            declarations,
            generated: 0,
        }
    }

    /// Prefix for a namespace, declaring a generated one on first use
    fn prefix_for(&mut self, namespace: &str) -> String {
        if namespace == XML_NAMESPACE {
            return "xml".to_string();
        }
        if let Some(prefix) = self.declarations.prefix_for(namespace) {
            return prefix.to_string();
        }
        loop {
            let candidate = format!("ns{}", self.generated);
            self.generated += 1;
            if self.declarations.get_namespace(&candidate).is_none() {
                self.declarations.add_prefix(candidate.clone(), namespace);
                return candidate;
            }
        }
    }

    fn xsd(&self, local_name: &str) -> XmlElement {
        XmlElement::prefixed(self.prefix.clone(), QName::namespaced(XSD_NAMESPACE, local_name))
    }

    /// Written form of a reference to a global component
    fn component_ref(&mut self, name: &str) -> String {
        match self.schema.target_namespace.clone() {
            Some(tns) if self.declarations.get_default_namespace() != Some(tns.as_str()) => {
                format!("{}:{}", self.prefix_for(&tns), name)
            }
            _ => name.to_string(),
        }
    }

    fn type_ref(&mut self, type_ref: &TypeRef) -> String {
        match type_ref {
            TypeRef::Builtin(builtin) => format!("{}:{}", self.prefix, builtin.local_name()),
            TypeRef::Named(name) => self.component_ref(name),
        }
    }

    fn write_schema(&mut self) -> XmlElement {
        let schema = self.schema;
        let mut root = self.xsd("schema");

        if let Some(tns) = &schema.target_namespace {
            root.set_attribute("targetNamespace", tns.clone());
        }
        if let Some(form) = &schema.element_form_default {
            root.set_attribute("elementFormDefault", form.clone());
        }
        if let Some(form) = &schema.attribute_form_default {
            root.set_attribute("attributeFormDefault", form.clone());
        }
        self.write_annotation(&mut root, schema.annotation.as_ref());

        for element in schema.elements.values() {
            let child = self.write_element(element);
            root.add_child(child);
        }
        for attribute in schema.attributes.values() {
            let child = self.write_attribute(attribute);
            root.add_child(child);
        }
        for definition in schema.types.values() {
            let child = match definition {
                TypeDefinition::Complex(ct) => self.write_complex_type(ct),
                TypeDefinition::Simple(st) => self.write_simple_type(st),
            };
            root.add_child(child);
        }

        root.declarations = self.declarations.clone();
        root
    }

    fn write_annotation(&mut self, target: &mut XmlElement, annotation: Option<&Annotation>) {
        let Some(annotation) = annotation else {
            return;
        };

        for entry in &annotation.attributes {
            match &entry.name.namespace {
                Some(ns) => {
                    let prefix = self.prefix_for(ns);
                    target
                        .attributes
                        .push(Attribute::prefixed(prefix, entry.name.clone(), entry.value.clone()));
                }
                None => target.set_attribute(entry.name.local_name.clone(), entry.value.clone()),
            }
        }

        if annotation.documentation.is_empty() {
            return;
        }
        let mut annotation_element = self.xsd("annotation");
        for documentation in &annotation.documentation {
            let child = self.write_documentation(documentation);
            annotation_element.add_child(child);
        }
        // xs:annotation is always the first child
        target.children.insert(0, annotation_element);
    }

    fn write_documentation(&mut self, documentation: &Documentation) -> XmlElement {
        let mut element = self.xsd("documentation");
        if let Some(lang) = &documentation.lang {
            element.attributes.push(Attribute::prefixed(
                "xml",
                QName::namespaced(XML_NAMESPACE, "lang"),
                lang.clone(),
            ));
        }
        if let Some(text) = &documentation.text {
            element.set_text(text.clone());
        }
        for marker in &documentation.markers {
            let child = if marker.name.is_in(XSD_NAMESPACE) {
                self.xsd("attribute")
                    .with_attribute("name", marker.name.local_name.clone())
                    .with_attribute("fixed", marker.value.clone())
            } else {
                let mut child = match &marker.name.namespace {
                    Some(ns) => XmlElement::prefixed(self.prefix_for(ns), marker.name.clone()),
                    None => XmlElement::new(marker.name.clone()),
                };
                if !marker.value.is_empty() {
                    child.set_text(marker.value.clone());
                }
                child
            };
            element.add_child(child);
        }
        element
    }

    fn write_occurs(target: &mut XmlElement, occurs: Occurs) {
        if occurs.min != 1 {
            target.set_attribute("minOccurs", occurs.min.to_string());
        }
        if occurs.max != Some(1) {
            target.set_attribute("maxOccurs", occurs.max_string());
        }
    }

    fn write_element(&mut self, element: &Element) -> XmlElement {
        let mut xml = self.xsd("element").with_attribute("name", element.name.clone());

        if let ElementContent::Type(type_ref) = &element.content {
            let written = self.type_ref(type_ref);
            xml.set_attribute("type", written);
        }
        Self::write_occurs(&mut xml, element.occurs);
        if element.nillable {
            xml.set_attribute("nillable", "true");
        }
        if let Some(default) = &element.default {
            xml.set_attribute("default", default.clone());
        }
        if let Some(fixed) = &element.fixed {
            xml.set_attribute("fixed", fixed.clone());
        }

        match &element.content {
            ElementContent::Complex(ct) => {
                let child = self.write_complex_type(ct);
                xml.add_child(child);
            }
            ElementContent::Simple(st) => {
                let child = self.write_simple_type(st);
                xml.add_child(child);
            }
            _ => {}
        }

        self.write_annotation(&mut xml, element.annotation.as_ref());
        xml
    }

    fn write_element_ref(&mut self, element_ref: &ElementRef) -> XmlElement {
        let reference = self.component_ref(&element_ref.name);
        let mut xml = self.xsd("element").with_attribute("ref", reference);
        Self::write_occurs(&mut xml, element_ref.occurs);
        self.write_annotation(&mut xml, element_ref.annotation.as_ref());
        xml
    }

    fn write_group(&mut self, group: &ModelGroup) -> XmlElement {
        let mut xml = self.xsd(group.compositor.as_str());
        Self::write_occurs(&mut xml, group.occurs);
        for particle in &group.particles {
            let child = match particle {
                Particle::Element(e) => self.write_element(e),
                Particle::ElementRef(r) => self.write_element_ref(r),
                Particle::Group(g) => self.write_group(g),
            };
            xml.add_child(child);
        }
        xml
    }

    fn write_attributes(&mut self, target: &mut XmlElement, attributes: &[AttributeUse]) {
        for attribute in attributes {
            let child = self.write_attribute(attribute);
            target.add_child(child);
        }
    }

    fn write_complex_type(&mut self, complex_type: &ComplexType) -> XmlElement {
        let mut xml = self.xsd("complexType");
        if let Some(name) = &complex_type.name {
            xml.set_attribute("name", name.clone());
        }

        match &complex_type.content {
            ComplexContent::Empty => self.write_attributes(&mut xml, &complex_type.attributes),
            ComplexContent::Group(group) => {
                let child = self.write_group(group);
                xml.add_child(child);
                self.write_attributes(&mut xml, &complex_type.attributes);
            }
            ComplexContent::Extension { base, group } => {
                let base = self.component_ref(base);
                let mut extension = self.xsd("extension").with_attribute("base", base);
                if let Some(group) = group {
                    let child = self.write_group(group);
                    extension.add_child(child);
                }
                self.write_attributes(&mut extension, &complex_type.attributes);
                let mut content = self.xsd("complexContent");
                content.add_child(extension);
                xml.add_child(content);
            }
            ComplexContent::Simple(simple) => {
                let base = match simple {
                    SimpleContent::Type(t) => self.type_ref(t),
                    _ => format!("{}:anySimpleType", self.prefix),
                };
                let mut extension = self.xsd("extension").with_attribute("base", base);
                self.write_attributes(&mut extension, &complex_type.attributes);
                let mut content = self.xsd("simpleContent");
                content.add_child(extension);
                xml.add_child(content);
            }
        }

        self.write_annotation(&mut xml, complex_type.annotation.as_ref());
        xml
    }

    fn write_simple_type(&mut self, simple_type: &SimpleType) -> XmlElement {
        let mut xml = self.xsd("simpleType");
        if let Some(name) = &simple_type.name {
            xml.set_attribute("name", name.clone());
        }

        let base = self.type_ref(&simple_type.base);
        let mut restriction = self.xsd("restriction").with_attribute("base", base);
        for facet in &simple_type.facets {
            restriction.add_child(self.xsd(facet.name()).with_attribute("value", facet.lexical_value()));
        }
        xml.add_child(restriction);

        self.write_annotation(&mut xml, simple_type.annotation.as_ref());
        xml
    }

    fn write_attribute(&mut self, attribute: &AttributeUse) -> XmlElement {
        let mut xml = self.xsd("attribute");
        if attribute.is_ref {
            let reference = self.component_ref(&attribute.name);
            xml.set_attribute("ref", reference);
        } else {
            xml.set_attribute("name", attribute.name.clone());
        }

        match &attribute.content {
            SimpleContent::Type(t) => {
                let written = self.type_ref(t);
                xml.set_attribute("type", written);
            }
            SimpleContent::Anonymous(st) => {
                let child = self.write_simple_type(st);
                xml.add_child(child);
            }
            SimpleContent::Unspecified => {}
        }

        if attribute.use_kind != AttributeUseKind::Optional {
            xml.set_attribute("use", attribute.use_kind.as_str());
        }
        if let Some(default) = &attribute.default {
            xml.set_attribute("default", default.clone());
        }
        if let Some(fixed) = &attribute.fixed {
            xml.set_attribute("fixed", fixed.clone());
        }

        self.write_annotation(&mut xml, attribute.annotation.as_ref());
        xml
    }
}
