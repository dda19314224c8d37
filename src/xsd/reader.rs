//! XSD document reading
//!
//! Lifts an XML element tree rooted at `xs:schema` into the [`Schema`] type
//! graph. Constructs the converters have no mapping for are kept on the
//! schema as [`UnsupportedConstruct`]s instead of failing the read, so a
//! caller can still inspect (or validate against) such a schema.

use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use super::builtins::BuiltinType;
use super::model::{
    Annotation, AnnotationEntry, AttributeUse, AttributeUseKind, ComplexContent, ComplexType,
    Compositor, Documentation, Element, ElementContent, ElementRef, Facet, ModelGroup, Occurs,
    Particle, Schema, SimpleContent, SimpleType, TypeRef, UnsupportedConstruct,
};
use crate::documents::{Document, Element as XmlElement};
use crate::error::{ConstructKind, Error, ParseError, Result};
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::{XML_NAMESPACE, XSD_NAMESPACE};

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const DOCUMENTATION: &str = "documentation";
    pub const APPINFO: &str = "appinfo";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const NOTATION: &str = "notation";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const NILLABLE: &str = "nillable";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const ABSTRACT: &str = "abstract";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const USE: &str = "use";
}

impl Schema {
    /// Parse an XSD schema from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::from_bytes_with_limits(xml.as_bytes(), &Limits::default())
    }

    /// Parse an XSD schema from bytes
    pub fn from_bytes(xml: &[u8]) -> Result<Self> {
        Self::from_bytes_with_limits(xml, &Limits::default())
    }

    /// Parse an XSD schema from bytes, enforcing resource limits
    pub fn from_bytes_with_limits(xml: &[u8], limits: &Limits) -> Result<Self> {
        let doc = Document::parse_with_limits(xml, limits)?;
        Self::from_document_with_limits(&doc, limits)
    }

    /// Parse an XSD schema from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_limits(path, &Limits::default())
    }

    /// Parse an XSD schema from a file path, enforcing resource limits
    pub fn from_file_with_limits(path: impl AsRef<Path>, limits: &Limits) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_bytes_with_limits(&bytes, limits).map_err(|e| match e {
            Error::Parse(pe) => Error::Parse(pe.with_location(path.display().to_string())),
            other => other,
        })
    }

    /// Lift a parsed document into the schema model
    pub fn from_document(doc: &Document) -> Result<Self> {
        Self::from_document_with_limits(doc, &Limits::default())
    }

    /// Lift a parsed document into the schema model, enforcing resource limits
    pub fn from_document_with_limits(doc: &Document, limits: &Limits) -> Result<Self> {
        let root = doc
            .root()
            .ok_or_else(|| Error::Parse(ParseError::new("Empty document")))?;

        if !root.is(XSD_NAMESPACE, xsd_elements::SCHEMA) {
            return Err(Error::Parse(ParseError::new(format!(
                "Expected xs:schema root element, got {}",
                root.qname
            ))));
        }

        let mut reader = SchemaReader {
            schema: Schema::new(),
            limits,
            owner: String::new(),
        };
        reader.read_schema(root)?;

        let schema = reader.schema;
        limits.check_schema_components(
            schema.elements.len() + schema.attributes.len() + schema.types.len(),
        )?;
        debug!(
            elements = schema.elements.len(),
            types = schema.types.len(),
            unsupported = schema.unsupported.len(),
            "read schema"
        );
        Ok(schema)
    }
}

impl FromStr for Schema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Schema::from_string(s)
    }
}

struct SchemaReader<'a> {
    schema: Schema,
    limits: &'a Limits,
    /// Global component currently being read, for messages
    owner: String,
}

impl SchemaReader<'_> {
    fn read_schema(&mut self, root: &XmlElement) -> Result<()> {
        self.schema.target_namespace = root
            .get_attribute(xsd_attrs::TARGET_NAMESPACE)
            .map(str::to_string);
        self.schema.element_form_default = root
            .get_attribute(xsd_attrs::ELEMENT_FORM_DEFAULT)
            .map(str::to_string);
        self.schema.attribute_form_default = root
            .get_attribute(xsd_attrs::ATTRIBUTE_FORM_DEFAULT)
            .map(str::to_string);
        self.schema.namespaces = root.declarations.clone();
        self.schema.annotation = self.read_annotation(root);

        for child in xsd_children(root) {
            match child.local_name() {
                xsd_elements::ELEMENT => {
                    self.owner = child.get_attribute(xsd_attrs::NAME).unwrap_or_default().to_string();
                    match self.read_element(child, true)? {
                        Particle::Element(element) => self.schema.add_element(element)?,
                        _ => {
                            return Err(parse_error(child, "global element declaration must have a name"))
                        }
                    }
                }
                xsd_elements::ATTRIBUTE => {
                    self.owner = child.get_attribute(xsd_attrs::NAME).unwrap_or_default().to_string();
                    let attribute = self.read_attribute(child)?;
                    if attribute.is_ref {
                        return Err(parse_error(child, "global attribute declaration must have a name"));
                    }
                    if self.schema.attributes.contains_key(&attribute.name) {
                        return Err(Error::malformed(format!(
                            "attribute '{}' is declared more than once",
                            attribute.name
                        )));
                    }
                    self.schema.attributes.insert(attribute.name.clone(), attribute);
                }
                xsd_elements::COMPLEX_TYPE => {
                    let name = required_name(child)?;
                    self.owner = name.clone();
                    let complex_type = self.read_complex_type(child, Some(name))?;
                    self.schema.add_complex_type(complex_type)?;
                }
                xsd_elements::SIMPLE_TYPE => {
                    let name = required_name(child)?;
                    self.owner = name.clone();
                    let simple_type = self.read_simple_type(child, Some(name))?;
                    self.schema.add_simple_type(simple_type)?;
                }
                xsd_elements::IMPORT | xsd_elements::INCLUDE | xsd_elements::REDEFINE => {
                    self.owner.clear();
                    self.unsupported(ConstructKind::Composition, format!("xs:{}", child.local_name()));
                }
                xsd_elements::GROUP | xsd_elements::ATTRIBUTE_GROUP => {
                    self.owner = child.get_attribute(xsd_attrs::NAME).unwrap_or_default().to_string();
                    self.unsupported(ConstructKind::Group, format!("xs:{}", child.local_name()));
                }
                xsd_elements::ANNOTATION | xsd_elements::NOTATION => {}
                other => return Err(parse_error(child, &format!("unexpected schema child xs:{}", other))),
            }
        }
        Ok(())
    }

    fn unsupported(&mut self, kind: ConstructKind, detail: impl Into<String>) {
        let detail = detail.into();
        debug!(kind = %kind, component = %self.owner, %detail, "unsupported construct");
        self.schema.unsupported.push(UnsupportedConstruct {
            kind,
            component: if self.owner.is_empty() {
                None
            } else {
                Some(self.owner.clone())
            },
            detail,
        });
    }

    /// Resolve a `type=`/`base=` QName against the element's scope
    fn read_type_ref(&mut self, element: &XmlElement, value: &str) -> Result<TypeRef> {
        let qname = element.namespaces.resolve(value.trim())?;
        match qname.namespace.as_deref() {
            Some(XSD_NAMESPACE) => match BuiltinType::from_local_name(&qname.local_name) {
                Some(builtin) => Ok(TypeRef::Builtin(builtin)),
                None => {
                    self.unsupported(
                        ConstructKind::SimpleTypeVariety,
                        format!("built-in type xs:{}", qname.local_name),
                    );
                    Ok(TypeRef::Builtin(BuiltinType::AnySimpleType))
                }
            },
            None => Ok(TypeRef::Named(qname.local_name)),
            Some(ns) if Some(ns) == self.schema.target_namespace.as_deref() => {
                Ok(TypeRef::Named(qname.local_name))
            }
            Some(_) => {
                self.unsupported(ConstructKind::Composition, format!("type {} from a foreign namespace", qname));
                Ok(TypeRef::Named(qname.local_name))
            }
        }
    }

    fn read_annotation(&mut self, element: &XmlElement) -> Option<Annotation> {
        let mut annotation = Annotation::default();

        for attribute in element.qualified_attributes() {
            annotation
                .attributes
                .push(AnnotationEntry::new(attribute.name.clone(), attribute.value.clone()));
        }

        for annotation_element in xsd_children(element)
            .filter(|c| c.local_name() == xsd_elements::ANNOTATION)
        {
            for child in xsd_children(annotation_element) {
                match child.local_name() {
                    xsd_elements::DOCUMENTATION => {
                        annotation.documentation.push(read_documentation(child));
                    }
                    xsd_elements::APPINFO => {
                        debug!(component = %self.owner, "dropping xs:appinfo");
                    }
                    _ => {}
                }
            }
        }

        annotation.non_empty()
    }

    fn read_element(&mut self, element: &XmlElement, global: bool) -> Result<Particle> {
        let occurs = if global {
            Occurs::once()
        } else {
            Occurs::parse(
                element.get_attribute(xsd_attrs::MIN_OCCURS),
                element.get_attribute(xsd_attrs::MAX_OCCURS),
            )
            .map_err(|e| locate(e, element))?
        };
        let annotation = self.read_annotation(element);

        if let Some(reference) = element.get_attribute(xsd_attrs::REF) {
            let qname = element.namespaces.resolve(reference.trim())?;
            return Ok(Particle::ElementRef(ElementRef {
                name: qname.local_name,
                occurs,
                annotation,
            }));
        }

        let name = required_name(element)?;
        if element.get_attribute(xsd_attrs::ABSTRACT) == Some("true")
            || element.get_attribute(xsd_attrs::SUBSTITUTION_GROUP).is_some()
        {
            self.unsupported(
                ConstructKind::Element,
                format!("substitution group membership of '{}'", name),
            );
        }

        let content = if let Some(type_name) = element.get_attribute(xsd_attrs::TYPE) {
            ElementContent::Type(self.read_type_ref(element, type_name)?)
        } else if let Some(ct) = first_child(element, xsd_elements::COMPLEX_TYPE) {
            ElementContent::Complex(Box::new(self.read_complex_type(ct, None)?))
        } else if let Some(st) = first_child(element, xsd_elements::SIMPLE_TYPE) {
            ElementContent::Simple(Box::new(self.read_simple_type(st, None)?))
        } else {
            ElementContent::Unspecified
        };

        Ok(Particle::Element(Element {
            name,
            occurs,
            content,
            nillable: element.get_attribute(xsd_attrs::NILLABLE) == Some("true"),
            default: element.get_attribute(xsd_attrs::DEFAULT).map(str::to_string),
            fixed: element.get_attribute(xsd_attrs::FIXED).map(str::to_string),
            annotation,
        }))
    }

    fn read_attribute(&mut self, element: &XmlElement) -> Result<AttributeUse> {
        let annotation = self.read_annotation(element);

        let (name, is_ref) = match element.get_attribute(xsd_attrs::REF) {
            Some(reference) => (element.namespaces.resolve(reference.trim())?.local_name, true),
            None => (required_name(element)?, false),
        };

        let content = if let Some(type_name) = element.get_attribute(xsd_attrs::TYPE) {
            SimpleContent::Type(self.read_type_ref(element, type_name)?)
        } else if let Some(st) = first_child(element, xsd_elements::SIMPLE_TYPE) {
            SimpleContent::Anonymous(Box::new(self.read_simple_type(st, None)?))
        } else {
            SimpleContent::Unspecified
        };

        let use_kind = match element.get_attribute(xsd_attrs::USE) {
            Some(value) => AttributeUseKind::from_str(value.trim()).ok_or_else(|| {
                parse_error(
                    element,
                    &format!(
                        "Invalid use value: '{}'. Must be 'optional', 'required', or 'prohibited'",
                        value
                    ),
                )
            })?,
            None => AttributeUseKind::Optional,
        };

        Ok(AttributeUse {
            name,
            is_ref,
            content,
            use_kind,
            default: element.get_attribute(xsd_attrs::DEFAULT).map(str::to_string),
            fixed: element.get_attribute(xsd_attrs::FIXED).map(str::to_string),
            annotation,
        })
    }

    fn read_complex_type(&mut self, element: &XmlElement, name: Option<String>) -> Result<ComplexType> {
        let mut complex_type = ComplexType::new(name, ComplexContent::Empty);
        complex_type.annotation = self.read_annotation(element);

        if element.get_attribute(xsd_attrs::MIXED) == Some("true") {
            self.unsupported(ConstructKind::Compositor, "mixed content");
        }

        for child in xsd_children(element) {
            match child.local_name() {
                xsd_elements::ANNOTATION => {}
                xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                    complex_type.content = ComplexContent::Group(self.read_group(child, 1)?);
                }
                xsd_elements::ATTRIBUTE => complex_type.attributes.push(self.read_attribute(child)?),
                xsd_elements::COMPLEX_CONTENT => self.read_complex_content(child, &mut complex_type)?,
                xsd_elements::SIMPLE_CONTENT => self.read_simple_content(child, &mut complex_type)?,
                xsd_elements::GROUP | xsd_elements::ATTRIBUTE_GROUP => {
                    self.unsupported(ConstructKind::Group, format!("xs:{} reference", child.local_name()))
                }
                xsd_elements::ANY_ATTRIBUTE => self.unsupported(ConstructKind::Wildcard, "xs:anyAttribute"),
                other => {
                    return Err(parse_error(child, &format!("unexpected xs:{} in complex type", other)))
                }
            }
        }

        Ok(complex_type)
    }

    fn read_complex_content(&mut self, element: &XmlElement, complex_type: &mut ComplexType) -> Result<()> {
        if element.get_attribute(xsd_attrs::MIXED) == Some("true") {
            self.unsupported(ConstructKind::Compositor, "mixed content");
        }

        for child in xsd_children(element) {
            match child.local_name() {
                xsd_elements::EXTENSION => {
                    let base = child
                        .get_attribute(xsd_attrs::BASE)
                        .ok_or_else(|| parse_error(child, "extension without a base"))?;
                    let base = match self.read_type_ref(child, base)? {
                        TypeRef::Named(name) => name,
                        TypeRef::Builtin(builtin) => {
                            self.unsupported(
                                ConstructKind::Derivation,
                                format!("complex content extension of {}", builtin),
                            );
                            builtin.local_name().to_string()
                        }
                    };

                    let mut group = None;
                    for grandchild in xsd_children(child) {
                        match grandchild.local_name() {
                            xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                                group = Some(self.read_group(grandchild, 1)?);
                            }
                            xsd_elements::ATTRIBUTE => {
                                complex_type.attributes.push(self.read_attribute(grandchild)?)
                            }
                            xsd_elements::GROUP | xsd_elements::ATTRIBUTE_GROUP => self.unsupported(
                                ConstructKind::Group,
                                format!("xs:{} reference", grandchild.local_name()),
                            ),
                            xsd_elements::ANY_ATTRIBUTE => {
                                self.unsupported(ConstructKind::Wildcard, "xs:anyAttribute")
                            }
                            _ => {}
                        }
                    }
                    complex_type.content = ComplexContent::Extension { base, group };
                }
                xsd_elements::RESTRICTION => {
                    self.unsupported(ConstructKind::Derivation, "complex content restriction")
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_simple_content(&mut self, element: &XmlElement, complex_type: &mut ComplexType) -> Result<()> {
        for child in xsd_children(element) {
            match child.local_name() {
                xsd_elements::EXTENSION => {
                    let base = child
                        .get_attribute(xsd_attrs::BASE)
                        .ok_or_else(|| parse_error(child, "extension without a base"))?;
                    let base = self.read_type_ref(child, base)?;
                    complex_type.content = ComplexContent::Simple(SimpleContent::Type(base));

                    for grandchild in xsd_children(child) {
                        match grandchild.local_name() {
                            xsd_elements::ATTRIBUTE => {
                                complex_type.attributes.push(self.read_attribute(grandchild)?)
                            }
                            xsd_elements::ATTRIBUTE_GROUP => self.unsupported(
                                ConstructKind::Group,
                                "xs:attributeGroup reference",
                            ),
                            xsd_elements::ANY_ATTRIBUTE => {
                                self.unsupported(ConstructKind::Wildcard, "xs:anyAttribute")
                            }
                            _ => {}
                        }
                    }
                }
                xsd_elements::RESTRICTION => {
                    self.unsupported(ConstructKind::Derivation, "simple content restriction")
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_group(&mut self, element: &XmlElement, depth: usize) -> Result<ModelGroup> {
        self.limits.check_nesting_depth(depth)?;

        let compositor = Compositor::from_str(element.local_name())
            .ok_or_else(|| parse_error(element, "expected a compositor"))?;
        let occurs = Occurs::parse(
            element.get_attribute(xsd_attrs::MIN_OCCURS),
            element.get_attribute(xsd_attrs::MAX_OCCURS),
        )
        .map_err(|e| locate(e, element))?;

        let mut group = ModelGroup::new(compositor).with_occurs(occurs);
        for child in xsd_children(element) {
            match child.local_name() {
                xsd_elements::ELEMENT => group.particles.push(self.read_element(child, false)?),
                xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                    group.particles.push(Particle::Group(self.read_group(child, depth + 1)?))
                }
                xsd_elements::ANY => self.unsupported(ConstructKind::Wildcard, "xs:any"),
                xsd_elements::GROUP => self.unsupported(ConstructKind::Group, "xs:group reference"),
                xsd_elements::ANNOTATION => {}
                other => {
                    return Err(parse_error(child, &format!("unexpected xs:{} in {}", other, compositor)))
                }
            }
        }
        Ok(group)
    }

    fn read_simple_type(&mut self, element: &XmlElement, name: Option<String>) -> Result<SimpleType> {
        let annotation = self.read_annotation(element);

        let mut simple_type = None;
        for child in xsd_children(element) {
            match child.local_name() {
                xsd_elements::RESTRICTION => simple_type = Some(self.read_restriction(child, name.clone())?),
                xsd_elements::LIST | xsd_elements::UNION => {
                    self.unsupported(ConstructKind::SimpleTypeVariety, format!("xs:{}", child.local_name()));
                    simple_type = Some(SimpleType::new(name.clone(), TypeRef::Builtin(BuiltinType::AnySimpleType)));
                }
                _ => {}
            }
        }

        let mut simple_type = simple_type
            .ok_or_else(|| parse_error(element, "simple type without restriction, list or union"))?;
        simple_type.annotation = annotation;
        Ok(simple_type)
    }

    fn read_restriction(&mut self, element: &XmlElement, name: Option<String>) -> Result<SimpleType> {
        let base = match element.get_attribute(xsd_attrs::BASE) {
            Some(base) => self.read_type_ref(element, base)?,
            None => {
                self.unsupported(ConstructKind::Derivation, "restriction of an anonymous base type");
                TypeRef::Builtin(BuiltinType::AnySimpleType)
            }
        };

        let mut simple_type = SimpleType::new(name, base);
        for child in xsd_children(element) {
            match child.local_name() {
                xsd_elements::ANNOTATION | xsd_elements::SIMPLE_TYPE => {}
                facet_name => {
                    let value = child.get_attribute(xsd_attrs::VALUE).unwrap_or_default();
                    match Facet::from_name_value(facet_name, value).map_err(|e| locate(e, child))? {
                        Some(facet) => simple_type.facets.push(facet),
                        None => self.unsupported(ConstructKind::Facet, format!("xs:{}", facet_name)),
                    }
                }
            }
        }
        Ok(simple_type)
    }
}

fn read_documentation(element: &XmlElement) -> Documentation {
    let lang = element
        .get_attribute_qname(&QName::namespaced(XML_NAMESPACE, "lang"))
        .map(str::to_string);

    let markers = element
        .children
        .iter()
        .map(|child| {
            let is_xsd_attribute = child.is(XSD_NAMESPACE, xsd_elements::ATTRIBUTE);
            match (is_xsd_attribute, child.get_attribute(xsd_attrs::NAME)) {
                (true, Some(name)) => AnnotationEntry::new(
                    QName::namespaced(XSD_NAMESPACE, name),
                    child.get_attribute(xsd_attrs::FIXED).unwrap_or_default(),
                ),
                _ => AnnotationEntry::new(child.qname.clone(), child.text.clone().unwrap_or_default()),
            }
        })
        .collect();

    Documentation {
        lang,
        text: element.text.as_ref().map(|t| t.trim().to_string()),
        markers,
    }
}

/// Children in the XSD namespace
fn xsd_children(element: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    element.children.iter().filter(|c| c.qname.is_in(XSD_NAMESPACE))
}

fn first_child<'e>(element: &'e XmlElement, local_name: &str) -> Option<&'e XmlElement> {
    xsd_children(element).find(|c| c.local_name() == local_name)
}

fn required_name(element: &XmlElement) -> Result<String> {
    element
        .get_attribute(xsd_attrs::NAME)
        .map(|n| n.trim().to_string())
        .ok_or_else(|| parse_error(element, &format!("xs:{} without a name", element.local_name())))
}

fn parse_error(element: &XmlElement, message: &str) -> Error {
    Error::Parse(ParseError::new(message).with_source(describe(element)))
}

fn locate(error: Error, element: &XmlElement) -> Error {
    match error {
        Error::Parse(pe) => Error::Parse(pe.with_source(describe(element))),
        other => other,
    }
}

fn describe(element: &XmlElement) -> String {
    let attributes: Vec<String> = element
        .attributes
        .iter()
        .map(|a| format!("{}=\"{}\"", a.name, a.value))
        .collect();
    format!("<xs:{} {}>", element.local_name(), attributes.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::TypeDefinition;

    const PERSON: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:seres="http://seres.no/xsd/forvaltningsdata"
           elementFormDefault="qualified">
  <xs:annotation>
    <xs:documentation>
      <xs:attribute name="XSLT-skriptnavn" fixed="SERES_XSD_GEN"/>
    </xs:documentation>
  </xs:annotation>
  <xs:element name="Person" type="PersonType"/>
  <xs:complexType name="PersonType" seres:guid="AT-1">
    <xs:sequence>
      <xs:element name="Name" type="NameType" minOccurs="0"/>
      <xs:element name="Phone" type="xs:string" maxOccurs="unbounded"/>
      <xs:choice>
        <xs:element name="Email" type="xs:string"/>
        <xs:element name="Fax" type="xs:string"/>
      </xs:choice>
    </xs:sequence>
    <xs:attribute name="id" type="xs:int" use="required"/>
  </xs:complexType>
  <xs:simpleType name="NameType">
    <xs:restriction base="xs:string">
      <xs:length value="5"/>
      <xs:pattern value="[A-Z].*"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

    #[test]
    fn test_read_person_schema() {
        let schema = Schema::from_string(PERSON).unwrap();
        assert!(schema.unsupported.is_empty());
        assert!(schema.is_seres());
        assert_eq!(schema.element_form_default.as_deref(), Some("qualified"));
        assert_eq!(schema.namespaces.get_namespace("seres"), Some("http://seres.no/xsd/forvaltningsdata"));

        let person = schema.resolve_element("Person").unwrap();
        assert_eq!(person.content, ElementContent::Type(TypeRef::Named("PersonType".into())));

        let ct = match schema.resolve("PersonType").unwrap() {
            TypeDefinition::Complex(ct) => ct,
            other => panic!("expected complex type, got {:?}", other),
        };
        let group = ct.group().unwrap();
        assert_eq!(group.compositor, Compositor::Sequence);
        assert_eq!(group.particles.len(), 3);
        assert_eq!(group.particles[0].occurs(), Occurs::optional());
        assert_eq!(group.particles[1].occurs(), Occurs::one_or_more());
        assert!(matches!(&group.particles[2], Particle::Group(g) if g.compositor == Compositor::Choice));
        assert_eq!(ct.attributes[0].use_kind, AttributeUseKind::Required);

        let guid = QName::namespaced("http://seres.no/xsd/forvaltningsdata", "guid");
        assert_eq!(ct.annotation.as_ref().unwrap().attribute(&guid), Some("AT-1"));

        let st = match schema.resolve("NameType").unwrap() {
            TypeDefinition::Simple(st) => st,
            other => panic!("expected simple type, got {:?}", other),
        };
        assert_eq!(st.facets, vec![Facet::Length(5), Facet::Pattern("[A-Z].*".into())]);
        assert!(schema.check().is_ok());
    }

    #[test]
    fn test_unsupported_constructs_are_recorded() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:include schemaLocation="other.xsd"/>
          <xs:complexType name="Open">
            <xs:sequence><xs:any/></xs:sequence>
          </xs:complexType>
          <xs:simpleType name="Ids"><xs:list itemType="xs:int"/></xs:simpleType>
        </xs:schema>"#;
        let schema = Schema::from_string(xsd).unwrap();
        let kinds: Vec<ConstructKind> = schema.unsupported.iter().map(|u| u.kind).collect();
        assert_eq!(
            kinds,
            vec![ConstructKind::Composition, ConstructKind::Wildcard, ConstructKind::SimpleTypeVariety]
        );
        assert_eq!(schema.unsupported[1].component.as_deref(), Some("Open"));
    }

    #[test]
    fn test_invalid_occurs_is_a_parse_error() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:complexType name="T">
            <xs:sequence><xs:element name="a" minOccurs="2" maxOccurs="1"/></xs:sequence>
          </xs:complexType>
        </xs:schema>"#;
        assert!(matches!(Schema::from_string(xsd), Err(Error::Parse(_))));
    }

    #[test]
    fn test_not_a_schema() {
        assert!(matches!(Schema::from_string("<root/>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_target_namespace_references() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="urn:test" targetNamespace="urn:test">
          <xs:element name="root" type="tns:T"/>
          <xs:simpleType name="T"><xs:restriction base="xs:token"/></xs:simpleType>
        </xs:schema>"#;
        let schema: Schema = xsd.parse().unwrap();
        assert!(schema.unsupported.is_empty());
        assert!(schema.check().is_ok());
    }
}
