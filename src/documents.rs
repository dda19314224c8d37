//! XML document trees
//!
//! A small namespace-aware element tree on top of quick-xml. Schemas are read
//! into this tree before being lifted into the XSD model, and reconstructed
//! schemas are lowered into it before being written out.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// An attribute of an element
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Resolved attribute name (unprefixed attributes have no namespace)
    pub name: QName,
    /// Prefix as written in the source, if any
    pub prefix: Option<String>,
    /// Unescaped value
    pub value: String,
}

impl Attribute {
    /// Create an unprefixed attribute
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: QName::local(local_name),
            prefix: None,
            value: value.into(),
        }
    }

    /// Create a prefixed attribute in a namespace
    pub fn prefixed(
        prefix: impl Into<String>,
        name: QName,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name,
            prefix: Some(prefix.into()),
            value: value.into(),
        }
    }

    fn written_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name.local_name),
            None => self.name.local_name.clone(),
        }
    }
}

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Prefix as written in the source, if any
    pub prefix: Option<String>,
    /// Element attributes in document order
    pub attributes: Vec<Attribute>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace declarations made on this element
    pub declarations: NamespaceContext,
    /// Namespaces in scope for this element
    pub namespaces: NamespaceContext,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            prefix: None,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            declarations: NamespaceContext::new(),
            namespaces: NamespaceContext::new(),
        }
    }

    /// Create a new element written with a prefix
    pub fn prefixed(prefix: impl Into<String>, qname: QName) -> Self {
        let mut element = Self::new(qname);
        element.prefix = Some(prefix.into());
        element
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Whether this element has the given namespace and local name
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.qname.is_in(namespace) && self.qname.local_name == local_name
    }

    /// Get an unqualified attribute value by local name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local_name == name)
            .map(|a| a.value.as_str())
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_qname(&self, qname: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == qname)
            .map(|a| a.value.as_str())
    }

    /// Attributes that live in a namespace
    pub fn qualified_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.name.namespace.is_some())
    }

    /// Add an unqualified attribute
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push(Attribute::new(name, value));
    }

    /// Builder-style unqualified attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set text content
    pub fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|e| e.local_name() == local_name)
            .collect()
    }

    fn written_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.qname.local_name),
            None => self.qname.local_name.clone(),
        }
    }
}

/// XML Document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document around a root element
    pub fn with_root(root: Element) -> Self {
        Self { root: Some(root) }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse_with_limits(xml.as_bytes(), &Limits::default())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document, enforcing size and depth limits
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let scope = element_stack.last().map(|p| &p.namespaces);
                    let element = Self::parse_element(&e, scope)?;
                    element_stack.push(element);
                    limits.check_xml_depth(element_stack.len())?;
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = element_stack.pop() {
                        Self::attach(&mut doc, &mut element_stack, current)?;
                    }
                }
                Ok(Event::Empty(e)) => {
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    let scope = element_stack.last().map(|p| &p.namespaces);
                    let element = Self::parse_element(&e, scope)?;
                    Self::attach(&mut doc, &mut element_stack, element)?;
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?
                            .to_string();
                        append_text(current, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = String::from_utf8(e.into_inner().into_owned())
                            .map_err(|e| Error::Xml(format!("Invalid CDATA: {}", e)))?;
                        append_text(current, &text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // Comments, processing instructions, declarations
            }
            buf.clear();
        }

        if !element_stack.is_empty() {
            return Err(Error::Xml("Unexpected end of document".to_string()));
        }

        Ok(doc)
    }

    fn attach(doc: &mut Document, stack: &mut [Element], element: Element) -> Result<()> {
        if let Some(parent) = stack.last_mut() {
            parent.add_child(element);
        } else if doc.root.is_some() {
            return Err(Error::Xml("Multiple root elements".to_string()));
        } else {
            doc.root = Some(element);
        }
        Ok(())
    }

    /// Parse element from BytesStart event, resolving prefixes against the
    /// parent scope plus the element's own declarations
    fn parse_element(start: &BytesStart, parent_scope: Option<&NamespaceContext>) -> Result<Element> {
        let name_bytes = start.name();
        let name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut declarations = NamespaceContext::new();
        let mut raw_attributes = Vec::new();

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                declarations.set_default_namespace(&attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                declarations.add_prefix(prefix, &attr_value);
            } else {
                raw_attributes.push((attr_name, attr_value));
            }
        }

        let scope = match parent_scope {
            Some(parent) => parent.inherit(&declarations),
            None => NamespaceContext::new().inherit(&declarations),
        };

        let (prefix, qname) = match name.split_once(':') {
            Some((prefix, _)) => (Some(prefix.to_string()), scope.resolve(&name)?),
            None => (None, scope.resolve(&name)?),
        };

        let mut element = Element::new(qname);
        element.prefix = prefix;

        for (attr_name, value) in raw_attributes {
            let attribute = match attr_name.split_once(':') {
                Some((prefix, _)) => Attribute {
                    name: scope.resolve(&attr_name)?,
                    prefix: Some(prefix.to_string()),
                    value,
                },
                // Unprefixed attributes are never in the default namespace
                None => Attribute::new(attr_name, value),
            };
            element.attributes.push(attribute);
        }

        element.declarations = declarations;
        element.namespaces = scope;
        Ok(element)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Serialize the document as UTF-8 XML with an XML declaration
    pub fn to_xml_string(&self, indent: usize) -> Result<String> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| Error::Xml("Cannot write an empty document".to_string()))?;

        let mut writer = if indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', indent)
        } else {
            Writer::new(Vec::new())
        };

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| Error::Xml(e.to_string()))?;
        write_element(&mut writer, root)?;

        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|e| Error::Xml(format!("Invalid UTF-8 output: {}", e)))
    }
}

fn append_text(element: &mut Element, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    match element.text.as_mut() {
        Some(existing) => existing.push_str(text),
        None => element.set_text(text.to_string()),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let name = element.written_name();
    let mut start = BytesStart::new(name.as_str());

    if let Some(ns) = element.declarations.get_default_namespace() {
        start.push_attribute(("xmlns", ns));
    }
    for (prefix, uri) in element.declarations.iter() {
        let key = format!("xmlns:{}", prefix);
        start.push_attribute((key.as_str(), uri));
    }
    for attribute in &element.attributes {
        let key = attribute.written_name();
        start.push_attribute((key.as_str(), attribute.value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::Xml(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Xml(e.to_string()))?;

    if let Some(text) = &element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Xml(e.to_string()))?;
    }

    for child in &element.children {
        write_element(writer, child)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(|e| Error::Xml(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes_in_order() {
        let xml = r#"<root attr1="value1" attr2="value2"><child/></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.get_attribute("attr1"), Some("value1"));
        assert_eq!(root.attributes[1].name.local_name, "attr2");
    }

    #[test]
    fn test_namespaces_are_resolved_and_inherited() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                        xmlns:seres="http://seres.no/xsd/forvaltningsdata">
                        <xs:element name="a" seres:guid="AT-1"/>
                     </xs:schema>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert!(root.is(crate::XSD_NAMESPACE, "schema"));
        assert_eq!(root.declarations.len(), 2);

        let child = &root.children[0];
        assert!(child.is(crate::XSD_NAMESPACE, "element"));
        assert!(child.declarations.is_empty());
        let guid = QName::namespaced("http://seres.no/xsd/forvaltningsdata", "guid");
        assert_eq!(child.get_attribute_qname(&guid), Some("AT-1"));
        assert_eq!(child.qualified_attributes().count(), 1);
    }

    #[test]
    fn test_unknown_prefix_fails() {
        let result = Document::from_string("<a:root/>");
        assert!(matches!(result, Err(Error::Namespace(_))));
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_xml_depth: 2,
            ..Limits::default()
        };
        let result = Document::parse_with_limits(b"<a><b><c/></b></a>", &limits);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));

        let result = Document::parse_with_limits(b"<a><b><c></c></b></a>", &limits);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
        assert!(Document::parse_with_limits(b"<a><b/></a>", &limits).is_ok());
    }

    #[test]
    fn test_write_round_trip() {
        let mut root = Element::prefixed("xs", QName::namespaced(crate::XSD_NAMESPACE, "schema"));
        root.declarations.add_prefix("xs", crate::XSD_NAMESPACE);
        let mut child = Element::prefixed("xs", QName::namespaced(crate::XSD_NAMESPACE, "element"))
            .with_attribute("name", "a&b");
        child.set_text("x < y".to_string());
        root.add_child(child);

        let xml = Document::with_root(root).to_xml_string(2).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("xmlns:xs=\"http://www.w3.org/2001/XMLSchema\""));
        assert!(xml.contains("name=\"a&amp;b\""));

        let reparsed = Document::from_string(&xml).unwrap();
        let child = &reparsed.root.unwrap().children[0];
        assert_eq!(child.get_attribute("name"), Some("a&b"));
        assert_eq!(child.text.as_deref(), Some("x < y"));
    }
}
