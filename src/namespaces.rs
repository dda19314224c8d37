//! Namespaces and qualified names
//!
//! Names are compared as `{uri}local` pairs, never by prefix: a schema
//! written with `xsd:` and read back with `xs:` names the same components.
//! Clark notation is also how annotation attributes are keyed in JSON.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Whether this name lives in the given namespace
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// Parse Clark notation (`{uri}local` or plain `local`)
    pub fn from_clark(text: &str) -> Result<Self> {
        match text.strip_prefix('{') {
            Some(rest) => {
                let (ns, local) = rest.split_once('}').ok_or_else(|| {
                    Error::Namespace(format!("Unterminated namespace in '{}'", text))
                })?;
                if local.is_empty() {
                    return Err(Error::Namespace(format!("Missing local name in '{}'", text)));
                }
                Ok(QName::namespaced(ns, local))
            }
            None => Ok(QName::local(text)),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// Namespace context for resolving prefixes
///
/// Declarations keep their document order so that a schema written back out
/// declares its prefixes in the order they were read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: IndexMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => Some(crate::XML_NAMESPACE),
            _ => self.prefixes.get(prefix).map(|s| s.as_str()),
        }
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Find a prefix bound to a namespace URI
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, uri)| uri.as_str() == namespace)
            .map(|(prefix, _)| prefix.as_str())
    }

    /// Iterate prefix declarations in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Number of prefixed declarations
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether no prefix is declared
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.default_namespace.is_none()
    }

    /// Build the context of a child element: this context overridden by the
    /// child's own declarations
    pub fn inherit(&self, declared: &NamespaceContext) -> NamespaceContext {
        let mut merged = self.clone();
        for (prefix, uri) in declared.iter() {
            merged.add_prefix(prefix, uri);
        }
        if let Some(ns) = declared.get_default_namespace() {
            merged.set_default_namespace(ns);
        }
        merged
    }

    /// Resolve `prefix:local` (or an unprefixed name in the default namespace)
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        let Some((prefix, local)) = prefixed_name.split_once(':') else {
            return Ok(QName {
                namespace: self.default_namespace.clone(),
                local_name: prefixed_name.to_string(),
            });
        };
        match self.get_namespace(prefix) {
            Some(namespace) => Ok(QName::namespaced(namespace, local)),
            None => Err(Error::Namespace(format!("prefix '{}' is not declared", prefix))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_qname_from_clark() {
        let qname = QName::from_clark("{http://seres.no/xsd/forvaltningsdata}guid").unwrap();
        assert_eq!(qname.namespace.as_deref(), Some("http://seres.no/xsd/forvaltningsdata"));
        assert_eq!(qname.local_name, "guid");

        assert_eq!(QName::from_clark("plain").unwrap(), QName::local("plain"));
        assert!(QName::from_clark("{broken").is_err());
        assert!(QName::from_clark("{ns}").is_err());
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", "http://www.w3.org/2001/XMLSchema");
        ctx.set_default_namespace("http://example.com");

        assert_eq!(
            ctx.get_namespace("xs"),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));
        assert_eq!(ctx.prefix_for("http://www.w3.org/2001/XMLSchema"), Some("xs"));
    }

    #[test]
    fn test_inherit_overrides_parent() {
        let mut parent = NamespaceContext::new();
        parent.add_prefix("a", "urn:one");
        let mut child = NamespaceContext::new();
        child.add_prefix("a", "urn:two");
        child.set_default_namespace("urn:default");

        let merged = parent.inherit(&child);
        assert_eq!(merged.get_namespace("a"), Some("urn:two"));
        assert_eq!(merged.get_default_namespace(), Some("urn:default"));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", "http://www.w3.org/2001/XMLSchema");

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(
            qname.namespace,
            Some("http://www.w3.org/2001/XMLSchema".to_string())
        );
        assert_eq!(qname.local_name, "element");
        assert!(ctx.resolve("nope:element").is_err());
    }
}
