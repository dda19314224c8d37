//! Error types for xsd-jsonschema
//!
//! This module defines the error types used throughout the library, the
//! non-fatal [`LossyConversionWarning`] and the [`Converted`] wrapper that
//! carries warnings alongside a successful conversion result.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for conversion operations
#[derive(Error, Debug)]
pub enum Error {
    /// A named type, element or `$ref` target could not be found
    #[error("unresolved reference: '{name}'")]
    UnresolvedReference {
        /// The name that failed to resolve
        name: String,
    },

    /// A construct has no defined mapping to the target format
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The input graph is structurally invalid
    #[error("malformed schema: {0}")]
    MalformedSchema(String),

    /// XSD document could not be read into the schema model
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// XML instance validation error
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// XML syntax error
    #[error("XML error: {0}")]
    Xml(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an unresolved reference error
    pub fn unresolved(name: impl Into<String>) -> Self {
        Error::UnresolvedReference { name: name.into() }
    }

    /// Shorthand for a malformed schema error
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedSchema(message.into())
    }
}

/// Kind of construct that could not be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    /// A constraining facet
    Facet,
    /// A compositor or compositor combination
    Compositor,
    /// A type derivation (extension/restriction)
    Derivation,
    /// `xs:import`, `xs:include` or `xs:redefine`
    Composition,
    /// Named model or attribute groups
    Group,
    /// Wildcards (`xs:any`, `xs:anyAttribute`)
    Wildcard,
    /// `xs:list` and `xs:union` simple types
    SimpleTypeVariety,
    /// Attribute declaration or use
    Attribute,
    /// Element declaration or reference
    Element,
    /// A JSON Schema keyword
    Keyword,
    /// A JSON Schema node shape
    Node,
}

impl ConstructKind {
    /// Short name used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructKind::Facet => "facet",
            ConstructKind::Compositor => "compositor",
            ConstructKind::Derivation => "derivation",
            ConstructKind::Composition => "schema composition",
            ConstructKind::Group => "group",
            ConstructKind::Wildcard => "wildcard",
            ConstructKind::SimpleTypeVariety => "simple type variety",
            ConstructKind::Attribute => "attribute",
            ConstructKind::Element => "element",
            ConstructKind::Keyword => "keyword",
            ConstructKind::Node => "node",
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A construct without a defined mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    /// Kind of the offending construct
    pub kind: ConstructKind,
    /// Name of the type (or element) the construct belongs to
    pub type_name: Option<String>,
    /// What exactly was found
    pub detail: Option<String>,
}

impl ConversionError {
    /// Create a new conversion error for a construct kind
    pub fn new(kind: ConstructKind) -> Self {
        Self {
            kind,
            type_name: None,
            detail: None,
        }
    }

    /// Set the owning type name
    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    /// Set the detail message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {}", self.kind)?;

        if let Some(ref name) = self.type_name {
            write!(f, " in '{}'", name)?;
        }

        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }

        Ok(())
    }
}

impl std::error::Error for ConversionError {}

/// XSD document parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the schema file
    pub location: Option<String>,
    /// Schema source that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// XML instance validation error with context
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Path to the element that failed validation
    pub path: Option<String>,
    /// Original reason
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            reason: None,
        }
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Non-fatal notice that a conversion proceeded without fidelity guarantees
#[derive(Debug, Clone, PartialEq)]
pub struct LossyConversionWarning {
    /// Component (type, element or pointer) where information was lost
    pub component: String,
    /// What was lost
    pub message: String,
}

impl LossyConversionWarning {
    /// Create a new warning
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LossyConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.message)
    }
}

/// A successful conversion result plus any lossy-conversion warnings
#[derive(Debug, Clone)]
pub struct Converted<T> {
    /// The produced graph
    pub value: T,
    /// Fidelity warnings collected while converting
    pub warnings: Vec<LossyConversionWarning>,
}

impl<T> Converted<T> {
    /// Wrap a value with a list of warnings
    pub fn new(value: T, warnings: Vec<LossyConversionWarning>) -> Self {
        Self { value, warnings }
    }

    /// Whether the conversion reported no fidelity loss
    pub fn is_lossless(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Map the contained value, keeping the warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Converted<U> {
        Converted {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Split into value and warnings
    pub fn into_parts(self) -> (T, Vec<LossyConversionWarning>) {
        (self.value, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_display() {
        let err = ConversionError::new(ConstructKind::Wildcard)
            .with_type_name("PersonType")
            .with_detail("xs:any");

        let msg = format!("{}", err);
        assert_eq!(msg, "unsupported wildcard in 'PersonType': xs:any");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("Invalid schema syntax")
            .with_location("schema.xsd:42:10")
            .with_source("<xs:element name='invalid'/>");

        let msg = format!("{}", err);
        assert!(msg.contains("Invalid schema syntax"));
        assert!(msg.contains("Location:"));
        assert!(msg.contains("Source:"));
    }

    #[test]
    fn test_unresolved_names_target() {
        let err = Error::unresolved("missing");
        assert_eq!(err.to_string(), "unresolved reference: 'missing'");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ConversionError::new(ConstructKind::Facet).into();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_converted_map_keeps_warnings() {
        let converted = Converted::new(1, vec![LossyConversionWarning::new("T", "dropped")]);
        let mapped = converted.map(|v| v + 1);
        assert_eq!(mapped.value, 2);
        assert!(!mapped.is_lossless());
    }
}
