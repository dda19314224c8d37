//! Schema converters
//!
//! Two independent conversions over the shared graph models:
//!
//! - [`XsdToJsonConverter`]: XSD type graph to JSON Schema
//! - [`JsonToXsdConverter`]: (normalized) JSON Schema to XSD type graph
//!
//! Both return [`Converted`] values: fidelity loss is reported as
//! [`LossyConversionWarning`](crate::error::LossyConversionWarning)s next to
//! the result, constructs without any mapping fail with a
//! [`ConversionError`](crate::error::ConversionError).

mod json_to_xsd;
pub mod values;
mod xsd_to_json;

pub use json_to_xsd::JsonToXsdConverter;
pub use xsd_to_json::XsdToJsonConverter;

use crate::error::{Converted, Result};
use crate::json::JsonSchema;
use crate::limits::Limits;
use crate::xsd::Schema;

/// Converter configuration shared by both directions
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    /// `$schema` of produced JSON documents
    schema_uri: String,
    /// `$id` of produced JSON documents
    schema_id: Option<String>,
    /// Property key holding the simple content of a complex type
    text_key: String,
    /// Prefix used to disambiguate attribute keys from element keys
    attr_prefix: String,
    /// Prefix of the XSD namespace in produced XSD documents
    xsd_prefix: String,
    /// Indentation of produced documents
    indent: usize,
    /// Whether annotations are carried into JSON
    emit_annotations: bool,
    /// Graph limits
    limits: Limits,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            schema_uri: crate::JSON_SCHEMA_DRAFT_07.to_string(),
            schema_id: None,
            text_key: "value".to_string(),
            attr_prefix: "@".to_string(),
            xsd_prefix: "xs".to_string(),
            indent: 2,
            emit_annotations: true,
            limits: Limits::default(),
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the `$schema` URI
    pub fn schema_uri(&self) -> &str {
        &self.schema_uri
    }

    /// Get the `$id`
    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    /// Get the text key
    pub fn text_key(&self) -> &str {
        &self.text_key
    }

    /// Get the attribute prefix
    pub fn attr_prefix(&self) -> &str {
        &self.attr_prefix
    }

    /// Get the XSD namespace prefix
    pub fn xsd_prefix(&self) -> &str {
        &self.xsd_prefix
    }

    /// Get indentation level
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Check if annotations are emitted
    pub fn emit_annotations(&self) -> bool {
        self.emit_annotations
    }

    /// Get the limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Set the `$schema` URI
    pub fn with_schema_uri(mut self, uri: impl Into<String>) -> Self {
        self.schema_uri = uri.into();
        self
    }

    /// Set the `$id`
    pub fn with_schema_id(mut self, id: Option<String>) -> Self {
        self.schema_id = id;
        self
    }

    /// Set text key
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Set attribute prefix
    pub fn with_attr_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attr_prefix = prefix.into();
        self
    }

    /// Set the XSD namespace prefix
    pub fn with_xsd_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.xsd_prefix = prefix.into();
        self
    }

    /// Set indentation
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set whether annotations are emitted
    pub fn with_emit_annotations(mut self, emit: bool) -> Self {
        self.emit_annotations = emit;
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Writer options matching this configuration
    pub fn write_options(&self) -> crate::xsd::WriteOptions {
        crate::xsd::WriteOptions::new()
            .with_indent(self.indent)
            .with_xsd_prefix(self.xsd_prefix.clone())
    }
}

/// Convert an XSD graph to JSON Schema with default settings
pub fn xsd_to_json(schema: &Schema) -> Result<Converted<JsonSchema>> {
    XsdToJsonConverter::new(ConverterConfig::default()).convert(schema)
}

/// Convert a JSON Schema graph to XSD with default settings
pub fn json_to_xsd(schema: &JsonSchema) -> Result<Converted<Schema>> {
    JsonToXsdConverter::new(ConverterConfig::default()).convert(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_config_defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.text_key(), "value");
        assert_eq!(config.attr_prefix(), "@");
        assert_eq!(config.xsd_prefix(), "xs");
        assert_eq!(config.indent(), 2);
        assert!(config.emit_annotations());
        assert_eq!(config.schema_uri(), crate::JSON_SCHEMA_DRAFT_07);
    }

    #[test]
    fn test_converter_config_builder() {
        let config = ConverterConfig::new()
            .with_text_key("#text")
            .with_attr_prefix("_")
            .with_schema_id(Some("urn:test".to_string()))
            .with_emit_annotations(false)
            .with_limits(Limits::strict());

        assert_eq!(config.text_key(), "#text");
        assert_eq!(config.attr_prefix(), "_");
        assert_eq!(config.schema_id(), Some("urn:test"));
        assert!(!config.emit_annotations());
        assert_eq!(config.limits().max_nesting_depth, 32);
    }
}
