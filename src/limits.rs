//! Resource limits for schema processing
//!
//! Bounds applied while reading XML documents and while walking schema
//! graphs, so a hostile or runaway input fails a single conversion instead
//! of exhausting the process.

use crate::error::{Error, Result};

/// Limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting depth of an XML document
    pub max_xml_depth: usize,

    /// Maximum XML document size in bytes
    pub max_xml_size: usize,

    /// Maximum nesting depth of compositors and anonymous types
    pub max_nesting_depth: usize,

    /// Maximum number of named schema components (types, globals, definitions)
    pub max_schema_components: usize,
}

const MB: usize = 1024 * 1024;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * MB,
            max_nesting_depth: 256,
            max_schema_components: 100_000,
        }
    }
}

impl Limits {
    /// Default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Tighter bounds for untrusted input
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * MB,
            max_nesting_depth: 32,
            max_schema_components: 10_000,
        }
    }

    /// Looser bounds for very large generated schema sets
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10_000,
            max_xml_size: 1024 * MB,
            max_nesting_depth: 4096,
            max_schema_components: 1_000_000,
        }
    }

    /// Element nesting of an XML document being read
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        within("XML element depth", depth, self.max_xml_depth)
    }

    /// Size in bytes of an XML document being read
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        within("XML document size (bytes)", size, self.max_xml_size)
    }

    /// Depth of model groups, anonymous types and instance elements
    pub fn check_nesting_depth(&self, depth: usize) -> Result<()> {
        within("schema nesting depth", depth, self.max_nesting_depth)
    }

    /// Number of named components in one schema or JSON Schema document
    pub fn check_schema_components(&self, count: usize) -> Result<()> {
        within("schema component count", count, self.max_schema_components)
    }
}

fn within(what: &str, value: usize, max: usize) -> Result<()> {
    if value > max {
        return Err(Error::LimitExceeded(format!("{} {} exceeds maximum {}", what, value, max)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        let (strict, default, permissive) = (Limits::strict(), Limits::default(), Limits::permissive());
        assert!(strict.max_nesting_depth < default.max_nesting_depth);
        assert!(default.max_nesting_depth < permissive.max_nesting_depth);
        assert!(strict.max_xml_size < default.max_xml_size);
        assert_eq!(Limits::new(), default);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let limits = Limits::strict();
        assert!(limits.check_nesting_depth(32).is_ok());
        assert!(limits.check_nesting_depth(33).is_err());
        assert!(limits.check_xml_depth(100).is_ok());
        assert!(limits.check_xml_depth(101).is_err());
    }

    #[test]
    fn test_error_names_the_limit() {
        match Limits::default().check_schema_components(200_000) {
            Err(Error::LimitExceeded(message)) => {
                assert!(message.contains("component count"));
                assert!(message.contains("200000"));
            }
            other => panic!("expected limit error, got {:?}", other),
        }
        assert!(Limits::default().check_xml_size(200 * MB).is_err());
    }
}
