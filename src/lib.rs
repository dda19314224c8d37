//! # xsd-jsonschema
//!
//! Bidirectional conversion between XML Schema (XSD 1.0) and JSON Schema
//! (draft-07), with a round-trip equivalence check.
//!
//! ## Pipeline
//!
//! ```text
//! XSD file ──reader──▶ xsd::Schema ──XsdToJsonConverter──▶ json::JsonSchema
//!                                                              │
//!                                                          normalize
//!                                                              ▼
//! XSD file ◀──writer── xsd::Schema ◀──JsonToXsdConverter── json::JsonSchema
//! ```
//!
//! Both graphs are arenas of named nodes addressed by name, so recursive
//! types never become recursive ownership. Information JSON Schema cannot
//! express natively (compositor kinds, attribute origin, XSD-only facets,
//! annotations) travels in `@xsd*` keywords.
//!
//! ## Features
//!
//! - XSD reader and writer on top of quick-xml
//! - XSD → JSON Schema and JSON Schema → XSD conversion with lossy warnings
//! - JSON Schema normalizer (canonical form for the reverse conversion)
//! - Structural equivalence assertion listing every difference
//! - XML instance validation against the XSD graph
//! - Parallel batch round-trip driver with per-file timeouts
//!
//! ## Example
//!
//! ```rust,ignore
//! use xsd_jsonschema::comparison::{is_equivalent_to, EquivalenceOptions};
//! use xsd_jsonschema::roundtrip::{round_trip, RoundTripConfig};
//! use xsd_jsonschema::xsd::Schema;
//!
//! let schema = Schema::from_file("order.xsd")?;
//! let trip = round_trip(&schema, &RoundTripConfig::default())?;
//! println!("{}", trip.json.to_json_string()?);
//! is_equivalent_to(&schema, &trip.reconstructed, &EquivalenceOptions::default())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// XML plumbing
pub mod documents;
pub mod names;
pub mod namespaces;

// Schema models
pub mod json;
pub mod xsd;

// Conversion and checking
pub mod comparison;
pub mod converters;
pub mod roundtrip;
pub mod validators;

// Re-exports for convenience
pub use comparison::{is_equivalent_to, Difference, Differences, EquivalenceOptions};
pub use converters::{json_to_xsd, xsd_to_json, ConverterConfig, JsonToXsdConverter, XsdToJsonConverter};
pub use error::{Converted, Error, LossyConversionWarning, Result};
pub use json::{normalize, JsonSchema, Normalizer, NormalizerConfig};
pub use roundtrip::{round_trip, RoundTripConfig, RoundTripReport, RoundTripRunner};
pub use validators::InstanceValidator;
pub use xsd::Schema;

/// Version of the xsd-jsonschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Namespace of SERES-generated schemas' own annotation attributes
pub const SERES_NAMESPACE: &str = "http://seres.no/xsd/forvaltningsdata";

/// `$schema` written into produced JSON Schema documents
pub const JSON_SCHEMA_DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Documentation marker naming the script that generated a SERES schema
pub const SERES_SCRIPT_MARKER: &str = "XSLT-skriptnavn";

/// Value of [`SERES_SCRIPT_MARKER`] in SERES-generated schemas
pub const SERES_GENERATOR: &str = "SERES_XSD_GEN";
