//! JSON Schema side of the conversion
//!
//! - [`model`]: the tagged-variant JSON Schema graph
//! - [`keywords`]: the `@xsd*` keywords that preserve XSD information
//! - [`value`]: reading and writing JSON documents
//! - [`walk`]: cycle-safe traversal
//! - [`normalizer`]: canonical form used before the reverse conversion

pub mod keywords;
pub mod model;
pub mod normalizer;
pub mod value;
pub mod walk;

pub use keywords::XsdKeywords;
pub use model::{
    ArrayNode, CombinatorKind, CombinatorNode, Definitions, Items, JsonSchema, JsonSchemaNode,
    NodeKind, ObjectNode, PrimitiveNode, RefTarget,
};
pub use normalizer::{normalize, Normalizer, NormalizerConfig};
pub use walk::SchemaWalk;
