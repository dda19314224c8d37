//! XSD side of the schema model
//!
//! - [`model`]: the type graph (`Schema`, `ComplexType`, `SimpleType`, ...)
//! - [`builtins`]: built-in datatypes and their JSON counterparts
//! - [`reader`]/[`writer`]: XSD documents to and from the graph
//! - [`walk`]: depth-first particle traversal

pub mod builtins;
pub mod model;
pub mod reader;
pub mod walk;
pub mod writer;

pub use builtins::{BuiltinType, JsonType};
pub use model::{
    Annotation, AnnotationEntry, AttributeUse, AttributeUseKind, ComplexContent, ComplexType,
    Compositor, Documentation, Element, ElementContent, ElementRef, Facet, ModelGroup, Occurs,
    Particle, Schema, SimpleContent, SimpleType, TypeDefinition, TypeRef, UnsupportedConstruct,
    WhiteSpace,
};
pub use walk::ParticleWalk;
pub use writer::WriteOptions;
