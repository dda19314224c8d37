//! Instance and value validators
//!
//! - [`builtins`]: lexical spaces of the built-in datatypes
//! - [`facets`]: constraining facets along simple type derivation chains
//! - [`instance`]: XML instance documents against a schema graph

pub mod builtins;
pub mod facets;
pub mod instance;

pub use builtins::validate_builtin;
pub use facets::{
    check_facets, compile_pattern, normalize_value, validate_simple_content, validate_simple_type,
    validate_type_ref,
};
pub use instance::{InstanceValidator, XSI_NAMESPACE};
