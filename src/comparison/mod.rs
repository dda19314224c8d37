//! Equivalence assertion between XSD graphs
//!
//! The oracle of the round trip: [`is_equivalent_to`] compares an original
//! schema with its reconstruction and returns every structural
//! [`Difference`] it finds.

mod differences;
mod equivalence;

pub use differences::{Difference, Differences};
pub use equivalence::{is_equivalent_to, EquivalenceOptions};
