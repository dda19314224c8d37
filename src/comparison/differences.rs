//! Structural differences between two schema graphs

use std::fmt;

use serde::{Deserialize, Serialize};

/// One structural difference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    /// Path of the component, e.g. `type 'PersonType'/name`
    pub component: String,

    /// What differs: `occurs`, `facets`, `compositor`, ...
    pub aspect: String,

    /// Value in the expected graph
    pub expected: String,

    /// Value in the actual graph
    pub actual: String,
}

impl Difference {
    /// Create a new difference
    pub fn new(
        component: impl Into<String>,
        aspect: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            aspect: aspect.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} differs (expected {}, found {})",
            self.component, self.aspect, self.expected, self.actual
        )
    }
}

/// Every difference found by one comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Differences(Vec<Difference>);

impl Differences {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a difference
    pub fn push(&mut self, difference: Difference) {
        self.0.push(difference);
    }

    /// Number of differences
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing differs
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the differences in discovery order
    pub fn iter(&self) -> std::slice::Iter<'_, Difference> {
        self.0.iter()
    }

    /// Take the differences out
    pub fn into_inner(self) -> Vec<Difference> {
        self.0
    }
}

impl IntoIterator for Differences {
    type Item = Difference;
    type IntoIter = std::vec::IntoIter<Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Differences {
    type Item = &'a Difference;
    type IntoIter = std::slice::Iter<'a, Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Differences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} structural difference(s)", self.0.len())?;
        for difference in &self.0 {
            write!(f, "\n  - {}", difference)?;
        }
        Ok(())
    }
}

impl std::error::Error for Differences {}
