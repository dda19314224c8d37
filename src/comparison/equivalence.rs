//! Structural equivalence of two XSD graphs
//!
//! Named types, global elements and global attributes are matched by name.
//! Sequence particles compare in order; choice and all children compare as
//! sets. Facets compare as multisets, numeric values by decimal value.
//! Prefixes and declaration order never matter.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::differences::{Difference, Differences};
use crate::converters::values::canonical_decimal;
use crate::xsd::{
    Annotation, AttributeUse, ComplexContent, ComplexType, Compositor, Element, ElementContent,
    Facet, ModelGroup, Occurs, Particle, Schema, SimpleContent, SimpleType, TypeDefinition, TypeRef,
};

const NONE: &str = "(none)";

/// Options of the equivalence assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceOptions {
    compare_annotations: bool,
}

impl Default for EquivalenceOptions {
    fn default() -> Self {
        Self {
            compare_annotations: true,
        }
    }
}

impl EquivalenceOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether annotations take part in the comparison
    pub fn compare_annotations(&self) -> bool {
        self.compare_annotations
    }

    /// Set whether annotations take part in the comparison
    pub fn with_compare_annotations(mut self, compare: bool) -> Self {
        self.compare_annotations = compare;
        self
    }
}

/// Assert that `actual` is structurally equivalent to `expected`.
///
/// Returns every difference found, not just the first.
pub fn is_equivalent_to(
    expected: &Schema,
    actual: &Schema,
    options: &EquivalenceOptions,
) -> Result<(), Differences> {
    let mut comparator = Comparator {
        options,
        differences: Differences::new(),
    };
    comparator.schema(expected, actual);

    if comparator.differences.is_empty() {
        Ok(())
    } else {
        Err(comparator.differences)
    }
}

struct Comparator<'o> {
    options: &'o EquivalenceOptions,
    differences: Differences,
}

impl<'o> Comparator<'o> {
    fn differ(&mut self, component: &str, aspect: &str, expected: impl Into<String>, actual: impl Into<String>) {
        self.differences
            .push(Difference::new(component, aspect, expected, actual));
    }

    fn check<T: PartialEq + std::fmt::Display>(&mut self, component: &str, aspect: &str, expected: T, actual: T) {
        if expected != actual {
            self.differ(component, aspect, expected.to_string(), actual.to_string());
        }
    }

    fn schema(&mut self, expected: &Schema, actual: &Schema) {
        self.check(
            "schema",
            "targetNamespace",
            optional(expected.target_namespace.as_deref()),
            optional(actual.target_namespace.as_deref()),
        );
        self.annotation("schema", &expected.annotation, &actual.annotation);

        self.keyed("element", &expected.elements, &actual.elements, |c, path, e, a| {
            c.element(path, e, a)
        });
        self.keyed("attribute", &expected.attributes, &actual.attributes, |c, path, e, a| {
            c.attribute(path, e, a)
        });
        self.keyed("type", &expected.types, &actual.types, |c, path, e, a| match (e, a) {
            (TypeDefinition::Complex(e), TypeDefinition::Complex(a)) => c.complex_type(path, e, a),
            (TypeDefinition::Simple(e), TypeDefinition::Simple(a)) => c.simple_type(path, e, a),
            (e, a) => c.differ(path, "kind", kind_of(e), kind_of(a)),
        });
    }

    /// Match two name-keyed maps, reporting missing and extra entries
    fn keyed<T>(
        &mut self,
        label: &str,
        expected: &IndexMap<String, T>,
        actual: &IndexMap<String, T>,
        mut compare: impl FnMut(&mut Self, &str, &T, &T),
    ) {
        for (name, e) in expected {
            let path = format!("{} '{}'", label, name);
            match actual.get(name) {
                Some(a) => compare(self, &path, e, a),
                None => self.differ(&path, "presence", "declared", "missing"),
            }
        }
        for name in actual.keys().filter(|name| !expected.contains_key(*name)) {
            self.differ(&format!("{} '{}'", label, name), "presence", "absent", "declared");
        }
    }

    fn annotation(&mut self, path: &str, expected: &Option<Annotation>, actual: &Option<Annotation>) {
        if !self.options.compare_annotations() {
            return;
        }
        let expected = expected.clone().and_then(Annotation::non_empty);
        let actual = actual.clone().and_then(Annotation::non_empty);
        if expected != actual {
            self.differ(path, "annotation", describe_annotation(&expected), describe_annotation(&actual));
        }
    }

    fn element(&mut self, path: &str, expected: &Element, actual: &Element) {
        self.check(path, "name", expected.name.as_str(), actual.name.as_str());
        self.check(path, "occurs", expected.occurs, actual.occurs);
        self.check(path, "nillable", expected.nillable, actual.nillable);
        self.lexical(path, "default", &expected.default, &actual.default);
        self.lexical(path, "fixed", &expected.fixed, &actual.fixed);
        self.annotation(path, &expected.annotation, &actual.annotation);

        match (element_content(&expected.content), element_content(&actual.content)) {
            (Content::Unspecified, Content::Unspecified) => {}
            (Content::Type(e), Content::Type(a)) => self.check(path, "type", e, a),
            (Content::Complex(e), Content::Complex(a)) => self.complex_type(path, e, a),
            (Content::Simple(e), Content::Simple(a)) => self.simple_type(path, e, a),
            (e, a) => self.differ(path, "content", e.describe(), a.describe()),
        }
    }

    fn lexical(&mut self, path: &str, aspect: &str, expected: &Option<String>, actual: &Option<String>) {
        let same = match (expected, actual) {
            (Some(e), Some(a)) => same_value(e, a),
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.differ(
                path,
                aspect,
                optional(expected.as_deref()),
                optional(actual.as_deref()),
            );
        }
    }

    fn attribute(&mut self, path: &str, expected: &AttributeUse, actual: &AttributeUse) {
        self.check(path, "ref", expected.is_ref, actual.is_ref);
        self.check(path, "use", expected.use_kind.as_str(), actual.use_kind.as_str());
        self.lexical(path, "default", &expected.default, &actual.default);
        self.lexical(path, "fixed", &expected.fixed, &actual.fixed);
        self.annotation(path, &expected.annotation, &actual.annotation);
        self.simple_content(path, &expected.content, &actual.content);
    }

    fn simple_content(&mut self, path: &str, expected: &SimpleContent, actual: &SimpleContent) {
        match (simple_content(expected), simple_content(actual)) {
            (Content::Unspecified, Content::Unspecified) => {}
            (Content::Type(e), Content::Type(a)) => self.check(path, "type", e, a),
            (Content::Simple(e), Content::Simple(a)) => self.simple_type(path, e, a),
            (e, a) => self.differ(path, "type", e.describe(), a.describe()),
        }
    }

    fn simple_type(&mut self, path: &str, expected: &SimpleType, actual: &SimpleType) {
        self.check(path, "base", &expected.base, &actual.base);
        self.annotation(path, &expected.annotation, &actual.annotation);

        let expected_facets = facet_set(&expected.facets);
        let actual_facets = facet_set(&actual.facets);
        for missing in expected_facets.difference(&actual_facets) {
            self.differ(path, "facet", missing.clone(), NONE);
        }
        for extra in actual_facets.difference(&expected_facets) {
            self.differ(path, "facet", NONE, extra.clone());
        }
    }

    fn complex_type(&mut self, path: &str, expected: &ComplexType, actual: &ComplexType) {
        self.annotation(path, &expected.annotation, &actual.annotation);

        match (complex_content(&expected.content), complex_content(&actual.content)) {
            (ComplexContent::Empty, ComplexContent::Empty) => {}
            (ComplexContent::Group(e), ComplexContent::Group(a)) => self.group(path, e, a),
            (
                ComplexContent::Extension { base: eb, group: eg },
                ComplexContent::Extension { base: ab, group: ag },
            ) => {
                self.check(path, "base", eb.as_str(), ab.as_str());
                match (eg, ag) {
                    (Some(e), Some(a)) => self.group(path, e, a),
                    (None, None) => {}
                    (e, a) => self.differ(
                        path,
                        "extension content",
                        e.as_ref().map_or(NONE.to_string(), group_signature),
                        a.as_ref().map_or(NONE.to_string(), group_signature),
                    ),
                }
            }
            (ComplexContent::Simple(e), ComplexContent::Simple(a)) => self.simple_content(path, e, a),
            (e, a) => self.differ(path, "content", content_kind(e), content_kind(a)),
        }

        let expected_attributes: IndexMap<String, &AttributeUse> =
            expected.attributes.iter().map(|a| (a.name.clone(), a)).collect();
        let actual_attributes: IndexMap<String, &AttributeUse> =
            actual.attributes.iter().map(|a| (a.name.clone(), a)).collect();
        let label = format!("{}/attribute", path);
        self.keyed(&label, &expected_attributes, &actual_attributes, |c, path, e, a| {
            c.attribute(path, e, a)
        });
    }

    fn group(&mut self, path: &str, expected: &ModelGroup, actual: &ModelGroup) {
        self.check(path, "compositor", expected.compositor, actual.compositor);
        self.check(path, "group occurs", expected.occurs, actual.occurs);
        if expected.compositor != actual.compositor {
            return;
        }
        if expected.particles.len() != actual.particles.len() {
            self.differ(
                path,
                "particle count",
                expected.particles.len().to_string(),
                actual.particles.len().to_string(),
            );
        }

        let expected_particles = ordered_particles(expected);
        let actual_particles = ordered_particles(actual);

        for (index, (e, a)) in expected_particles.iter().zip(actual_particles.iter()).enumerate() {
            self.particle(&format!("{}/{}", path, particle_label(e, index)), e, a);
        }
    }

    fn particle(&mut self, path: &str, expected: &Particle, actual: &Particle) {
        match (expected, actual) {
            (Particle::Element(e), Particle::Element(a)) => self.element(path, e, a),
            (Particle::ElementRef(e), Particle::ElementRef(a)) => {
                self.check(path, "ref", e.name.as_str(), a.name.as_str());
                self.check(path, "occurs", e.occurs, a.occurs);
                self.annotation(path, &e.annotation, &a.annotation);
            }
            (Particle::Group(e), Particle::Group(a)) => self.group(path, e, a),
            (e, a) => self.differ(path, "particle", particle_signature(e), particle_signature(a)),
        }
    }
}

/// Element or attribute content with trivial anonymous types resolved
#[derive(Debug)]
enum Content<'s> {
    Unspecified,
    Type(&'s TypeRef),
    Complex(&'s ComplexType),
    Simple(&'s SimpleType),
}

impl Content<'_> {
    fn describe(&self) -> String {
        match self {
            Content::Unspecified => "unspecified".to_string(),
            Content::Type(t) => format!("type {}", t),
            Content::Complex(_) => "anonymous complex type".to_string(),
            Content::Simple(_) => "anonymous simple type".to_string(),
        }
    }
}

/// An anonymous simple type without facets is the same as its base
fn trivial_simple(simple: &SimpleType) -> Option<&TypeRef> {
    let annotated = simple.annotation.as_ref().map_or(false, |a| !a.is_empty());
    (simple.facets.is_empty() && !annotated).then_some(&simple.base)
}

fn element_content(content: &ElementContent) -> Content<'_> {
    match content {
        ElementContent::Unspecified => Content::Unspecified,
        ElementContent::Type(t) => Content::Type(t),
        ElementContent::Complex(ct) => Content::Complex(ct),
        ElementContent::Simple(st) => trivial_simple(st).map_or(Content::Simple(st), Content::Type),
    }
}

fn simple_content(content: &SimpleContent) -> Content<'_> {
    match content {
        SimpleContent::Unspecified => Content::Unspecified,
        SimpleContent::Type(t) => Content::Type(t),
        SimpleContent::Anonymous(st) => trivial_simple(st).map_or(Content::Simple(st), Content::Type),
    }
}

/// `<xs:sequence/>` without occurrence bounds is empty content
fn complex_content(content: &ComplexContent) -> &ComplexContent {
    const EMPTY: &ComplexContent = &ComplexContent::Empty;
    match content {
        ComplexContent::Group(group) if group.particles.is_empty() && group.occurs == Occurs::once() => EMPTY,
        other => other,
    }
}

fn content_kind(content: &ComplexContent) -> String {
    match content {
        ComplexContent::Empty => "empty".to_string(),
        ComplexContent::Group(group) => group_signature(group),
        ComplexContent::Extension { base, .. } => format!("extension of {}", base),
        ComplexContent::Simple(_) => "simple content".to_string(),
    }
}

fn kind_of(definition: &TypeDefinition) -> &'static str {
    match definition {
        TypeDefinition::Complex(_) => "complex type",
        TypeDefinition::Simple(_) => "simple type",
    }
}

fn optional(value: Option<&str>) -> String {
    value.unwrap_or(NONE).to_string()
}

fn same_value(expected: &str, actual: &str) -> bool {
    expected == actual
        || matches!(
            (canonical_decimal(expected), canonical_decimal(actual)),
            (Some(e), Some(a)) if e == a
        )
}

/// Facets as comparable strings, numeric values in canonical form
fn facet_set(facets: &[Facet]) -> BTreeSet<String> {
    facets
        .iter()
        .map(|facet| {
            let value = match facet {
                Facet::Pattern(_) | Facet::WhiteSpace(_) => facet.lexical_value(),
                other => {
                    let lexical = other.lexical_value();
                    canonical_decimal(&lexical).unwrap_or(lexical)
                }
            };
            format!("{}={}", facet.name(), value)
        })
        .collect()
}

/// Particles in comparison order: declared order for sequences
fn ordered_particles(group: &ModelGroup) -> Vec<&Particle> {
    let mut particles: Vec<&Particle> = group.particles.iter().collect();
    if group.compositor != Compositor::Sequence {
        particles.sort_by_key(|p| particle_signature(p));
    }
    particles
}

fn particle_label(particle: &Particle, index: usize) -> String {
    match particle.element_name() {
        Some(name) => name.to_string(),
        None => format!("#{}", index),
    }
}

/// Order-independent description of a particle
fn particle_signature(particle: &Particle) -> String {
    match particle {
        Particle::Element(e) => format!("element {} {}", e.name, e.occurs),
        Particle::ElementRef(r) => format!("ref {} {}", r.name, r.occurs),
        Particle::Group(g) => group_signature(g),
    }
}

fn group_signature(group: &ModelGroup) -> String {
    let mut children: Vec<String> = group.particles.iter().map(particle_signature).collect();
    if group.compositor != Compositor::Sequence {
        children.sort();
    }
    format!("{}{}({})", group.compositor, group.occurs, children.join(", "))
}

fn describe_annotation(annotation: &Option<Annotation>) -> String {
    match annotation {
        None => NONE.to_string(),
        Some(annotation) => {
            let texts: Vec<&str> = annotation
                .documentation
                .iter()
                .filter_map(|d| d.text.as_deref())
                .collect();
            format!(
                "{} attribute(s), documentation [{}]",
                annotation.attributes.len(),
                texts.join(" | ")
            )
        }
    }
}
