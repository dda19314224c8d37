//! Instance document validation
//!
//! Validates XML instances against a schema graph. Content models are matched
//! by tracking the set of child positions each particle can reach, so choices
//! and optional particles never need backtracking.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::documents::{Document, Element as Node};
use crate::error::{Error, Result, ValidationError};
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::xsd::{
    AttributeUse, AttributeUseKind, BuiltinType, ComplexContent, ComplexType, Compositor, Element,
    ElementContent, ModelGroup, Occurs, Particle, Schema, SimpleContent, TypeDefinition, TypeRef,
};

use super::facets::{normalize_value, validate_simple_content};

/// XML Schema instance namespace (`xsi:nil`, `xsi:schemaLocation`, ...)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Validates instance documents against one schema
#[derive(Debug, Clone)]
pub struct InstanceValidator<'s> {
    schema: &'s Schema,
    limits: Limits,
}

impl<'s> InstanceValidator<'s> {
    /// Create a validator with default limits
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            limits: Limits::default(),
        }
    }

    /// Use custom limits for parsing and nesting
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Validate an instance given as a string.
    ///
    /// Returns every validity error found; `Err` only when the instance is
    /// not well-formed or the schema itself cannot be evaluated.
    pub fn validate_str(&self, xml: &str) -> Result<Vec<ValidationError>> {
        let doc = Document::parse_with_limits(xml.as_bytes(), &self.limits)?;
        self.validate_document(&doc)
    }

    /// Validate an instance file
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<Vec<ValidationError>> {
        let bytes = std::fs::read(path.as_ref())?;
        let doc = Document::parse_with_limits(&bytes, &self.limits)?;
        self.validate_document(&doc)
    }

    /// Validate a parsed instance
    pub fn validate_document(&self, doc: &Document) -> Result<Vec<ValidationError>> {
        let mut context = ValidationContext {
            schema: self.schema,
            limits: &self.limits,
            errors: Vec::new(),
        };

        let root = match doc.root() {
            Some(root) => root,
            None => {
                context.report("/", "document has no root element", None);
                return Ok(context.errors);
            }
        };

        let path = format!("/{}", root.local_name());
        if root.namespace() != self.schema.target_namespace.as_deref() {
            context.report(
                &path,
                format!("root element '{}' is not in the target namespace", root.local_name()),
                Some(format!(
                    "expected namespace '{}', found '{}'",
                    self.schema.target_namespace.as_deref().unwrap_or(""),
                    root.namespace().unwrap_or("")
                )),
            );
            return Ok(context.errors);
        }

        match self.schema.elements.get(root.local_name()) {
            Some(decl) => context.element(decl, root, &path, 0)?,
            None => context.report(
                &path,
                format!("unknown root element '{}'", root.local_name()),
                Some("no global element declaration with that name".to_string()),
            ),
        }

        debug!(errors = context.errors.len(), "validated instance");
        Ok(context.errors)
    }

    /// Whether an instance string is well-formed and valid
    pub fn is_valid(&self, xml: &str) -> bool {
        matches!(self.validate_str(xml), Ok(errors) if errors.is_empty())
    }
}

struct ValidationContext<'s, 'l> {
    schema: &'s Schema,
    limits: &'l Limits,
    errors: Vec<ValidationError>,
}

/// Attributes and content of a complex type after following its derivation
struct EffectiveType<'s> {
    attributes: Vec<&'s AttributeUse>,
    groups: Vec<&'s ModelGroup>,
    simple: Option<&'s SimpleContent>,
    empty: bool,
}

impl<'s, 'l> ValidationContext<'s, 'l> {
    fn report(&mut self, path: &str, message: impl Into<String>, reason: Option<String>) {
        let mut error = ValidationError::new(message).with_path(path);
        error.reason = reason;
        self.errors.push(error);
    }

    /// Collect a value error, propagate anything else
    fn collect(&mut self, path: &str, outcome: Result<()>) -> Result<()> {
        match outcome {
            Err(Error::Validation(error)) => {
                self.errors.push(error.with_path(path));
                Ok(())
            }
            other => other,
        }
    }

    fn element(&mut self, decl: &'s Element, node: &Node, path: &str, depth: usize) -> Result<()> {
        self.limits.check_nesting_depth(depth)?;

        let nil = QName::namespaced(XSI_NAMESPACE, "nil");
        if matches!(node.get_attribute_qname(&nil), Some("true" | "1")) {
            if !decl.nillable {
                self.report(
                    path,
                    format!("element '{}' is not nillable", decl.name),
                    Some("xsi:nil='true' used on a non-nillable element".to_string()),
                );
            } else if !node.children.is_empty() || has_text(node) {
                self.report(path, format!("nilled element '{}' must be empty", decl.name), None);
            }
            return Ok(());
        }

        match &decl.content {
            ElementContent::Unspecified | ElementContent::Type(TypeRef::Builtin(BuiltinType::AnyType)) => {
                Ok(())
            }
            ElementContent::Type(TypeRef::Builtin(builtin)) => {
                let content = SimpleContent::Type(TypeRef::Builtin(*builtin));
                self.simple_element(decl, &content, node, path)
            }
            ElementContent::Type(TypeRef::Named(name)) => match self.schema.resolve(name)? {
                TypeDefinition::Simple(_) => {
                    let content = SimpleContent::Type(TypeRef::Named(name.clone()));
                    self.simple_element(decl, &content, node, path)
                }
                TypeDefinition::Complex(ct) => self.complex_element(decl, ct, node, path, depth),
            },
            ElementContent::Complex(ct) => self.complex_element(decl, ct, node, path, depth),
            ElementContent::Simple(st) => {
                let content = SimpleContent::Anonymous(st.clone());
                self.simple_element(decl, &content, node, path)
            }
        }
    }

    fn simple_element(
        &mut self,
        decl: &Element,
        content: &SimpleContent,
        node: &Node,
        path: &str,
    ) -> Result<()> {
        if !node.children.is_empty() {
            self.report(
                path,
                format!("element '{}' has a simple type but contains child elements", decl.name),
                None,
            );
            return Ok(());
        }
        for attribute in &node.attributes {
            if !is_instance_attribute(&attribute.name) {
                self.report(
                    path,
                    format!("attribute '{}' is not allowed", attribute.name.local_name),
                    None,
                );
            }
        }
        let value = self.text_or_default(decl, node);
        self.fixed_value(decl, content, &value, path)?;
        let outcome = validate_simple_content(self.schema, content, &value);
        self.collect(path, outcome)
    }

    fn text_or_default(&self, decl: &Element, node: &Node) -> String {
        match (node.text.as_deref(), &decl.default) {
            (Some(text), _) if !text.is_empty() => text.to_string(),
            (_, Some(default)) => default.clone(),
            _ => String::new(),
        }
    }

    fn fixed_value(&mut self, decl: &Element, content: &SimpleContent, value: &str, path: &str) -> Result<()> {
        if let Some(fixed) = &decl.fixed {
            let actual = normalize_value(self.schema, content, value)?;
            let expected = normalize_value(self.schema, content, fixed)?;
            if actual != expected {
                self.report(
                    path,
                    format!("element '{}' must have the fixed value '{}'", decl.name, fixed),
                    Some(format!("found '{}'", value)),
                );
            }
        }
        Ok(())
    }

    fn complex_element(
        &mut self,
        decl: &Element,
        complex_type: &'s ComplexType,
        node: &Node,
        path: &str,
        depth: usize,
    ) -> Result<()> {
        let effective = self.effective(complex_type, 0)?;
        self.attributes(&effective.attributes, node, path)?;

        if let Some(content) = effective.simple {
            if !node.children.is_empty() {
                self.report(
                    path,
                    format!("element '{}' has simple content but contains child elements", decl.name),
                    None,
                );
                return Ok(());
            }
            let value = self.text_or_default(decl, node);
            self.fixed_value(decl, content, &value, path)?;
            let outcome = validate_simple_content(self.schema, content, &value);
            return self.collect(path, outcome);
        }

        if has_text(node) {
            self.report(
                path,
                format!("element '{}' cannot contain character data", decl.name),
                Some(format!("type '{}' has element-only content", complex_type.display_name())),
            );
        }

        if effective.empty || effective.groups.is_empty() {
            if !node.children.is_empty() {
                self.report(
                    path,
                    format!("element '{}' must be empty", decl.name),
                    Some(format!("found child element '{}'", node.children[0].local_name())),
                );
            }
            return Ok(());
        }

        self.content_model(decl, &effective.groups, node, path)?;

        let paths = child_paths(node, path);
        for (child, child_path) in node.children.iter().zip(&paths) {
            if let Some(child_decl) = self.declaration_in(&effective.groups, child.local_name())? {
                self.element(child_decl, child, child_path, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Follow extension and simple content derivation to the full type
    fn effective(&self, complex_type: &'s ComplexType, depth: usize) -> Result<EffectiveType<'s>> {
        self.limits.check_nesting_depth(depth)?;

        let mut effective = match &complex_type.content {
            ComplexContent::Empty => EffectiveType {
                attributes: Vec::new(),
                groups: Vec::new(),
                simple: None,
                empty: true,
            },
            ComplexContent::Group(group) => EffectiveType {
                attributes: Vec::new(),
                groups: vec![group],
                simple: None,
                empty: false,
            },
            ComplexContent::Extension { base, group } => {
                let base_type = self.complex_type_named(base)?;
                let mut effective = self.effective(base_type, depth + 1)?;
                if let Some(group) = group {
                    effective.groups.push(group);
                    effective.empty = false;
                }
                effective
            }
            ComplexContent::Simple(content) => {
                let mut attributes = Vec::new();
                if let SimpleContent::Type(TypeRef::Named(name)) = content {
                    if let TypeDefinition::Complex(base) = self.schema.resolve(name)? {
                        attributes = self.effective(base, depth + 1)?.attributes;
                    }
                }
                EffectiveType {
                    attributes,
                    groups: Vec::new(),
                    simple: Some(content),
                    empty: false,
                }
            }
        };

        // Derived attribute uses replace inherited ones with the same name
        for attribute in &complex_type.attributes {
            effective.attributes.retain(|a| a.name != attribute.name);
            effective.attributes.push(attribute);
        }
        Ok(effective)
    }

    fn complex_type_named(&self, name: &str) -> Result<&'s ComplexType> {
        match self.schema.resolve(name)? {
            TypeDefinition::Complex(ct) => Ok(ct),
            TypeDefinition::Simple(_) => Err(Error::malformed(format!(
                "extension base '{}' is not a complex type",
                name
            ))),
        }
    }

    fn attributes(&mut self, uses: &[&'s AttributeUse], node: &Node, path: &str) -> Result<()> {
        for attribute in &node.attributes {
            if is_instance_attribute(&attribute.name) {
                continue;
            }
            let qualified_elsewhere = match attribute.name.namespace.as_deref() {
                None => false,
                Some(ns) => Some(ns) != self.schema.target_namespace.as_deref(),
            };
            let declared = uses.iter().copied().find(|u| u.name == attribute.name.local_name);

            match declared {
                Some(declared) if !qualified_elsewhere => {
                    if declared.use_kind == AttributeUseKind::Prohibited {
                        self.report(
                            path,
                            format!("attribute '{}' is prohibited", declared.name),
                            None,
                        );
                        continue;
                    }
                    let content = self.attribute_content(declared);
                    if let Some(fixed) = &declared.fixed {
                        let actual = normalize_value(self.schema, content, &attribute.value)?;
                        if actual != normalize_value(self.schema, content, fixed)? {
                            self.report(
                                path,
                                format!(
                                    "attribute '{}' must have the fixed value '{}'",
                                    declared.name, fixed
                                ),
                                Some(format!("found '{}'", attribute.value)),
                            );
                        }
                    }
                    let outcome = validate_simple_content(self.schema, content, &attribute.value);
                    self.collect(&format!("{}/@{}", path, declared.name), outcome)?;
                }
                _ => self.report(
                    path,
                    format!("attribute '{}' is not allowed", attribute.name.local_name),
                    None,
                ),
            }
        }

        for declared in uses.iter().filter(|u| u.is_required()) {
            let present = node
                .attributes
                .iter()
                .any(|a| a.name.local_name == declared.name && !is_instance_attribute(&a.name));
            if !present {
                self.report(
                    path,
                    format!("missing required attribute '{}'", declared.name),
                    None,
                );
            }
        }
        Ok(())
    }

    /// Type of an attribute use, following `ref=` to the global declaration
    fn attribute_content(&self, attribute: &'s AttributeUse) -> &'s SimpleContent {
        if attribute.is_ref {
            if let Some(global) = self.schema.attributes.get(&attribute.name) {
                return &global.content;
            }
        }
        &attribute.content
    }

    fn content_model(
        &mut self,
        decl: &Element,
        groups: &[&'s ModelGroup],
        node: &Node,
        path: &str,
    ) -> Result<()> {
        let model = combined_group(groups);
        let names: Vec<&str> = node.children.iter().map(|c| c.local_name()).collect();
        let matcher = Matcher {
            schema: self.schema,
            limits: self.limits,
            names: &names,
        };
        let ends = matcher.group(&model, 0, 0)?;
        if ends.contains(&names.len()) {
            return Ok(());
        }

        // Explain the first child the model cannot place
        for name in &names {
            if self.declaration_in(groups, name)?.is_none() {
                self.report(
                    path,
                    format!("unexpected child element '{}' in '{}'", name, decl.name),
                    Some(format!("expected {}", describe_group(&model))),
                );
                return Ok(());
            }
        }

        self.report(
            path,
            format!("content of element '{}' does not match its content model", decl.name),
            Some(format!(
                "expected {}, found ({})",
                describe_group(&model),
                names.join(", ")
            )),
        );
        Ok(())
    }

    fn declaration_in(&self, groups: &[&'s ModelGroup], name: &str) -> Result<Option<&'s Element>> {
        for group in groups {
            if let Some(found) = self.find_declaration(group, name, 0)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// The declaration governing children with `name` anywhere in a group
    fn find_declaration(&self, group: &'s ModelGroup, name: &str, depth: usize) -> Result<Option<&'s Element>> {
        self.limits.check_nesting_depth(depth)?;
        for particle in &group.particles {
            match particle {
                Particle::Element(e) if e.name == name => return Ok(Some(e)),
                Particle::ElementRef(r) if r.name == name => {
                    return self.schema.resolve_element(&r.name).map(Some)
                }
                Particle::Group(inner) => {
                    if let Some(found) = self.find_declaration(inner, name, depth + 1)? {
                        return Ok(Some(found));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

/// Position-set matcher over child element names
struct Matcher<'a> {
    schema: &'a Schema,
    limits: &'a Limits,
    names: &'a [&'a str],
}

impl Matcher<'_> {
    fn particle(&self, particle: &Particle, start: usize, depth: usize) -> Result<BTreeSet<usize>> {
        match particle {
            Particle::Element(e) => Ok(self.repeat(e.occurs, start, |p| Ok(self.single(&e.name, p)))?),
            Particle::ElementRef(r) => {
                self.schema.resolve_element(&r.name)?;
                self.repeat(r.occurs, start, |p| Ok(self.single(&r.name, p)))
            }
            Particle::Group(g) => self.group(g, start, depth + 1),
        }
    }

    fn single(&self, name: &str, position: usize) -> BTreeSet<usize> {
        let mut next = BTreeSet::new();
        if self.names.get(position) == Some(&name) {
            next.insert(position + 1);
        }
        next
    }

    fn group(&self, group: &ModelGroup, start: usize, depth: usize) -> Result<BTreeSet<usize>> {
        self.limits.check_nesting_depth(depth)?;
        self.repeat(group.occurs, start, |p| self.group_once(group, p, depth))
    }

    fn group_once(&self, group: &ModelGroup, start: usize, depth: usize) -> Result<BTreeSet<usize>> {
        match group.compositor {
            Compositor::Sequence => {
                let mut positions = BTreeSet::from([start]);
                for particle in &group.particles {
                    let mut next = BTreeSet::new();
                    for &p in &positions {
                        next.extend(self.particle(particle, p, depth)?);
                    }
                    if next.is_empty() {
                        return Ok(next);
                    }
                    positions = next;
                }
                Ok(positions)
            }
            Compositor::Choice => {
                let mut positions = BTreeSet::new();
                for particle in &group.particles {
                    positions.extend(self.particle(particle, start, depth)?);
                }
                Ok(positions)
            }
            Compositor::All => Ok(self.all(group, start)),
        }
    }

    /// `xs:all`: each element at most once, in any order
    fn all(&self, group: &ModelGroup, start: usize) -> BTreeSet<usize> {
        let mut used = vec![false; group.particles.len()];
        let mut position = start;

        while let Some(name) = self.names.get(position) {
            let slot = group
                .particles
                .iter()
                .enumerate()
                .position(|(i, p)| !used[i] && p.element_name() == Some(*name));
            match slot {
                Some(i) => {
                    used[i] = true;
                    position += 1;
                }
                None => break,
            }
        }

        let complete = group
            .particles
            .iter()
            .zip(&used)
            .all(|(p, used)| *used || p.occurs().is_emptiable());
        if complete {
            BTreeSet::from([position])
        } else {
            BTreeSet::new()
        }
    }

    /// Apply a step between `min` and `max` times
    fn repeat(
        &self,
        occurs: Occurs,
        start: usize,
        step: impl Fn(usize) -> Result<BTreeSet<usize>>,
    ) -> Result<BTreeSet<usize>> {
        let mut reached = BTreeSet::new();
        if occurs.min == 0 {
            reached.insert(start);
        }

        let mut frontier = BTreeSet::from([start]);
        let mut count: u32 = 0;
        let bound = self.names.len() + occurs.min as usize + 1;

        while occurs.max.map_or(true, |max| count < max) && (count as usize) < bound {
            let mut next = BTreeSet::new();
            for &p in &frontier {
                next.extend(step(p)?);
            }
            count += 1;
            if next.is_empty() {
                break;
            }
            if count >= occurs.min {
                if next.is_subset(&reached) {
                    break;
                }
                reached.extend(next.iter().copied());
            }
            frontier = next;
        }
        Ok(reached)
    }
}

/// The groups of a derivation chain as one sequence
fn combined_group(groups: &[&ModelGroup]) -> ModelGroup {
    match groups {
        [single] => (*single).clone(),
        _ => groups.iter().fold(ModelGroup::new(Compositor::Sequence), |acc, g| {
            acc.with_particle(Particle::Group((*g).clone()))
        }),
    }
}

fn describe_group(group: &ModelGroup) -> String {
    let separator = match group.compositor {
        Compositor::Sequence => ", ",
        Compositor::Choice => " | ",
        Compositor::All => " & ",
    };
    let parts: Vec<String> = group
        .particles
        .iter()
        .map(|p| match p {
            Particle::Group(g) => describe_group(g),
            other => format!(
                "{}{}",
                other.element_name().unwrap_or_default(),
                occurs_suffix(other.occurs())
            ),
        })
        .collect();
    format!("({}){}", parts.join(separator), occurs_suffix(group.occurs))
}

fn occurs_suffix(occurs: Occurs) -> String {
    match (occurs.min, occurs.max) {
        (1, Some(1)) => String::new(),
        (0, Some(1)) => "?".to_string(),
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        _ => format!("{}", occurs),
    }
}

fn has_text(node: &Node) -> bool {
    node.text.as_deref().map_or(false, |t| !t.trim().is_empty())
}

/// `xsi:*` and `xml:*` attributes are never declared by a schema
fn is_instance_attribute(name: &QName) -> bool {
    matches!(
        name.namespace.as_deref(),
        Some(XSI_NAMESPACE) | Some(crate::XML_NAMESPACE)
    )
}

/// Paths of the children, indexed when a name repeats
fn child_paths(node: &Node, path: &str) -> Vec<String> {
    let mut seen: Vec<(&str, usize)> = Vec::new();
    node.children
        .iter()
        .map(|child| {
            let name = child.local_name();
            let total = node.children.iter().filter(|c| c.local_name() == name).count();
            let index = match seen.iter_mut().find(|(n, _)| *n == name) {
                Some((_, i)) => {
                    *i += 1;
                    *i
                }
                None => {
                    seen.push((name, 1));
                    1
                }
            };
            if total > 1 {
                format!("{}/{}[{}]", path, name, index)
            } else {
                format!("{}/{}", path, name)
            }
        })
        .collect()
}
