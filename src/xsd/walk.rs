//! Depth-first particle traversal
//!
//! Walks content models in declared order, descending into nested
//! compositors and anonymous complex types. Named types are indirections and
//! are not followed, so the walk is finite on self-referential schemas.

use super::model::{ComplexType, ElementContent, ModelGroup, Particle, Schema};

/// Iterator over `(path, particle)` pairs of one or more content models.
///
/// Cloning the iterator restarts nothing; call [`Schema::particles`] or
/// [`ParticleWalk::of_type`] again to start over.
#[derive(Debug, Clone)]
pub struct ParticleWalk<'a> {
    stack: Vec<(String, &'a Particle)>,
}

impl<'a> ParticleWalk<'a> {
    /// Walk the particles of one complex type, paths rooted at `root`
    pub fn of_type(root: &str, complex_type: &'a ComplexType) -> Self {
        let mut walk = ParticleWalk { stack: Vec::new() };
        if let Some(group) = complex_type.group() {
            walk.push_group(root, group);
        }
        walk
    }

    fn empty() -> Self {
        ParticleWalk { stack: Vec::new() }
    }

    fn push_group(&mut self, prefix: &str, group: &'a ModelGroup) {
        // Reverse so the first child is popped first
        for (index, particle) in group.particles.iter().enumerate().rev() {
            let segment = match particle {
                Particle::Element(e) => e.name.clone(),
                Particle::ElementRef(r) => format!("ref:{}", r.name),
                Particle::Group(g) => format!("{}[{}]", g.compositor, index),
            };
            self.stack
                .push((format!("{}/{}/{}", prefix, group.compositor, segment), particle));
        }
    }
}

impl<'a> Iterator for ParticleWalk<'a> {
    type Item = (String, &'a Particle);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, particle) = self.stack.pop()?;
        match particle {
            Particle::Group(group) => {
                // Nested group children are addressed below the group itself
                let mut children = Vec::new();
                for (index, child) in group.particles.iter().enumerate() {
                    let segment = match child {
                        Particle::Element(e) => e.name.clone(),
                        Particle::ElementRef(r) => format!("ref:{}", r.name),
                        Particle::Group(g) => format!("{}[{}]", g.compositor, index),
                    };
                    children.push((format!("{}/{}", path, segment), child));
                }
                self.stack.extend(children.into_iter().rev());
            }
            Particle::Element(element) => {
                if let ElementContent::Complex(ct) = &element.content {
                    if let Some(group) = ct.group() {
                        self.push_group(&path, group);
                    }
                }
            }
            Particle::ElementRef(_) => {}
        }
        Some((path, particle))
    }
}

impl Schema {
    /// Walk the particles of one complex type depth-first in declared order
    pub fn walk_particles<'a>(&self, complex_type: &'a ComplexType) -> ParticleWalk<'a> {
        ParticleWalk::of_type(complex_type.display_name(), complex_type)
    }

    /// Walk every particle of the schema: anonymous types of global elements
    /// first, then named complex types, each in declaration order.
    pub fn particles(&self) -> impl Iterator<Item = (String, &Particle)> + '_ {
        let from_elements = self.elements.values().flat_map(|element| match &element.content {
            ElementContent::Complex(ct) => ParticleWalk::of_type(&element.name, ct),
            _ => ParticleWalk::empty(),
        });
        let from_types = self
            .complex_types()
            .flat_map(|(name, ct)| ParticleWalk::of_type(name, ct));
        from_elements.chain(from_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::{BuiltinType, ComplexContent, Compositor, Element, Occurs, TypeRef};

    fn string_element(name: &str) -> Particle {
        Particle::Element(Element::typed(name, TypeRef::Builtin(BuiltinType::String)))
    }

    fn sample_type() -> ComplexType {
        let choice = ModelGroup::new(Compositor::Choice)
            .with_particle(string_element("b"))
            .with_particle(string_element("c"));
        let group = ModelGroup::new(Compositor::Sequence)
            .with_particle(string_element("a"))
            .with_particle(Particle::Group(choice.with_occurs(Occurs::zero_or_more())))
            .with_particle(string_element("d"));
        ComplexType::new(Some("T".into()), ComplexContent::Group(group))
    }

    #[test]
    fn test_walk_is_depth_first_in_declared_order() {
        let ct = sample_type();
        let names: Vec<String> = ParticleWalk::of_type("T", &ct).map(|(path, _)| path).collect();
        assert_eq!(
            names,
            vec![
                "T/sequence/a",
                "T/sequence/choice[1]",
                "T/sequence/choice[1]/b",
                "T/sequence/choice[1]/c",
                "T/sequence/d",
            ]
        );
    }

    #[test]
    fn test_walk_is_restartable() {
        let ct = sample_type();
        let first: Vec<_> = ParticleWalk::of_type("T", &ct).map(|(p, _)| p).collect();
        let second: Vec<_> = ParticleWalk::of_type("T", &ct).map(|(p, _)| p).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_does_not_follow_named_types() {
        let mut schema = Schema::new();
        let group = ModelGroup::new(Compositor::Sequence).with_particle(Particle::Element(
            Element::typed("child", TypeRef::Named("Node".into())).with_occurs(Occurs::zero_or_more()),
        ));
        schema
            .add_complex_type(ComplexType::new(Some("Node".into()), ComplexContent::Group(group)))
            .unwrap();

        let paths: Vec<_> = schema.particles().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["Node/sequence/child"]);
    }
}
