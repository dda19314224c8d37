//! XSD type graph
//!
//! An owned, immutable-by-convention model of one XML Schema document. Named
//! types live in a single arena keyed by name ([`Schema::types`]); every other
//! reference to a named type is a string key into that arena, so cyclic
//! (self-referential) schemas never form pointer cycles.

use indexmap::IndexMap;
use std::fmt;

use super::builtins::BuiltinType;
use crate::error::{ConstructKind, Error, ParseError, Result};
use crate::namespaces::{NamespaceContext, QName};

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if particle can have more than one occurrence (or none at all
    /// with maxOccurs = 0, which also needs an array to express)
    pub fn is_repeated(&self) -> bool {
        !self.is_single()
    }

    /// Check if this particle can be absent
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Whether min <= max holds
    pub fn is_valid(&self) -> bool {
        match self.max {
            Some(max) => self.min <= max,
            None => true,
        }
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if occurrence count is at or over the maximum
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }

    /// Parse minOccurs/maxOccurs attribute values
    pub fn parse(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
        let mut occurs = Occurs::once();

        if let Some(min_str) = min_occurs {
            occurs.min = min_str.trim().parse::<u32>().map_err(|_| {
                ParseError::new(format!(
                    "minOccurs value '{}' is not a valid non-negative integer",
                    min_str
                ))
            })?;
        }

        if let Some(max_str) = max_occurs {
            occurs.max = match max_str.trim() {
                "unbounded" => None,
                other => Some(other.parse::<u32>().map_err(|_| {
                    ParseError::new(format!(
                        "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                        max_str
                    ))
                })?),
            };
        }

        if !occurs.is_valid() {
            return Err(ParseError::new(format!(
                "minOccurs ({}) must be lesser or equal than maxOccurs ({})",
                occurs.min,
                occurs.max_string()
            ))
            .into());
        }

        Ok(occurs)
    }

    /// maxOccurs as written in XSD
    pub fn max_string(&self) -> String {
        match self.max {
            Some(max) => max.to_string(),
            None => "unbounded".to_string(),
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max_string())
    }
}

/// Reference to a type: either an XSD built-in or a named type of this schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A built-in datatype from the XSD namespace
    Builtin(BuiltinType),
    /// A named type declared at the root of this schema
    Named(String),
}

impl TypeRef {
    /// Name of the referenced named type, if any
    pub fn named(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            TypeRef::Builtin(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Builtin(b) => write!(f, "{}", b),
            TypeRef::Named(n) => f.write_str(n),
        }
    }
}

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "preserve" => Some(WhiteSpace::Preserve),
            "replace" => Some(WhiteSpace::Replace),
            "collapse" => Some(WhiteSpace::Collapse),
            _ => None,
        }
    }

    /// Value as written in XSD
    pub fn as_str(&self) -> &'static str {
        match self {
            WhiteSpace::Preserve => "preserve",
            WhiteSpace::Replace => "replace",
            WhiteSpace::Collapse => "collapse",
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s
                .split([' ', '\t', '\n', '\r'])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A constraining facet of a simple type restriction
///
/// Range values stay in their lexical form: their interpretation depends on
/// the base type (numbers, dates, durations).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Facet {
    /// `length`
    Length(u64),
    /// `minLength`
    MinLength(u64),
    /// `maxLength`
    MaxLength(u64),
    /// `pattern` (XSD regular expression, implicitly anchored)
    Pattern(String),
    /// `enumeration`
    Enumeration(String),
    /// `minInclusive`
    MinInclusive(String),
    /// `maxInclusive`
    MaxInclusive(String),
    /// `minExclusive`
    MinExclusive(String),
    /// `maxExclusive`
    MaxExclusive(String),
    /// `totalDigits`
    TotalDigits(u32),
    /// `fractionDigits`
    FractionDigits(u32),
    /// `whiteSpace`
    WhiteSpace(WhiteSpace),
}

impl Facet {
    /// Facet element local name
    pub fn name(&self) -> &'static str {
        match self {
            Facet::Length(_) => "length",
            Facet::MinLength(_) => "minLength",
            Facet::MaxLength(_) => "maxLength",
            Facet::Pattern(_) => "pattern",
            Facet::Enumeration(_) => "enumeration",
            Facet::MinInclusive(_) => "minInclusive",
            Facet::MaxInclusive(_) => "maxInclusive",
            Facet::MinExclusive(_) => "minExclusive",
            Facet::MaxExclusive(_) => "maxExclusive",
            Facet::TotalDigits(_) => "totalDigits",
            Facet::FractionDigits(_) => "fractionDigits",
            Facet::WhiteSpace(_) => "whiteSpace",
        }
    }

    /// The `value` attribute as written in XSD
    pub fn lexical_value(&self) -> String {
        match self {
            Facet::Length(v) | Facet::MinLength(v) | Facet::MaxLength(v) => v.to_string(),
            Facet::TotalDigits(v) | Facet::FractionDigits(v) => v.to_string(),
            Facet::Pattern(v)
            | Facet::Enumeration(v)
            | Facet::MinInclusive(v)
            | Facet::MaxInclusive(v)
            | Facet::MinExclusive(v)
            | Facet::MaxExclusive(v) => v.clone(),
            Facet::WhiteSpace(ws) => ws.as_str().to_string(),
        }
    }

    /// Whether this facet bounds a value range
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Facet::MinInclusive(_)
                | Facet::MaxInclusive(_)
                | Facet::MinExclusive(_)
                | Facet::MaxExclusive(_)
        )
    }

    /// Build a facet from its element name and `value` attribute.
    ///
    /// Returns `Ok(None)` for facet names this model does not carry.
    pub fn from_name_value(name: &str, value: &str) -> Result<Option<Facet>> {
        fn count<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
            value.trim().parse::<T>().map_err(|_| {
                Error::Parse(ParseError::new(format!(
                    "{} value '{}' is not a valid non-negative integer",
                    name, value
                )))
            })
        }

        let facet = match name {
            "length" => Facet::Length(count(name, value)?),
            "minLength" => Facet::MinLength(count(name, value)?),
            "maxLength" => Facet::MaxLength(count(name, value)?),
            "totalDigits" => Facet::TotalDigits(count(name, value)?),
            "fractionDigits" => Facet::FractionDigits(count(name, value)?),
            "pattern" => Facet::Pattern(value.to_string()),
            "enumeration" => Facet::Enumeration(value.to_string()),
            "minInclusive" => Facet::MinInclusive(value.trim().to_string()),
            "maxInclusive" => Facet::MaxInclusive(value.trim().to_string()),
            "minExclusive" => Facet::MinExclusive(value.trim().to_string()),
            "maxExclusive" => Facet::MaxExclusive(value.trim().to_string()),
            "whiteSpace" => Facet::WhiteSpace(WhiteSpace::from_str(value.trim()).ok_or_else(
                || {
                    Error::Parse(ParseError::new(format!(
                        "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                        value
                    )))
                },
            )?),
            _ => return Ok(None),
        };
        Ok(Some(facet))
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name(), self.lexical_value())
    }
}

/// One namespace-qualified key/value pair of an opaque annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationEntry {
    /// Qualified key
    pub name: QName,
    /// Verbatim value
    pub value: String,
}

impl AnnotationEntry {
    /// Create a new entry
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// One `xs:documentation` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Documentation {
    /// `xml:lang`
    pub lang: Option<String>,
    /// Text content
    pub text: Option<String>,
    /// Markup children, e.g. SERES `<xs:attribute name=".." fixed=".."/>`
    pub markers: Vec<AnnotationEntry>,
}

/// Opaque annotation payload carried through both conversion directions.
///
/// Holds the foreign-namespace attributes of a component (`seres:guid`,
/// `seres:elementtype`, ...) and its `xs:annotation/xs:documentation` blocks.
/// None of it is interpreted by the converters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Annotation {
    /// Foreign-namespace attributes in document order
    pub attributes: Vec<AnnotationEntry>,
    /// Documentation blocks in document order
    pub documentation: Vec<Documentation>,
}

impl Annotation {
    /// Whether nothing is carried
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.documentation.is_empty()
    }

    /// Look up a documentation marker by qualified name
    pub fn marker(&self, name: &QName) -> Option<&str> {
        self.documentation
            .iter()
            .flat_map(|d| d.markers.iter())
            .find(|m| &m.name == name)
            .map(|m| m.value.as_str())
    }

    /// Look up a foreign attribute by qualified name
    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// `None` when empty, so empty annotations never reach the output
    pub fn non_empty(self) -> Option<Annotation> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// XSD compositors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compositor {
    /// `xs:sequence`, children in declared order
    Sequence,
    /// `xs:choice`, exactly one branch
    Choice,
    /// `xs:all`, children in any order
    All,
}

impl Compositor {
    /// Element local name (also the value of the structure keyword)
    pub fn as_str(&self) -> &'static str {
        match self {
            Compositor::Sequence => "sequence",
            Compositor::Choice => "choice",
            Compositor::All => "all",
        }
    }

    /// Parse a compositor name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequence" => Some(Compositor::Sequence),
            "choice" => Some(Compositor::Choice),
            "all" => Some(Compositor::All),
            _ => None,
        }
    }
}

impl fmt::Display for Compositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compositor with its occurrence range and child particles
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGroup {
    /// Kind of compositor
    pub compositor: Compositor,
    /// Occurrence range of the group itself
    pub occurs: Occurs,
    /// Children in declared order
    pub particles: Vec<Particle>,
}

impl ModelGroup {
    /// Create an empty group occurring once
    pub fn new(compositor: Compositor) -> Self {
        Self {
            compositor,
            occurs: Occurs::once(),
            particles: Vec::new(),
        }
    }

    /// Builder-style particle
    pub fn with_particle(mut self, particle: Particle) -> Self {
        self.particles.push(particle);
        self
    }

    /// Builder-style occurs
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Whether every child is an element particle
    pub fn is_flat(&self) -> bool {
        self.particles
            .iter()
            .all(|p| !matches!(p, Particle::Group(_)))
    }
}

/// A particle of a content model
#[derive(Debug, Clone, PartialEq)]
pub enum Particle {
    /// A local element declaration
    Element(Element),
    /// `ref=` to a global element
    ElementRef(ElementRef),
    /// A nested compositor
    Group(ModelGroup),
}

impl Particle {
    /// Occurrence range of this particle
    pub fn occurs(&self) -> Occurs {
        match self {
            Particle::Element(e) => e.occurs,
            Particle::ElementRef(r) => r.occurs,
            Particle::Group(g) => g.occurs,
        }
    }

    /// Element name for element particles
    pub fn element_name(&self) -> Option<&str> {
        match self {
            Particle::Element(e) => Some(&e.name),
            Particle::ElementRef(r) => Some(&r.name),
            Particle::Group(_) => None,
        }
    }
}

/// Content of an element declaration
#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    /// No type given (`xs:anyType` by default)
    Unspecified,
    /// `type=` attribute
    Type(TypeRef),
    /// Anonymous complex type
    Complex(Box<ComplexType>),
    /// Anonymous simple type
    Simple(Box<SimpleType>),
}

/// An element declaration (global or local)
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element name
    pub name: String,
    /// Occurrence range (always once for global elements)
    pub occurs: Occurs,
    /// Type of the element
    pub content: ElementContent,
    /// `nillable="true"`
    pub nillable: bool,
    /// `default=`
    pub default: Option<String>,
    /// `fixed=`
    pub fixed: Option<String>,
    /// Opaque annotations
    pub annotation: Option<Annotation>,
}

impl Element {
    /// Create an element of a given type occurring once
    pub fn new(name: impl Into<String>, content: ElementContent) -> Self {
        Self {
            name: name.into(),
            occurs: Occurs::once(),
            content,
            nillable: false,
            default: None,
            fixed: None,
            annotation: None,
        }
    }

    /// Create an element with a `type=` reference
    pub fn typed(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self::new(name, ElementContent::Type(type_ref))
    }

    /// Builder-style occurs
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }
}

/// `<xs:element ref="..."/>`
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRef {
    /// Name of the referenced global element
    pub name: String,
    /// Occurrence range
    pub occurs: Occurs,
    /// Opaque annotations
    pub annotation: Option<Annotation>,
}

/// Attribute use modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeUseKind {
    /// `use="optional"` (default)
    #[default]
    Optional,
    /// `use="required"`
    Required,
    /// `use="prohibited"`
    Prohibited,
}

impl AttributeUseKind {
    /// Parse a `use` attribute value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "optional" => Some(AttributeUseKind::Optional),
            "required" => Some(AttributeUseKind::Required),
            "prohibited" => Some(AttributeUseKind::Prohibited),
            _ => None,
        }
    }

    /// Value as written in XSD
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeUseKind::Optional => "optional",
            AttributeUseKind::Required => "required",
            AttributeUseKind::Prohibited => "prohibited",
        }
    }
}

/// Type of an attribute or of simple content
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleContent {
    /// No type given (`xs:anySimpleType`)
    Unspecified,
    /// `type=`/`base=` reference
    Type(TypeRef),
    /// Anonymous simple type
    Anonymous(Box<SimpleType>),
}

/// An attribute declaration or use
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUse {
    /// Attribute name
    pub name: String,
    /// Whether this is a `ref=` to a global attribute
    pub is_ref: bool,
    /// Attribute type
    pub content: SimpleContent,
    /// `use=`
    pub use_kind: AttributeUseKind,
    /// `default=`
    pub default: Option<String>,
    /// `fixed=`
    pub fixed: Option<String>,
    /// Opaque annotations
    pub annotation: Option<Annotation>,
}

impl AttributeUse {
    /// Create an optional attribute of the given type
    pub fn new(name: impl Into<String>, content: SimpleContent) -> Self {
        Self {
            name: name.into(),
            is_ref: false,
            content,
            use_kind: AttributeUseKind::Optional,
            default: None,
            fixed: None,
            annotation: None,
        }
    }

    /// Builder-style use kind
    pub fn with_use(mut self, use_kind: AttributeUseKind) -> Self {
        self.use_kind = use_kind;
        self
    }

    /// Whether `use="required"`
    pub fn is_required(&self) -> bool {
        self.use_kind == AttributeUseKind::Required
    }
}

/// Content of a complex type
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexContent {
    /// No child elements
    Empty,
    /// Child elements governed by a compositor
    Group(ModelGroup),
    /// `complexContent/extension` of a named complex type
    Extension {
        /// Base complex type name
        base: String,
        /// Particles added by the extension
        group: Option<ModelGroup>,
    },
    /// `simpleContent/extension`: text value of a simple type plus attributes
    Simple(SimpleContent),
}

/// A complex type definition (named or anonymous)
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// Name (None for anonymous types)
    pub name: Option<String>,
    /// Content model
    pub content: ComplexContent,
    /// Attribute uses in declared order
    pub attributes: Vec<AttributeUse>,
    /// Opaque annotations
    pub annotation: Option<Annotation>,
}

impl ComplexType {
    /// Create a complex type with the given content and no attributes
    pub fn new(name: Option<String>, content: ComplexContent) -> Self {
        Self {
            name,
            content,
            attributes: Vec::new(),
            annotation: None,
        }
    }

    /// The model group of this type, including one added by an extension
    pub fn group(&self) -> Option<&ModelGroup> {
        match &self.content {
            ComplexContent::Group(g) => Some(g),
            ComplexContent::Extension { group, .. } => group.as_ref(),
            _ => None,
        }
    }

    /// Compositor of the outermost model group
    pub fn compositor(&self) -> Option<Compositor> {
        self.group().map(|g| g.compositor)
    }

    /// Base type for derived types
    pub fn base(&self) -> Option<TypeRef> {
        match &self.content {
            ComplexContent::Extension { base, .. } => Some(TypeRef::Named(base.clone())),
            ComplexContent::Simple(SimpleContent::Type(t)) => Some(t.clone()),
            _ => None,
        }
    }

    /// Display name for messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(anonymous)")
    }
}

/// An atomic simple type defined by restriction
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    /// Name (None for anonymous types)
    pub name: Option<String>,
    /// Restriction base
    pub base: TypeRef,
    /// Facets in declared order
    pub facets: Vec<Facet>,
    /// Opaque annotations
    pub annotation: Option<Annotation>,
}

impl SimpleType {
    /// Create a restriction of `base` without facets
    pub fn new(name: Option<String>, base: TypeRef) -> Self {
        Self {
            name,
            base,
            facets: Vec::new(),
            annotation: None,
        }
    }

    /// Builder-style facet
    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    /// Enumeration values in declared order
    pub fn enumerations(&self) -> Vec<&str> {
        self.facets
            .iter()
            .filter_map(|f| match f {
                Facet::Enumeration(v) => Some(v.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Patterns in declared order
    pub fn patterns(&self) -> Vec<&str> {
        self.facets
            .iter()
            .filter_map(|f| match f {
                Facet::Pattern(v) => Some(v.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Display name for messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(anonymous)")
    }
}

/// A named type at the schema root
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    /// `xs:complexType`
    Complex(ComplexType),
    /// `xs:simpleType`
    Simple(SimpleType),
}

impl TypeDefinition {
    /// Whether this is a simple type
    pub fn is_simple(&self) -> bool {
        matches!(self, TypeDefinition::Simple(_))
    }
}

/// A construct the reader recognised but the converters cannot map
#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedConstruct {
    /// Construct category
    pub kind: ConstructKind,
    /// Component it was found in
    pub component: Option<String>,
    /// The construct as written
    pub detail: String,
}

/// Root of an XSD type graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// `targetNamespace`
    pub target_namespace: Option<String>,
    /// `elementFormDefault`
    pub element_form_default: Option<String>,
    /// `attributeFormDefault`
    pub attribute_form_default: Option<String>,
    /// Namespace declarations of the `xs:schema` element
    pub namespaces: NamespaceContext,
    /// Schema-level annotations (SERES markers live here)
    pub annotation: Option<Annotation>,
    /// Global element declarations
    pub elements: IndexMap<String, Element>,
    /// Global attribute declarations
    pub attributes: IndexMap<String, AttributeUse>,
    /// Named types, simple and complex share one symbol space
    pub types: IndexMap<String, TypeDefinition>,
    /// Constructs without a mapping, reported at conversion time
    pub unsupported: Vec<UnsupportedConstruct>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty schema with a target namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            target_namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    /// Resolve a named type
    pub fn resolve(&self, name: &str) -> Result<&TypeDefinition> {
        self.types.get(name).ok_or_else(|| Error::unresolved(name))
    }

    /// Resolve a global element
    pub fn resolve_element(&self, name: &str) -> Result<&Element> {
        self.elements.get(name).ok_or_else(|| Error::unresolved(name))
    }

    /// Add a named complex type
    pub fn add_complex_type(&mut self, complex_type: ComplexType) -> Result<()> {
        let name = complex_type
            .name
            .clone()
            .ok_or_else(|| Error::malformed("global complex type without a name"))?;
        self.insert_type(name, TypeDefinition::Complex(complex_type))
    }

    /// Add a named simple type
    pub fn add_simple_type(&mut self, simple_type: SimpleType) -> Result<()> {
        let name = simple_type
            .name
            .clone()
            .ok_or_else(|| Error::malformed("global simple type without a name"))?;
        self.insert_type(name, TypeDefinition::Simple(simple_type))
    }

    fn insert_type(&mut self, name: String, definition: TypeDefinition) -> Result<()> {
        if self.types.contains_key(&name) {
            return Err(Error::malformed(format!("type '{}' is declared more than once", name)));
        }
        self.types.insert(name, definition);
        Ok(())
    }

    /// Add a global element
    pub fn add_element(&mut self, element: Element) -> Result<()> {
        if self.elements.contains_key(&element.name) {
            return Err(Error::malformed(format!(
                "element '{}' is declared more than once",
                element.name
            )));
        }
        self.elements.insert(element.name.clone(), element);
        Ok(())
    }

    /// Iterate named complex types in declaration order
    pub fn complex_types(&self) -> impl Iterator<Item = (&str, &ComplexType)> {
        self.types.iter().filter_map(|(name, def)| match def {
            TypeDefinition::Complex(ct) => Some((name.as_str(), ct)),
            _ => None,
        })
    }

    /// Iterate named simple types in declaration order
    pub fn simple_types(&self) -> impl Iterator<Item = (&str, &SimpleType)> {
        self.types.iter().filter_map(|(name, def)| match def {
            TypeDefinition::Simple(st) => Some((name.as_str(), st)),
            _ => None,
        })
    }

    /// Whether the schema was generated by SERES (`XSLT-skriptnavn` marker)
    pub fn is_seres(&self) -> bool {
        let marker = QName::namespaced(crate::XSD_NAMESPACE, crate::SERES_SCRIPT_MARKER);
        self.annotation
            .as_ref()
            .and_then(|a| a.marker(&marker))
            .map(|value| value == crate::SERES_GENERATOR)
            .unwrap_or(false)
    }

    /// Check the graph invariants: every reference resolves, every
    /// occurrence range is valid and extension bases are complex types.
    pub fn check(&self) -> Result<()> {
        for element in self.elements.values() {
            self.check_element(element)?;
        }
        for attribute in self.attributes.values() {
            self.check_simple_content(&attribute.content)?;
        }
        for definition in self.types.values() {
            match definition {
                TypeDefinition::Complex(ct) => self.check_complex(ct)?,
                TypeDefinition::Simple(st) => self.check_type_ref(&st.base)?,
            }
        }
        Ok(())
    }

    fn check_type_ref(&self, type_ref: &TypeRef) -> Result<()> {
        match type_ref {
            TypeRef::Named(name) => self.resolve(name).map(|_| ()),
            TypeRef::Builtin(_) => Ok(()),
        }
    }

    fn check_simple_content(&self, content: &SimpleContent) -> Result<()> {
        match content {
            SimpleContent::Type(t) => {
                self.check_type_ref(t)?;
                match t {
                    TypeRef::Named(name) if !self.resolve(name)?.is_simple() => Err(
                        Error::malformed(format!("'{}' is not a simple type", name)),
                    ),
                    _ => Ok(()),
                }
            }
            SimpleContent::Anonymous(st) => self.check_type_ref(&st.base),
            SimpleContent::Unspecified => Ok(()),
        }
    }

    fn check_element(&self, element: &Element) -> Result<()> {
        if !element.occurs.is_valid() {
            return Err(Error::malformed(format!(
                "element '{}' has invalid occurs {}",
                element.name, element.occurs
            )));
        }
        match &element.content {
            ElementContent::Type(t) => self.check_type_ref(t),
            ElementContent::Complex(ct) => self.check_complex(ct),
            ElementContent::Simple(st) => self.check_type_ref(&st.base),
            ElementContent::Unspecified => Ok(()),
        }
    }

    fn check_complex(&self, complex_type: &ComplexType) -> Result<()> {
        match &complex_type.content {
            ComplexContent::Extension { base, .. } => match self.resolve(base)? {
                TypeDefinition::Complex(_) => {}
                TypeDefinition::Simple(_) => {
                    return Err(Error::malformed(format!(
                        "complex content of '{}' extends simple type '{}'",
                        complex_type.display_name(),
                        base
                    )))
                }
            },
            ComplexContent::Simple(content) => self.check_simple_content(content)?,
            _ => {}
        }
        if let Some(group) = complex_type.group() {
            self.check_group(group)?;
        }
        for attribute in &complex_type.attributes {
            if attribute.is_ref && !self.attributes.contains_key(&attribute.name) {
                return Err(Error::unresolved(attribute.name.clone()));
            }
            self.check_simple_content(&attribute.content)?;
        }
        Ok(())
    }

    fn check_group(&self, group: &ModelGroup) -> Result<()> {
        if !group.occurs.is_valid() {
            return Err(Error::malformed(format!(
                "{} has invalid occurs {}",
                group.compositor, group.occurs
            )));
        }
        for particle in &group.particles {
            match particle {
                Particle::Element(e) => self.check_element(e)?,
                Particle::ElementRef(r) => {
                    self.resolve_element(&r.name)?;
                    if !r.occurs.is_valid() {
                        return Err(Error::malformed(format!(
                            "reference to '{}' has invalid occurs {}",
                            r.name, r.occurs
                        )));
                    }
                }
                Particle::Group(g) => self.check_group(g)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_parse() {
        assert_eq!(Occurs::parse(None, None).unwrap(), Occurs::once());
        assert_eq!(
            Occurs::parse(Some("0"), Some("unbounded")).unwrap(),
            Occurs::zero_or_more()
        );
        assert!(Occurs::parse(Some("3"), Some("2")).is_err());
        assert!(Occurs::parse(Some("2"), None).is_err());
        assert!(Occurs::parse(Some("-1"), None).is_err());
    }

    #[test]
    fn test_occurs_repetition() {
        assert!(!Occurs::once().is_repeated());
        assert!(!Occurs::optional().is_repeated());
        assert!(Occurs::zero_or_more().is_repeated());
        assert!(Occurs::new(0, Some(0)).is_repeated());
    }

    #[test]
    fn test_white_space_normalize() {
        assert_eq!(WhiteSpace::Replace.normalize("a\tb\nc"), "a b c");
        assert_eq!(WhiteSpace::Collapse.normalize("  a \t b  "), "a b");
        assert_eq!(WhiteSpace::Preserve.normalize(" a "), " a ");
    }

    #[test]
    fn test_facet_from_name_value() {
        assert_eq!(
            Facet::from_name_value("length", "5").unwrap(),
            Some(Facet::Length(5))
        );
        assert_eq!(
            Facet::from_name_value("whiteSpace", "collapse").unwrap(),
            Some(Facet::WhiteSpace(WhiteSpace::Collapse))
        );
        assert!(Facet::from_name_value("maxLength", "x").is_err());
        assert_eq!(Facet::from_name_value("assertion", "x").unwrap(), None);
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut schema = Schema::new();
        schema
            .add_simple_type(SimpleType::new(Some("T".into()), TypeRef::Builtin(BuiltinType::String)))
            .unwrap();
        let result = schema.add_complex_type(ComplexType::new(Some("T".into()), ComplexContent::Empty));
        assert!(matches!(result, Err(Error::MalformedSchema(_))));
    }

    #[test]
    fn test_check_reports_unresolved_type() {
        let mut schema = Schema::new();
        schema
            .add_element(Element::typed("root", TypeRef::Named("Missing".into())))
            .unwrap();
        match schema.check() {
            Err(Error::UnresolvedReference { name }) => assert_eq!(name, "Missing"),
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_seres_marker() {
        let mut schema = Schema::new();
        assert!(!schema.is_seres());

        schema.annotation = Some(Annotation {
            attributes: vec![],
            documentation: vec![Documentation {
                lang: None,
                text: None,
                markers: vec![AnnotationEntry::new(
                    QName::namespaced(crate::XSD_NAMESPACE, "XSLT-skriptnavn"),
                    "SERES_XSD_GEN",
                )],
            }],
        });
        assert!(schema.is_seres());
    }
}
