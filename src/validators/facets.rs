//! Constraining facets and simple type derivation chains
//!
//! A simple type is checked layer by layer: the value is normalized once with
//! the nearest `whiteSpace` facet, validated against the built-in at the root
//! of the chain, then against the facets of every restriction step.
//! Patterns and enumerations of one step are alternatives; steps combine.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{Error, Result, ValidationError};
use crate::xsd::{
    BuiltinType, ComplexContent, Facet, Schema, SimpleContent, SimpleType, TypeDefinition, TypeRef,
    WhiteSpace,
};

use super::builtins::{
    decode_base64, default_white_space, parse_date, parse_date_time, parse_time, validate_builtin,
};

/// Restriction steps of a simple type, most derived first
#[derive(Debug)]
struct Chain<'a> {
    builtin: BuiltinType,
    layers: Vec<&'a SimpleType>,
}

impl<'a> Chain<'a> {
    fn of(schema: &'a Schema, simple_type: &'a SimpleType) -> Result<Self> {
        let mut layers = vec![simple_type];
        let mut base = &simple_type.base;

        loop {
            match base {
                TypeRef::Builtin(builtin) => {
                    return Ok(Self {
                        builtin: *builtin,
                        layers,
                    })
                }
                TypeRef::Named(name) => match schema.resolve(name)? {
                    TypeDefinition::Simple(next) => {
                        if layers.len() > schema.types.len() {
                            return Err(Error::malformed(format!(
                                "simple type '{}' derives from itself",
                                simple_type.display_name()
                            )));
                        }
                        layers.push(next);
                        base = &next.base;
                    }
                    TypeDefinition::Complex(_) => {
                        return Err(Error::malformed(format!("'{}' is not a simple type", name)))
                    }
                },
            }
        }
    }

    fn white_space(&self) -> WhiteSpace {
        self.layers
            .iter()
            .flat_map(|layer| layer.facets.iter())
            .find_map(|facet| match facet {
                Facet::WhiteSpace(ws) => Some(*ws),
                _ => None,
            })
            .unwrap_or_else(|| default_white_space(self.builtin))
    }
}

/// Normalize a value the way the given simple content would before checking it
pub fn normalize_value(schema: &Schema, content: &SimpleContent, value: &str) -> Result<String> {
    match content {
        SimpleContent::Unspecified => Ok(value.to_string()),
        SimpleContent::Type(TypeRef::Builtin(builtin)) => {
            Ok(default_white_space(*builtin).normalize(value))
        }
        SimpleContent::Type(TypeRef::Named(name)) => match schema.resolve(name)? {
            TypeDefinition::Simple(st) => Ok(Chain::of(schema, st)?.white_space().normalize(value)),
            TypeDefinition::Complex(ct) => match &ct.content {
                ComplexContent::Simple(inner) => normalize_value(schema, inner, value),
                _ => Err(Error::malformed(format!("'{}' is not a simple type", name))),
            },
        },
        SimpleContent::Anonymous(st) => Ok(Chain::of(schema, st)?.white_space().normalize(value)),
    }
}

/// Check a lexical value against a type reference
pub fn validate_type_ref(schema: &Schema, type_ref: &TypeRef, value: &str) -> Result<()> {
    match type_ref {
        TypeRef::Builtin(builtin) => {
            validate_builtin(*builtin, &default_white_space(*builtin).normalize(value))
        }
        TypeRef::Named(name) => match schema.resolve(name)? {
            TypeDefinition::Simple(st) => validate_simple_type(schema, st, value),
            // simpleContent: the text follows the content type
            TypeDefinition::Complex(ct) => match &ct.content {
                ComplexContent::Simple(inner) => validate_simple_content(schema, inner, value),
                _ => Err(Error::malformed(format!("'{}' is not a simple type", name))),
            },
        },
    }
}

/// Check a lexical value against the type of an attribute or of simple content
pub fn validate_simple_content(schema: &Schema, content: &SimpleContent, value: &str) -> Result<()> {
    match content {
        SimpleContent::Unspecified => Ok(()),
        SimpleContent::Type(type_ref) => validate_type_ref(schema, type_ref, value),
        SimpleContent::Anonymous(st) => validate_simple_type(schema, st, value),
    }
}

/// Check a lexical value against a simple type and all its restriction steps
pub fn validate_simple_type(schema: &Schema, simple_type: &SimpleType, value: &str) -> Result<()> {
    let chain = Chain::of(schema, simple_type)?;
    let normalized = chain.white_space().normalize(value);

    validate_builtin(chain.builtin, &normalized)?;
    for layer in &chain.layers {
        check_facets(chain.builtin, &layer.facets, &normalized)
            .map_err(|e| with_type_context(e, layer.display_name()))?;
    }
    Ok(())
}

fn with_type_context(error: Error, type_name: &str) -> Error {
    match error {
        Error::Validation(v) if v.reason.is_none() => {
            Error::Validation(v.with_reason(format!("restriction of '{}'", type_name)))
        }
        other => other,
    }
}

// =============================================================================
// Facet checks
// =============================================================================

fn facet_error(facet: &Facet, value: &str, message: &str) -> Error {
    Error::Validation(
        ValidationError::new(format!("value '{}' {}", value, message)).with_reason(facet.to_string()),
    )
}

/// Check one restriction step's facets against a normalized value
pub fn check_facets(builtin: BuiltinType, facets: &[Facet], value: &str) -> Result<()> {
    let mut patterns = Vec::new();
    let mut enumerations = Vec::new();

    for facet in facets {
        match facet {
            Facet::Length(n) => {
                if length_of(builtin, value) != *n {
                    return Err(facet_error(facet, value, &format!("must have length {}", n)));
                }
            }
            Facet::MinLength(n) => {
                if length_of(builtin, value) < *n {
                    return Err(facet_error(facet, value, &format!("is shorter than {}", n)));
                }
            }
            Facet::MaxLength(n) => {
                if length_of(builtin, value) > *n {
                    return Err(facet_error(facet, value, &format!("is longer than {}", n)));
                }
            }
            Facet::MinInclusive(bound) => {
                if compare(builtin, value, bound) == Some(Ordering::Less) {
                    return Err(facet_error(facet, value, &format!("is less than {}", bound)));
                }
            }
            Facet::MaxInclusive(bound) => {
                if compare(builtin, value, bound) == Some(Ordering::Greater) {
                    return Err(facet_error(facet, value, &format!("is greater than {}", bound)));
                }
            }
            Facet::MinExclusive(bound) => {
                if matches!(compare(builtin, value, bound), Some(Ordering::Less | Ordering::Equal)) {
                    return Err(facet_error(facet, value, &format!("must be greater than {}", bound)));
                }
            }
            Facet::MaxExclusive(bound) => {
                if matches!(compare(builtin, value, bound), Some(Ordering::Greater | Ordering::Equal)) {
                    return Err(facet_error(facet, value, &format!("must be less than {}", bound)));
                }
            }
            Facet::TotalDigits(n) => {
                if let Ok(d) = Decimal::from_str(value) {
                    if total_digits(&d) > *n {
                        return Err(facet_error(facet, value, &format!("has more than {} digits", n)));
                    }
                }
            }
            Facet::FractionDigits(n) => {
                if let Ok(d) = Decimal::from_str(value) {
                    if d.normalize().scale() > *n {
                        return Err(facet_error(
                            facet,
                            value,
                            &format!("has more than {} fraction digits", n),
                        ));
                    }
                }
            }
            Facet::Pattern(p) => patterns.push(p.as_str()),
            Facet::Enumeration(e) => enumerations.push(e.as_str()),
            Facet::WhiteSpace(_) => {}
        }
    }

    if !patterns.is_empty() {
        let mut matched = false;
        for pattern in &patterns {
            if compile_pattern(pattern)?.is_match(value) {
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(Error::Validation(
                ValidationError::new(format!("value '{}' does not match the pattern", value))
                    .with_reason(format!("pattern={}", patterns.join(" | "))),
            ));
        }
    }

    if !enumerations.is_empty() && !enumerations.iter().any(|e| same_value(builtin, value, e)) {
        return Err(Error::Validation(
            ValidationError::new(format!("value '{}' is not one of the enumerated values", value))
                .with_reason(format!("enumeration=[{}]", enumerations.join(", "))),
        ));
    }

    Ok(())
}

fn length_of(builtin: BuiltinType, value: &str) -> u64 {
    match builtin {
        BuiltinType::HexBinary => (value.len() / 2) as u64,
        BuiltinType::Base64Binary => decode_base64(value).map(|b| b.len()).unwrap_or(0) as u64,
        _ => value.chars().count() as u64,
    }
}

fn total_digits(d: &Decimal) -> u32 {
    let digits = d.normalize().mantissa().unsigned_abs().to_string();
    digits.len() as u32
}

/// Order two values in the value space of `builtin`; None if incomparable
fn compare(builtin: BuiltinType, a: &str, b: &str) -> Option<Ordering> {
    match builtin {
        BuiltinType::Float | BuiltinType::Double => {
            let (a, b) = (parse_float(a)?, parse_float(b)?);
            a.partial_cmp(&b)
        }
        _ if builtin.is_numeric() => Decimal::from_str(a)
            .ok()?
            .partial_cmp(&Decimal::from_str(b).ok()?),
        BuiltinType::Date => parse_date(a)?.partial_cmp(&parse_date(b)?),
        BuiltinType::DateTime => parse_date_time(a)?.partial_cmp(&parse_date_time(b)?),
        BuiltinType::Time => parse_time(a)?.partial_cmp(&parse_time(b)?),
        // gYear and friends: same-width lexical forms order correctly
        BuiltinType::GYear | BuiltinType::GYearMonth | BuiltinType::GMonthDay
        | BuiltinType::GMonth | BuiltinType::GDay
            if a.len() == b.len() =>
        {
            Some(a.cmp(b))
        }
        _ => None,
    }
}

fn parse_float(value: &str) -> Option<f64> {
    match value {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => None,
        other => other.parse().ok(),
    }
}

fn same_value(builtin: BuiltinType, a: &str, b: &str) -> bool {
    a == b || compare(builtin, a, b) == Some(Ordering::Equal)
}

// =============================================================================
// Patterns
// =============================================================================

/// Compile an XSD pattern, anchored at both ends
pub fn compile_pattern(pattern: &str) -> Result<regex::Regex> {
    let translated = translate_pattern(pattern);
    regex::Regex::new(&format!("^(?:{})$", translated)).map_err(|e| {
        Error::malformed(format!("pattern '{}' is not a supported regular expression: {}", pattern, e))
    })
}

/// Rewrite the XSD-only escapes `\i`, `\I`, `\c` and `\C`
fn translate_pattern(pattern: &str) -> String {
    const NAME_START: &str = r"\p{L}_:";
    const NAME_CHAR: &str = r"\p{L}\p{N}._:\-";

    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('i') => out.push_str(&format!("[{}]", NAME_START)),
            Some('I') => out.push_str(&format!("[^{}]", NAME_START)),
            Some('c') => out.push_str(&format!("[{}]", NAME_CHAR)),
            Some('C') => out.push_str(&format!("[^{}]", NAME_CHAR)),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::SimpleType;

    fn restriction(base: BuiltinType, facets: Vec<Facet>) -> SimpleType {
        let mut st = SimpleType::new(Some("T".to_string()), TypeRef::Builtin(base));
        st.facets = facets;
        st
    }

    #[test]
    fn test_length_facets() {
        let schema = Schema::new();
        let st = restriction(BuiltinType::String, vec![Facet::Length(4)]);
        assert!(validate_simple_type(&schema, &st, "abcd").is_ok());
        assert!(validate_simple_type(&schema, &st, "abc").is_err());
        assert!(validate_simple_type(&schema, &st, "æøåé").is_ok());

        let hex = restriction(BuiltinType::HexBinary, vec![Facet::MaxLength(2)]);
        assert!(validate_simple_type(&schema, &hex, "0A0B").is_ok());
        assert!(validate_simple_type(&schema, &hex, "0A0B0C").is_err());
    }

    #[test]
    fn test_numeric_bounds() {
        let schema = Schema::new();
        let st = restriction(
            BuiltinType::Decimal,
            vec![
                Facet::MinInclusive("0".to_string()),
                Facet::MaxExclusive("100.5".to_string()),
            ],
        );
        assert!(validate_simple_type(&schema, &st, "0").is_ok());
        assert!(validate_simple_type(&schema, &st, "100.49").is_ok());
        assert!(validate_simple_type(&schema, &st, "100.5").is_err());
        assert!(validate_simple_type(&schema, &st, "-0.1").is_err());
    }

    #[test]
    fn test_digits() {
        let schema = Schema::new();
        let st = restriction(
            BuiltinType::Decimal,
            vec![Facet::TotalDigits(4), Facet::FractionDigits(2)],
        );
        assert!(validate_simple_type(&schema, &st, "12.34").is_ok());
        assert!(validate_simple_type(&schema, &st, "12.340").is_ok());
        assert!(validate_simple_type(&schema, &st, "123.45").is_err());
        assert!(validate_simple_type(&schema, &st, "1.234").is_err());
    }

    #[test]
    fn test_enumeration_compares_values() {
        let schema = Schema::new();
        let st = restriction(
            BuiltinType::Decimal,
            vec![
                Facet::Enumeration("1.0".to_string()),
                Facet::Enumeration("2".to_string()),
            ],
        );
        assert!(validate_simple_type(&schema, &st, "1").is_ok());
        assert!(validate_simple_type(&schema, &st, "2.00").is_ok());
        assert!(validate_simple_type(&schema, &st, "3").is_err());
    }

    #[test]
    fn test_patterns_are_anchored_alternatives() {
        let schema = Schema::new();
        let st = restriction(
            BuiltinType::String,
            vec![
                Facet::Pattern(r"\d{4}".to_string()),
                Facet::Pattern("[A-Z]{2}".to_string()),
            ],
        );
        assert!(validate_simple_type(&schema, &st, "1234").is_ok());
        assert!(validate_simple_type(&schema, &st, "NO").is_ok());
        assert!(validate_simple_type(&schema, &st, "12345").is_err());
        assert!(compile_pattern(r"\i\c*").unwrap().is_match("orgnr.1"));
    }

    #[test]
    fn test_chain_applies_every_step() {
        let mut schema = Schema::new();
        schema
            .add_simple_type(restriction(BuiltinType::Integer, vec![Facet::MaxInclusive("10".to_string())]))
            .unwrap();
        let derived = SimpleType::new(Some("Small".to_string()), TypeRef::Named("T".to_string()))
            .with_facet(Facet::MinInclusive("5".to_string()));

        assert!(validate_simple_type(&schema, &derived, " 7 ").is_ok());
        assert!(validate_simple_type(&schema, &derived, "4").is_err());
        assert!(validate_simple_type(&schema, &derived, "11").is_err());
        assert!(validate_simple_type(&schema, &derived, "x").is_err());
    }

    #[test]
    fn test_white_space_facet_wins() {
        let schema = Schema::new();
        let st = restriction(
            BuiltinType::String,
            vec![Facet::WhiteSpace(WhiteSpace::Collapse), Facet::Length(3)],
        );
        assert!(validate_simple_type(&schema, &st, "  abc \n").is_ok());
        assert_eq!(
            normalize_value(&schema, &SimpleContent::Anonymous(Box::new(st)), " a  b ").unwrap(),
            "a b"
        );
    }

    #[test]
    fn test_date_bounds() {
        let schema = Schema::new();
        let st = restriction(BuiltinType::Date, vec![Facet::MinInclusive("2000-01-01".to_string())]);
        assert!(validate_simple_type(&schema, &st, "2024-05-17").is_ok());
        assert!(validate_simple_type(&schema, &st, "1999-12-31").is_err());
    }
}
