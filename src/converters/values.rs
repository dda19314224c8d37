//! Lexical XSD values and their JSON counterparts
//!
//! Facet values, defaults and fixed values are strings in XSD. In JSON they
//! are typed according to the built-in type they constrain, so an `xs:int`
//! enumeration `"42"` becomes the JSON number `42`.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Number, Value};

use crate::error::{Error, Result};
use crate::xsd::{BuiltinType, Schema, TypeDefinition, TypeRef};

/// Typed JSON value of a lexical XSD value. Values that do not fit the
/// built-in's value space stay strings.
pub fn lexical_to_json(builtin: BuiltinType, lexical: &str) -> Value {
    if builtin.is_numeric() {
        if let Some(number) = number_from_lexical(lexical) {
            return Value::Number(number);
        }
    } else if builtin == BuiltinType::Boolean {
        match lexical.trim() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
    }
    Value::String(lexical.to_string())
}

/// Lexical form of a scalar JSON value
pub fn json_to_lexical(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// JSON number for a numeric lexical value: integral values become JSON
/// integers, everything else a float. `None` when the float would not hold
/// the value exactly.
pub fn number_from_lexical(lexical: &str) -> Option<Number> {
    let trimmed = lexical.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Some(Number::from(u));
    }
    let decimal = Decimal::from_str(trimmed).ok()?;
    let f: f64 = decimal.to_string().parse().ok()?;
    let number = Number::from_f64(f)?;
    let exact = canonical_decimal(&number.to_string())? == canonical_decimal(trimmed)?;
    exact.then_some(number)
}

/// Canonical form of a numeric lexical value (`"10.50"` and `"10.5"` agree)
pub fn canonical_decimal(lexical: &str) -> Option<String> {
    Decimal::from_str(lexical.trim())
        .or_else(|_| Decimal::from_scientific(lexical.trim()))
        .ok()
        .map(|d| d.normalize().to_string())
}

/// `fractionDigits` equivalent of a `multipleOf`: `0.01` maps to 2,
/// anything that is not a power of ten below or at one has no equivalent
pub fn fraction_digits_of(multiple_of: &Number) -> Option<u32> {
    let text = multiple_of.to_string();
    let decimal = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?
        .normalize();
    (decimal.mantissa() == 1).then(|| decimal.scale())
}

/// Pattern synthesized for integer types carrying `totalDigits`
pub fn total_digits_pattern(digits: u32) -> String {
    format!("^-?[0-9]{{1,{}}}$", digits)
}

/// The built-in type a simple type reference ultimately restricts
pub fn ultimate_builtin(schema: &Schema, type_ref: &TypeRef) -> Result<BuiltinType> {
    let mut seen = HashSet::new();
    let mut current = type_ref;
    loop {
        match current {
            TypeRef::Builtin(builtin) => return Ok(*builtin),
            TypeRef::Named(name) => {
                if !seen.insert(name.as_str()) {
                    return Err(Error::malformed(format!(
                        "simple type '{}' is derived from itself",
                        name
                    )));
                }
                match schema.resolve(name)? {
                    TypeDefinition::Simple(simple) => current = &simple.base,
                    TypeDefinition::Complex(_) => {
                        return Err(Error::malformed(format!("'{}' is not a simple type", name)))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsd::{Facet, SimpleType};
    use serde_json::json;

    #[test]
    fn test_lexical_to_json() {
        assert_eq!(lexical_to_json(BuiltinType::Int, "42"), json!(42));
        assert_eq!(lexical_to_json(BuiltinType::Decimal, "10.50"), json!(10.5));
        assert_eq!(lexical_to_json(BuiltinType::Boolean, "true"), json!(true));
        assert_eq!(lexical_to_json(BuiltinType::Boolean, "1"), json!("1"));
        assert_eq!(lexical_to_json(BuiltinType::Boolean, "0"), json!("0"));
        assert_eq!(lexical_to_json(BuiltinType::String, "42"), json!("42"));
        assert_eq!(lexical_to_json(BuiltinType::Double, "INF"), json!("INF"));
    }

    #[test]
    fn test_number_from_lexical_is_exact() {
        assert_eq!(number_from_lexical("10.50"), Number::from_f64(10.5));
        assert_eq!(number_from_lexical("-7"), Some(Number::from(-7)));
        assert_eq!(number_from_lexical("12345678901234567.89"), None);
        assert_eq!(number_from_lexical("99999999999999999999999"), None);
        assert_eq!(number_from_lexical("0.1000000000000000055511151231257827"), None);
        assert_eq!(lexical_to_json(BuiltinType::Integer, "99999999999999999999999"), json!("99999999999999999999999"));
    }

    #[test]
    fn test_json_to_lexical() {
        assert_eq!(json_to_lexical(&json!(42)).as_deref(), Some("42"));
        assert_eq!(json_to_lexical(&json!("a")).as_deref(), Some("a"));
        assert_eq!(json_to_lexical(&json!(false)).as_deref(), Some("false"));
        assert_eq!(json_to_lexical(&json!(null)), None);
    }

    #[test]
    fn test_canonical_decimal() {
        assert_eq!(canonical_decimal("10.50"), canonical_decimal("10.5"));
        assert_eq!(canonical_decimal("007").as_deref(), Some("7"));
        assert_eq!(canonical_decimal("abc"), None);
    }

    #[test]
    fn test_fraction_digits_of() {
        assert_eq!(fraction_digits_of(&Number::from_f64(0.01).unwrap()), Some(2));
        assert_eq!(fraction_digits_of(&Number::from(1)), Some(0));
        assert_eq!(fraction_digits_of(&Number::from_f64(0.5).unwrap()), None);
        assert_eq!(fraction_digits_of(&Number::from(10)), None);
    }

    #[test]
    fn test_ultimate_builtin_follows_chain() {
        let mut schema = Schema::new();
        schema
            .add_simple_type(SimpleType::new(Some("A".into()), TypeRef::Builtin(BuiltinType::Short)))
            .unwrap();
        schema
            .add_simple_type(
                SimpleType::new(Some("B".into()), TypeRef::Named("A".into()))
                    .with_facet(Facet::MinInclusive("0".into())),
            )
            .unwrap();

        assert_eq!(
            ultimate_builtin(&schema, &TypeRef::Named("B".into())).unwrap(),
            BuiltinType::Short
        );
        assert!(ultimate_builtin(&schema, &TypeRef::Named("C".into())).is_err());
    }
}
