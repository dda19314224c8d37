//! Lexical spaces of the XSD built-in types
//!
//! Checks that a (white space normalized) lexical value belongs to a
//! built-in type. Values are checked, not converted.

use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{Error, Result, ValidationError};
use crate::names::{is_valid_ncname, is_valid_qname};
use crate::xsd::{BuiltinType, WhiteSpace};

// =============================================================================
// Patterns
// =============================================================================

lazy_static::lazy_static! {
    static ref LANGUAGE: regex::Regex = regex::Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap();
    static ref NAME: regex::Regex = regex::Regex::new(r"^[\p{L}_:][\p{L}\p{N}._:\-]*$").unwrap();
    static ref NMTOKEN: regex::Regex = regex::Regex::new(r"^[\p{L}\p{N}._:\-]+$").unwrap();
    static ref HEX_BINARY: regex::Regex = regex::Regex::new(r"^([0-9a-fA-F]{2})*$").unwrap();
    static ref DURATION: regex::Regex = regex::Regex::new(
        r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$"
    ).unwrap();
    static ref TIMEZONE: regex::Regex = regex::Regex::new(r"(Z|[+-]\d{2}:\d{2})$").unwrap();
    static ref GYEAR: regex::Regex = regex::Regex::new(r"^-?\d{4,}$").unwrap();
    static ref GYEAR_MONTH: regex::Regex = regex::Regex::new(r"^-?\d{4,}-(0[1-9]|1[0-2])$").unwrap();
    static ref GMONTH: regex::Regex = regex::Regex::new(r"^--(0[1-9]|1[0-2])$").unwrap();
    static ref GMONTH_DAY: regex::Regex = regex::Regex::new(r"^--(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").unwrap();
    static ref GDAY: regex::Regex = regex::Regex::new(r"^---(0[1-9]|[12]\d|3[01])$").unwrap();
}

fn invalid(builtin: BuiltinType, value: &str) -> Error {
    Error::Validation(
        ValidationError::new(format!("'{}' is not a valid {}", value, builtin))
    )
}

/// White space handling a built-in applies before its lexical check
pub fn default_white_space(builtin: BuiltinType) -> WhiteSpace {
    match builtin {
        BuiltinType::String | BuiltinType::AnySimpleType | BuiltinType::AnyType => WhiteSpace::Preserve,
        BuiltinType::NormalizedString => WhiteSpace::Replace,
        _ => WhiteSpace::Collapse,
    }
}

/// Check a lexical value against a built-in type
pub fn validate_builtin(builtin: BuiltinType, value: &str) -> Result<()> {
    use BuiltinType::*;

    let ok = match builtin {
        AnyType | AnySimpleType | String => true,
        NormalizedString => !value.contains(['\r', '\n', '\t']),
        Token => !value.starts_with(' ') && !value.ends_with(' ') && !value.contains("  "),
        Language => LANGUAGE.is_match(value),
        Name => NAME.is_match(value),
        NcName | Id | IdRef => is_valid_ncname(value),
        NmToken => NMTOKEN.is_match(value),
        QName => is_valid_qname(value),
        AnyUri => is_any_uri(value),
        Boolean => matches!(value, "true" | "false" | "1" | "0"),
        Decimal => is_decimal(value),
        Float | Double => is_float(value),
        Integer | Long | Int | Short | Byte | NonNegativeInteger | PositiveInteger
        | NonPositiveInteger | NegativeInteger | UnsignedLong | UnsignedInt | UnsignedShort
        | UnsignedByte => return validate_integer(builtin, value),
        Date => parse_date(value).is_some(),
        DateTime => parse_date_time(value).is_some(),
        Time => parse_time(value).is_some(),
        Duration => DURATION.is_match(value) && !value.ends_with('P') && !value.ends_with('T'),
        GYear => GYEAR.is_match(strip_timezone(value)),
        GYearMonth => GYEAR_MONTH.is_match(strip_timezone(value)),
        GMonth => GMONTH.is_match(strip_timezone(value)),
        GMonthDay => GMONTH_DAY.is_match(strip_timezone(value)),
        GDay => GDAY.is_match(strip_timezone(value)),
        Base64Binary => decode_base64(value).is_some(),
        HexBinary => HEX_BINARY.is_match(value),
    };

    if ok {
        Ok(())
    } else {
        Err(invalid(builtin, value))
    }
}

// =============================================================================
// Numbers
// =============================================================================

fn is_decimal(value: &str) -> bool {
    // Exponents are not part of the xs:decimal lexical space
    !value.contains(['e', 'E']) && Decimal::from_str(value).is_ok()
}

fn is_float(value: &str) -> bool {
    matches!(value, "NaN" | "INF" | "-INF" | "+INF")
        || (!value.contains(['i', 'I', 'n', 'N']) && value.parse::<f64>().is_ok())
}

/// Inclusive value range of an integer built-in
fn integer_range(builtin: BuiltinType) -> (Option<i128>, Option<i128>) {
    use BuiltinType::*;
    match builtin {
        Long => (Some(i64::MIN as i128), Some(i64::MAX as i128)),
        Int => (Some(i32::MIN as i128), Some(i32::MAX as i128)),
        Short => (Some(i16::MIN as i128), Some(i16::MAX as i128)),
        Byte => (Some(i8::MIN as i128), Some(i8::MAX as i128)),
        NonNegativeInteger => (Some(0), None),
        PositiveInteger => (Some(1), None),
        NonPositiveInteger => (None, Some(0)),
        NegativeInteger => (None, Some(-1)),
        UnsignedLong => (Some(0), Some(u64::MAX as i128)),
        UnsignedInt => (Some(0), Some(u32::MAX as i128)),
        UnsignedShort => (Some(0), Some(u16::MAX as i128)),
        UnsignedByte => (Some(0), Some(u8::MAX as i128)),
        _ => (None, None),
    }
}

fn validate_integer(builtin: BuiltinType, value: &str) -> Result<()> {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(builtin, value));
    }

    // Out-of-range literals of unbounded types are still integers
    let parsed = match value.parse::<i128>() {
        Ok(n) => n,
        Err(_) if integer_range(builtin) == (None, None) => return Ok(()),
        Err(_) => return Err(out_of_range(builtin, value)),
    };

    let (min, max) = integer_range(builtin);
    if min.map_or(false, |min| parsed < min) || max.map_or(false, |max| parsed > max) {
        return Err(out_of_range(builtin, value));
    }
    Ok(())
}

fn out_of_range(builtin: BuiltinType, value: &str) -> Error {
    Error::Validation(
        ValidationError::new(format!("'{}' is out of range for {}", value, builtin))
    )
}

// =============================================================================
// Dates and times
// =============================================================================

fn strip_timezone(value: &str) -> &str {
    match TIMEZONE.find(value) {
        Some(m) if m.start() > 0 => &value[..m.start()],
        _ => value,
    }
}

/// Parse an `xs:date`, timezone ignored
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(strip_timezone(value), "%Y-%m-%d").ok()
}

/// Parse an `xs:dateTime`, timezone ignored
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let local = strip_timezone(value);
    NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            // 24:00:00 is the end of the day
            let (date, time) = local.split_once('T')?;
            (time == "24:00:00").then(|| parse_date(date)?.succ_opt()?.and_hms_opt(0, 0, 0))?
        })
}

/// Parse an `xs:time`, timezone ignored
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(strip_timezone(value), "%H:%M:%S%.f").ok()
}

// =============================================================================
// Binary and URIs
// =============================================================================

/// Decode an `xs:base64Binary` value
pub fn decode_base64(value: &str) -> Option<Vec<u8>> {
    let cleaned: std::string::String = value.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(cleaned).ok()
}

fn is_any_uri(value: &str) -> bool {
    if value.contains(['\n', '\r', '\t']) {
        return false;
    }
    // Absolute URIs must parse; relative references are accepted as written
    match value.split_once(':') {
        Some((scheme, _)) if !scheme.is_empty() && !scheme.contains(['/', '?', '#']) => {
            url::Url::parse(value).is_ok()
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ranges() {
        assert!(validate_builtin(BuiltinType::Byte, "127").is_ok());
        assert!(validate_builtin(BuiltinType::Byte, "128").is_err());
        assert!(validate_builtin(BuiltinType::UnsignedInt, "-1").is_err());
        assert!(validate_builtin(BuiltinType::PositiveInteger, "0").is_err());
        assert!(validate_builtin(BuiltinType::Integer, "123456789012345678901234567890123456789012").is_ok());
        assert!(validate_builtin(BuiltinType::Int, "+42").is_ok());
        assert!(validate_builtin(BuiltinType::Int, "4.2").is_err());
    }

    #[test]
    fn test_decimal_and_float() {
        assert!(validate_builtin(BuiltinType::Decimal, "-10.50").is_ok());
        assert!(validate_builtin(BuiltinType::Decimal, "1e3").is_err());
        assert!(validate_builtin(BuiltinType::Double, "1e3").is_ok());
        assert!(validate_builtin(BuiltinType::Float, "INF").is_ok());
        assert!(validate_builtin(BuiltinType::Float, "inf").is_err());
    }

    #[test]
    fn test_boolean() {
        for value in ["true", "false", "1", "0"] {
            assert!(validate_builtin(BuiltinType::Boolean, value).is_ok());
        }
        assert!(validate_builtin(BuiltinType::Boolean, "yes").is_err());
    }

    #[test]
    fn test_dates() {
        assert!(validate_builtin(BuiltinType::Date, "2024-02-29").is_ok());
        assert!(validate_builtin(BuiltinType::Date, "2023-02-29").is_err());
        assert!(validate_builtin(BuiltinType::Date, "2024-01-01Z").is_ok());
        assert!(validate_builtin(BuiltinType::DateTime, "2024-01-01T12:30:00.5+02:00").is_ok());
        assert!(validate_builtin(BuiltinType::DateTime, "2024-01-01").is_err());
        assert!(validate_builtin(BuiltinType::Time, "23:59:59").is_ok());
        assert!(validate_builtin(BuiltinType::GYearMonth, "2024-13").is_err());
        assert!(validate_builtin(BuiltinType::GMonthDay, "--12-25").is_ok());
        assert!(validate_builtin(BuiltinType::Duration, "P1Y2MT3H").is_ok());
        assert!(validate_builtin(BuiltinType::Duration, "P").is_err());
    }

    #[test]
    fn test_binary() {
        assert!(validate_builtin(BuiltinType::HexBinary, "0FB7").is_ok());
        assert!(validate_builtin(BuiltinType::HexBinary, "0FB").is_err());
        assert!(validate_builtin(BuiltinType::Base64Binary, "SGVsbG8=").is_ok());
        assert!(validate_builtin(BuiltinType::Base64Binary, "SGVsbG8").is_err());
        assert_eq!(decode_base64("SGVs bG8=").unwrap(), b"Hello");
    }

    #[test]
    fn test_names_and_uris() {
        assert!(validate_builtin(BuiltinType::NcName, "order-id").is_ok());
        assert!(validate_builtin(BuiltinType::NcName, "a:b").is_err());
        assert!(validate_builtin(BuiltinType::QName, "a:b").is_ok());
        assert!(validate_builtin(BuiltinType::Language, "nb-NO").is_ok());
        assert!(validate_builtin(BuiltinType::AnyUri, "http://example.com/a").is_ok());
        assert!(validate_builtin(BuiltinType::AnyUri, "relative/path").is_ok());
        assert!(validate_builtin(BuiltinType::Token, " padded").is_err());
    }
}
