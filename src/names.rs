//! XML name validation
//!
//! JSON property keys and definition names become XSD element, attribute
//! and type names on the way back, so they have to be valid NCNames.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// Letters from the Latin-1 supplement and Latin extended blocks are common in
// SERES names (æ, ø, å), so they are admitted alongside ASCII.
static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\-\.0-9\u{B7}]*$",
    )
    .unwrap()
});

/// Whether `name` can be used unprefixed as an element, attribute or type name
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// `prefix:local` or a bare NCName (lexical space of `xs:QName`)
pub fn is_valid_qname(name: &str) -> bool {
    name.split(':').count() <= 2 && name.split(':').all(is_valid_ncname)
}

/// Reject a property key or definition name that cannot become an XML name
pub fn validate_ncname(name: &str) -> Result<()> {
    if !is_valid_ncname(name) {
        return Err(Error::Name(format!("'{}' is not a valid XML name", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ncname() {
        assert!(is_valid_ncname("element"));
        assert!(is_valid_ncname("my-element"));
        assert!(is_valid_ncname("_element"));
        assert!(is_valid_ncname("Skjemanummer.1"));
        assert!(is_valid_ncname("Oppgavegiverærstatning"));

        assert!(!is_valid_ncname(""));
        assert!(!is_valid_ncname("prefix:element"));
        assert!(!is_valid_ncname("123element"));
        assert!(!is_valid_ncname("has space"));
        assert!(!is_valid_ncname("@attr"));
    }

    #[test]
    fn test_is_valid_qname() {
        assert!(is_valid_qname("element"));
        assert!(is_valid_qname("xs:schema"));

        assert!(!is_valid_qname(""));
        assert!(!is_valid_qname(":element"));
        assert!(!is_valid_qname("element:"));
        assert!(!is_valid_qname("a:b:c"));
    }

    #[test]
    fn test_validate_ncname() {
        assert!(validate_ncname("element").is_ok());
        match validate_ncname("@id") {
            Err(Error::Name(message)) => assert!(message.contains("'@id'")),
            other => panic!("expected name error, got {:?}", other),
        }
    }
}
