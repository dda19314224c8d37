//! XSD built-in types
//!
//! The built-in datatypes that may appear as `type=` or `base=` targets, with
//! their JSON Schema counterparts.

use std::fmt;

/// JSON Schema primitive type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    /// `"string"`
    String,
    /// `"integer"`
    Integer,
    /// `"number"`
    Number,
    /// `"boolean"`
    Boolean,
}

impl JsonType {
    /// Keyword value of the `type` keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
        }
    }

    /// Parse a `type` keyword value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "string" => Some(JsonType::String),
            "integer" => Some(JsonType::Integer),
            "number" => Some(JsonType::Number),
            "boolean" => Some(JsonType::Boolean),
            _ => None,
        }
    }

    /// Whether range keywords (`minimum`, `maximum`) apply
    pub fn is_numeric(&self) -> bool {
        matches!(self, JsonType::Integer | JsonType::Number)
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! builtin_types {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// An XSD built-in datatype
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum BuiltinType {
            $(
                #[doc = concat!("`xs:", $name, "`")]
                $variant,
            )*
        }

        impl BuiltinType {
            /// All built-in types known to the converter
            pub const ALL: &'static [BuiltinType] = &[$(BuiltinType::$variant),*];

            /// Local name within the XSD namespace
            pub fn local_name(&self) -> &'static str {
                match self {
                    $(BuiltinType::$variant => $name,)*
                }
            }

            /// Look up a built-in type by local name
            pub fn from_local_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(BuiltinType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

builtin_types! {
    AnyType => "anyType",
    AnySimpleType => "anySimpleType",
    String => "string",
    NormalizedString => "normalizedString",
    Token => "token",
    Language => "language",
    Name => "Name",
    NcName => "NCName",
    Id => "ID",
    IdRef => "IDREF",
    NmToken => "NMTOKEN",
    QName => "QName",
    AnyUri => "anyURI",
    Boolean => "boolean",
    Decimal => "decimal",
    Float => "float",
    Double => "double",
    Integer => "integer",
    Long => "long",
    Int => "int",
    Short => "short",
    Byte => "byte",
    NonNegativeInteger => "nonNegativeInteger",
    PositiveInteger => "positiveInteger",
    NonPositiveInteger => "nonPositiveInteger",
    NegativeInteger => "negativeInteger",
    UnsignedLong => "unsignedLong",
    UnsignedInt => "unsignedInt",
    UnsignedShort => "unsignedShort",
    UnsignedByte => "unsignedByte",
    Date => "date",
    DateTime => "dateTime",
    Time => "time",
    Duration => "duration",
    GYear => "gYear",
    GYearMonth => "gYearMonth",
    GMonth => "gMonth",
    GMonthDay => "gMonthDay",
    GDay => "gDay",
    Base64Binary => "base64Binary",
    HexBinary => "hexBinary",
}

impl BuiltinType {
    /// JSON Schema `type` for this built-in (None for the `any` types)
    pub fn json_type(&self) -> Option<JsonType> {
        use BuiltinType::*;
        match self {
            AnyType | AnySimpleType => None,
            Boolean => Some(JsonType::Boolean),
            Decimal | Float | Double => Some(JsonType::Number),
            Integer | Long | Int | Short | Byte | NonNegativeInteger | PositiveInteger
            | NonPositiveInteger | NegativeInteger | UnsignedLong | UnsignedInt
            | UnsignedShort | UnsignedByte => Some(JsonType::Integer),
            _ => Some(JsonType::String),
        }
    }

    /// JSON Schema `format` for this built-in
    pub fn json_format(&self) -> Option<&'static str> {
        match self {
            BuiltinType::Date => Some("date"),
            BuiltinType::DateTime => Some("date-time"),
            BuiltinType::Time => Some("time"),
            BuiltinType::Duration => Some("duration"),
            BuiltinType::AnyUri => Some("uri"),
            _ => None,
        }
    }

    /// The built-in implied by a JSON `type` and `format` pair
    pub fn implied_by(json_type: JsonType, format: Option<&str>) -> BuiltinType {
        match (json_type, format) {
            (JsonType::String, Some("date")) => BuiltinType::Date,
            (JsonType::String, Some("date-time")) => BuiltinType::DateTime,
            (JsonType::String, Some("time")) => BuiltinType::Time,
            (JsonType::String, Some("duration")) => BuiltinType::Duration,
            (JsonType::String, Some("uri")) => BuiltinType::AnyUri,
            (JsonType::String, _) => BuiltinType::String,
            (JsonType::Integer, _) => BuiltinType::Integer,
            (JsonType::Number, _) => BuiltinType::Decimal,
            (JsonType::Boolean, _) => BuiltinType::Boolean,
        }
    }

    /// Whether the JSON keywords `type`/`format` alone identify this built-in
    pub fn is_implied_by_json(&self) -> bool {
        match self.json_type() {
            Some(json_type) => BuiltinType::implied_by(json_type, self.json_format()) == *self,
            None => false,
        }
    }

    /// Whether values are numbers (range facets map to `minimum`/`maximum`)
    pub fn is_numeric(&self) -> bool {
        self.json_type().map(|t| t.is_numeric()).unwrap_or(false)
    }

    /// Whether values are integers
    pub fn is_integer(&self) -> bool {
        self.json_type() == Some(JsonType::Integer)
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_local_name() {
        assert_eq!(BuiltinType::from_local_name("int"), Some(BuiltinType::Int));
        assert_eq!(BuiltinType::from_local_name("gYear"), Some(BuiltinType::GYear));
        assert_eq!(BuiltinType::from_local_name("nope"), None);
        for builtin in BuiltinType::ALL {
            assert_eq!(BuiltinType::from_local_name(builtin.local_name()), Some(*builtin));
        }
    }

    #[test]
    fn test_json_mapping() {
        assert_eq!(BuiltinType::Int.json_type(), Some(JsonType::Integer));
        assert_eq!(BuiltinType::Double.json_type(), Some(JsonType::Number));
        assert_eq!(BuiltinType::GYear.json_type(), Some(JsonType::String));
        assert_eq!(BuiltinType::AnyType.json_type(), None);
        assert_eq!(BuiltinType::DateTime.json_format(), Some("date-time"));
    }

    #[test]
    fn test_implied_types() {
        assert!(BuiltinType::String.is_implied_by_json());
        assert!(BuiltinType::Date.is_implied_by_json());
        assert!(BuiltinType::Decimal.is_implied_by_json());
        assert!(!BuiltinType::Int.is_implied_by_json());
        assert!(!BuiltinType::Token.is_implied_by_json());
        assert!(!BuiltinType::AnyType.is_implied_by_json());
    }
}
