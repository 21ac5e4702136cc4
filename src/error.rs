use std::fmt;

/// All error types produced while printing or parsing proto3 JSON.
#[derive(Debug)]
pub enum JsonFormatError {
    /// A JSON value had the wrong shape for the field it was decoded against
    /// (e.g. an array where an object was expected).
    UnexpectedType {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    /// A JSON number or numeric string could not be parsed as the field's
    /// declared proto type, or was out of range for it.
    InvalidNumber { field: String, detail: String },

    /// A `bytes` field held a string that was not valid standard base64.
    InvalidBase64 {
        field: String,
        source: base64::DecodeError,
    },

    /// An enum field held a name or number with no matching value in the
    /// enum's descriptor.
    UnknownEnumValue { field: String, value: String },

    /// An `Any`'s `@type` did not resolve to a registered descriptor.
    UnknownType { type_url: String },

    /// An `Any` was missing its required `@type` key.
    MissingTypeUrl,

    /// A well-known type's registered formatter rejected the JSON it was given.
    InvalidWellKnownFormat {
        type_name: &'static str,
        detail: String,
    },

    /// A map key string could not be converted to the map's declared key type.
    MapKeyError { field: String, detail: String },

    /// The top-level input to `Parser::parse_str` was not well-formed JSON at all.
    MalformedJson(String),
}

impl fmt::Display for JsonFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonFormatError::UnexpectedType {
                field,
                expected,
                got,
            } => {
                write!(f, "field {field}: expected {expected}, got {got}")
            }
            JsonFormatError::InvalidNumber { field, detail } => {
                write!(f, "field {field}: invalid number: {detail}")
            }
            JsonFormatError::InvalidBase64 { field, source } => {
                write!(f, "field {field}: invalid base64: {source}")
            }
            JsonFormatError::UnknownEnumValue { field, value } => {
                write!(f, "field {field}: unknown enum value {value:?}")
            }
            JsonFormatError::UnknownType { type_url } => {
                write!(f, "unknown type url {type_url:?}")
            }
            JsonFormatError::MissingTypeUrl => {
                write!(f, "Any value is missing the @type field")
            }
            JsonFormatError::InvalidWellKnownFormat { type_name, detail } => {
                write!(f, "{type_name}: {detail}")
            }
            JsonFormatError::MapKeyError { field, detail } => {
                write!(f, "field {field}: invalid map key: {detail}")
            }
            JsonFormatError::MalformedJson(detail) => {
                write!(f, "malformed JSON: {detail}")
            }
        }
    }
}

impl std::error::Error for JsonFormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JsonFormatError::InvalidBase64 { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias used throughout the codec.
pub type Result<T> = std::result::Result<T, JsonFormatError>;
