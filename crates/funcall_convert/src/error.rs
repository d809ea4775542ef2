//! Error types for schema conversion.

use serde_json::Value;
use thiserror::Error;

/// Reason a converter rejected a raw JSON value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// The JSON value has the wrong kind for the target type.
    #[error("Value is not of type '{expected}', found {found}.")]
    TypeMismatch {
        /// JSON Schema type the converter expects.
        expected: &'static str,
        /// JSON kind that was supplied.
        found: &'static str,
    },

    /// A validation keyword from the parameter schema was violated.
    #[error("Value does not meet the {keyword} constraint ({detail}).")]
    Constraint {
        /// The JSON Schema keyword, e.g. `minLength`.
        keyword: &'static str,
        /// What the constraint required.
        detail: String,
    },

    /// The value is not one of a closed set of allowed values.
    #[error("Value {value} does not match any of the literal values: {allowed:?}")]
    NotInLiteral {
        /// The offending value as received.
        value: String,
        /// The allowed values.
        allowed: Vec<String>,
    },

    /// The value is numeric but does not fit the target type.
    #[error("Value {value} is out of range for {target}.")]
    OutOfRange {
        /// The offending value as received.
        value: String,
        /// Rust type name of the target.
        target: &'static str,
    },

    /// A string could not be parsed in the expected format.
    #[error("Value '{value}' is not a valid {format}: {reason}")]
    Format {
        /// The offending value as received.
        value: String,
        /// Name of the expected format, e.g. `date-time`.
        format: &'static str,
        /// Parser message.
        reason: String,
    },

    /// A keyword in the schema itself is malformed.
    #[error("Schema keyword '{keyword}' is invalid: {reason}")]
    InvalidSchema {
        /// The JSON Schema keyword.
        keyword: &'static str,
        /// Why it could not be used.
        reason: String,
    },

    /// An element of an array failed conversion.
    #[error("Item {index}: {source}")]
    Item {
        /// Position of the failing element.
        index: usize,
        /// Underlying failure.
        #[source]
        source: Box<ConvertError>,
    },

    /// Failure reported by a user-supplied converter.
    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    /// Creates a [`TypeMismatch`](Self::TypeMismatch) for the given raw value.
    pub fn type_mismatch(expected: &'static str, raw: &Value) -> Self {
        Self::TypeMismatch {
            expected,
            found: json_kind(raw),
        }
    }

    /// Creates a [`Constraint`](Self::Constraint).
    pub fn constraint(keyword: &'static str, detail: impl Into<String>) -> Self {
        Self::Constraint {
            keyword,
            detail: detail.into(),
        }
    }

    /// Creates a [`Custom`](Self::Custom) error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// A raw value could not be coerced into the type of a named parameter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid value {value} for parameter '{parameter}': {source}")]
pub struct ConversionError {
    /// Parameter the value was supplied for.
    pub parameter: String,
    /// The raw value as received.
    pub value: Value,
    /// Why the converter rejected it.
    #[source]
    pub source: ConvertError,
}

impl ConversionError {
    /// Attaches a parameter name and raw value to a converter failure.
    pub fn new(parameter: impl Into<String>, value: Value, source: ConvertError) -> Self {
        Self {
            parameter: parameter.into(),
            value,
            source,
        }
    }
}

/// No converter is registered for a type, and no structural fallback applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No converter registered for type `{type_name}`")]
pub struct UnsupportedTypeError {
    /// Rust type name that could not be resolved.
    pub type_name: &'static str,
}

/// Returns the JSON Schema kind name of a value.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
