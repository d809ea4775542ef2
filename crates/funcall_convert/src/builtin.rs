//! Converters for scalar types: strings, numbers, booleans and dates.
//!
//! Each converter enforces the JSON Schema validation keywords that apply to
//! its type when they are present in the rendered property schema:
//!
//! | Type | Keywords |
//! |------|----------|
//! | string, date, date-time | `minLength`, `maxLength`, `pattern` |
//! | integer, number | `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`, `multipleOf` |

use crate::converter::{Converter, type_only};
use crate::error::ConvertError;
use crate::native::NativeType;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use core::marker::PhantomData;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Fallback layout for timestamps that are not RFC 3339, e.g. `+0000` offsets.
const DATE_TIME_FALLBACK: &str = "%Y-%m-%dT%H:%M:%S%z";

// ─────────────────────────────────────────────────────────────────────
// String
// ─────────────────────────────────────────────────────────────────────

/// Converter for [`String`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter for StringConverter {
    type Native = String;

    fn schema_type(&self) -> &'static str {
        "string"
    }

    fn from_value(&self, raw: &Value, schema: &Map<String, Value>) -> Result<String, ConvertError> {
        let value = expect_str(raw)?;
        check_string(value, schema)?;
        Ok(value.to_string())
    }
}

/// Returns the string inside `raw`, or a type mismatch.
pub fn expect_str(raw: &Value) -> Result<&str, ConvertError> {
    raw.as_str()
        .ok_or_else(|| ConvertError::type_mismatch("string", raw))
}

/// Compiled `pattern` keywords, keyed by source.
static PATTERNS: LazyLock<RwLock<HashMap<String, Regex>>> = LazyLock::new(Default::default);

/// Compiles a `pattern` keyword, reusing an earlier compilation of the same
/// source.
pub fn compile_pattern(pattern: &Value) -> Result<Regex, ConvertError> {
    let source = pattern.as_str().ok_or_else(|| ConvertError::InvalidSchema {
        keyword: "pattern",
        reason: "expected a string".to_string(),
    })?;
    if let Some(regex) = PATTERNS.read().get(source) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(source).map_err(|err| ConvertError::InvalidSchema {
        keyword: "pattern",
        reason: err.to_string(),
    })?;
    PATTERNS.write().insert(source.to_string(), regex.clone());
    Ok(regex)
}

/// Enforces `minLength`, `maxLength` and `pattern` against `value`.
///
/// Lengths count characters. `pattern` must match at the start of the value.
pub fn check_string(value: &str, schema: &Map<String, Value>) -> Result<(), ConvertError> {
    let length = value.chars().count() as u64;

    if let Some(min) = schema.get("minLength").and_then(Value::as_u64)
        && length < min
    {
        return Err(ConvertError::constraint(
            "minLength",
            format!("at least {min} characters, got {length}"),
        ));
    }

    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64)
        && length > max
    {
        return Err(ConvertError::constraint(
            "maxLength",
            format!("at most {max} characters, got {length}"),
        ));
    }

    if let Some(pattern) = schema.get("pattern") {
        let regex = compile_pattern(pattern)?;
        if !regex.find(value).is_some_and(|m| m.start() == 0) {
            return Err(ConvertError::constraint(
                "pattern",
                format!("must match {}", regex.as_str()),
            ));
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Numeric
// ─────────────────────────────────────────────────────────────────────

/// Converter for primitive integer types.
///
/// Accepts JSON integers, and floats with no fractional part. Values that do
/// not fit `T` are rejected.
pub struct IntegerConverter<T>(PhantomData<fn() -> T>);

impl<T> IntegerConverter<T> {
    /// Creates a converter for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for IntegerConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Converter for IntegerConverter<T>
where
    T: NativeType + TryFrom<i64> + TryFrom<u64>,
{
    type Native = T;

    fn schema_type(&self) -> &'static str {
        "integer"
    }

    fn from_value(&self, raw: &Value, schema: &Map<String, Value>) -> Result<T, ConvertError> {
        let Value::Number(number) = raw else {
            return Err(ConvertError::type_mismatch("integer", raw));
        };
        let out_of_range = || ConvertError::OutOfRange {
            value: number.to_string(),
            target: core::any::type_name::<T>(),
        };

        let converted = if let Some(signed) = number.as_i64() {
            T::try_from(signed).map_err(|_| out_of_range())
        } else if let Some(unsigned) = number.as_u64() {
            T::try_from(unsigned).map_err(|_| out_of_range())
        } else {
            match number.as_f64() {
                Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                    T::try_from(float as i64).map_err(|_| out_of_range())
                }
                _ => Err(ConvertError::type_mismatch("integer", raw)),
            }
        }?;

        if let Some(float) = number.as_f64() {
            check_number(float, schema)?;
        }
        Ok(converted)
    }
}

/// Converter for `f32` and `f64`.
pub struct NumberConverter<T>(PhantomData<fn() -> T>);

impl<T> NumberConverter<T> {
    /// Creates a converter for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for NumberConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! number_converter {
    ($($ty:ty),*) => {
        $(
            impl Converter for NumberConverter<$ty> {
                type Native = $ty;

                fn schema_type(&self) -> &'static str {
                    "number"
                }

                fn from_value(
                    &self,
                    raw: &Value,
                    schema: &Map<String, Value>,
                ) -> Result<$ty, ConvertError> {
                    let value = raw
                        .as_f64()
                        .ok_or_else(|| ConvertError::type_mismatch("number", raw))?;
                    check_number(value, schema)?;
                    Ok(value as $ty)
                }
            }
        )*
    };
}

number_converter!(f32, f64);

/// Enforces the numeric range keywords against `value`.
pub fn check_number(value: f64, schema: &Map<String, Value>) -> Result<(), ConvertError> {
    let bound = |keyword: &str| schema.get(keyword).and_then(Value::as_f64);

    if let Some(min) = bound("minimum")
        && value < min
    {
        return Err(ConvertError::constraint("minimum", format!(">= {min}")));
    }
    if let Some(max) = bound("maximum")
        && value > max
    {
        return Err(ConvertError::constraint("maximum", format!("<= {max}")));
    }
    if let Some(min) = bound("exclusiveMinimum")
        && value <= min
    {
        return Err(ConvertError::constraint("exclusiveMinimum", format!("> {min}")));
    }
    if let Some(max) = bound("exclusiveMaximum")
        && value >= max
    {
        return Err(ConvertError::constraint("exclusiveMaximum", format!("< {max}")));
    }
    if let Some(step) = bound("multipleOf") {
        if step <= 0.0 {
            return Err(ConvertError::InvalidSchema {
                keyword: "multipleOf",
                reason: "must be greater than zero".to_string(),
            });
        }
        let quotient = value / step;
        if (quotient - quotient.round()).abs() > 1e-9 {
            return Err(ConvertError::constraint(
                "multipleOf",
                format!("a multiple of {step}"),
            ));
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Boolean
// ─────────────────────────────────────────────────────────────────────

/// Converter for [`bool`]. Only JSON booleans are accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    type Native = bool;

    fn schema_type(&self) -> &'static str {
        "boolean"
    }

    fn from_value(&self, raw: &Value, _schema: &Map<String, Value>) -> Result<bool, ConvertError> {
        raw.as_bool()
            .ok_or_else(|| ConvertError::type_mismatch("boolean", raw))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Dates
// ─────────────────────────────────────────────────────────────────────

/// Converter for `DateTime<FixedOffset>`, rendered as `format: date-time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeConverter;

impl Converter for DateTimeConverter {
    type Native = DateTime<FixedOffset>;

    fn schema_type(&self) -> &'static str {
        "string"
    }

    fn to_schema(&self, _keywords: &Map<String, Value>) -> Map<String, Value> {
        with_format("date-time")
    }

    fn from_value(
        &self,
        raw: &Value,
        schema: &Map<String, Value>,
    ) -> Result<DateTime<FixedOffset>, ConvertError> {
        let value = expect_str(raw)?;
        check_string(value, schema)?;
        parse_date_time(value)
    }
}

/// Converter for `DateTime<Utc>`; any offset is accepted and normalized.
#[derive(Debug, Default, Clone, Copy)]
pub struct UtcDateTimeConverter;

impl Converter for UtcDateTimeConverter {
    type Native = DateTime<Utc>;

    fn schema_type(&self) -> &'static str {
        "string"
    }

    fn to_schema(&self, _keywords: &Map<String, Value>) -> Map<String, Value> {
        with_format("date-time")
    }

    fn from_value(
        &self,
        raw: &Value,
        schema: &Map<String, Value>,
    ) -> Result<DateTime<Utc>, ConvertError> {
        let value = expect_str(raw)?;
        check_string(value, schema)?;
        parse_date_time(value).map(|dt| dt.with_timezone(&Utc))
    }
}

/// Converter for [`NaiveDate`], rendered as `format: date`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateConverter;

impl Converter for DateConverter {
    type Native = NaiveDate;

    fn schema_type(&self) -> &'static str {
        "string"
    }

    fn to_schema(&self, _keywords: &Map<String, Value>) -> Map<String, Value> {
        with_format("date")
    }

    fn from_value(&self, raw: &Value, schema: &Map<String, Value>) -> Result<NaiveDate, ConvertError> {
        let value = expect_str(raw)?;
        check_string(value, schema)?;
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| ConvertError::Format {
            value: value.to_string(),
            format: "date",
            reason: err.to_string(),
        })
    }
}

fn with_format(format: &str) -> Map<String, Value> {
    let mut schema = type_only("string");
    schema.insert("format".to_string(), Value::String(format.to_string()));
    schema
}

fn parse_date_time(value: &str) -> Result<DateTime<FixedOffset>, ConvertError> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, DATE_TIME_FALLBACK))
        .map_err(|err| ConvertError::Format {
            value: value.to_string(),
            format: "date-time",
            reason: err.to_string(),
        })
}
