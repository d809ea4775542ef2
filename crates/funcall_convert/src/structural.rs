//! Converters resolved from a type's [`Shape`](crate::Shape) rather than its
//! identity: closed value sets and sequences.

use crate::converter::{AnyConverter, type_only};
use crate::error::ConvertError;
use crate::native::{LiteralShape, NativeValue, SequenceShape};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Converter for a closed set of string values.
///
/// Renders `{"type": "string", "enum": [...]}` and rejects any value that is
/// not one of the allowed literals.
#[derive(Clone, Copy)]
pub struct LiteralConverter {
    shape: LiteralShape,
}

impl LiteralConverter {
    /// Creates a converter for the given shape.
    #[must_use]
    pub fn new(shape: LiteralShape) -> Self {
        Self { shape }
    }

    /// Allowed values, in declaration order.
    #[must_use]
    pub fn values(&self) -> &'static [&'static str] {
        self.shape.values
    }

    fn rejected(&self, raw: &Value) -> ConvertError {
        ConvertError::NotInLiteral {
            value: raw.to_string(),
            allowed: self.shape.values.iter().map(ToString::to_string).collect(),
        }
    }
}

impl AnyConverter for LiteralConverter {
    fn schema_type(&self) -> &'static str {
        "string"
    }

    fn to_schema(&self, _keywords: &Map<String, Value>) -> Map<String, Value> {
        let mut schema = type_only("string");
        schema.insert(
            "enum".to_string(),
            Value::Array(
                self.shape
                    .values
                    .iter()
                    .map(|value| Value::String((*value).to_string()))
                    .collect(),
            ),
        );
        schema
    }

    fn convert(
        &self,
        raw: &Value,
        _schema: &Map<String, Value>,
    ) -> Result<NativeValue, ConvertError> {
        let value = raw.as_str().ok_or_else(|| self.rejected(raw))?;
        if !self.shape.values.contains(&value) {
            return Err(self.rejected(raw));
        }
        (self.shape.parse)(value).ok_or_else(|| self.rejected(raw))
    }
}

/// Converter for homogeneous sequences.
///
/// Each element is coerced through the item converter against the `items`
/// sub-schema. Honors `minItems`, `maxItems` and `uniqueItems`.
pub struct ArrayConverter {
    item: Arc<dyn AnyConverter>,
    collect: fn(Vec<NativeValue>) -> Option<NativeValue>,
}

impl ArrayConverter {
    /// Creates a converter from an item converter and the sequence shape.
    pub fn new(item: Arc<dyn AnyConverter>, shape: &SequenceShape) -> Self {
        Self {
            item,
            collect: shape.collect,
        }
    }
}

impl AnyConverter for ArrayConverter {
    fn schema_type(&self) -> &'static str {
        "array"
    }

    fn to_schema(&self, _keywords: &Map<String, Value>) -> Map<String, Value> {
        let mut schema = type_only("array");
        schema.insert(
            "items".to_string(),
            Value::Object(self.item.to_schema(&Map::new())),
        );
        schema
    }

    fn convert(
        &self,
        raw: &Value,
        schema: &Map<String, Value>,
    ) -> Result<NativeValue, ConvertError> {
        let items = raw
            .as_array()
            .ok_or_else(|| ConvertError::type_mismatch("array", raw))?;
        check_items(items, schema)?;

        let empty = Map::new();
        let item_schema = schema
            .get("items")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let converted = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.item
                    .convert(item, item_schema)
                    .map_err(|source| ConvertError::Item {
                        index,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        (self.collect)(converted)
            .ok_or_else(|| ConvertError::custom("items do not match the sequence element type"))
    }
}

fn check_items(items: &[Value], schema: &Map<String, Value>) -> Result<(), ConvertError> {
    let count = items.len() as u64;

    if let Some(min) = schema.get("minItems").and_then(Value::as_u64)
        && count < min
    {
        return Err(ConvertError::constraint(
            "minItems",
            format!("at least {min} items, got {count}"),
        ));
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64)
        && count > max
    {
        return Err(ConvertError::constraint(
            "maxItems",
            format!("at most {max} items, got {count}"),
        ));
    }
    if schema.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
        let mut seen = HashSet::with_capacity(items.len());
        if let Some(duplicate) = items.iter().find(|item| !seen.insert(item.to_string())) {
            return Err(ConvertError::constraint(
                "uniqueItems",
                format!("{duplicate} appears more than once"),
            ));
        }
    }
    Ok(())
}
