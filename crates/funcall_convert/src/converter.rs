//! The [`Converter`] trait and its type-erased form.

use crate::error::ConvertError;
use crate::native::{NativeType, NativeValue};
use serde_json::{Map, Value};

/// Converts between one native type and its JSON Schema representation.
///
/// `to_schema` renders the type-specific part of a property schema; the
/// parameter's description and extra keywords are merged over it by
/// [`render_schema`]. `from_value` receives the fully rendered property
/// schema so it can enforce validation keywords supplied by the caller.
pub trait Converter: Send + Sync + 'static {
    /// The native type produced by this converter.
    type Native: NativeType;

    /// JSON Schema primitive name, e.g. `"string"`.
    fn schema_type(&self) -> &'static str;

    /// Renders the schema fragment for this type.
    ///
    /// `keywords` are the caller-supplied extra keywords; they are merged
    /// afterwards regardless, so most converters only read them.
    fn to_schema(&self, _keywords: &Map<String, Value>) -> Map<String, Value> {
        type_only(self.schema_type())
    }

    /// Coerces a raw JSON value into the native type.
    fn from_value(
        &self,
        raw: &Value,
        schema: &Map<String, Value>,
    ) -> Result<Self::Native, ConvertError>;
}

/// Object-safe form of [`Converter`] used by the registry.
pub trait AnyConverter: Send + Sync {
    /// JSON Schema primitive name.
    fn schema_type(&self) -> &'static str;

    /// Renders the schema fragment for this type.
    fn to_schema(&self, keywords: &Map<String, Value>) -> Map<String, Value>;

    /// Coerces a raw JSON value into a boxed native value.
    fn convert(&self, raw: &Value, schema: &Map<String, Value>)
    -> Result<NativeValue, ConvertError>;
}

impl<C: Converter> AnyConverter for C {
    fn schema_type(&self) -> &'static str {
        Converter::schema_type(self)
    }

    fn to_schema(&self, keywords: &Map<String, Value>) -> Map<String, Value> {
        Converter::to_schema(self, keywords)
    }

    fn convert(
        &self,
        raw: &Value,
        schema: &Map<String, Value>,
    ) -> Result<NativeValue, ConvertError> {
        self.from_value(raw, schema)
            .map(|value| Box::new(value) as NativeValue)
    }
}

/// Renders a complete property schema.
///
/// The converter's fragment comes first, then `description` (when non-empty),
/// then `keywords`. Later entries win, so caller-supplied keywords override
/// converter defaults.
pub fn render_schema(
    converter: &dyn AnyConverter,
    description: Option<&str>,
    keywords: &Map<String, Value>,
) -> Map<String, Value> {
    let mut schema = converter.to_schema(keywords);
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        schema.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
    }
    for (key, value) in keywords {
        schema.insert(key.clone(), value.clone());
    }
    schema
}

/// A schema fragment holding only `type`.
pub(crate) fn type_only(schema_type: &str) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String(schema_type.to_string()));
    schema
}
