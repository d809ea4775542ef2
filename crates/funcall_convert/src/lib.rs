//! Type converters between native Rust values and JSON Schema.
//!
//! A converter knows how to describe one native type as a JSON Schema
//! fragment and how to coerce a model-supplied JSON value back into that
//! type. The [`ConverterRegistry`] resolves converters by type, and can be
//! extended with converters for domain types.
//!
//! # Example
//!
//! ```
//! use funcall_convert::{ConvertError, Converter, ConverterRegistry, NativeType, render_schema};
//! use serde_json::{Map, Value, json};
//!
//! struct UserId(u64);
//!
//! impl NativeType for UserId {}
//!
//! /// Reconstructs a user from a `<@123>` mention.
//! struct UserIdConverter;
//!
//! impl Converter for UserIdConverter {
//!     type Native = UserId;
//!
//!     fn schema_type(&self) -> &'static str {
//!         "string"
//!     }
//!
//!     fn from_value(&self, raw: &Value, _schema: &Map<String, Value>) -> Result<UserId, ConvertError> {
//!         raw.as_str()
//!             .and_then(|s| s.strip_prefix("<@")?.strip_suffix('>')?.parse().ok())
//!             .map(UserId)
//!             .ok_or_else(|| ConvertError::custom("expected a user mention"))
//!     }
//! }
//!
//! let mut registry = ConverterRegistry::default();
//! registry.register(UserIdConverter);
//!
//! let converter = registry.resolve_type::<UserId>().unwrap();
//! let schema = render_schema(converter.as_ref(), Some("The user."), &Map::new());
//! assert_eq!(Value::Object(schema), json!({"type": "string", "description": "The user."}));
//!
//! let value = converter.convert(&json!("<@42>"), &Map::new()).unwrap();
//! assert_eq!(value.downcast::<UserId>().unwrap().0, 42);
//! ```
//!
//! # Architecture
//!
//! - [`NativeType`] / [`TypeTag`] — type identity plus structural [`Shape`]
//! - [`Converter`] — typed conversion strategy, erased as [`AnyConverter`]
//! - [`ConverterRegistry`] — exact lookup with literal and sequence fallback
//! - [`render_schema`] — merges description and caller keywords over a fragment

pub mod builtin;
pub mod converter;
pub mod error;
pub mod native;
pub mod registry;
pub mod structural;

pub use builtin::{
    BooleanConverter, DateConverter, DateTimeConverter, IntegerConverter, NumberConverter,
    StringConverter, UtcDateTimeConverter, compile_pattern,
};
pub use converter::{AnyConverter, Converter, render_schema};
pub use error::{ConversionError, ConvertError, UnsupportedTypeError, json_kind};
pub use native::{Literal, LiteralShape, NativeType, NativeValue, SequenceShape, Shape, TypeTag};
pub use registry::{ConverterConflictError, ConverterRegistry};
pub use structural::{ArrayConverter, LiteralConverter};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}
