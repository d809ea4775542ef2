//! Parameter declarations, descriptors and converted call input.
//!
//! - [`ParamDeclaration`] — what the host declares for one parameter
//! - [`ParameterDescriptor`] — the resolved, cached form stored in a library
//! - [`CallInput`] — converted argument values handed to a callable

use funcall_convert::{
    AnyConverter, ConversionError, ConvertError, NativeType, NativeValue, TypeTag,
    compile_pattern, render_schema,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::FunctionError;

/// Declaration of a single function parameter.
///
/// # Example
///
/// ```
/// use funcall_library::ParamDeclaration;
/// use serde_json::json;
///
/// let param = ParamDeclaration::typed::<u32>("limit")
///     .with_description("Max results.")
///     .with_keyword("maximum", json!(50))
///     .with_default(json!(10));
/// assert_eq!(param.name(), "limit");
/// assert!(!param.infers_required());
/// ```
#[derive(Debug, Clone)]
pub struct ParamDeclaration {
    name: String,
    type_tag: Option<TypeTag>,
    description: Option<String>,
    keywords: Map<String, Value>,
    default: Option<Value>,
    optional: bool,
}

impl ParamDeclaration {
    /// Declares a parameter of native type `T`.
    pub fn typed<T: NativeType>(name: impl Into<String>) -> Self {
        Self::with_tag(name, Some(T::type_tag()))
    }

    /// Declares a parameter with no type annotation.
    ///
    /// Registration of a function holding such a parameter fails.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::with_tag(name, None)
    }

    fn with_tag(name: impl Into<String>, type_tag: Option<TypeTag>) -> Self {
        Self {
            name: name.into(),
            type_tag,
            description: None,
            keywords: Map::new(),
            default: None,
            optional: false,
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an extra JSON Schema keyword.
    #[must_use]
    pub fn with_keyword(mut self, key: impl Into<String>, value: Value) -> Self {
        self.keywords.insert(key.into(), value);
        self
    }

    /// Adds several extra JSON Schema keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Map<String, Value>) -> Self {
        self.keywords.extend(keywords);
        self
    }

    /// Sets the default value shown to the model.
    ///
    /// The callable is responsible for applying the default when the
    /// argument is absent.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the parameter as optional without a default.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native type, if annotated.
    #[must_use]
    pub fn type_tag(&self) -> Option<&TypeTag> {
        self.type_tag.as_ref()
    }

    /// Whether the parameter would be required absent an explicit list.
    #[must_use]
    pub fn infers_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// A resolved parameter, cached on its [`FunctionDescriptor`](crate::FunctionDescriptor).
#[derive(Clone)]
pub struct ParameterDescriptor {
    name: String,
    type_name: &'static str,
    description: String,
    required: bool,
    keywords: Map<String, Value>,
    default: Option<Value>,
    converter: Arc<dyn AnyConverter>,
    schema: Map<String, Value>,
}

impl core::fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("required", &self.required)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ParameterDescriptor {
    pub(crate) fn new(
        declaration: ParamDeclaration,
        type_name: &'static str,
        converter: Arc<dyn AnyConverter>,
        required: bool,
        include_default: bool,
    ) -> Result<Self, ConvertError> {
        if let Some(pattern) = declaration.keywords.get("pattern") {
            compile_pattern(pattern)?;
        }
        let description = declaration.description.unwrap_or_default();
        let mut schema = render_schema(
            converter.as_ref(),
            Some(description.as_str()),
            &declaration.keywords,
        );
        if include_default
            && !required
            && let Some(default) = &declaration.default
        {
            schema.insert("default".to_string(), default.clone());
        }

        Ok(Self {
            name: declaration.name,
            type_name,
            description,
            required,
            keywords: declaration.keywords,
            default: declaration.default,
            converter,
            schema,
        })
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the parameter.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Description; empty when none was declared.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the model must supply this argument.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Extra JSON Schema keywords as declared.
    #[must_use]
    pub fn keywords(&self) -> &Map<String, Value> {
        &self.keywords
    }

    /// Declared default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The rendered property schema.
    #[must_use]
    pub fn schema(&self) -> &Map<String, Value> {
        &self.schema
    }

    /// Coerces a raw argument through this parameter's converter.
    pub(crate) fn convert(&self, raw: &Value) -> Result<NativeValue, ConversionError> {
        self.converter
            .convert(raw, &self.schema)
            .map_err(|source| ConversionError::new(&self.name, raw.clone(), source))
    }
}

/// Converted argument values for one call.
///
/// Each value is taken out by name and type exactly once.
pub struct CallInput {
    values: HashMap<String, NativeValue>,
}

impl core::fmt::Debug for CallInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort_unstable();
        f.debug_struct("CallInput").field("arguments", &names).finish()
    }
}

impl CallInput {
    pub(crate) fn new(values: HashMap<String, NativeValue>) -> Self {
        Self { values }
    }

    /// Creates input with no arguments.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Adds an argument value, for invoking callables directly.
    #[must_use]
    pub fn with<T: NativeType>(mut self, name: impl Into<String>, value: T) -> Self {
        self.values.insert(name.into(), Box::new(value));
        self
    }

    /// Takes a required argument.
    pub fn take<T: 'static>(&mut self, name: &str) -> Result<T, FunctionError> {
        self.take_optional(name)?
            .ok_or_else(|| FunctionError::MissingArgument(name.to_string()))
    }

    /// Takes an argument that may be absent.
    pub fn take_optional<T: 'static>(&mut self, name: &str) -> Result<Option<T>, FunctionError> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(value) => value
                .downcast::<T>()
                .map(|value| Some(*value))
                .map_err(|_| FunctionError::ArgumentType {
                    parameter: name.to_string(),
                    expected: core::any::type_name::<T>(),
                }),
        }
    }

    /// Returns whether an argument is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of remaining arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no arguments remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
