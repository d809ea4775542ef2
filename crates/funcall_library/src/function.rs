//! Function declarations and resolved function descriptors.
//!
//! A [`FunctionDeclaration`] pairs a callable with its annotation and
//! parameter declarations. Registering it into a library resolves every
//! parameter's converter once and caches the result, together with the
//! rendered schema, on an immutable [`FunctionDescriptor`].

use crate::context::CallContext;
use crate::error::{FunctionError, RegistrationError};
use crate::param::{CallInput, ParamDeclaration, ParameterDescriptor};
use crate::schema::{FunctionSchema, ParametersSchema};
use core::future::Future;
use core::pin::Pin;
use funcall_convert::ConverterRegistry;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Future returned by a coroutine callable.
pub type CallFuture = Pin<Box<dyn Future<Output = Result<Value, FunctionError>> + Send + 'static>>;

type BlockingFn = dyn Fn(&CallContext, CallInput) -> Result<Value, FunctionError> + Send + Sync;
type CoroutineFn = dyn Fn(CallContext, CallInput) -> CallFuture + Send + Sync;

/// The underlying callable of a function.
#[derive(Clone)]
pub enum Callable {
    /// Runs to completion on the calling thread.
    Blocking(Arc<BlockingFn>),
    /// Returns a future that must be awaited.
    Coroutine(Arc<CoroutineFn>),
}

impl core::fmt::Debug for Callable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Blocking(_) => f.write_str("Blocking"),
            Self::Coroutine(_) => f.write_str("Coroutine"),
        }
    }
}

impl Callable {
    /// Returns whether the callable must be awaited.
    #[must_use]
    pub fn is_coroutine(&self) -> bool {
        matches!(self, Self::Coroutine(_))
    }
}

/// Serializes a callable's return value.
pub fn to_output<T: Serialize>(value: T) -> Result<Value, FunctionError> {
    serde_json::to_value(value).map_err(FunctionError::from)
}

/// Function-level metadata: display name, description, required list,
/// force words and the enabled flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionAnnotation {
    name: Option<String>,
    description: String,
    required: Option<Vec<String>>,
    force_words: Vec<String>,
    enabled: bool,
}

impl FunctionAnnotation {
    /// Creates an enabled annotation with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            name: None,
            description: description.into(),
            required: None,
            force_words: Vec::new(),
            enabled: true,
        }
    }

    /// Overrides the display name, which otherwise is the native name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the authoritative list of required parameters.
    ///
    /// When set, exactly these parameters are required, whether or not
    /// they declare defaults. A default on a listed parameter is ignored.
    /// Every parameter left out must have a default or be optional.
    #[must_use]
    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Sets words that force this function when found in a user query.
    #[must_use]
    pub fn with_force_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.force_words = words.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables the function. Disabled functions are omitted from
    /// exported schemas but can still be dispatched.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A callable plus the metadata needed to register it.
///
/// # Example
///
/// ```
/// use funcall_library::{FunctionAnnotation, FunctionDeclaration, ParamDeclaration, to_output};
///
/// let declaration = FunctionDeclaration::blocking("echo", |_ctx, mut input| {
///     let text: String = input.take("text")?;
///     to_output(text)
/// })
/// .with_annotation(FunctionAnnotation::new("Repeat the text."))
/// .with_param(ParamDeclaration::typed::<String>("text"));
///
/// assert_eq!(declaration.native_name(), "echo");
/// assert!(!declaration.is_coroutine());
/// ```
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    native_name: String,
    annotation: Option<FunctionAnnotation>,
    params: Vec<ParamDeclaration>,
    callable: Callable,
}

impl FunctionDeclaration {
    /// Declares a blocking callable.
    pub fn blocking<F>(native_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&CallContext, CallInput) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self::new(native_name, Callable::Blocking(Arc::new(f)))
    }

    /// Declares a coroutine callable.
    pub fn coroutine<F, Fut>(native_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(CallContext, CallInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FunctionError>> + Send + 'static,
    {
        let erased = move |ctx: CallContext, input: CallInput| -> CallFuture { Box::pin(f(ctx, input)) };
        Self::new(native_name, Callable::Coroutine(Arc::new(erased)))
    }

    fn new(native_name: impl Into<String>, callable: Callable) -> Self {
        Self {
            native_name: native_name.into(),
            annotation: None,
            params: Vec::new(),
            callable,
        }
    }

    /// Attaches the function annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: FunctionAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Appends a parameter declaration.
    #[must_use]
    pub fn with_param(mut self, param: ParamDeclaration) -> Self {
        self.params.push(param);
        self
    }

    /// Native name of the callable.
    #[must_use]
    pub fn native_name(&self) -> &str {
        &self.native_name
    }

    /// Display name: the annotated name, else the native name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.annotation
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or(&self.native_name)
    }

    /// The function annotation, if any.
    #[must_use]
    pub fn annotation(&self) -> Option<&FunctionAnnotation> {
        self.annotation.as_ref()
    }

    /// Parameter declarations in order.
    #[must_use]
    pub fn params(&self) -> &[ParamDeclaration] {
        &self.params
    }

    /// Returns whether the callable must be awaited.
    #[must_use]
    pub fn is_coroutine(&self) -> bool {
        self.callable.is_coroutine()
    }
}

/// A registered function. Immutable once built.
#[derive(Debug)]
pub struct FunctionDescriptor {
    name: String,
    native_name: String,
    description: String,
    parameters: Vec<ParameterDescriptor>,
    required: Vec<String>,
    force_words: Vec<String>,
    force_matcher: Option<Regex>,
    enabled: bool,
    callable: Callable,
    schema: FunctionSchema,
}

impl FunctionDescriptor {
    /// Resolves a declaration against a converter registry.
    pub fn build(
        declaration: FunctionDeclaration,
        converters: &ConverterRegistry,
        include_defaults: bool,
    ) -> Result<Self, RegistrationError> {
        let FunctionDeclaration {
            native_name,
            annotation,
            params,
            callable,
        } = declaration;
        let annotation =
            annotation.ok_or_else(|| RegistrationError::MissingAnnotation(native_name.clone()))?;

        let mut seen = HashSet::with_capacity(params.len());
        for param in &params {
            if !seen.insert(param.name()) {
                return Err(RegistrationError::DuplicateParameter {
                    function: native_name.clone(),
                    parameter: param.name().to_string(),
                });
            }
        }
        if let Some(unknown) = annotation
            .required
            .iter()
            .flatten()
            .find(|name| !seen.contains(name.as_str()))
        {
            return Err(RegistrationError::UnknownRequired {
                function: native_name.clone(),
                parameter: unknown.clone(),
            });
        }

        let mut parameters = Vec::with_capacity(params.len());
        for param in params {
            let tag = param.type_tag().cloned().ok_or_else(|| {
                RegistrationError::MissingTypeAnnotation {
                    function: native_name.clone(),
                    parameter: param.name().to_string(),
                }
            })?;
            let converter =
                converters
                    .resolve(&tag)
                    .map_err(|source| RegistrationError::UnsupportedType {
                        function: native_name.clone(),
                        parameter: param.name().to_string(),
                        source,
                    })?;
            let required = match &annotation.required {
                Some(list) => list.iter().any(|name| name == param.name()),
                None => param.infers_required(),
            };
            if !required && param.infers_required() {
                return Err(RegistrationError::UnlistedRequired {
                    function: native_name.clone(),
                    parameter: param.name().to_string(),
                });
            }
            if required && !param.infers_required() {
                tracing::debug!(
                    function = %native_name,
                    parameter = param.name(),
                    "parameter is forced required; its default is ignored"
                );
            }
            let parameter_name = param.name().to_string();
            let parameter =
                ParameterDescriptor::new(param, tag.name(), converter, required, include_defaults)
                    .map_err(|source| RegistrationError::InvalidSchema {
                        function: native_name.clone(),
                        parameter: parameter_name,
                        source,
                    })?;
            parameters.push(parameter);
        }

        let name = annotation.name.unwrap_or_else(|| native_name.clone());
        let force_matcher = force_matcher(&name, &annotation.force_words)?;
        let required: Vec<String> = parameters
            .iter()
            .filter(|p| p.required())
            .map(|p| p.name().to_string())
            .collect();
        let schema = FunctionSchema {
            name: name.clone(),
            description: annotation.description.clone(),
            parameters: ParametersSchema::from_parameters(&parameters),
        };

        Ok(Self {
            name,
            native_name,
            description: annotation.description,
            parameters,
            required,
            force_words: annotation.force_words,
            force_matcher,
            enabled: annotation.enabled,
            callable,
            schema,
        })
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native name of the callable.
    #[must_use]
    pub fn native_name(&self) -> &str {
        &self.native_name
    }

    /// Function description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Resolved parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Names of required parameters.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Force words, as declared.
    #[must_use]
    pub fn force_words(&self) -> &[String] {
        &self.force_words
    }

    /// Whether the function appears in exported schemas.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether the callable must be awaited.
    #[must_use]
    pub fn is_coroutine(&self) -> bool {
        self.callable.is_coroutine()
    }

    /// The cached function schema.
    #[must_use]
    pub fn schema(&self) -> &FunctionSchema {
        &self.schema
    }

    /// Returns whether `query` contains one of the force words as a whole
    /// word, ignoring case.
    #[must_use]
    pub fn matches_force_word(&self, query: &str) -> bool {
        self.force_matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(query))
    }

    pub(crate) fn callable(&self) -> &Callable {
        &self.callable
    }
}

fn force_matcher(function: &str, words: &[String]) -> Result<Option<Regex>, RegistrationError> {
    if words.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = words.iter().map(|word| regex::escape(word)).collect();
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|source| RegistrationError::InvalidForceWords {
            function: function.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Opaque;

    impl funcall_convert::NativeType for Opaque {}

    fn echo() -> FunctionDeclaration {
        FunctionDeclaration::blocking("echo", |_ctx, mut input| {
            let text: String = input.take("text")?;
            to_output(text)
        })
    }

    fn build(declaration: FunctionDeclaration) -> Result<FunctionDescriptor, RegistrationError> {
        FunctionDescriptor::build(declaration, &ConverterRegistry::default(), true)
    }

    #[test]
    fn display_name_defaults_to_native_name() {
        let descriptor = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo."))
                .with_param(ParamDeclaration::typed::<String>("text")),
        )
        .unwrap();
        assert_eq!(descriptor.name(), "echo");
        assert_eq!(descriptor.native_name(), "echo");
        assert_eq!(descriptor.required(), ["text"]);
        assert!(!descriptor.is_coroutine());
    }

    #[test]
    fn annotated_name_overrides() {
        let declaration = echo().with_annotation(FunctionAnnotation::new("Echo.").with_name("say"));
        assert_eq!(declaration.display_name(), "say");
        assert_eq!(build(declaration).unwrap().name(), "say");
    }

    #[test]
    fn explicit_required_list_is_authoritative() {
        let descriptor = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo.").with_required(["limit"]))
                .with_param(ParamDeclaration::typed::<String>("text").optional())
                .with_param(ParamDeclaration::typed::<u32>("limit").with_default(json!(5))),
        )
        .unwrap();
        assert_eq!(descriptor.required(), ["limit"]);
        assert_eq!(
            serde_json::to_value(&descriptor.schema().parameters).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string"},
                    "limit": {"type": "integer"}
                },
                "required": ["limit"]
            })
        );
    }

    #[test]
    fn required_list_must_cover_parameters_without_defaults() {
        let err = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo.").with_required(["limit"]))
                .with_param(ParamDeclaration::typed::<String>("text"))
                .with_param(ParamDeclaration::typed::<u32>("limit").with_default(json!(5))),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::UnlistedRequired { parameter, .. } if parameter == "text"
        ));
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let err = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo."))
                .with_param(
                    ParamDeclaration::typed::<String>("text").with_keyword("pattern", json!("([")),
                ),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::InvalidSchema { parameter, .. } if parameter == "text"
        ));
    }

    #[test]
    fn missing_annotation_is_rejected() {
        let err = build(echo()).unwrap_err();
        assert!(matches!(err, RegistrationError::MissingAnnotation(name) if name == "echo"));
    }

    #[test]
    fn untyped_parameter_is_rejected() {
        let err = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo."))
                .with_param(ParamDeclaration::untyped("text")),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::MissingTypeAnnotation { parameter, .. } if parameter == "text"
        ));
    }

    #[test]
    fn unsupported_parameter_type_is_rejected() {
        let err = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo."))
                .with_param(ParamDeclaration::typed::<Opaque>("thing")),
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::UnsupportedType { .. }));
    }

    #[test]
    fn duplicate_and_unknown_parameters_are_rejected() {
        let err = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo."))
                .with_param(ParamDeclaration::typed::<String>("text"))
                .with_param(ParamDeclaration::typed::<String>("text")),
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateParameter { .. }));

        let err = build(
            echo()
                .with_annotation(FunctionAnnotation::new("Echo.").with_required(["nope"]))
                .with_param(ParamDeclaration::typed::<String>("text")),
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownRequired { .. }));
    }

    #[test]
    fn force_words_match_whole_words_case_insensitively() {
        let descriptor = build(
            echo().with_annotation(
                FunctionAnnotation::new("Echo.").with_force_words(["repeat", "c++"]),
            ),
        )
        .unwrap();
        assert!(descriptor.matches_force_word("Please REPEAT after me"));
        assert!(!descriptor.matches_force_word("repeatedly"));
        assert!(!descriptor.matches_force_word("nothing here"));
    }

    #[test]
    fn no_force_words_never_match() {
        let descriptor = build(echo().with_annotation(FunctionAnnotation::new("Echo."))).unwrap();
        assert!(!descriptor.matches_force_word("echo"));
    }
}
