//! Error types for registration, dispatch and function execution.

use funcall_convert::{ConversionError, ConvertError, UnsupportedTypeError};
use thiserror::Error;

/// Errors raised while registering a function into a library.
///
/// A failed registration leaves the library unchanged.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A parameter was declared without a native type.
    #[error("Parameter '{parameter}' of function '{function}' has no type annotation")]
    MissingTypeAnnotation {
        /// Native name of the function.
        function: String,
        /// Name of the untyped parameter.
        parameter: String,
    },

    /// A parameter's type has no converter.
    #[error("Parameter '{parameter}' of function '{function}': {source}")]
    UnsupportedType {
        /// Native name of the function.
        function: String,
        /// Name of the parameter.
        parameter: String,
        /// The resolution failure.
        #[source]
        source: UnsupportedTypeError,
    },

    /// A parameter's extra schema keywords cannot be enforced.
    #[error("Parameter '{parameter}' of function '{function}': {source}")]
    InvalidSchema {
        /// Native name of the function.
        function: String,
        /// Name of the parameter.
        parameter: String,
        /// The malformed keyword.
        #[source]
        source: ConvertError,
    },

    /// The display name is already registered.
    #[error("Function '{0}' is already registered")]
    DuplicateFunction(String),

    /// Two parameters share a name.
    #[error("Function '{function}' declares parameter '{parameter}' more than once")]
    DuplicateParameter {
        /// Native name of the function.
        function: String,
        /// The repeated parameter name.
        parameter: String,
    },

    /// The explicit required list names a parameter that does not exist.
    #[error("Function '{function}' marks unknown parameter '{parameter}' as required")]
    UnknownRequired {
        /// Native name of the function.
        function: String,
        /// The unknown name.
        parameter: String,
    },

    /// The explicit required list leaves out a parameter that has neither a
    /// default nor an optional type, so no call could omit it.
    #[error("Function '{function}' leaves parameter '{parameter}' out of its required list, but it has no default")]
    UnlistedRequired {
        /// Native name of the function.
        function: String,
        /// The unlisted parameter.
        parameter: String,
    },

    /// The callable carries no function annotation.
    #[error("Callable '{0}' has no function annotation")]
    MissingAnnotation(String),

    /// The force words could not be compiled into a matcher.
    #[error("Force words of function '{function}' are invalid: {source}")]
    InvalidForceWords {
        /// Display name of the function.
        function: String,
        /// The regex build failure.
        #[source]
        source: regex::Error,
    },
}

impl RegistrationError {
    /// Returns whether this error means the callable lacks annotations, as
    /// opposed to being annotated incorrectly.
    #[must_use]
    pub fn is_unannotated(&self) -> bool {
        matches!(
            self,
            Self::MissingAnnotation(_) | Self::MissingTypeAnnotation { .. }
        )
    }
}

/// Errors raised while dispatching an invocation.
///
/// Recoverable errors (see [`is_recoverable`](Self::is_recoverable)) are
/// reported back to the model as text; the rest propagate to the host.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No function is registered under the requested name.
    #[error("{name} is not a valid function.")]
    UnknownFunction {
        /// The requested name.
        name: String,
        /// The raw arguments, rendered as text.
        arguments: String,
    },

    /// The invocation is not shaped like a function call or tool call.
    #[error("Malformed invocation: {0}")]
    MalformedInvocation(String),

    /// The arguments are neither a JSON object nor a string encoding one.
    #[error("args: {arguments} is {kind} not a string!")]
    InvalidArgumentType {
        /// Display name of the function.
        function: String,
        /// The raw arguments.
        arguments: String,
        /// JSON kind of the arguments.
        kind: &'static str,
    },

    /// The argument string could not be decoded as JSON.
    #[error("ArgDecodeError for '{function}': {message} at line {line} column {column}: `{near}`\n{arguments}")]
    ArgumentDecode {
        /// Display name of the function.
        function: String,
        /// The argument string after repair.
        arguments: String,
        /// Decoder message.
        message: String,
        /// 1-based line of the failure.
        line: usize,
        /// 1-based column of the failure.
        column: usize,
        /// Character at the failure position, if any.
        near: String,
    },

    /// A required argument is absent.
    #[error("Function '{function}' is missing required argument '{parameter}'")]
    MissingArgument {
        /// Display name of the function.
        function: String,
        /// The missing parameter.
        parameter: String,
    },

    /// An argument could not be coerced to its parameter type.
    #[error("Function '{function}': {source}")]
    Conversion {
        /// Display name of the function.
        function: String,
        /// The conversion failure.
        #[source]
        source: ConversionError,
    },

    /// A coroutine function was invoked through the synchronous entry point.
    #[error("Function '{0}' is a coroutine and must be called through the async entry point")]
    SyncCallOnCoroutine(String),

    /// The function itself failed.
    #[error("Function '{function}' failed: {source}")]
    Execution {
        /// Display name of the function.
        function: String,
        /// The failure reported by the function.
        #[source]
        source: FunctionError,
    },
}

impl DispatchError {
    /// Returns whether this error is reported to the model as text rather
    /// than propagated to the host.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::SyncCallOnCoroutine(_) | Self::Execution { .. }
        )
    }
}

/// Errors returned by registered callables.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// The callable asked for an argument the dispatcher did not supply.
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// The callable asked for an argument as a different type than declared.
    #[error("Argument '{parameter}' is not a {expected}")]
    ArgumentType {
        /// Name of the parameter.
        parameter: String,
        /// Rust type name the callable asked for.
        expected: &'static str,
    },

    /// The callable reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The return value could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FunctionError {
    /// Creates a [`Failed`](Self::Failed) error from any displayable error.
    pub fn failed(err: impl core::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}

/// Errors raised by [`SingleCall`](crate::single_call::SingleCall).
#[derive(Debug, Error)]
pub enum SingleCallError {
    /// The chat client failed.
    #[error("Chat client error: {0}")]
    Client(String),

    /// The completion response did not have the expected shape.
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    /// The response contained no tool calls.
    #[error("The API did not return any valid tool calls in the response.")]
    NoToolCalls,

    /// Dispatching a returned tool call failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
