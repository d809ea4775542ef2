//! Dispatching model invocations onto registered functions.
//!
//! Every entry point follows the same pipeline:
//!
//! 1. Resolve the display name; an unknown name yields a fallback reply.
//! 2. Decode the arguments, repairing argument strings when enabled.
//! 3. Coerce each declared parameter through its converter.
//! 4. Call the function and normalize its return value to text.
//!
//! Failures in steps 2 and 3 are reported back as a [`Reply`] whose status
//! carries the typed error, because the model has no other way to recover.
//! Calling a coroutine through the synchronous entry point and failures
//! raised by the function itself propagate as `Err`.

use crate::context::CallContext;
use crate::error::DispatchError;
use crate::function::{Callable, FunctionDescriptor};
use crate::library::FunctionLibrary;
use crate::param::CallInput;
use crate::repair;
use crate::request::{Invocation, InvocationRequest, RawArguments, ToolCall};
use funcall_convert::json_kind;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Outcome of a dispatch that did not fail hard.
#[derive(Debug)]
pub enum ReplyStatus {
    /// The function ran.
    Success,
    /// No function matched the requested name.
    Fallback,
    /// The invocation was rejected before the function ran.
    Rejected(DispatchError),
}

/// Result of a dispatch, ready to be inserted into a transcript.
#[derive(Debug)]
pub struct Reply {
    /// Text for the model.
    pub content: String,
    /// The function's structured return value; `Null` unless it ran.
    pub value: Value,
    /// What happened.
    pub status: ReplyStatus,
}

impl Reply {
    fn success(value: Value) -> Self {
        let content = match &value {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            content,
            value,
            status: ReplyStatus::Success,
        }
    }

    fn rejected(error: DispatchError) -> Self {
        tracing::warn!(error = %error, "invocation rejected");
        Self {
            content: error.to_string(),
            value: Value::Null,
            status: ReplyStatus::Rejected(error),
        }
    }

    /// Returns whether the function ran.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ReplyStatus::Success)
    }

    /// Returns the rejection error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&DispatchError> {
        match &self.status {
            ReplyStatus::Rejected(error) => Some(error),
            _ => None,
        }
    }
}

/// Reply to a tool call, carrying the call id.
#[derive(Debug)]
pub struct ToolOutput {
    /// Id of the answered tool call.
    pub tool_call_id: Option<String>,
    /// Name of the invoked function.
    pub name: String,
    /// The dispatch reply.
    pub reply: Reply,
}

impl ToolOutput {
    /// Renders the tool output as a chat message.
    ///
    /// ```
    /// # use funcall_library::{FunctionLibrary, ToolCall, InvocationRequest};
    /// let library = FunctionLibrary::default();
    /// let call = ToolCall::new("call_1", InvocationRequest::new("missing", "{}"));
    /// let message = library.call_by_tool(&call).unwrap().to_message();
    /// assert_eq!(message["role"], "tool");
    /// assert_eq!(message["tool_call_id"], "call_1");
    /// ```
    #[must_use]
    pub fn to_message(&self) -> Value {
        let mut message = json!({
            "role": "tool",
            "name": self.name,
            "content": self.reply.content,
        });
        if let (Some(id), Some(object)) = (&self.tool_call_id, message.as_object_mut()) {
            object.insert("tool_call_id".to_string(), Value::String(id.clone()));
        }
        message
    }
}

impl FunctionLibrary {
    /// Dispatches an invocation to a blocking function.
    ///
    /// Fails with [`DispatchError::SyncCallOnCoroutine`] without running the
    /// function when the target is a coroutine.
    pub fn resolve_and_call(
        &self,
        request: &InvocationRequest,
        ctx: &CallContext,
    ) -> Result<Reply, DispatchError> {
        let Some(function) = self.functions.get(&request.name) else {
            return Ok(self.fallback(request));
        };
        let Callable::Blocking(call) = function.callable() else {
            return Err(DispatchError::SyncCallOnCoroutine(function.name().to_string()));
        };
        let input = match self.prepare(function, &request.arguments) {
            Ok(input) => input,
            Err(error) => return Ok(Reply::rejected(error)),
        };

        tracing::debug!(function = function.name(), "calling blocking function");
        let value = call(ctx, input).map_err(|source| DispatchError::Execution {
            function: function.name().to_string(),
            source,
        })?;
        Ok(Reply::success(value))
    }

    /// Dispatches an invocation to any function, awaiting coroutines.
    pub async fn resolve_and_call_async(
        &self,
        request: &InvocationRequest,
        ctx: &CallContext,
    ) -> Result<Reply, DispatchError> {
        let Some(function) = self.functions.get(&request.name) else {
            return Ok(self.fallback(request));
        };
        let input = match self.prepare(function, &request.arguments) {
            Ok(input) => input,
            Err(error) => return Ok(Reply::rejected(error)),
        };

        tracing::debug!(
            function = function.name(),
            coroutine = function.is_coroutine(),
            "calling function"
        );
        let result = match function.callable() {
            Callable::Blocking(call) => call(ctx, input),
            Callable::Coroutine(call) => call(ctx.clone(), input).await,
        };
        let value = result.map_err(|source| DispatchError::Execution {
            function: function.name().to_string(),
            source,
        })?;
        Ok(Reply::success(value))
    }

    /// Dispatches a JSON invocation, either a function call or a tool-call
    /// envelope, with an empty context.
    pub fn call_by_dict(&self, invocation: &Value) -> Result<Reply, DispatchError> {
        match Invocation::from_value(invocation) {
            Ok(invocation) => self.resolve_and_call(invocation.request(), &CallContext::default()),
            Err(error) => Ok(Reply::rejected(error)),
        }
    }

    /// Async counterpart of [`call_by_dict`](Self::call_by_dict).
    pub async fn call_by_dict_async(&self, invocation: &Value) -> Result<Reply, DispatchError> {
        match Invocation::from_value(invocation) {
            Ok(invocation) => {
                self.resolve_and_call_async(invocation.request(), &CallContext::default())
                    .await
            }
            Err(error) => Ok(Reply::rejected(error)),
        }
    }

    /// Dispatches a tool call with an empty context.
    pub fn call_by_tool(&self, call: &ToolCall) -> Result<ToolOutput, DispatchError> {
        let reply = self.resolve_and_call(&call.function, &CallContext::default())?;
        Ok(Self::tool_output(call, reply))
    }

    /// Async counterpart of [`call_by_tool`](Self::call_by_tool).
    pub async fn call_by_tool_async(&self, call: &ToolCall) -> Result<ToolOutput, DispatchError> {
        let reply = self
            .resolve_and_call_async(&call.function, &CallContext::default())
            .await?;
        Ok(Self::tool_output(call, reply))
    }

    fn tool_output(call: &ToolCall, reply: Reply) -> ToolOutput {
        ToolOutput {
            tool_call_id: call.id.clone(),
            name: call.function.name.clone(),
            reply,
        }
    }

    fn fallback(&self, request: &InvocationRequest) -> Reply {
        let arguments = request.arguments.to_text().replace("\\n", "\n");
        let arguments = truncate_chars(&arguments, self.config.fallback_max_chars);
        let error = DispatchError::UnknownFunction {
            name: request.name.clone(),
            arguments: arguments.to_string(),
        };
        tracing::warn!(function = %request.name, "unknown function requested");
        Reply {
            content: format!("{error}\n```{arguments}```"),
            value: Value::Null,
            status: ReplyStatus::Fallback,
        }
    }

    fn prepare(
        &self,
        function: &FunctionDescriptor,
        arguments: &RawArguments,
    ) -> Result<CallInput, DispatchError> {
        let arguments = self.decode(function.name(), arguments)?;
        coerce(function, &arguments)
    }

    fn decode(
        &self,
        function: &str,
        arguments: &RawArguments,
    ) -> Result<Map<String, Value>, DispatchError> {
        match arguments {
            RawArguments::Map(map) => Ok(map.clone()),
            RawArguments::Other(Value::Null) => Ok(Map::new()),
            RawArguments::Other(other) => Err(DispatchError::InvalidArgumentType {
                function: function.to_string(),
                arguments: other.to_string(),
                kind: json_kind(other),
            }),
            RawArguments::Text(text) => self.decode_text(function, text),
        }
    }

    fn decode_text(&self, function: &str, text: &str) -> Result<Map<String, Value>, DispatchError> {
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        let mut fixed = if self.config.repair_arguments {
            repair::repair(text)
        } else {
            text.to_string()
        };
        if self.config.evaluate_expressions {
            fixed = repair::evaluate_expressions(&fixed, self.evaluator.as_ref());
        }
        let fixed = repair::escape_control_characters(&fixed);
        if fixed != text {
            tracing::debug!(function, arguments = %fixed, "repaired argument string");
        }

        match serde_json::from_str::<Value>(&fixed) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Ok(Map::new()),
            Ok(other) => Err(DispatchError::InvalidArgumentType {
                function: function.to_string(),
                arguments: fixed,
                kind: json_kind(&other),
            }),
            Err(err) => {
                let (line, column) = (err.line(), err.column());
                let message = err.to_string();
                let message = message
                    .split(" at line ")
                    .next()
                    .unwrap_or_default()
                    .to_string();
                Err(DispatchError::ArgumentDecode {
                    function: function.to_string(),
                    near: repair::char_at(&fixed, line, column),
                    arguments: fixed,
                    message,
                    line,
                    column,
                })
            }
        }
    }
}

/// Coerces decoded arguments into call input. Null counts as absent;
/// arguments matching no parameter are ignored.
fn coerce(
    function: &FunctionDescriptor,
    arguments: &Map<String, Value>,
) -> Result<CallInput, DispatchError> {
    let mut values = HashMap::with_capacity(function.parameters().len());

    for param in function.parameters() {
        match arguments.get(param.name()) {
            None | Some(Value::Null) => {
                if param.required() {
                    return Err(DispatchError::MissingArgument {
                        function: function.name().to_string(),
                        parameter: param.name().to_string(),
                    });
                }
            }
            Some(raw) => {
                let value = param.convert(raw).map_err(|source| DispatchError::Conversion {
                    function: function.name().to_string(),
                    source,
                })?;
                tracing::debug!(
                    function = function.name(),
                    parameter = param.name(),
                    type_name = param.type_name(),
                    "converted argument"
                );
                values.insert(param.name().to_string(), value);
            }
        }
    }

    let ignored: Vec<&str> = arguments
        .keys()
        .map(String::as_str)
        .filter(|name| !function.parameters().iter().any(|p| p.name() == *name))
        .collect();
    if !ignored.is_empty() {
        tracing::debug!(function = function.name(), ?ignored, "ignoring unknown arguments");
    }

    Ok(CallInput::new(values))
}

/// Returns the longest prefix of `text` with at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibraryConfig;
    use crate::error::FunctionError;
    use crate::function::{FunctionAnnotation, FunctionDeclaration, to_output};
    use crate::param::ParamDeclaration;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ─────────────────────────────────────────────────────────────────────
    // Fixtures
    // ─────────────────────────────────────────────────────────────────────

    fn adder() -> FunctionDeclaration {
        FunctionDeclaration::blocking("add", |_ctx, mut input| {
            let a: i64 = input.take("a")?;
            let b: i64 = input.take_optional("b")?.unwrap_or(1);
            to_output(a + b)
        })
        .with_annotation(FunctionAnnotation::new("Add two integers."))
        .with_param(ParamDeclaration::typed::<i64>("a"))
        .with_param(ParamDeclaration::typed::<i64>("b").with_default(json!(1)))
    }

    fn library(config: LibraryConfig) -> FunctionLibrary {
        FunctionLibrary::builder()
            .with_config(config)
            .function(adder())
            .build()
            .unwrap()
    }

    fn call(library: &FunctionLibrary, name: &str, arguments: impl Into<RawArguments>) -> Reply {
        library
            .resolve_and_call(&InvocationRequest::new(name, arguments), &CallContext::default())
            .unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────
    // 1. Argument handling
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn applies_default_when_absent() {
        let library = library(LibraryConfig::default());
        let reply = call(&library, "add", r#"{"a": 2}"#);
        assert!(reply.is_success());
        assert_eq!(reply.content, "3");
        assert_eq!(reply.value, json!(3));
    }

    #[test]
    fn null_counts_as_absent() {
        let library = library(LibraryConfig::default());
        assert_eq!(call(&library, "add", r#"{"a": 2, "b": null}"#).content, "3");
        let reply = call(&library, "add", r#"{"a": null}"#);
        assert!(matches!(
            reply.error(),
            Some(DispatchError::MissingArgument { parameter, .. }) if parameter == "a"
        ));
    }

    #[test]
    fn unknown_arguments_are_ignored() {
        let library = library(LibraryConfig::default());
        assert_eq!(call(&library, "add", r#"{"a": 2, "b": 2, "c": 9}"#).content, "4");
    }

    #[test]
    fn whitespace_arguments_mean_no_arguments() {
        let library = library(LibraryConfig::default());
        let reply = call(&library, "add", "  ");
        assert!(matches!(reply.error(), Some(DispatchError::MissingArgument { .. })));
    }

    #[test]
    fn conversion_failure_is_reported_as_text() {
        let library = library(LibraryConfig::default());
        let reply = call(&library, "add", r#"{"a": "two"}"#);
        assert!(matches!(reply.error(), Some(DispatchError::Conversion { .. })));
        assert!(reply.content.contains("'a'"), "{}", reply.content);
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let library = library(LibraryConfig::default());
        let reply = call(&library, "add", json!([1, 2]));
        assert!(matches!(
            reply.error(),
            Some(DispatchError::InvalidArgumentType { kind: "array", .. })
        ));
        let reply = call(&library, "add", "[1, 2]");
        assert!(matches!(
            reply.error(),
            Some(DispatchError::InvalidArgumentType { kind: "array", .. })
        ));
    }

    #[test]
    fn decode_failure_reports_position() {
        let library = library(LibraryConfig::default());
        let reply = call(&library, "add", r#"{"a": 2,, }"#);
        let Some(DispatchError::ArgumentDecode { line, column, .. }) = reply.error() else {
            panic!("expected a decode error, got {:?}", reply.status);
        };
        assert_eq!(*line, 1);
        assert!(*column > 0);
    }

    #[test]
    fn expressions_are_evaluated_when_enabled() {
        let off = library(LibraryConfig::default());
        assert!(matches!(
            call(&off, "add", r#"{"a": 2*3, "b": 0}"#).error(),
            Some(DispatchError::ArgumentDecode { .. })
        ));

        let on = library(LibraryConfig::new().with_evaluate_expressions(true));
        assert_eq!(call(&on, "add", r#"{"a": 2*3, "b": 0}"#).content, "6");
    }

    // ─────────────────────────────────────────────────────────────────────
    // 2. Fallbacks and hard failures
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn unknown_function_falls_back() {
        let library = library(LibraryConfig::default());
        let reply = call(&library, "fly", r#"{"to": "moon"}"#);
        assert!(matches!(reply.status, ReplyStatus::Fallback));
        assert_eq!(reply.content, "fly is not a valid function.\n```{\"to\": \"moon\"}```");
    }

    #[test]
    fn fallback_truncates_arguments() {
        let library = library(LibraryConfig::new().with_fallback_max_chars(4));
        let reply = call(&library, "fly", "ééééééé");
        assert_eq!(reply.content, "fly is not a valid function.\n```éééé```");
    }

    #[test]
    fn execution_failure_propagates() {
        let library = FunctionLibrary::builder()
            .function(
                FunctionDeclaration::blocking("boom", |_ctx, _input| {
                    Err(FunctionError::failed("kaboom"))
                })
                .with_annotation(FunctionAnnotation::new("Fails.")),
            )
            .build()
            .unwrap();
        let err = library
            .resolve_and_call(&InvocationRequest::new("boom", "{}"), &CallContext::default())
            .unwrap_err();
        assert!(matches!(err, DispatchError::Execution { .. }));
    }

    #[test]
    fn sync_entry_point_rejects_coroutines_without_running_them() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let library = FunctionLibrary::builder()
            .function(
                FunctionDeclaration::coroutine("wait", move |_ctx, _input| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { to_output("done") }
                })
                .with_annotation(FunctionAnnotation::new("Waits.")),
            )
            .build()
            .unwrap();
        let err = library
            .resolve_and_call(&InvocationRequest::new("wait", "{}"), &CallContext::default())
            .unwrap_err();
        assert!(matches!(err, DispatchError::SyncCallOnCoroutine(name) if name == "wait"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn tool_output_message_omits_missing_id() {
        let output = ToolOutput {
            tool_call_id: None,
            name: "f".into(),
            reply: Reply::success(json!("ok")),
        };
        assert_eq!(
            output.to_message(),
            json!({"role": "tool", "name": "f", "content": "ok"})
        );
    }
}
