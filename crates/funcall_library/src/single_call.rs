//! One-shot chat completion with forced tool dispatch.
//!
//! [`SingleCall`] sends a single user prompt with the library's tool schema
//! to a host-provided chat client and dispatches every tool call in the
//! response. The client is the only network-facing piece and stays with the
//! host.

use crate::dispatch::ToolOutput;
use crate::error::SingleCallError;
use crate::library::FunctionLibrary;
use crate::request::ToolCall;
use core::future::Future;
use core::pin::Pin;
use core::time::Duration;
use serde_json::{Value, json};

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A blocking chat-completion client.
pub trait ChatClient {
    /// Sends a request body and returns the completion response.
    fn create(&self, request: &Value) -> Result<Value, SingleCallError>;
}

/// An async chat-completion client.
pub trait AsyncChatClient: Send + Sync {
    /// Sends a request body and returns the completion response.
    fn create<'a>(
        &'a self,
        request: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, SingleCallError>> + Send + 'a>>;
}

/// Which tool the model may or must call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides.
    #[default]
    Auto,
    /// The model must not call a tool.
    None,
    /// The model must call some tool.
    Required,
    /// The model must call the named function.
    Function(String),
}

impl ToolChoice {
    /// Renders the choice in request form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Auto => json!("auto"),
            Self::None => json!("none"),
            Self::Required => json!("required"),
            Self::Function(name) => json!({"type": "function", "function": {"name": name}}),
        }
    }
}

/// Issues a single completion request and dispatches its tool calls.
///
/// Works with a [`ChatClient`] through [`call_single`](Self::call_single)
/// and with an [`AsyncChatClient`] through
/// [`call_single_async`](Self::call_single_async).
#[derive(Debug)]
pub struct SingleCall<'a, C> {
    library: &'a FunctionLibrary,
    client: C,
    model: String,
    system_prompt: String,
    timeout: Option<Duration>,
}

impl<'a, C> SingleCall<'a, C> {
    /// Creates a single-call helper with the default model and prompt.
    pub fn new(library: &'a FunctionLibrary, client: C) -> Self {
        Self {
            library,
            client,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: None,
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the request timeout passed to the client.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the completion request body.
    #[must_use]
    pub fn request_body(&self, user_prompt: &str, tool_choice: &ToolChoice) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "tools": self.library.get_tool_schema(),
            "tool_choice": tool_choice.to_value(),
        });
        if let (Some(timeout), Some(object)) = (self.timeout, body.as_object_mut()) {
            object.insert("timeout".to_string(), json!(timeout.as_secs_f64()));
        }
        body
    }
}

impl<C: ChatClient> SingleCall<'_, C> {
    /// Sends the prompt and dispatches every returned tool call.
    pub fn call_single(
        &self,
        user_prompt: &str,
        tool_choice: &ToolChoice,
    ) -> Result<Vec<ToolOutput>, SingleCallError> {
        let response = self
            .client
            .create(&self.request_body(user_prompt, tool_choice))?;
        tool_calls(&response)?
            .iter()
            .map(|call| self.library.call_by_tool(call).map_err(SingleCallError::from))
            .collect()
    }
}

impl<C: AsyncChatClient> SingleCall<'_, C> {
    /// Async counterpart of [`call_single`](SingleCall::call_single).
    pub async fn call_single_async(
        &self,
        user_prompt: &str,
        tool_choice: &ToolChoice,
    ) -> Result<Vec<ToolOutput>, SingleCallError> {
        let body = self.request_body(user_prompt, tool_choice);
        let response = self.client.create(&body).await?;
        let calls = tool_calls(&response)?;
        let mut outputs = Vec::with_capacity(calls.len());
        for call in &calls {
            outputs.push(self.library.call_by_tool_async(call).await?);
        }
        Ok(outputs)
    }
}

/// Extracts the tool calls of the first choice.
fn tool_calls(response: &Value) -> Result<Vec<ToolCall>, SingleCallError> {
    let message = response
        .pointer("/choices/0/message")
        .ok_or_else(|| SingleCallError::MalformedResponse("missing choices[0].message".into()))?;
    let calls = match message.get("tool_calls") {
        Some(Value::Array(calls)) if !calls.is_empty() => calls,
        _ => return Err(SingleCallError::NoToolCalls),
    };
    calls
        .iter()
        .map(|call| {
            serde_json::from_value(call.clone())
                .map_err(|err| SingleCallError::MalformedResponse(err.to_string()))
        })
        .collect()
}
