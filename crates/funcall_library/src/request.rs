//! Invocation requests as received from the model.

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw arguments of an invocation.
///
/// Models send arguments as a JSON-encoded string; hosts may also pass an
/// already decoded object. Anything else is kept as-is and rejected at
/// dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArguments {
    /// A JSON-encoded argument object.
    Text(String),
    /// A decoded argument object.
    Map(Map<String, Value>),
    /// Any other JSON value.
    Other(Value),
}

impl Default for RawArguments {
    fn default() -> Self {
        Self::Map(Map::new())
    }
}

impl RawArguments {
    /// Renders the arguments as text, for fallback replies and errors.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Map(map) => Value::Object(map.clone()).to_string(),
            Self::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for RawArguments {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RawArguments {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Map<String, Value>> for RawArguments {
    fn from(map: Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<Value> for RawArguments {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(map) => Self::Map(map),
            other => Self::Other(other),
        }
    }
}

/// A function invocation: `{"name": ..., "arguments": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Display name of the target function.
    pub name: String,
    /// Raw arguments; absent arguments decode to an empty object.
    #[serde(default)]
    pub arguments: RawArguments,
}

impl InvocationRequest {
    /// Creates a request.
    pub fn new(name: impl Into<String>, arguments: impl Into<RawArguments>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A tool-call envelope: `{"id"?, "type": "function", "function": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier echoed back in the tool output message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `"function"`.
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    /// The wrapped invocation.
    pub function: InvocationRequest,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Creates a tool call wrapping `function`.
    pub fn new(id: impl Into<String>, function: InvocationRequest) -> Self {
        Self {
            id: Some(id.into()),
            kind: function_kind(),
            function,
        }
    }
}

/// Either invocation shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Invocation {
    /// A tool-call envelope.
    Tool(ToolCall),
    /// A bare function call.
    Function(InvocationRequest),
}

impl Invocation {
    /// Parses an invocation from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, DispatchError> {
        Self::deserialize(value).map_err(|err| DispatchError::MalformedInvocation(err.to_string()))
    }

    /// The tool-call id, if this is a tool call that carries one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Tool(call) => call.id.as_deref(),
            Self::Function(_) => None,
        }
    }

    /// The function invocation.
    #[must_use]
    pub fn request(&self) -> &InvocationRequest {
        match self {
            Self::Tool(call) => &call.function,
            Self::Function(request) => request,
        }
    }
}
