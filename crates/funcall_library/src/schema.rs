//! Schema types exported to the model.
//!
//! [`FunctionSchema`] is the bare function-calling shape; [`ToolSchema`]
//! wraps it in the tool envelope used by newer protocol versions.

use crate::param::ParameterDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON Schema of a function's parameter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    /// Always `"object"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Property schemas keyed by parameter name, in declaration order.
    pub properties: Map<String, Value>,
    /// Names of required parameters, in declaration order.
    pub required: Vec<String>,
}

impl ParametersSchema {
    /// Builds the parameter object schema from resolved parameters.
    pub(crate) fn from_parameters(parameters: &[ParameterDescriptor]) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in parameters {
            properties.insert(param.name().to_string(), Value::Object(param.schema().clone()));
            if param.required() {
                required.push(param.name().to_string());
            }
        }

        Self {
            kind: "object".to_string(),
            properties,
            required,
        }
    }
}

/// Schema of one function: `{name, description, parameters}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Display name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// Parameter object schema.
    pub parameters: ParametersSchema,
}

impl FunctionSchema {
    /// Wraps this schema in the tool envelope.
    #[must_use]
    pub fn to_tool(&self) -> ToolSchema {
        ToolSchema {
            kind: "function".to_string(),
            function: self.clone(),
        }
    }

    /// Serializes this schema to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": self.parameters.kind,
                "properties": self.parameters.properties,
                "required": self.parameters.required,
            }
        })
    }
}

/// Tool envelope: `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The wrapped function schema.
    pub function: FunctionSchema,
}
