use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::borrow::Cow;

/// A capability the model may invoke, in the OpenAI-compatible `tools` format.
///
/// Fields that must be present for a valid spec are still optional here so that
/// caller-supplied JSON always deserializes and the validator can report what is wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments the function accepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolSpec {
    /// Create a function tool with the given name, description and parameter schema
    pub fn function<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolSpec {
            kind: "function".to_string(),
            function: FunctionSpec {
                name: name.into(),
                description: Some(description.into()),
                parameters: Some(parameters),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// A tool call requested by the model inside an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments exactly as the model sent them: an encoded string from
    /// OpenAI-compatible servers, an object from Ollama
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new<N: Into<String>, A: Into<Value>>(name: N, arguments: A) -> Self {
        ToolCall {
            id: None,
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Arguments as JSON text, verbatim when the model sent a string
    pub fn arguments(&self) -> Cow<'_, str> {
        match &self.function.arguments {
            Value::String(arguments) => Cow::Borrowed(arguments),
            Value::Null => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Arguments as a JSON value. Missing or blank arguments parse as `{}`.
    pub fn parsed_arguments(&self) -> Result<Value, serde_json::Error> {
        match &self.function.arguments {
            Value::Null => Ok(json!({})),
            Value::String(arguments) if arguments.trim().is_empty() => Ok(json!({})),
            Value::String(arguments) => serde_json::from_str(arguments),
            other => Ok(other.clone()),
        }
    }
}

/// What a tool executor receives for a single call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

/// One executed tool call, as reported back to the caller after a tool-enabled exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    /// Raw argument string from the model
    pub arguments: String,
    /// Value returned by the executor, or an `{"error": ...}` wrapper
    pub result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_spec_serialization() {
        let spec = ToolSpec::function(
            "lookup",
            "Look up a value",
            json!({"type": "object", "properties": {"q": {"type": "string"}}}),
        );
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "lookup");
        assert_eq!(value["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_tool_spec_without_parameters_deserializes() {
        let spec: ToolSpec =
            serde_json::from_value(json!({"type": "function", "function": {"name": "x"}}))
                .unwrap();
        assert_eq!(spec.name(), "x");
        assert!(spec.function.parameters.is_none());
    }

    #[test]
    fn test_object_arguments_keep_their_shape() {
        let wire = json!({"function": {"name": "lookup", "arguments": {"q": "x"}}});
        let call: ToolCall = serde_json::from_value(wire.clone()).unwrap();

        assert_eq!(call.arguments(), "{\"q\":\"x\"}");
        assert_eq!(call.parsed_arguments().unwrap(), json!({"q": "x"}));
        assert_eq!(serde_json::to_value(&call).unwrap(), wire);
    }

    #[test]
    fn test_missing_and_blank_arguments() {
        let call: ToolCall =
            serde_json::from_value(json!({"function": {"name": "now"}})).unwrap();
        assert_eq!(call.arguments(), "");
        assert_eq!(call.parsed_arguments().unwrap(), json!({}));
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({"function": {"name": "now"}})
        );

        assert_eq!(ToolCall::new("now", " ").parsed_arguments().unwrap(), json!({}));
        assert!(ToolCall::new("now", "{oops").parsed_arguments().is_err());
    }

    #[test]
    fn test_string_arguments_are_kept_verbatim() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "function": {"name": "lookup", "arguments": "{ \"q\": \"x\" }"}
        }))
        .unwrap();
        assert_eq!(call.id.as_deref(), Some("call_1"));
        assert_eq!(call.arguments(), "{ \"q\": \"x\" }");
        assert_eq!(
            serde_json::to_value(&call).unwrap()["function"]["arguments"],
            "{ \"q\": \"x\" }"
        );
    }
}
