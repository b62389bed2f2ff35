//! Precondition checks run before any request leaves the client.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::{LlamaError, LlamaResult};
use crate::models::tool::ToolSpec;

lazy_static! {
    static ref BASE64_ALPHABET: Regex = Regex::new(r"^[A-Za-z0-9+/=]+$").unwrap();
}

pub fn validate_message(message: &str) -> LlamaResult<()> {
    if message.is_empty() {
        return Err(LlamaError::validation(
            "message",
            "must be a non-empty string",
        ));
    }
    Ok(())
}

pub fn validate_base64_image(image: &str) -> LlamaResult<()> {
    if image.is_empty() {
        return Err(LlamaError::validation("image", "must be a base64 string"));
    }
    if !BASE64_ALPHABET.is_match(image) {
        return Err(LlamaError::validation("image", "is not valid base64"));
    }
    Ok(())
}

/// Check every tool spec has the function type, a name and a parameter schema
pub fn validate_tools(tools: &[ToolSpec]) -> LlamaResult<()> {
    let mut names = HashSet::new();

    for tool in tools {
        if tool.kind != "function" {
            return Err(LlamaError::validation(
                "tools",
                format!("tool type must be \"function\", got \"{}\"", tool.kind),
            ));
        }
        if tool.function.name.is_empty() {
            return Err(LlamaError::validation("tools", "tool must have function.name"));
        }
        if matches!(tool.function.parameters, None | Some(Value::Null)) {
            return Err(LlamaError::validation(
                "tools",
                format!("tool {} must have function.parameters", tool.function.name),
            ));
        }
        if !names.insert(tool.function.name.as_str()) {
            return Err(LlamaError::validation(
                "tools",
                format!("duplicate tool name: {}", tool.function.name),
            ));
        }
    }

    Ok(())
}

pub fn validate_max_iterations(max_iterations: usize) -> LlamaResult<()> {
    if max_iterations == 0 {
        return Err(LlamaError::validation(
            "max_iterations",
            "must be at least 1",
        ));
    }
    Ok(())
}
