use serde_json::Value;

pub mod image;
pub mod prompt;
pub mod stream;
pub mod tool;

/// Text of `message.content` in a chat response, empty when absent
fn response_content(response: &Value) -> String {
    response
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .unwrap_or_default()
        .to_string()
}
