use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::ToolSpec;

/// Wire-level body of a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub model: String,
    pub stream: bool,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
}

/// Everything besides the model and the user message that shapes a payload
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadOptions<'a> {
    pub system_prompt: Option<&'a str>,
    pub conversation: &'a [Message],
    pub image: Option<&'a str>,
    pub tools: &'a [ToolSpec],
    pub stream: bool,
}

/// Assemble a request payload.
///
/// The prior conversation is copied, then a system message (when a non-empty prompt is
/// given) and the user message are appended in that order. Tools are attached only when
/// there are some.
pub fn build_payload(model: &str, message: &str, options: PayloadOptions<'_>) -> Payload {
    let mut messages = options.conversation.to_vec();

    if let Some(system_prompt) = options.system_prompt.filter(|prompt| !prompt.is_empty()) {
        messages.push(Message::system(system_prompt));
    }

    let mut user_message = Message::user(message);
    if let Some(image) = options.image {
        user_message = user_message.with_image(image);
    }
    messages.push(user_message);

    Payload {
        model: model.to_string(),
        stream: options.stream,
        messages,
        tools: tools_field(options.tools),
    }
}

/// Build a payload from an already assembled conversation without appending any turn
pub fn build_conversation_payload(
    model: &str,
    conversation: &[Message],
    tools: &[ToolSpec],
    stream: bool,
) -> Payload {
    Payload {
        model: model.to_string(),
        stream,
        messages: conversation.to_vec(),
        tools: tools_field(tools),
    }
}

fn tools_field(tools: &[ToolSpec]) -> Option<Vec<ToolSpec>> {
    if tools.is_empty() {
        None
    } else {
        Some(tools.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use serde_json::json;

    fn lookup_tool() -> ToolSpec {
        ToolSpec::function("lookup", "Look up a value", json!({"type": "object"}))
    }

    #[test]
    fn test_plain_message() {
        let payload = build_payload("llava", "2+2?", PayloadOptions::default());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llava",
                "stream": false,
                "messages": [{"role": "user", "content": "2+2?"}]
            })
        );
    }

    #[test]
    fn test_system_prompt_precedes_user_message() {
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let payload = build_payload(
            "llava",
            "2+2?",
            PayloadOptions {
                system_prompt: Some("be concise"),
                conversation: &history,
                ..Default::default()
            },
        );

        let roles: Vec<Role> = payload.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::System, Role::User]
        );
        assert_eq!(payload.messages[2].content, "be concise");
        assert_eq!(payload.messages[3].content, "2+2?");
        // the caller's history is copied, not extended
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_empty_system_prompt_is_ignored() {
        let payload = build_payload(
            "llava",
            "hi",
            PayloadOptions {
                system_prompt: Some(""),
                ..Default::default()
            },
        );
        assert_eq!(payload.messages.len(), 1);
    }

    #[test]
    fn test_image_attached_to_user_message() {
        let payload = build_payload(
            "llava",
            "describe",
            PayloadOptions {
                system_prompt: Some("vision"),
                image: Some("aGVsbG8="),
                ..Default::default()
            },
        );
        assert_eq!(payload.messages[0].images, None);
        assert_eq!(
            payload.messages[1].images,
            Some(vec!["aGVsbG8=".to_string()])
        );
    }

    #[test]
    fn test_tools_present_iff_non_empty() {
        let tools = vec![lookup_tool()];
        let with_tools = build_payload(
            "llava",
            "hi",
            PayloadOptions {
                tools: &tools,
                ..Default::default()
            },
        );
        assert_eq!(with_tools.tools, Some(tools.clone()));

        let without = build_payload("llava", "hi", PayloadOptions::default());
        let value = serde_json::to_value(&without).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_build_payload_is_deterministic() {
        let history = vec![Message::user("earlier")];
        let tools = vec![lookup_tool()];
        let options = PayloadOptions {
            system_prompt: Some("sys"),
            conversation: &history,
            image: Some("aGk="),
            tools: &tools,
            stream: true,
        };

        let first = build_payload("llava", "now", options);
        let second = build_payload("llava", "now", options);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_conversation_payload_appends_nothing() {
        let conversation = vec![Message::user("hi"), Message::assistant("hello")];
        let payload = build_conversation_payload("llava", &conversation, &[], false);
        assert_eq!(payload.messages, conversation);
        assert!(payload.tools.is_none());
    }
}
