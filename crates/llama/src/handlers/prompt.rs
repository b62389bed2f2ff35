use std::sync::Arc;

use super::response_content;
use crate::connection::Connection;
use crate::errors::LlamaResult;
use crate::models::message::Message;
use crate::request::{build_payload, PayloadOptions};
use crate::transport::Transport;
use crate::validator::validate_message;

/// Options for a single request/response exchange
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptOptions {
    /// Appended as a system message just before the user message
    pub system_prompt: Option<String>,
    /// Prior turns sent ahead of the new message
    pub conversation: Vec<Message>,
}

impl PromptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_conversation(mut self, conversation: Vec<Message>) -> Self {
        self.conversation = conversation;
        self
    }

    pub(crate) fn payload_options(&self) -> PayloadOptions<'_> {
        PayloadOptions {
            system_prompt: self.system_prompt.as_deref(),
            conversation: &self.conversation,
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct PromptHandler {
    connection: Arc<Connection>,
    transport: Arc<dyn Transport>,
}

impl PromptHandler {
    pub fn new(connection: Arc<Connection>, transport: Arc<dyn Transport>) -> Self {
        Self {
            connection,
            transport,
        }
    }

    /// Send one message and return the model's reply text
    pub async fn send(&self, message: &str, options: &PromptOptions) -> LlamaResult<String> {
        validate_message(message)?;

        let payload = build_payload(self.connection.model(), message, options.payload_options());
        let response = self
            .transport
            .post(self.connection.api_url(), &payload)
            .await?;

        Ok(response_content(&response))
    }
}
