use std::sync::Arc;

use super::prompt::PromptOptions;
use super::response_content;
use crate::connection::Connection;
use crate::errors::LlamaResult;
use crate::request::{build_payload, PayloadOptions};
use crate::transport::Transport;
use crate::validator::{validate_base64_image, validate_message};

#[derive(Clone)]
pub struct ImageHandler {
    connection: Arc<Connection>,
    transport: Arc<dyn Transport>,
}

impl ImageHandler {
    pub fn new(connection: Arc<Connection>, transport: Arc<dyn Transport>) -> Self {
        Self {
            connection,
            transport,
        }
    }

    /// Send a message with one base64 encoded image attached to the user turn
    pub async fn send_with_image(
        &self,
        message: &str,
        image: &str,
        options: &PromptOptions,
    ) -> LlamaResult<String> {
        validate_message(message)?;
        validate_base64_image(image)?;

        let payload = build_payload(
            self.connection.model(),
            message,
            PayloadOptions {
                image: Some(image),
                ..options.payload_options()
            },
        );
        let response = self
            .transport
            .post(self.connection.api_url(), &payload)
            .await?;

        Ok(response_content(&response))
    }
}
