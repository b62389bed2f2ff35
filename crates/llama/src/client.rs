use std::sync::Arc;

use crate::connection::Connection;
use crate::errors::LlamaResult;
use crate::handlers::image::ImageHandler;
use crate::handlers::prompt::{PromptHandler, PromptOptions};
use crate::handlers::stream::{EventStream, StreamHandler, StreamOptions};
use crate::handlers::tool::{ToolHandler, ToolOptions, ToolOutcome};
use crate::transport::{HttpTransport, Transport};

/// Entry point for talking to a chat service.
///
/// Cloning is cheap and clones share the same connection, so one client can back any
/// number of concurrent, independent calls.
#[derive(Clone)]
pub struct Client {
    connection: Arc<Connection>,
    prompt: PromptHandler,
    stream: StreamHandler,
    image: ImageHandler,
    tool: ToolHandler,
}

impl Client {
    /// Create a client that talks HTTP, honoring the connection's timeout
    pub fn new(connection: Connection) -> LlamaResult<Self> {
        let transport = HttpTransport::new(connection.timeout())?;
        Ok(Self::with_transport(connection, Arc::new(transport)))
    }

    pub fn with_transport(connection: Connection, transport: Arc<dyn Transport>) -> Self {
        let connection = Arc::new(connection);
        Self {
            prompt: PromptHandler::new(connection.clone(), transport.clone()),
            stream: StreamHandler::new(connection.clone(), transport.clone()),
            image: ImageHandler::new(connection.clone(), transport.clone()),
            tool: ToolHandler::new(connection.clone(), transport),
            connection,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Send a message and wait for the complete reply
    pub async fn send(&self, message: &str, options: &PromptOptions) -> LlamaResult<String> {
        self.prompt.send(message, options).await
    }

    /// Stream a reply through `options.on_chunk` and return the assembled text
    pub async fn send_stream(&self, message: &str, options: StreamOptions) -> LlamaResult<String> {
        self.stream.send_stream(message, options).await
    }

    /// Stream a reply as a sequence of events
    pub async fn stream(&self, message: &str, options: &PromptOptions) -> LlamaResult<EventStream> {
        self.stream.stream(message, options).await
    }

    /// Send a message together with one base64 encoded image
    pub async fn send_with_image(
        &self,
        message: &str,
        image: &str,
        options: &PromptOptions,
    ) -> LlamaResult<String> {
        self.image.send_with_image(message, image, options).await
    }

    /// Send a message, letting the model call the given tools between rounds
    pub async fn send_with_tools(
        &self,
        message: &str,
        options: &ToolOptions,
    ) -> LlamaResult<ToolOutcome> {
        self.tool.send_with_tools(message, options).await
    }
}
