use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::prompt::PromptOptions;
use crate::connection::Connection;
use crate::errors::{LlamaError, LlamaResult};
use crate::models::message::Message;
use crate::request::{build_payload, PayloadOptions};
use crate::transport::Transport;
use crate::validator::validate_message;

/// One incremental unit of a streamed reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunkEvent {
    /// The new fragment, empty on the terminal event
    pub content: String,
    /// Everything received so far
    pub full_response: String,
    pub is_complete: bool,
}

/// Finite sequence of events for one streaming call. A successful stream ends with
/// exactly one event whose `is_complete` is set; a failed one ends with an error instead.
pub type EventStream = BoxStream<'static, LlamaResult<StreamChunkEvent>>;

pub type ChunkCallback = Box<dyn FnMut(&StreamChunkEvent) + Send>;

/// Options for a streaming exchange
#[derive(Default)]
pub struct StreamOptions {
    pub system_prompt: Option<String>,
    pub conversation: Vec<Message>,
    /// Invoked for every event, including the terminal one
    pub on_chunk: Option<ChunkCallback>,
}

impl StreamOptions {
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

    pub fn on_chunk<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&StreamChunkEvent) + Send + 'static,
    {
        self.on_chunk = Some(Box::new(callback));
        self
    }
}

/// Splits a byte stream into complete lines, holding back any unterminated tail until the
/// rest of it arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return every line it completes, skipping blank ones
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return Vec::new();
        };
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        // Decoding only whole lines keeps multi-byte characters split across reads intact
        String::from_utf8_lossy(&complete)
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    /// Return whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(default)]
    message: Option<StreamMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Content fragment carried by one NDJSON record, if any.
///
/// Lines that are not JSON objects of the expected shape are dropped.
fn record_fragment(line: &str) -> Option<String> {
    let record: StreamRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, line, "skipping unparseable stream record");
            return None;
        }
    };

    if let Some(error) = record.error {
        tracing::warn!(%error, "chat service reported an error mid-stream");
    }

    record
        .message
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
}

/// Turns raw response bytes into progress events and the accumulated reply.
#[derive(Debug, Default)]
pub struct StreamParser {
    lines: LineBuffer,
    full_response: String,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_response(&self) -> &str {
        &self.full_response
    }

    /// Consume one read from the network
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamChunkEvent> {
        let lines = self.lines.push(chunk);
        lines
            .iter()
            .filter_map(|line| self.accept(line))
            .collect()
    }

    /// Flush any unterminated last record and emit the terminal event
    pub fn finish(mut self) -> Vec<StreamChunkEvent> {
        let mut events = Vec::new();
        if let Some(line) = self.lines.finish() {
            events.extend(self.accept(&line));
        }
        events.push(StreamChunkEvent {
            content: String::new(),
            full_response: self.full_response,
            is_complete: true,
        });
        events
    }

    fn accept(&mut self, line: &str) -> Option<StreamChunkEvent> {
        let content = record_fragment(line)?;
        self.full_response.push_str(&content);
        Some(StreamChunkEvent {
            content,
            full_response: self.full_response.clone(),
            is_complete: false,
        })
    }
}

#[derive(Clone)]
pub struct StreamHandler {
    connection: Arc<Connection>,
    transport: Arc<dyn Transport>,
}

impl StreamHandler {
    pub fn new(connection: Arc<Connection>, transport: Arc<dyn Transport>) -> Self {
        Self {
            connection,
            transport,
        }
    }

    /// Start a streaming exchange.
    ///
    /// Validation and the request itself happen before this returns, so input and HTTP
    /// status errors never show up inside the event stream.
    pub async fn stream(&self, message: &str, options: &PromptOptions) -> LlamaResult<EventStream> {
        validate_message(message)?;

        let payload = build_payload(
            self.connection.model(),
            message,
            PayloadOptions {
                stream: true,
                ..options.payload_options()
            },
        );
        let mut bytes = self
            .transport
            .post_stream(self.connection.api_url(), &payload)
            .await?;

        let events = async_stream::stream! {
            let mut parser = StreamParser::new();

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for event in parser.feed(&chunk) {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, received = parser.full_response().len(), "stream interrupted");
                        yield Err::<StreamChunkEvent, LlamaError>(e);
                        return;
                    }
                }
            }

            for event in parser.finish() {
                yield Ok(event);
            }
        };

        Ok(events.boxed())
    }

    /// Stream a reply, reporting every event to `options.on_chunk`, and return the full text
    pub async fn send_stream(&self, message: &str, options: StreamOptions) -> LlamaResult<String> {
        let StreamOptions {
            system_prompt,
            conversation,
            mut on_chunk,
        } = options;
        let prompt_options = PromptOptions {
            system_prompt,
            conversation,
        };

        let mut events = self.stream(message, &prompt_options).await?;
        let mut full_response = String::new();

        while let Some(event) = events.next().await {
            let event = event?;
            if let Some(callback) = on_chunk.as_mut() {
                callback(&event);
            }
            if event.is_complete {
                full_response = event.full_response;
            }
        }

        Ok(full_response)
    }
}
