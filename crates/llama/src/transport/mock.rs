use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{ByteStream, Transport};
use crate::errors::{LlamaError, LlamaResult};
use crate::request::Payload;

/// A scripted reply for one request
pub enum MockReply {
    Json(Value),
    Status(u16, String),
    /// Body chunks exactly as they should arrive from the network
    Chunks(Vec<LlamaResult<Bytes>>),
}

impl MockReply {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        MockReply::Chunks(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from(chunk.into())))
                .collect(),
        )
    }
}

/// A transport that returns pre-configured replies and records every payload it receives
#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    payloads: Arc<Mutex<Vec<Payload>>>,
}

impl MockTransport {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn payloads(&self) -> Vec<Payload> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    fn next_reply(&self, payload: &Payload) -> MockReply {
        self.payloads.lock().unwrap().push(payload.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left for request")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, _url: &str, payload: &Payload) -> LlamaResult<Value> {
        match self.next_reply(payload) {
            MockReply::Json(value) => Ok(value),
            MockReply::Status(status, body) => Err(LlamaError::Transport {
                status: Some(status),
                body,
            }),
            MockReply::Chunks(_) => panic!("streamed reply scripted for a non-streaming request"),
        }
    }

    async fn post_stream(&self, _url: &str, payload: &Payload) -> LlamaResult<ByteStream> {
        match self.next_reply(payload) {
            MockReply::Chunks(chunks) => Ok(stream::iter(chunks).boxed()),
            MockReply::Status(status, body) => Err(LlamaError::Transport {
                status: Some(status),
                body,
            }),
            MockReply::Json(_) => panic!("JSON reply scripted for a streaming request"),
        }
    }
}
