use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

use crate::errors::{LlamaError, LlamaResult};
use crate::request::Payload;

#[cfg(test)]
pub mod mock;

/// Raw response body chunks, in arrival order
pub type ByteStream = BoxStream<'static, LlamaResult<Bytes>>;

/// The HTTP boundary: a POST with a JSON body, answered by one JSON document or a byte
/// stream. Any non-success status must surface as `LlamaError::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, payload: &Payload) -> LlamaResult<Value>;

    async fn post_stream(&self, url: &str, payload: &Payload) -> LlamaResult<ByteStream>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> LlamaResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlamaError::config(format!("could not build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str, payload: &Payload) -> LlamaResult<Response> {
        tracing::debug!(
            url,
            model = %payload.model,
            stream = payload.stream,
            messages = payload.messages.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("could not read error body: {}", e));
            tracing::warn!(status = status.as_u16(), "chat request failed");
            return Err(LlamaError::Transport {
                status: Some(status.as_u16()),
                body,
            });
        }

        Ok(response)
    }
}

fn request_error(url: &str, error: reqwest::Error) -> LlamaError {
    let body = if error.is_connect() {
        format!("could not connect to {}: {}", url, error)
    } else if error.is_timeout() {
        format!("request to {} timed out", url)
    } else {
        error.to_string()
    };
    LlamaError::Transport { status: None, body }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, payload: &Payload) -> LlamaResult<Value> {
        let response = self.send(url, payload).await?;
        response
            .json()
            .await
            .map_err(|e| LlamaError::InvalidResponse {
                reason: format!("response body is not JSON: {}", e),
            })
    }

    async fn post_stream(&self, url: &str, payload: &Payload) -> LlamaResult<ByteStream> {
        let response = self.send(url, payload).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| LlamaError::Transport {
                    status: None,
                    body: format!("stream read error: {}", e),
                })
            })
            .boxed())
    }
}
