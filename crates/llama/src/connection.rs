use std::time::Duration;

use crate::errors::{LlamaError, LlamaResult};

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_ENDPOINT: &str = "/api/chat";
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved connection settings, built once by the calling application.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub host: String,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    /// Pre-shared key that callers must present to open a connection
    pub api_key: String,
}

impl ConnectionConfig {
    pub fn new<H, M, K>(host: H, model: M, api_key: K) -> Self
    where
        H: Into<String>,
        M: Into<String>,
        K: Into<String>,
    {
        Self {
            host: host.into(),
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An authorized, immutable view of where and how to reach the chat service
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    host: String,
    api_url: String,
    model: String,
    timeout: Duration,
}

impl Connection {
    /// Check `api_key` against the configured key and resolve the endpoint.
    ///
    /// `model` overrides the configured default model when given.
    pub fn new(config: ConnectionConfig, api_key: &str, model: Option<&str>) -> LlamaResult<Self> {
        if api_key.is_empty() {
            return Err(LlamaError::config("API key missing"));
        }
        if api_key != config.api_key {
            return Err(LlamaError::config("API key does not match the configured key"));
        }
        if config.host.trim().is_empty() {
            return Err(LlamaError::config("host missing"));
        }

        let model = match model {
            Some(model) if !model.is_empty() => model.to_string(),
            _ => config.model,
        };
        if model.is_empty() {
            return Err(LlamaError::config("model missing"));
        }

        let host = config.host.trim_end_matches('/').to_string();
        let api_url = format!("{}{}", host, config.endpoint);

        tracing::info!(host = %host, model = %model, "connected to chat service");

        Ok(Self {
            host,
            api_url,
            model,
            timeout: config.timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
