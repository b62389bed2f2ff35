use thiserror::Error;

/// Failures surfaced by the client. Everything here aborts the current operation;
/// recoverable conditions (malformed stream records, failing tools) never reach callers
/// through this type.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlamaError {
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{}", transport_message(.status, .body))]
    Transport { status: Option<u16>, body: String },

    #[error("Invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Max tool iterations ({max_iterations}) reached")]
    MaxIterations { max_iterations: usize },
}

fn transport_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(status) => format!("LLM error {}: {}", status, body),
        None => format!("Transport failure: {}", body),
    }
}

impl LlamaError {
    pub fn config<S: Into<String>>(reason: S) -> Self {
        LlamaError::Config {
            reason: reason.into(),
        }
    }

    pub fn validation<S: Into<String>>(field: &'static str, reason: S) -> Self {
        LlamaError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// HTTP status of a transport failure, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            LlamaError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

pub type LlamaResult<T> = Result<T, LlamaError>;

/// Failure reported by a tool executor. Captured into the tool result sent back to the
/// model rather than propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}
