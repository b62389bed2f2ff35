pub mod client;
pub mod connection;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod request;
pub mod transport;
pub mod validator;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use errors::{LlamaError, LlamaResult, ToolError};
pub use handlers::prompt::PromptOptions;
pub use handlers::stream::{StreamChunkEvent, StreamOptions};
pub use handlers::tool::{ToolExecutor, ToolOptions, ToolOutcome};
