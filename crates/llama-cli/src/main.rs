use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Parser, Subcommand};
use console::style;
use dotenv::dotenv;
use futures::StreamExt;
use serde_json::{json, Value};
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use llama::handlers::tool::DEFAULT_MAX_ITERATIONS;
use llama::models::tool::{ToolInvocation, ToolSpec};
use llama::{Client, Connection, PromptOptions, ToolError, ToolExecutor, ToolOptions};

mod configuration;
mod error;

use configuration::Settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML), defaults to config/configuration.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model to use instead of the configured default
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key (can also be set via LLAMA_API_KEY environment variable)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Log requests and stream progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message and print the reply
    Send {
        message: String,
        #[arg(long)]
        system: Option<String>,
    },
    /// Print the reply as it is generated
    Stream {
        message: String,
        #[arg(long)]
        system: Option<String>,
    },
    /// Ask about an image file
    Image {
        message: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        system: Option<String>,
    },
    /// Let the model call the built-in count_words tool
    Tools {
        message: String,
        #[arg(long)]
        system: Option<String>,
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "llama=debug,warn" } else { "warn" });

    let settings =
        Settings::new(cli.config.as_deref()).context("Failed to load configuration")?;
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| env::var("LLAMA_API_KEY").ok())
        .unwrap_or_default();
    let connection = Connection::new(
        settings.into_connection_config(),
        &api_key,
        cli.model.as_deref(),
    )
    .context("Failed to open connection")?;
    let client = Client::new(connection)?;

    match cli.command {
        Command::Send { message, system } => {
            let reply = client.send(&message, &prompt_options(system)).await?;
            println!("{}", reply);
        }
        Command::Stream { message, system } => {
            let mut events = client.stream(&message, &prompt_options(system)).await?;
            let mut stdout = std::io::stdout();
            while let Some(event) = events.next().await {
                let event = event.context("Stream interrupted")?;
                write!(stdout, "{}", event.content)?;
                stdout.flush()?;
            }
            println!();
        }
        Command::Image {
            message,
            file,
            system,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read image {}", file.display()))?;
            let image = BASE64.encode(bytes);
            let reply = client
                .send_with_image(&message, &image, &prompt_options(system))
                .await?;
            println!("{}", reply);
        }
        Command::Tools {
            message,
            system,
            max_iterations,
        } => {
            let mut options = ToolOptions::new(vec![count_words_spec()])
                .with_executor(Arc::new(BuiltinTools))
                .with_max_iterations(max_iterations);
            if let Some(system) = system {
                options = options.with_system_prompt(system);
            }

            let outcome = client.send_with_tools(&message, &options).await?;
            for call in &outcome.tool_calls {
                println!(
                    "{}",
                    style(format!("{}({}) -> {}", call.name, call.arguments, call.result)).dim()
                );
            }
            println!("{}", outcome.content);
        }
    }
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn prompt_options(system: Option<String>) -> PromptOptions {
    PromptOptions {
        system_prompt: system,
        ..Default::default()
    }
}

fn count_words_spec() -> ToolSpec {
    ToolSpec::function(
        "count_words",
        "Count the number of words in text",
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to count words in"
                }
            },
            "required": ["text"]
        }),
    )
}

struct BuiltinTools;

#[async_trait]
impl ToolExecutor for BuiltinTools {
    async fn execute(&self, invocation: ToolInvocation) -> Result<Value, ToolError> {
        match invocation.name.as_str() {
            "count_words" => {
                let text = invocation
                    .arguments
                    .get("text")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ToolError::InvalidParameters("text is required".to_string()))?;
                Ok(json!({ "count": text.split_whitespace().count() }))
            }
            other => Err(ToolError::ToolNotFound(other.to_string())),
        }
    }
}
