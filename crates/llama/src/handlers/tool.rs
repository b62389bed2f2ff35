use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::connection::Connection;
use crate::errors::{LlamaError, LlamaResult, ToolError};
use crate::models::message::{Conversation, Message};
use crate::models::tool::{ToolCall, ToolCallRecord, ToolInvocation, ToolSpec};
use crate::request::{build_conversation_payload, build_payload, Payload, PayloadOptions};
use crate::transport::Transport;
use crate::validator::{validate_max_iterations, validate_message, validate_tools};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Runs the tools the model asks for
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, invocation: ToolInvocation) -> Result<Value, ToolError>;
}

/// Adapts a plain closure into a `ToolExecutor`
pub struct FnExecutor<F>(pub F);

#[async_trait]
impl<F> ToolExecutor for FnExecutor<F>
where
    F: Fn(ToolInvocation) -> Result<Value, ToolError> + Send + Sync,
{
    async fn execute(&self, invocation: ToolInvocation) -> Result<Value, ToolError> {
        (self.0)(invocation)
    }
}

/// Options for a tool-enabled exchange
#[derive(Clone)]
pub struct ToolOptions {
    /// Sent on the first round only
    pub system_prompt: Option<String>,
    pub conversation: Vec<Message>,
    /// Offered to the model on every round
    pub tools: Vec<ToolSpec>,
    /// Without one, every requested call gets an error result
    pub executor: Option<Arc<dyn ToolExecutor>>,
    pub max_iterations: usize,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            conversation: Vec::new(),
            tools: Vec::new(),
            executor: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ToolOptions {
    pub fn new(tools: Vec<ToolSpec>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_conversation(mut self, conversation: Vec<Message>) -> Self {
        self.conversation = conversation;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_executor_fn<F>(self, executor: F) -> Self
    where
        F: Fn(ToolInvocation) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.with_executor(Arc::new(FnExecutor(executor)))
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Result of a tool-enabled exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Text of the final, tool-free assistant message
    pub content: String,
    /// Every executed call, in execution order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model rounds it took
    pub iterations: usize,
    /// The full working transcript, ending with the final assistant message
    pub conversation: Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolLoopState {
    AwaitingModelResponse,
    ExecutingTools,
    Done,
    Failed,
}

/// Round bookkeeping for the tool-calling conversation, independent of any transport.
///
/// A round starts with `begin_round`, which fails once the round budget is spent. The
/// model's reply goes to `receive_response`; if it requests tools, their results go to
/// `complete_tools` before the next round can begin.
#[derive(Debug)]
pub struct ToolLoop {
    state: ToolLoopState,
    round: usize,
    max_iterations: usize,
    conversation: Conversation,
    pending: Vec<ToolCall>,
    records: Vec<ToolCallRecord>,
    content: String,
}

impl ToolLoop {
    pub fn new(history: &[Message], message: &str, max_iterations: usize) -> Self {
        let mut conversation = history.to_vec();
        conversation.push(Message::user(message));

        Self {
            state: ToolLoopState::AwaitingModelResponse,
            round: 0,
            max_iterations,
            conversation,
            pending: Vec::new(),
            records: Vec::new(),
            content: String::new(),
        }
    }

    pub fn state(&self) -> ToolLoopState {
        self.state
    }

    /// Rounds started so far
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    /// Tool calls awaiting execution in the current round, in model order
    pub fn pending_calls(&self) -> &[ToolCall] {
        &self.pending
    }

    /// Start the next round, returning its 1-based number
    pub fn begin_round(&mut self) -> LlamaResult<usize> {
        debug_assert_eq!(self.state, ToolLoopState::AwaitingModelResponse);

        if self.round >= self.max_iterations {
            self.state = ToolLoopState::Failed;
            return Err(LlamaError::MaxIterations {
                max_iterations: self.max_iterations,
            });
        }
        self.round += 1;
        Ok(self.round)
    }

    /// Record the assistant's reply for the current round
    pub fn receive_response(&mut self, message: Message) -> ToolLoopState {
        debug_assert_eq!(self.state, ToolLoopState::AwaitingModelResponse);

        self.pending = message.tool_calls().to_vec();
        if self.pending.is_empty() {
            self.content = message.content.clone();
            self.state = ToolLoopState::Done;
        } else {
            self.state = ToolLoopState::ExecutingTools;
        }
        self.conversation.push(message);
        self.state
    }

    /// Record one result per pending call, in the same order
    pub fn complete_tools(&mut self, results: Vec<Value>) {
        debug_assert_eq!(self.state, ToolLoopState::ExecutingTools);
        debug_assert_eq!(results.len(), self.pending.len());

        for (call, result) in std::mem::take(&mut self.pending).into_iter().zip(results) {
            self.conversation
                .push(Message::tool_result(call.name(), result.to_string()));
            self.records.push(ToolCallRecord {
                arguments: call.arguments().into_owned(),
                name: call.function.name,
                result,
            });
        }
        self.state = ToolLoopState::AwaitingModelResponse;
    }

    pub fn fail(&mut self) {
        self.state = ToolLoopState::Failed;
    }

    pub fn into_outcome(self) -> ToolOutcome {
        debug_assert_eq!(self.state, ToolLoopState::Done);

        ToolOutcome {
            content: self.content,
            tool_calls: self.records,
            iterations: self.round,
            conversation: self.conversation,
        }
    }
}

#[derive(Clone)]
pub struct ToolHandler {
    connection: Arc<Connection>,
    transport: Arc<dyn Transport>,
}

impl ToolHandler {
    pub fn new(connection: Arc<Connection>, transport: Arc<dyn Transport>) -> Self {
        Self {
            connection,
            transport,
        }
    }

    /// Converse with the model, executing the tools it requests between rounds, until it
    /// answers without tool calls or `options.max_iterations` rounds have run.
    pub async fn send_with_tools(
        &self,
        message: &str,
        options: &ToolOptions,
    ) -> LlamaResult<ToolOutcome> {
        validate_message(message)?;
        validate_tools(&options.tools)?;
        validate_max_iterations(options.max_iterations)?;

        let mut tool_loop = ToolLoop::new(&options.conversation, message, options.max_iterations);

        loop {
            let round = tool_loop.begin_round()?;
            tracing::debug!(round, "requesting model response");

            let payload = if round == 1 {
                build_payload(
                    self.connection.model(),
                    message,
                    PayloadOptions {
                        system_prompt: options.system_prompt.as_deref(),
                        conversation: &options.conversation,
                        tools: &options.tools,
                        ..Default::default()
                    },
                )
            } else {
                build_conversation_payload(
                    self.connection.model(),
                    tool_loop.conversation(),
                    &options.tools,
                    false,
                )
            };

            let assistant = match self.request(&payload).await {
                Ok(assistant) => assistant,
                Err(e) => {
                    tool_loop.fail();
                    return Err(e);
                }
            };

            if tool_loop.receive_response(assistant) == ToolLoopState::Done {
                return Ok(tool_loop.into_outcome());
            }

            let mut results = Vec::with_capacity(tool_loop.pending_calls().len());
            for call in tool_loop.pending_calls() {
                results.push(execute_tool_call(call, options.executor.as_deref()).await);
            }
            tool_loop.complete_tools(results);
        }
    }

    async fn request(&self, payload: &Payload) -> LlamaResult<Message> {
        let response = self
            .transport
            .post(self.connection.api_url(), payload)
            .await?;

        let message = response
            .get("message")
            .cloned()
            .ok_or_else(|| LlamaError::InvalidResponse {
                reason: "response has no message".to_string(),
            })?;

        serde_json::from_value(message).map_err(|e| LlamaError::InvalidResponse {
            reason: format!("could not decode assistant message: {}", e),
        })
    }
}

/// Run one requested call. Failures become an `{"error": ...}` result for the model to read.
async fn execute_tool_call(call: &ToolCall, executor: Option<&dyn ToolExecutor>) -> Value {
    let Some(executor) = executor else {
        return json!({ "error": "Tool execution not configured" });
    };

    let arguments = match call.parsed_arguments() {
        Ok(arguments) => arguments,
        Err(e) => {
            let error = ToolError::InvalidParameters(format!(
                "could not parse arguments for {}: {}",
                call.name(),
                e
            ));
            tracing::warn!(tool = call.name(), %error, "tool call rejected");
            return json!({ "error": error.to_string() });
        }
    };

    let invocation = ToolInvocation {
        name: call.name().to_string(),
        arguments,
    };
    match executor.execute(invocation).await {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(tool = call.name(), %error, "tool execution failed");
            json!({ "error": error.to_string() })
        }
    }
}
