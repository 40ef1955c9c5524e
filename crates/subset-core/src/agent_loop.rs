use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::model::{ChatModel, ModelReply};
use crate::tool_registry::ToolRegistry;
use crate::types::{AgentEvent, Message, ToolOutput};

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Answer returned when the model keeps calling tools past the iteration limit.
pub const MAX_ITERATIONS_ANSWER: &str = "[Agent reached maximum tool iterations]";

/// One reasoning step: the model may call registered tools any number of times
/// (up to the limit) before producing its final answer.
pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    tool_registry: Arc<ToolRegistry>,
    max_tool_iterations: usize,
}

impl AgentLoop {
    pub fn new(model: Arc<dyn ChatModel>, tool_registry: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        Self {
            model,
            tool_registry,
            max_tool_iterations: config.max_tool_iterations,
        }
    }

    /// Run one reasoning step for `user_text` under `system_prompt` and return
    /// the final assistant message. Tool failures are reported to the model;
    /// only model-service failures come back as `Err`.
    pub async fn run(
        &self,
        system_prompt: &str,
        user_text: &str,
        event_tx: mpsc::UnboundedSender<AgentEvent>,
    ) -> Result<Message, AgentError> {
        let tool_schemas = self.tool_registry.schemas();
        let mut running_messages = vec![Message::system(system_prompt), Message::user(user_text)];

        for iteration in 1..=self.max_tool_iterations {
            debug!("Agent loop iteration {}", iteration);

            let (content, calls) = match self.model.complete(&running_messages, &tool_schemas).await? {
                ModelReply::Answer(content) => {
                    let final_message = Message::assistant(content);
                    let _ = event_tx.send(AgentEvent::Done(final_message.clone()));
                    return Ok(final_message);
                }
                ModelReply::ToolCalls { content, calls } => (content, calls),
            };

            if !content.is_empty() {
                let _ = event_tx.send(AgentEvent::ContentChunk(content.clone()));
            }
            running_messages.push(Message::assistant_with_tool_calls(content, calls.clone()));

            for tc in &calls {
                let _ = event_tx.send(AgentEvent::ToolCallStart {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                });

                let output = if !self.tool_registry.contains(&tc.name) {
                    ToolOutput {
                        tool_call_id: tc.id.clone(),
                        content: format!("Tool not allowed: {}", tc.name),
                        is_error: true,
                    }
                } else {
                    match serde_json::from_str(&tc.arguments) {
                        Ok(args) => self.tool_registry.execute(&tc.name, &tc.id, args).await,
                        Err(e) => ToolOutput {
                            tool_call_id: tc.id.clone(),
                            content: format!("Invalid JSON arguments: {}", e),
                            is_error: true,
                        },
                    }
                };

                let _ = event_tx.send(AgentEvent::ToolResult(output.clone()));
                running_messages.push(Message::tool_result(&tc.id, output.content));
            }
        }

        warn!(
            "Hit max tool iterations ({}), ending turn",
            self.max_tool_iterations
        );
        let fallback = Message::assistant(MAX_ITERATIONS_ANSWER);
        let _ = event_tx.send(AgentEvent::Done(fallback.clone()));
        Ok(fallback)
    }
}
