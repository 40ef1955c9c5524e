use crate::config::ProviderConfig;
use crate::error::AgentError;
use crate::types::{Message, Role, ToolCall, ToolSchema};

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolArgs, ChatCompletionToolType, CreateChatCompletionRequestArgs,
    FunctionCall, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

/// What the model did with one completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// A final natural-language answer.
    Answer(String),
    /// One or more tool invocations, optionally with accompanying text.
    ToolCalls { content: String, calls: Vec<ToolCall> },
}

/// The language-model completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelReply, AgentError>;
}

/// `ChatModel` backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    config: ProviderConfig,
}

impl OpenAiChatModel {
    pub fn new(config: &ProviderConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(&config.api_base)
            .with_api_key(config.api_key.clone().unwrap_or_default());

        Self {
            client: Client::with_config(openai_config),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelReply, AgentError> {
        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(&self.config.model)
            .messages(to_openai_messages(messages)?)
            .temperature(self.config.temperature)
            .max_completion_tokens(self.config.max_tokens);

        if !tools.is_empty() {
            request_builder.tools(to_openai_tools(tools)?);
        }

        let request = request_builder
            .build()
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        debug!("Requesting completion from {}", self.config.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("No choices in response".into()))?;

        let content = choice.message.content.unwrap_or_default();
        match choice.message.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => Ok(ModelReply::ToolCalls {
                content,
                calls: tool_calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        arguments: tc.function.arguments,
                    })
                    .collect(),
            }),
            _ => Ok(ModelReply::Answer(content)),
        }
    }
}

/// Convert tool schemas to OpenAI function definitions.
fn to_openai_tools(schemas: &[ToolSchema]) -> Result<Vec<ChatCompletionTool>, AgentError> {
    schemas
        .iter()
        .map(|s| {
            let func = FunctionObjectArgs::default()
                .name(&s.name)
                .description(&s.description)
                .parameters(s.parameters.clone())
                .build()
                .map_err(|e| AgentError::Schema(format!("function '{}': {}", s.name, e)))?;
            ChatCompletionToolArgs::default()
                .r#type(ChatCompletionToolType::Function)
                .function(func)
                .build()
                .map_err(|e| AgentError::Schema(format!("tool '{}': {}", s.name, e)))
        })
        .collect()
}

/// Convert our Message types to async-openai request messages.
fn to_openai_messages(
    messages: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
    let mut result = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => {
                let m = ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()
                    .map_err(|e| AgentError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::System(m));
            }
            Role::User => {
                let m = ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()
                    .map_err(|e| AgentError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::User(m));
            }
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                builder.content(msg.content.as_str());
                if let Some(tool_calls) = &msg.tool_calls {
                    let tc_openai: Vec<ChatCompletionMessageToolCall> = tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect();
                    builder.tool_calls(tc_openai);
                }
                let m = builder
                    .build()
                    .map_err(|e| AgentError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::Assistant(m));
            }
            Role::Tool => {
                let m = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(msg.tool_call_id.as_deref().unwrap_or(""))
                    .content(msg.content.as_str())
                    .build()
                    .map_err(|e| AgentError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::Tool(m));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages_convert_in_order() {
        let messages = vec![
            Message::system("rules"),
            Message::user("question"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call-1".into(),
                    name: "subset_analytics_tool".into(),
                    arguments: "{}".into(),
                }],
            ),
            Message::tool_result("call-1", "{\"slug\":\"q42\"}"),
        ];
        let converted = to_openai_messages(&messages).unwrap();
        assert_eq!(converted.len(), 4);
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(converted[3], ChatCompletionRequestMessage::Tool(_)));
    }

    #[test]
    fn test_tools_convert_to_functions() {
        let schemas = vec![ToolSchema {
            name: "subset_analytics_tool".into(),
            description: "answers analytical questions".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let tools = to_openai_tools(&schemas).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "subset_analytics_tool");
        assert!(matches!(tools[0].r#type, ChatCompletionToolType::Function));
    }
}
