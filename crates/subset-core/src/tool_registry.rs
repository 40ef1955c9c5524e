use crate::error::AgentError;
use crate::types::{ToolOutput, ToolSchema};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A capability the model may invoke during a reasoning step.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (used in function calling).
    fn name(&self) -> &str;

    /// Description surfaced to the model.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Validate `args` and execute. Validation failures must come back as `Err`
    /// so the registry can report them to the model instead of aborting the turn.
    async fn execute(&self, args: Value) -> Result<String, AgentError>;
}

/// The fixed capability set bound to the model for a session.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::debug!("Registered tool: {}", name);
        self.tools.insert(name, tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all registered tool names, sorted.
    pub fn list_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Schemas for every registered tool, suitable for sending to the model.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Execute a tool by name. Never fails: errors become an `is_error` output
    /// that is routed back to the model.
    pub async fn execute(&self, tool_name: &str, tool_call_id: &str, args: Value) -> ToolOutput {
        match self.tools.get(tool_name) {
            Some(tool) => match tool.execute(args).await {
                Ok(content) => ToolOutput {
                    tool_call_id: tool_call_id.to_string(),
                    content,
                    is_error: false,
                },
                Err(e) => {
                    tracing::warn!("Tool {} failed: {}", tool_name, e);
                    ToolOutput {
                        tool_call_id: tool_call_id.to_string(),
                        content: format!("Error: {}", e),
                        is_error: true,
                    }
                }
            },
            None => ToolOutput {
                tool_call_id: tool_call_id.to_string(),
                content: AgentError::ToolNotFound(tool_name.to_string()).to_string(),
                is_error: true,
            },
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the `text` argument"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value) -> Result<String, AgentError> {
            args.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AgentError::ToolExecution {
                    tool_name: "echo".into(),
                    message: "missing field `text`".into(),
                })
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry
    }

    #[test]
    fn test_schemas_reflect_registered_tools() {
        let registry = registry();
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "echo");
        assert_eq!(schemas[0].parameters["required"], json!(["text"]));
        assert_eq!(registry.list_names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_execute_success() {
        let out = registry().execute("echo", "call-1", json!({"text": "hi"})).await;
        assert!(!out.is_error);
        assert_eq!(out.content, "hi");
        assert_eq!(out.tool_call_id, "call-1");
    }

    #[tokio::test]
    async fn test_execute_error_becomes_output() {
        let out = registry().execute("echo", "call-2", json!({})).await;
        assert!(out.is_error);
        assert!(out.content.contains("missing field"), "got: {}", out.content);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let out = registry().execute("nope", "call-3", json!({})).await;
        assert!(out.is_error);
        assert_eq!(out.content, "Tool not found: nope");
    }
}
