pub mod agent_loop;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod tool_registry;
pub mod types;
pub mod vocabulary;

pub use agent_loop::AgentLoop;
pub use client::{ApiOutcome, RawResponse, RemoteQueryClient};
pub use config::AppConfig;
pub use error::AgentError;
pub use model::{ChatModel, ModelReply, OpenAiChatModel};
pub use session::{Console, SessionLoop, SessionState};
pub use tool_registry::{Tool, ToolRegistry};
pub use vocabulary::{VocabularyConstraint, VocabularySource};
