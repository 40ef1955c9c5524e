use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use subset_core::client::{ApiOutcome, RemoteQueryClient};
use subset_core::config::AnalyticsConfig;
use subset_core::error::AgentError;
use subset_core::tool_registry::Tool;
use tracing::{debug, warn};
use url::Url;

use crate::link::ResultLinker;
use crate::query::AnalyticsQuery;

pub const TOOL_NAME: &str = "subset_analytics_tool";
pub const QUERY_PATH: &str = "api/v1/query";
pub const REPHRASE_MESSAGE: &str = "please rephrase your description and try again";

/// Receives the result link of every successful query.
pub type LinkReporter = Arc<dyn Fn(&Url) + Send + Sync>;

/// Outcome of one analytics query.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsResult {
    /// The engine's response body, passed through untouched, and its link.
    Success { payload: Value, link: Url },
    /// The engine refused the query; the model should rephrase.
    Rejected,
}

impl AnalyticsResult {
    /// What the model sees as the tool result.
    pub fn to_value(&self) -> Value {
        match self {
            AnalyticsResult::Success { payload, .. } => payload.clone(),
            AnalyticsResult::Rejected => json!({ "error": REPHRASE_MESSAGE }),
        }
    }
}

/// Answers analytical questions by posting an [`AnalyticsQuery`] to the engine.
pub struct AnalyticsTool {
    client: RemoteQueryClient,
    linker: ResultLinker,
    reporter: LinkReporter,
}

impl AnalyticsTool {
    pub fn new(config: &AnalyticsConfig, reporter: LinkReporter) -> Result<Self, AgentError> {
        Ok(Self {
            client: RemoteQueryClient::from_config(config)?,
            linker: ResultLinker::from_config(config)?,
            reporter,
        })
    }

    /// Execute one query. Engine rejections are a normal result; transport
    /// failures and unparsable success bodies are errors.
    pub async fn run_query(&self, query: &AnalyticsQuery) -> Result<AnalyticsResult, AgentError> {
        let raw = self.client.post(QUERY_PATH, query).await?;
        match raw.classify()? {
            ApiOutcome::Rejected { status, body } => {
                warn!(
                    "Query rejected ({}): {}",
                    status.as_u16(),
                    body.chars().take(200).collect::<String>()
                );
                Ok(AnalyticsResult::Rejected)
            }
            ApiOutcome::Success(payload) => {
                let slug = payload.get("slug").and_then(Value::as_str).unwrap_or_default();
                let link = self.linker.link(slug);
                debug!(slug, "query url: {}", link);
                (self.reporter)(&link);
                Ok(AnalyticsResult::Success { payload, link })
            }
        }
    }
}

#[async_trait]
impl Tool for AnalyticsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "allows you to answer analytical questions about entities in your database, \
         using a combination of parameters and a natural language statement describing the subject set. \
         For the subset_description, you should only use verbs, adjectives and values from your system prompt"
    }

    fn parameters_schema(&self) -> Value {
        AnalyticsQuery::parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let query = AnalyticsQuery::from_args(args)?;
        debug!("Running analytics query: {:?}", query);
        let result = self.run_query(&query).await?;
        Ok(serde_json::to_string(&result.to_value())?)
    }
}
