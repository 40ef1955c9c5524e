//! The structured query the model must produce to call the analytics tool.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use subset_core::error::AgentError;

use crate::analytics::TOOL_NAME;

/// One sort key: `(field, direction)`, e.g. `("count", "desc")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort(pub String, pub String);

impl Sort {
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self(field.into(), direction.into())
    }
}

/// A validated analytics query. Serializes to the query endpoint's body.
///
/// Every field is required and `limit` must be positive. Whether
/// `subset_description` sticks to the session vocabulary is left to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    pub measures: Vec<String>,
    pub subset_description: String,
    pub breakdown_fields: Vec<String>,
    pub sorts: Vec<Sort>,
    pub limit: NonZeroU32,
}

impl AnalyticsQuery {
    /// Validate raw tool-call arguments against the schema.
    pub fn from_args(args: Value) -> Result<Self, AgentError> {
        serde_json::from_value(args).map_err(|e| AgentError::ToolExecution {
            tool_name: TOOL_NAME.into(),
            message: format!("Invalid arguments: {}", e),
        })
    }

    /// JSON Schema surfaced to the model, with the per-field constraints it
    /// has to follow.
    pub fn parameters_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "measures": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "a list of measures from the prompt to aggregate, e.g. ['count', 'sum', 'average']"
                },
                "breakdown_fields": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "a list of fields from the prompt to group by, e.g. ['user_details.state', 'users_details.city']"
                },
                "sorts": {
                    "type": "array",
                    "items": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 2,
                        "maxItems": 2
                    },
                    "description": "a list of [field, direction] pairs from the prompt to sort by, e.g. [['count', 'desc'], ['user_details.city', 'desc']]"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "the maximum number of rows to return, e.g. 10"
                },
                "subset_description": {
                    "type": "string",
                    "description": "a single sentence english statement describing entities in your database. \
                                    Do not pose a question or issue a command, rephrase it as a single sentence \
                                    descriptive statement using only verbs, adjectives and values from your system prompt. \
                                    example: 'users who have not logged in in the last 30 days'"
                }
            },
            "required": ["measures", "breakdown_fields", "sorts", "limit", "subset_description"]
        })
    }
}
