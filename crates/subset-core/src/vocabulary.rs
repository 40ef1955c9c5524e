//! Runtime vocabulary: the terms the model may use when it describes a subset.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ApiOutcome, RemoteQueryClient};
use crate::error::{AgentError, Result};

pub const VOCABULARY_PATH: &str = "api/v1/query/rag";

/// Comma-separated terms returned by the vocabulary service. Empty when the
/// service had nothing to offer or could not be reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyConstraint(String);

impl VocabularyConstraint {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Extract the `text` field of a vocabulary response; anything else is empty.
    pub fn from_payload(payload: &Value) -> Self {
        Self(
            payload
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )
    }

    /// System instruction that binds the model's tool arguments to this vocabulary.
    pub fn system_prompt(&self) -> String {
        format!(
            "in tools, you may only use verbs, adjectives and measures in the following list: {}",
            self.0
        )
    }
}

impl fmt::Display for VocabularyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a session turn gets its vocabulary from.
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn fetch(&self, user_text: &str) -> Result<VocabularyConstraint>;
}

#[async_trait]
impl VocabularySource for RemoteQueryClient {
    async fn fetch(&self, user_text: &str) -> Result<VocabularyConstraint> {
        let raw = self.get(VOCABULARY_PATH, &[("q", user_text)]).await?;
        match raw.classify()? {
            ApiOutcome::Success(payload) => Ok(VocabularyConstraint::from_payload(&payload)),
            ApiOutcome::Rejected { status, .. } => Err(AgentError::Provider(format!(
                "vocabulary service returned {}",
                status.as_u16()
            ))),
        }
    }
}

/// Fetch the vocabulary for `user_text`, degrading to an empty constraint on
/// any failure so the turn can proceed.
pub async fn fetch_or_empty(source: &dyn VocabularySource, user_text: &str) -> VocabularyConstraint {
    match source.fetch(user_text).await {
        Ok(vocabulary) => {
            debug!("Vocabulary: {}", vocabulary);
            vocabulary
        }
        Err(e) => {
            warn!("Vocabulary fetch failed, continuing without constraint: {}", e);
            VocabularyConstraint::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_reads_text() {
        let v = VocabularyConstraint::from_payload(&json!({"text": "signups, users, weekly"}));
        assert_eq!(v.as_str(), "signups, users, weekly");
    }

    #[test]
    fn test_from_payload_missing_or_wrong_type_is_empty() {
        assert!(VocabularyConstraint::from_payload(&json!({})).is_empty());
        assert!(VocabularyConstraint::from_payload(&json!({"text": 7})).is_empty());
        assert!(VocabularyConstraint::from_payload(&json!(["text"])).is_empty());
    }

    #[test]
    fn test_system_prompt_embeds_terms() {
        let prompt = VocabularyConstraint::new("signups, users").system_prompt();
        assert!(prompt.starts_with("in tools, you may only use verbs, adjectives and measures"));
        assert!(prompt.ends_with("signups, users"));
    }

    struct Failing;

    #[async_trait]
    impl VocabularySource for Failing {
        async fn fetch(&self, _user_text: &str) -> Result<VocabularyConstraint> {
            Err(AgentError::Provider("down".into()))
        }
    }

    #[tokio::test]
    async fn test_fetch_or_empty_degrades() {
        let v = fetch_or_empty(&Failing, "anything").await;
        assert_eq!(v, VocabularyConstraint::default());
    }
}
