//! Authenticated HTTP access to the analytics engine and vocabulary service.
//!
//! The client never interprets status codes or retries. Callers turn a
//! [`RawResponse`] into an [`ApiOutcome`] when they need a verdict.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::{AnalyticsConfig, DEFAULT_QUERY_PORT};
use crate::error::{AgentError, Result};

/// Status and body of a remote call, untouched.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// A remote response classified once, instead of at every call site.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// 200 with a JSON body.
    Success(Value),
    /// Any other status.
    Rejected { status: StatusCode, body: String },
}

impl RawResponse {
    /// Only `200 OK` counts as success. A 200 whose body is not JSON is an
    /// error, not a rejection.
    pub fn classify(self) -> Result<ApiOutcome> {
        if self.status == StatusCode::OK {
            let payload: Value = serde_json::from_str(&self.body)?;
            Ok(ApiOutcome::Success(payload))
        } else {
            Ok(ApiOutcome::Rejected {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Immutable `{base host, api key}` record plus the HTTP client built from
/// it. The query port lives in `base`.
#[derive(Debug, Clone)]
pub struct RemoteQueryClient {
    base: Url,
    api_key: String,
    http: reqwest::Client,
}

impl RemoteQueryClient {
    /// Build a client for the analytics engine described by `config`.
    ///
    /// When `config.accept_invalid_certs` is set, TLS certificate verification
    /// is disabled for this client. That is a deliberate trust decision for
    /// self-signed internal deployments and is controlled only by that flag.
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        let mut base = Url::parse(config.host_or_default())?;
        if base.cannot_be_a_base() {
            return Err(AgentError::Config(format!(
                "analytics host '{}' is not a base URL",
                base
            )));
        }
        let port = match config.query_port {
            Some(port) => Some(port),
            None if base.port().is_none() => Some(DEFAULT_QUERY_PORT),
            None => None,
        };
        if let Some(port) = port {
            base.set_port(Some(port)).map_err(|_| {
                AgentError::Config(format!("cannot set port {} on '{}'", port, base))
            })?;
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("subset-agent/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;

        Ok(Self {
            base,
            api_key: config.api_key.clone().unwrap_or_default(),
            http,
        })
    }

    /// Value of the `Authorization` header sent with every request.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Resolve `path` (with or without a leading slash) against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// Authenticated GET with `params` as the query string.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<RawResponse> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "*/*")
            .header(AUTHORIZATION, self.authorization())
            .query(params)
            .send()
            .await?;
        Self::read(response).await
    }

    /// Authenticated POST with `body` serialized as JSON.
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .header(ACCEPT, "*/*")
            .header(AUTHORIZATION, self.authorization())
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status();
        let body = response.text().await?;
        debug!("-> {} ({} bytes)", status.as_u16(), body.len());
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    fn config(host: &str, port: Option<u16>) -> AnalyticsConfig {
        AnalyticsConfig {
            host: Some(host.into()),
            api_key: Some("secret".into()),
            query_port: port,
            ..AnalyticsConfig::default()
        }
    }

    #[test]
    fn test_authorization_header() {
        let client = RemoteQueryClient::from_config(&config("http://internal:3001", None)).unwrap();
        assert_eq!(client.authorization(), "Bearer secret");
    }

    #[test]
    fn test_missing_api_key_sends_empty_bearer() {
        let mut cfg = config("http://internal:3001", None);
        cfg.api_key = None;
        let client = RemoteQueryClient::from_config(&cfg).unwrap();
        assert_eq!(client.authorization(), "Bearer ");
    }

    #[test]
    fn test_endpoint_joins_relative_and_absolute_paths() {
        let client = RemoteQueryClient::from_config(&config("http://internal:3001", None)).unwrap();
        assert_eq!(
            client.endpoint("api/v1/query").unwrap().as_str(),
            "http://internal:3001/api/v1/query"
        );
        assert_eq!(
            client.endpoint("/api/v1/query/rag").unwrap().as_str(),
            "http://internal:3001/api/v1/query/rag"
        );
    }

    #[test]
    fn test_endpoint_keeps_host_path_prefix() {
        let client =
            RemoteQueryClient::from_config(&config("http://internal:3001/subset", None)).unwrap();
        assert_eq!(
            client.endpoint("api/v1/query").unwrap().as_str(),
            "http://internal:3001/subset/api/v1/query"
        );
    }

    #[test]
    fn test_query_port_overrides_host_port() {
        let client =
            RemoteQueryClient::from_config(&config("http://internal:9999", Some(3001))).unwrap();
        assert_eq!(
            client.endpoint("api/v1/query").unwrap().as_str(),
            "http://internal:3001/api/v1/query"
        );
    }

    #[test]
    fn test_file_without_query_port_keeps_host_port() {
        let app: AppConfig = toml::from_str(
            r#"
            [analytics]
            host = "http://x:8080"
            "#,
        )
        .unwrap();
        let client = RemoteQueryClient::from_config(&app.analytics).unwrap();
        assert_eq!(client.endpoint("api/v1/query").unwrap().port(), Some(8080));
    }

    #[test]
    fn test_host_without_port_binds_default_query_port() {
        let client = RemoteQueryClient::from_config(&config("https://internal", None)).unwrap();
        assert_eq!(
            client.endpoint("api/v1/query/rag").unwrap().as_str(),
            "https://internal:3001/api/v1/query/rag"
        );
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let err = RemoteQueryClient::from_config(&config("not a url", None)).unwrap_err();
        assert!(matches!(err, AgentError::Url(_)), "got: {err}");
    }

    #[test]
    fn test_classify_success() {
        let raw = RawResponse {
            status: StatusCode::OK,
            body: r#"{"slug":"abc123"}"#.into(),
        };
        assert_eq!(
            raw.classify().unwrap(),
            ApiOutcome::Success(json!({"slug": "abc123"}))
        );
    }

    #[test]
    fn test_classify_non_200_is_rejected() {
        for status in [StatusCode::CREATED, StatusCode::BAD_REQUEST, StatusCode::BAD_GATEWAY] {
            let raw = RawResponse {
                status,
                body: "nope".into(),
            };
            assert!(matches!(
                raw.classify().unwrap(),
                ApiOutcome::Rejected { status: s, .. } if s == status
            ));
        }
    }

    #[test]
    fn test_classify_200_with_garbage_body_is_error() {
        let raw = RawResponse {
            status: StatusCode::OK,
            body: "<html>".into(),
        };
        assert!(matches!(raw.classify(), Err(AgentError::Serialization(_))));
    }
}
