use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Host used when neither the config file nor the environment names one.
pub const DEFAULT_ANALYTICS_HOST: &str = "http://localhost:3001";

/// Query port used when `host` carries no explicit port and `query_port` is unset.
pub const DEFAULT_QUERY_PORT: u16 = 3001;

/// Top-level application configuration, loaded from TOML.
///
/// Built once at startup and passed by reference into the clients and loops;
/// nothing below `main` reads the environment directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub analytics: AnalyticsConfig,
    pub agent: AgentConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if
    /// the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write current configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file path (~/.config/subset-agent/config.toml).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("subset-agent")
            .join("config.toml")
    }

    /// Data directory for REPL history.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("subset-agent")
    }

    /// Fill unset credentials and host from the environment variables the
    /// config names. Explicit config values win.
    pub fn resolve_env(&mut self) {
        self.resolve_with(|name| std::env::var(name).ok());
    }

    /// Same as [`AppConfig::resolve_env`] with an injectable lookup.
    pub fn resolve_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.provider.api_key.is_none() {
            self.provider.api_key = lookup(&self.provider.api_key_env);
        }
        if self.analytics.api_key.is_none() {
            self.analytics.api_key = lookup(&self.analytics.api_key_env);
        }
        if self.analytics.host.is_none() {
            self.analytics.host = lookup(&self.analytics.host_env);
        }
    }
}

/// Language-model service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for the OpenAI-compatible API.
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "gpt-4".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Analytics engine and vocabulary service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Base URL of the analytics engine, e.g. `http://internal:3001`.
    pub host: Option<String>,
    pub host_env: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    /// Port the query client is bound to. Unset keeps the port in `host`,
    /// or [`DEFAULT_QUERY_PORT`] when `host` has none.
    pub query_port: Option<u16>,
    /// Port of the public frontend that serves result links.
    pub public_port: u16,
    /// Scheme of the public frontend.
    pub public_scheme: String,
    /// Skip TLS certificate verification for the analytics engine.
    ///
    /// On by default: internal deployments serve self-signed certificates and
    /// the engine is reached over a trusted network. Turn it off for any host
    /// reachable from outside that network.
    pub accept_invalid_certs: bool,
    /// Request timeout. `None` leaves the transport default in place.
    pub timeout_secs: Option<u64>,
}

impl AnalyticsConfig {
    /// The configured host, or [`DEFAULT_ANALYTICS_HOST`].
    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_ANALYTICS_HOST)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            host: None,
            host_env: "SUBSET_HOST".into(),
            api_key: None,
            api_key_env: "SUBSET_API_KEY".into(),
            query_port: None,
            public_port: 3000,
            public_scheme: "https".into(),
            accept_invalid_certs: true,
            timeout_secs: None,
        }
    }
}

/// Reasoning step limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model/tool round trips in one reasoning step.
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("gpt-4"));
        assert!(toml_str.contains("SUBSET_API_KEY"));
        assert!(toml_str.contains("accept_invalid_certs = true"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [analytics]
            host = "http://internal:3001"
            public_port = 8443
            "#,
        )
        .unwrap();
        assert_eq!(config.analytics.host_or_default(), "http://internal:3001");
        assert_eq!(config.analytics.public_port, 8443);
        assert_eq!(config.analytics.public_scheme, "https");
        assert_eq!(config.provider.model, "gpt-4");
        assert_eq!(config.agent.max_tool_iterations, 20);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.provider.model = "gpt-4o".into();
        config.analytics.query_port = Some(4001);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.provider.model, "gpt-4o");
        assert_eq!(loaded.analytics.query_port, Some(4001));
    }

    #[test]
    fn test_unset_query_port_survives_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.analytics.host = Some("http://x:8080".into());
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.analytics.query_port, None);
        assert_eq!(loaded.analytics.host_or_default(), "http://x:8080");
    }

    #[test]
    fn test_resolve_env_fills_only_missing_values() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("SUBSET_API_KEY", "subset-env"),
            ("SUBSET_HOST", "http://env-host:3001"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.analytics.api_key = Some("from-file".into());
        config.resolve_with(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.provider.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.analytics.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.analytics.host_or_default(), "http://env-host:3001");
    }

    #[test]
    fn test_missing_env_leaves_credentials_unset() {
        let mut config = AppConfig::default();
        config.resolve_with(|_| None);
        assert!(config.provider.api_key.is_none());
        assert!(config.analytics.api_key.is_none());
        assert_eq!(config.analytics.host_or_default(), DEFAULT_ANALYTICS_HOST);
    }
}
