use subset_core::config::AnalyticsConfig;
use subset_core::error::AgentError;
use url::Url;

/// Builds the human-facing link for a query result: the analytics host with
/// its internal scheme and port swapped for the public ones, plus `data/<slug>`.
#[derive(Debug, Clone)]
pub struct ResultLinker {
    public_base: Url,
}

impl ResultLinker {
    pub fn new(host: &str, public_scheme: &str, public_port: u16) -> Result<Self, AgentError> {
        let mut public_base = Url::parse(host)?;
        public_base.set_scheme(public_scheme).map_err(|_| {
            AgentError::Config(format!(
                "cannot switch '{}' to scheme '{}'",
                public_base, public_scheme
            ))
        })?;
        public_base.set_port(Some(public_port)).map_err(|_| {
            AgentError::Config(format!("cannot set port {} on '{}'", public_port, public_base))
        })?;
        Ok(Self { public_base })
    }

    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, AgentError> {
        Self::new(
            config.host_or_default(),
            &config.public_scheme,
            config.public_port,
        )
    }

    /// Link for `slug`. An empty slug yields a link ending in `/data/`.
    pub fn link(&self, slug: &str) -> Url {
        let mut url = self.public_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("data").push(slug);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_host_maps_to_public_link() {
        let linker = ResultLinker::new("http://internal:3001", "https", 3000).unwrap();
        assert_eq!(linker.link("abc123").as_str(), "https://internal:3000/data/abc123");
    }

    #[test]
    fn test_empty_slug_ends_in_data() {
        let linker = ResultLinker::new("http://internal:3001", "https", 3000).unwrap();
        assert!(linker.link("").as_str().ends_with("/data/"));
    }

    #[test]
    fn test_host_path_prefix_is_kept() {
        let linker = ResultLinker::new("http://internal:3001/subset/", "https", 3000).unwrap();
        assert_eq!(
            linker.link("q42").as_str(),
            "https://internal:3000/subset/data/q42"
        );
    }

    #[test]
    fn test_slug_is_percent_encoded() {
        let linker = ResultLinker::new("http://internal:3001", "https", 3000).unwrap();
        assert_eq!(
            linker.link("a b/c").as_str(),
            "https://internal:3000/data/a%20b%2Fc"
        );
    }

    #[test]
    fn test_from_config_uses_public_settings() {
        let config = AnalyticsConfig {
            host: Some("http://engine.corp:3001".into()),
            public_port: 8443,
            ..AnalyticsConfig::default()
        };
        let linker = ResultLinker::from_config(&config).unwrap();
        assert_eq!(linker.link("x").as_str(), "https://engine.corp:8443/data/x");
    }

    #[test]
    fn test_non_special_scheme_rejected() {
        assert!(ResultLinker::new("http://internal:3001", "mailto", 3000).is_err());
    }
}
