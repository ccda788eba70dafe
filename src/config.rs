use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub copart: SourceConfig,
    #[serde(default)]
    pub iaai: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub api_enabled: bool,
    #[serde(default = "default_true")]
    pub scrape_enabled: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_enabled: true,
            scrape_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchConfig {
    #[serde(default)]
    pub queries: Vec<WatchQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchQuery {
    pub make: String,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_cache_ttl() -> u64 { 600 }
fn default_attempt_timeout() -> u64 { 10 }
fn default_true() -> bool { true }

/// Endpoint URLs come from the environment so deployments can point at a
/// different proxy or mirror without touching config.toml.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub copart_api_url: String,
    pub copart_search_url: String,
    pub iaai_api_url: String,
    pub iaai_search_url: String,
    pub proxy_base_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            copart_api_url: std::env::var("COPART_API_URL")
                .unwrap_or_else(|_| "https://www.copart.com/public/lots/search-results".to_string()),
            copart_search_url: std::env::var("COPART_SEARCH_URL")
                .unwrap_or_else(|_| "https://www.copart.com/lotSearchResults".to_string()),
            iaai_api_url: std::env::var("IAAI_API_URL")
                .unwrap_or_else(|_| "https://www.iaai.com/Search/SearchVehicles".to_string()),
            iaai_search_url: std::env::var("IAAI_SEARCH_URL")
                .unwrap_or_else(|_| "https://www.iaai.com/Search".to_string()),
            proxy_base_url: std::env::var("PROXY_BASE_URL")
                .unwrap_or_else(|_| "https://api.allorigins.win/raw".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let toml_str = r#"
            [system]

            [sources]

            [[watch.queries]]
            make = "Tesla"
            model = "Model 3"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.system.cache_ttl_secs, 600);
        assert_eq!(config.system.attempt_timeout_secs, 10);
        assert!(config.sources.copart.api_enabled);
        assert!(config.sources.iaai.scrape_enabled);
        assert_eq!(config.watch.queries.len(), 1);
        assert_eq!(config.watch.queries[0].model.as_deref(), Some("Model 3"));
    }

    #[test]
    fn test_ttl_override() {
        let toml_str = r#"
            [system]
            cache_ttl_secs = 300

            [sources]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.system.cache_ttl_secs, 300);
    }
}
