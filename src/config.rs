use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Generation backend base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Token budget per generation call
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Qdrant endpoint
    pub qdrant_url: String,
    /// Catalog collection name
    pub collection: String,
    /// Embedding model served by the generation backend
    pub embedding_model: String,
    /// Passages fetched per agent query
    pub passage_budget: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://127.0.0.1:6334".to_string(),
            collection: "catalog".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            passage_budget: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Confidence needed to select a category as a target
    pub confidence_threshold: f64,
    /// Routing cache entry lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Maximum cached routing decisions
    pub cache_capacity: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            cache_ttl_secs: 600,
            cache_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-agent deadline in seconds
    pub agent_timeout_secs: u64,
    /// Turns of history carried into agent prompts
    pub history_turns: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 45,
            history_turns: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionsConfig {
    /// Session storage directory (defaults to ~/.campus-advisor/sessions)
    pub storage_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".campus-advisor").join("config.toml"))
    }

    /// Resolve the session storage directory
    pub fn session_storage_dir(&self) -> PathBuf {
        self.sessions.storage_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".campus-advisor")
                .join("sessions")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.routing.confidence_threshold, 0.5);
        assert_eq!(config.retrieval.passage_budget, 4);
        assert_eq!(config.orchestrator.history_turns, 5);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.generation.model = "llama3.1:8b".to_string();
        config.routing.cache_capacity = 50;

        let toml_string = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_string).unwrap();

        assert_eq!(parsed.generation.model, "llama3.1:8b");
        assert_eq!(parsed.routing.cache_capacity, 50);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: Config = toml::from_str("[generation]\nbase_url = \"http://10.0.0.2:11434\"\nmodel = \"m\"\nmax_tokens = 256\ntimeout_secs = 10\n").unwrap();
        assert_eq!(parsed.generation.max_tokens, 256);
        assert_eq!(parsed.routing.confidence_threshold, 0.5);
    }

    #[test]
    fn test_storage_dir_override() {
        let mut config = Config::default();
        config.sessions.storage_dir = Some(PathBuf::from("/tmp/advisor-sessions"));
        assert_eq!(
            config.session_storage_dir(),
            PathBuf::from("/tmp/advisor-sessions")
        );
    }
}
