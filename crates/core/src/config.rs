//! Configuration management for the tutor RAG subsystem.
//!
//! Configuration is assembled from three layers, later layers winning:
//! - Built-in defaults
//! - A YAML file (`TUTOR_CONFIG`, falling back to `./tutor.yaml`)
//! - Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tutor.yaml";

/// Chat-completion providers `validate` accepts.
pub const LLM_PROVIDERS: &[&str] = &["openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Chat-completion settings (query rewriting, citation enrichment)
    pub llm: LlmSettings,

    /// Embedding service settings
    pub embedding: EmbeddingSettings,

    /// Rerank service settings
    pub rerank: RerankSettings,

    /// Retrieval pipeline tuning
    pub retrieval: RetrievalSettings,

    /// Logging settings
    pub logging: LoggingSettings,

    /// Directory holding prompt overrides (`<id>.yml`)
    #[serde(rename = "promptDir", skip_serializing_if = "Option::is_none")]
    pub prompt_dir: Option<PathBuf>,
}

/// Chat-completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider identifier ("ollama", "openai")
    pub provider: String,

    /// Optional custom endpoint
    pub endpoint: Option<String>,

    /// Model identifier
    pub model: String,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: Option<String>,

    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            endpoint: None,
            model: "llama3.2".to_string(),
            api_key_env: None,
            timeout: Some(60),
        }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider identifier ("ollama", "mock")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Expected vector dimensions
    pub dimensions: usize,

    /// Optional custom endpoint
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
        }
    }
}

/// Rerank service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    /// Base URL of a Cohere-compatible rerank API
    pub endpoint: String,

    /// Rerank model identifier
    pub model: String,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: String,

    /// Explicit API key (takes precedence over `api_key_env`)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cohere.com".to_string(),
            model: "rerank-v3.5".to_string(),
            api_key_env: "COHERE_API_KEY".to_string(),
            api_key: None,
        }
    }
}

impl RerankSettings {
    /// Resolve the API key, checking the explicit key first.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
    }
}

/// Retrieval pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Items kept per source type after reranking
    #[serde(rename = "topN")]
    pub top_n: usize,

    /// Result limit of each similarity search
    #[serde(rename = "searchLimit")]
    pub search_limit: usize,

    /// Result limit of each summary-segment expansion fetch
    #[serde(rename = "expansionLimit")]
    pub expansion_limit: usize,

    /// Hybrid search weight between keyword (0.0) and vector (1.0) scoring
    #[serde(rename = "hybridAlpha")]
    pub hybrid_alpha: f32,

    /// Most recent chat turns passed to the query rewriter
    #[serde(rename = "historyLimit")]
    pub history_limit: usize,

    /// Deadline for a whole retrieval call, in seconds
    #[serde(rename = "deadlineSecs", skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_n: 7,
            search_limit: 10,
            expansion_limit: 10,
            hybrid_alpha: 0.5,
            history_limit: 5,
            deadline_secs: None,
        }
    }
}

impl RetrievalSettings {
    /// Deadline for a whole retrieval call, if configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log filter (e.g. "info", "tutor_retrieval=debug")
    pub level: Option<String>,

    /// Emit colored output
    pub color: Option<bool>,
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment.
    ///
    /// Environment variables:
    /// - `TUTOR_CONFIG`: Path to config file
    /// - `TUTOR_LLM_PROVIDER`: Chat-completion provider
    /// - `TUTOR_LLM_MODEL`: Chat-completion model
    /// - `TUTOR_RERANK_API_KEY`: Rerank API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use tutor_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Top N: {}", config.retrieval.top_n);
    /// ```
    pub fn load() -> AppResult<Self> {
        let explicit = std::env::var("TUTOR_CONFIG").ok().map(PathBuf::from);

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Self::from_yaml_file(&path)?
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_yaml_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file. Missing sections fall back to defaults.
    pub fn from_yaml_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("TUTOR_LLM_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("TUTOR_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(key) = std::env::var("TUTOR_RERANK_API_KEY") {
            self.rerank.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.logging.color = Some(false);
        }
    }

    /// Whether log output should be colored.
    pub fn no_color(&self) -> bool {
        matches!(self.logging.color, Some(false))
    }

    /// Resolve the chat-completion API key from its environment variable.
    pub fn resolve_llm_api_key(&self) -> Option<String> {
        self.llm
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !LLM_PROVIDERS.contains(&self.llm.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                LLM_PROVIDERS.join(", ")
            )));
        }

        let known_embedders = ["ollama", "mock"];
        if !known_embedders.contains(&self.embedding.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedders.join(", ")
            )));
        }

        if self.retrieval.top_n == 0 {
            return Err(AppError::Config("retrieval.topN must be at least 1".to_string()));
        }

        if !(0.0..=1.0).contains(&self.retrieval.hybrid_alpha) {
            return Err(AppError::Config(format!(
                "retrieval.hybridAlpha must be within 0.0..=1.0, got {}",
                self.retrieval.hybrid_alpha
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.retrieval.top_n, 7);
        assert_eq!(config.retrieval.deadline(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_sections_use_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "llm:\n  provider: openai\n  model: gpt-4o-mini\nretrieval:\n  topN: 5\n  deadlineSecs: 30\n"
        )
        .unwrap();

        let config = AppConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.retrieval.top_n, 5);
        assert_eq!(config.retrieval.search_limit, 10);
        assert_eq!(config.retrieval.deadline(), Some(Duration::from_secs(30)));
        assert_eq!(config.embedding.model, "nomic-embed-text");
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "retrieval: [unclosed").unwrap();

        let result = AppConfig::from_yaml_file(file.path());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_top_n() {
        let mut config = AppConfig::default();
        config.retrieval.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rerank_explicit_key_wins() {
        let settings = RerankSettings {
            api_key: Some("explicit".to_string()),
            api_key_env: "TUTOR_TEST_UNSET_RERANK_KEY".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.resolve_api_key(), Some("explicit".to_string()));
    }
}
