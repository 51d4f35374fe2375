//! Configuration loading and validation.
//!
//! Hierarchical merge, lowest to highest precedence: programmatic defaults,
//! `medirec.yaml` in the working directory, then `MEDIREC_`-prefixed
//! environment variables (nested keys split on `__`, e.g.
//! `MEDIREC_AGENT__MAX_ITERATIONS=8`). The completion API key is
//! deliberately not part of the file config; it always comes from
//! `ANTHROPIC_API_KEY`.

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChunkerConfig, EmbeddingModel};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub embedding: EmbeddingSection,
    pub index: IndexSection,
    pub completion: CompletionSection,
    pub agent: AgentSection,
    pub chunking: ChunkerConfig,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    /// Embedding backend: `minilm`, `mpnet`, or `hashed`.
    pub model: String,

    /// Override for the HuggingFace Hub cache directory.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSection {
    /// Path of the checkup-records index.
    pub records_path: PathBuf,

    /// Path of the disease-knowledge index.
    pub knowledge_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSection {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    /// Iteration bound of the tool loop; exhausting it forces a direct
    /// answer.
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingSection {
                model: "minilm".to_string(),
                cache_dir: None,
            },
            index: IndexSection {
                records_path: PathBuf::from("data/records.db"),
                knowledge_path: PathBuf::from("data/knowledge.db"),
            },
            completion: CompletionSection {
                base_url: "https://api.anthropic.com".to_string(),
                model: "claude-3-5-sonnet-20241022".to_string(),
                max_tokens: 1024,
                temperature: None,
                timeout_secs: 120,
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 8000,
            },
            agent: AgentSection { max_iterations: 6 },
            chunking: ChunkerConfig::default(),
            logging: LoggingSection {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl Config {
    /// Load with the default hierarchy (`medirec.yaml` + environment).
    pub fn load() -> DomainResult<Self> {
        Self::load_from(Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file("medirec.yaml"))
            .merge(Env::prefixed("MEDIREC_").split("__")))
    }

    /// Load from an explicit yaml file plus the environment.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> DomainResult<Self> {
        Self::load_from(Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("MEDIREC_").split("__")))
    }

    fn load_from(figment: Figment) -> DomainResult<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| DomainError::Configuration(format!("failed to load config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values after extraction.
    pub fn validate(&self) -> DomainResult<()> {
        EmbeddingModel::parse(&self.embedding.model)?;

        self.chunking
            .validate()
            .map_err(DomainError::Configuration)?;

        if self.agent.max_iterations == 0 || self.agent.max_iterations > 16 {
            return Err(DomainError::Configuration(format!(
                "agent.max_iterations must be between 1 and 16, got {}",
                self.agent.max_iterations
            )));
        }

        if self.completion.max_tokens == 0 {
            return Err(DomainError::Configuration(
                "completion.max_tokens must be positive".to_string(),
            ));
        }

        if self.completion.initial_backoff_ms > self.completion.max_backoff_ms {
            return Err(DomainError::Configuration(format!(
                "completion.initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.completion.initial_backoff_ms, self.completion.max_backoff_ms
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(DomainError::Configuration(format!(
                "logging.level must be one of {valid_levels:?}, got '{}'",
                self.logging.level
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(DomainError::Configuration(format!(
                "logging.format must be one of {valid_formats:?}, got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Parsed embedding model.
    pub fn embedding_model(&self) -> DomainResult<EmbeddingModel> {
        EmbeddingModel::parse(&self.embedding.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.embedding_model().unwrap(), EmbeddingModel::MiniLm);
    }

    #[test]
    fn test_bad_embedding_model_rejected() {
        let mut config = Config::default();
        config.embedding.model = "word2vec".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_iteration_bound_limits() {
        let mut config = Config::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());

        config.agent.max_iterations = 17;
        assert!(config.validate().is_err());

        config.agent.max_iterations = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_ordering_enforced() {
        let mut config = Config::default();
        config.completion.initial_backoff_ms = 10_000;
        config.completion.max_backoff_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medirec.yaml");
        std::fs::write(
            &path,
            "embedding:\n  model: hashed\nagent:\n  max_iterations: 4\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.embedding_model().unwrap(), EmbeddingModel::Hashed);
        assert_eq!(config.agent.max_iterations, 4);
        // Untouched sections keep their defaults.
        assert_eq!(config.completion.max_tokens, 1024);
    }
}
