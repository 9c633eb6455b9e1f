// Configuration
// TOML-backed settings for the workflow and its collaborators.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// One entry in the static rewrite dictionary, applied by the rewriter
/// in natural language ("pattern -> canonical form").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

impl RewriteRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Tunables for one workflow run. The retry bounds are required
/// configuration: the executor refuses unbounded loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Documents requested per retrieve call.
    pub top_k: usize,
    /// Generate calls allowed per retrieval cycle before the
    /// hallucination loop gives up.
    pub max_generation_attempts: u32,
    /// Rewrite-and-retry cycles allowed per run.
    pub max_rewrites: u32,
    /// Whole-run timeout in seconds; `None` disables it.
    pub request_timeout_secs: Option<u64>,
    /// Static dictionary handed to the rewriter.
    pub rewrite_rules: Vec<RewriteRule>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_generation_attempts: 3,
            max_rewrites: 2,
            request_timeout_secs: None,
            rewrite_rules: vec![RewriteRule::new("expressions about the user", "client")],
        }
    }
}

impl WorkflowConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".to_string()));
        }
        if self.max_generation_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_generation_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Step ceiling for the graph runtime, derived from the bounds. One
    /// cycle visits at most retrieve, relevance, generate+hallucination
    /// per attempt, helpfulness and rewrite.
    pub fn step_ceiling(&self) -> usize {
        let per_cycle = 4 + 2 * self.max_generation_attempts as usize;
        (self.max_rewrites as usize + 1) * per_cycle + 2
    }
}

/// OpenAI-compatible provider endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
}

/// Vector store endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    pub base_url: String,
    pub collection: String,
}

/// Top-level application config for the CLI host surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub retriever: RetrieverConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// SQLite file for the session history store; `None` disables history.
    #[serde(default)]
    pub history_db: Option<PathBuf>,
    /// Directory for the rolling log file; `None` logs to stdout only.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "provider.base_url must not be empty".to_string(),
            ));
        }
        if self.retriever.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "retriever.base_url must not be empty".to_string(),
            ));
        }
        if self.retriever.collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "retriever.collection must not be empty".to_string(),
            ));
        }
        self.workflow.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_defaults_are_bounded() {
        let config = WorkflowConfig::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_generation_attempts, 3);
        assert_eq!(config.max_rewrites, 2);
        assert!(config.request_timeout().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn step_ceiling_covers_worst_case() {
        let config = WorkflowConfig::default();
        // 3 cycles of (retrieve + relevance + 3x(generate + check) + helpfulness + rewrite)
        assert_eq!(config.step_ceiling(), 32);
    }

    #[test]
    fn zero_bounds_are_rejected() {
        let mut config = WorkflowConfig::default();
        config.max_generation_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = WorkflowConfig::default();
        config.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn app_config_parses_from_toml() {
        let raw = r#"
            [provider]
            base_url = "http://localhost:1234"
            chat_model = "gpt-4o"
            embedding_model = "text-embedding-3-large"

            [retriever]
            base_url = "http://localhost:8000"
            collection = "spring_framework_docs"

            [workflow]
            top_k = 5
            max_rewrites = 1
            request_timeout_secs = 30

            [[workflow.rewrite_rules]]
            pattern = "the framework"
            replacement = "Spring"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.workflow.top_k, 5);
        assert_eq!(config.workflow.max_rewrites, 1);
        assert_eq!(
            config.workflow.request_timeout(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.workflow.rewrite_rules.len(), 1);
        assert!(config.history_db.is_none());
        // defaults fill unspecified workflow fields
        assert_eq!(config.workflow.max_generation_attempts, 3);
    }

    #[test]
    fn empty_collection_is_rejected() {
        let raw = r#"
            [provider]
            base_url = "http://localhost:1234"
            chat_model = "m"
            embedding_model = "e"

            [retriever]
            base_url = "http://localhost:8000"
            collection = "  "
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert!(config.validate().is_err());
    }
}
