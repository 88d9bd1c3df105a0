use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GradusError;
use crate::grading::GradingScale;

/// Top-level configuration loaded from `.gradus.toml`.
///
/// Every section and field has a serde default, so a missing file, an empty
/// file, and a partial file all yield a usable configuration.
///
/// # Examples
///
/// ```
/// use gradus_core::GradusConfig;
///
/// let config = GradusConfig::default();
/// assert_eq!(config.pipeline.batch_char_budget, 100_000);
/// assert_eq!(config.pipeline.max_files, 500);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradusConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Content acquisition settings.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Batching, triage, and summarization settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Score-to-grade mapping settings.
    #[serde(default)]
    pub grading: GradingConfig,
}

impl GradusConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::Io`] if the file cannot be read, or
    /// [`GradusError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, GradusError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use gradus_core::GradusConfig;
    ///
    /// let toml = r#"
    /// [pipeline]
    /// max_files = 200
    /// "#;
    /// let config = GradusConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.pipeline.max_files, 200);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, GradusError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// LLM provider configuration.
///
/// Works with any provider exposing an OpenAI-compatible
/// `/v1/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds (default: 120).
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Content acquisition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum concurrent file fetches (default: 8).
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Per-request timeout in seconds for listing/content endpoints
    /// (default: 30).
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional glob patterns to exclude from the listing, on top of the
    /// built-in ignore list.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
            timeout_secs: default_fetch_timeout_secs(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Batching, triage, and summarization configuration.
///
/// `max_files` caps the *file count* and is independent of
/// `batch_char_budget`, which bounds *content size* per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Character budget per batch, wrapper overhead included
    /// (default: 100 000).
    #[serde(default = "default_batch_char_budget")]
    pub batch_char_budget: usize,
    /// File-count cap above which relevance triage runs (default: 500).
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Maximum concurrent batch summarizations (default: 4).
    #[serde(default = "default_summary_concurrency")]
    pub summary_concurrency: usize,
}

fn default_batch_char_budget() -> usize {
    100_000
}

fn default_max_files() -> usize {
    500
}

fn default_summary_concurrency() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_char_budget: default_batch_char_budget(),
            max_files: default_max_files(),
            summary_concurrency: default_summary_concurrency(),
        }
    }
}

/// Score-to-grade mapping configuration.
///
/// Defaults to the Chilean 1.0–7.0 scale with a 60% pass threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Score (0–100) at which the passing grade is reached (default: 60).
    #[serde(default = "default_pass_score")]
    pub pass_score: f64,
    /// Lower bound of the grade scale (default: 1.0).
    #[serde(default = "default_min_grade")]
    pub min_grade: f64,
    /// Grade awarded exactly at the pass threshold (default: 4.0).
    #[serde(default = "default_pass_grade")]
    pub pass_grade: f64,
    /// Upper bound of the grade scale (default: 7.0).
    #[serde(default = "default_max_grade")]
    pub max_grade: f64,
}

fn default_pass_score() -> f64 {
    60.0
}

fn default_min_grade() -> f64 {
    1.0
}

fn default_pass_grade() -> f64 {
    4.0
}

fn default_max_grade() -> f64 {
    7.0
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            pass_score: default_pass_score(),
            min_grade: default_min_grade(),
            pass_grade: default_pass_grade(),
            max_grade: default_max_grade(),
        }
    }
}

impl GradingConfig {
    /// Build the grading scale described by this configuration.
    pub fn scale(&self) -> GradingScale {
        GradingScale {
            pass_score: self.pass_score,
            min_grade: self.min_grade,
            pass_grade: self.pass_grade,
            max_grade: self.max_grade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = GradusConfig::default();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.ingest.fetch_concurrency, 8);
        assert_eq!(config.pipeline.batch_char_budget, 100_000);
        assert_eq!(config.pipeline.max_files, 500);
        assert_eq!(config.grading.pass_score, 60.0);
        assert!(config.ingest.ignore_patterns.is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = GradusConfig::from_toml("").unwrap();
        assert_eq!(config.pipeline.max_files, 500);
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[llm]
model = "gpt-4o-mini"
base_url = "http://localhost:11434"
timeout_secs = 60

[ingest]
fetch_concurrency = 4
ignore_patterns = ["docs/**", "*.lock"]

[pipeline]
batch_char_budget = 50000
max_files = 300

[grading]
pass_score = 50.0
"#;
        let config = GradusConfig::from_toml(toml).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.ingest.fetch_concurrency, 4);
        assert_eq!(config.ingest.ignore_patterns, vec!["docs/**", "*.lock"]);
        assert_eq!(config.pipeline.batch_char_budget, 50_000);
        assert_eq!(config.pipeline.max_files, 300);
        assert_eq!(config.grading.pass_score, 50.0);
        assert_eq!(config.grading.max_grade, 7.0);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = GradusConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }
}
