//! Configuration management for `Diverdict`.

use serde::{Deserialize, Serialize};

/// Global configuration for `Diverdict`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiverdictConfig {
    /// Sentence alignment configuration.
    pub alignment: AlignmentConfig,
    /// Evidence adjudication configuration.
    pub adjudication: AdjudicationConfig,
    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
}

/// Configuration for the sentence alignment engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Weight of the edit-similarity component.
    pub semantic_weight: f64,
    /// Weight of the bigram/year-overlap component.
    pub rule_weight: f64,
    /// Weight of the positional component.
    pub position_weight: f64,
    /// Minimum composite score for a pair to become a match candidate.
    pub match_threshold: f64,
    /// Minimum negation-stripped similarity for a contradiction candidate.
    pub negation_similarity_threshold: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            rule_weight: 0.2,
            position_weight: 0.1,
            match_threshold: 0.72,
            negation_similarity_threshold: 0.82,
        }
    }
}

impl AlignmentConfig {
    /// Create a new alignment configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the match threshold.
    #[must_use]
    pub const fn with_match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Set the negation similarity threshold.
    #[must_use]
    pub const fn with_negation_similarity_threshold(mut self, threshold: f64) -> Self {
        self.negation_similarity_threshold = threshold;
        self
    }

    /// Set the three component weights.
    #[must_use]
    pub const fn with_weights(mut self, semantic: f64, rule: f64, position: f64) -> Self {
        self.semantic_weight = semantic;
        self.rule_weight = rule;
        self.position_weight = position;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights do not sum to 1.0 or a threshold is
    /// outside the unit interval.
    pub fn validate(&self) -> crate::error::Result<()> {
        let sum = self.semantic_weight + self.rule_weight + self.position_weight;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(crate::error::DiverdictError::Config(format!(
                "alignment weights must sum to 1.0, got {sum}"
            )));
        }
        for (name, value) in [
            ("match_threshold", self.match_threshold),
            (
                "negation_similarity_threshold",
                self.negation_similarity_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::error::DiverdictError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the tiered evidence gating policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjudicationConfig {
    /// Confidence reported when the L1 gate fires.
    pub l1_confidence: f64,
    /// Confidence reported when the L2 gate fires.
    pub l2_confidence: f64,
    /// Confidence reported when some evidence existed but no gate fired.
    pub insufficient_confidence: f64,
    /// Minimum same-year occurrences required by the L2 gate.
    pub min_l2_occurrences: usize,
    /// Minimum distinct sources required by the L2 gate.
    pub min_l2_sources: usize,
    /// Domain-suffix token removed during catalog subject normalization.
    pub subject_suffix: String,
    /// Maximum distinct sources listed in the provenance string.
    pub max_sources: usize,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        Self {
            l1_confidence: 0.92,
            l2_confidence: 0.78,
            insufficient_confidence: 0.35,
            min_l2_occurrences: 2,
            min_l2_sources: 2,
            subject_suffix: "专利".to_string(),
            max_sources: 5,
        }
    }
}

impl AdjudicationConfig {
    /// Create a new adjudication configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the L2 gate requirements.
    #[must_use]
    pub const fn with_l2_requirements(mut self, occurrences: usize, sources: usize) -> Self {
        self.min_l2_occurrences = occurrences;
        self.min_l2_sources = sources;
        self
    }

    /// Set the domain-suffix token removed from catalog subjects.
    #[must_use]
    pub fn with_subject_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.subject_suffix = suffix.into();
        self
    }
}

/// Configuration for retry logic with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add random jitter to delay.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new `RetryConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial delay in milliseconds.
    #[must_use]
    pub const fn with_initial_delay_ms(mut self, initial_delay_ms: u64) -> Self {
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    /// Set the maximum delay in milliseconds.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Set the backoff multiplier.
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Set whether to add jitter.
    #[must_use]
    pub const fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }
}

/// Configuration for the end-to-end pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whether to adjudicate conflicts against the evidence catalog.
    pub enable_evidence: bool,
    /// Whether to run knowledge-graph contradiction analysis.
    pub enable_graph: bool,
    /// Whether to consult the answer cache before calling providers.
    pub use_cache: bool,
    /// Whether a failed provider call may fall back to a substitute answer.
    pub allow_mock_fallback: bool,
    /// Maximum accepted question length in characters.
    pub max_question_len: usize,
    /// Retry configuration for provider calls.
    pub retry_config: Option<RetryConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_evidence: false,
            enable_graph: false,
            use_cache: true,
            allow_mock_fallback: false,
            max_question_len: 5000,
            retry_config: Some(RetryConfig::default()),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable evidence adjudication.
    #[must_use]
    pub const fn with_evidence(mut self, enable: bool) -> Self {
        self.enable_evidence = enable;
        self
    }

    /// Enable or disable knowledge-graph analysis.
    #[must_use]
    pub const fn with_graph(mut self, enable: bool) -> Self {
        self.enable_graph = enable;
        self
    }

    /// Enable or disable the answer cache.
    #[must_use]
    pub const fn with_cache(mut self, enable: bool) -> Self {
        self.use_cache = enable;
        self
    }

    /// Allow or forbid fallback answers on provider failure.
    #[must_use]
    pub const fn with_mock_fallback(mut self, allow: bool) -> Self {
        self.allow_mock_fallback = allow;
        self
    }
}

impl DiverdictConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Serialize configuration to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        let content = serde_json::to_string_pretty(self)?;
        Ok(content)
    }

    /// Set alignment configuration.
    #[must_use]
    pub fn with_alignment(mut self, alignment: AlignmentConfig) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set adjudication configuration.
    #[must_use]
    pub fn with_adjudication(mut self, adjudication: AdjudicationConfig) -> Self {
        self.adjudication = adjudication;
        self
    }

    /// Set pipeline configuration.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }
}
