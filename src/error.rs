//! Unified error types for `Diverdict`.

use thiserror::Error;

/// The main error type for `Diverdict` operations.
#[derive(Debug, Error)]
pub enum DiverdictError {
    /// Evidence catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Answer acquisition errors
    #[error("Answer error: {0}")]
    Answer(#[from] AnswerError),

    /// Record store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors related to loading the evidence catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("Failed to read catalog: {0}")]
    Read(String),

    /// Catalog content could not be parsed
    #[error("Failed to parse catalog: {0}")]
    Parse(String),

    /// A catalog entry is structurally invalid
    #[error("Invalid catalog item: {0}")]
    InvalidItem(String),
}

/// Errors related to acquiring the two source answers.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// The underlying provider call failed
    #[error("Provider call failed: {0}")]
    Provider(String),

    /// Provider returned an empty answer
    #[error("Provider returned an empty answer for model {0}")]
    EmptyAnswer(String),

    /// Question exceeds the configured maximum length
    #[error("Question too long: {length} characters exceeds max {max}")]
    QuestionTooLong {
        /// Actual question length
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Question is empty after trimming
    #[error("Question must not be empty")]
    EmptyQuestion,
}

/// Errors related to record store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Stored payload could not be serialized or deserialized
    #[error("Record serialization failed: {0}")]
    Serialization(String),

    /// Backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors related to pipeline orchestration.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The incoming question failed validation
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    /// Answer acquisition failed and fallback was not permitted
    #[error("Answer acquisition failed: {0}")]
    AnswerAcquisition(String),

    /// Execution error
    #[error("Pipeline execution error: {0}")]
    ExecutionError(String),
}

/// A type alias for Results with [`DiverdictError`].
pub type Result<T> = std::result::Result<T, DiverdictError>;
