//! Error types for Catalyst.
//!
//! This module defines a unified error enum covering every failure category
//! of the hybrid query pipeline: configuration, input validation, model calls,
//! retrieval backends, prompt rendering, and plan handling.

use thiserror::Error;

/// Unified error type for Catalyst.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic in library code; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller supplied missing or empty input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Generative-model service errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Structured-fact or semantic-search store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A backend call exceeded the per-call timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The planning model output could not be parsed into a plan.
    ///
    /// `raw` keeps the unmodified model text for server-side diagnosis.
    #[error("Failed to parse execution plan: {reason}. Raw content: {raw}")]
    PlanParse { reason: String, raw: String },

    /// A load-bearing tool invocation lacked a required argument
    #[error("missing '{argument}' argument for {tool}")]
    MissingArgument { tool: String, argument: String },

    /// The synthesis model call failed or returned nothing usable
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error belongs to the backend family that the tool
    /// executor absorbs (logged, contribution dropped, request continues).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Embedding(_) | AppError::Storage(_) | AppError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_are_recoverable() {
        assert!(AppError::Embedding("down".into()).is_recoverable());
        assert!(AppError::Storage("no rows".into()).is_recoverable());
        assert!(AppError::Timeout("search".into()).is_recoverable());
    }

    #[test]
    fn test_pipeline_errors_are_fatal() {
        let missing = AppError::MissingArgument {
            tool: "get_mission_facts".into(),
            argument: "mission_name".into(),
        };
        assert!(!missing.is_recoverable());
        assert!(!AppError::Synthesis("500".into()).is_recoverable());
        assert!(!AppError::Input("empty".into()).is_recoverable());
    }

    #[test]
    fn test_plan_parse_keeps_raw_content() {
        let err = AppError::PlanParse {
            reason: "expected value".into(),
            raw: "not json".into(),
        };
        assert!(err.to_string().contains("Raw content: not json"));
    }
}
