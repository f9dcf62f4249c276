//! Error types for intent scoring.

use lookout_core::LookoutError;
use thiserror::Error;

/// Errors that can occur while talking to a language model.
#[derive(Error, Debug)]
pub enum IntentError {
    /// No API key in the environment for the chosen provider
    #[error("API key not found for provider {provider} (set {env_var})")]
    MissingApiKey {
        /// Provider name
        provider: String,
        /// Environment variable that should hold the key
        env_var: String,
    },

    /// The configured provider name is not supported
    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),

    /// API error with status code
    #[error("API error ({provider}): status {status}, {message}")]
    ApiError {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The provider answered but not in the expected shape
    #[error("failed to parse response from {provider}: {message}")]
    ParseError {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The model's verdict was not usable JSON
    #[error("invalid verdict: {0}")]
    InvalidVerdict(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IntentError> for LookoutError {
    fn from(err: IntentError) -> Self {
        LookoutError::Pipeline(err.to_string())
    }
}

/// Result type alias for intent operations.
pub type Result<T> = std::result::Result<T, IntentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IntentError::ApiError {
            provider: "openai".to_string(),
            status: 429,
            message: "Too Many Requests".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error (openai): status 429, Too Many Requests"
        );

        let err = IntentError::MissingApiKey {
            provider: "gemini".to_string(),
            env_var: "GEMINI_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_converts_to_pipeline_error() {
        let err: LookoutError = IntentError::UnknownProvider("claude".to_string()).into();
        assert!(matches!(err, LookoutError::Pipeline(msg) if msg.contains("claude")));
    }
}
