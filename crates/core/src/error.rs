//! Error types for the Ragraph domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external capability has its own error enum; the pipeline surfaces
//! them through the top-level [`Error`].

use thiserror::Error;

/// The top-level error type for all Ragraph operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Text generation errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Passage retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Conversation memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Structured output did not decode ---
    #[error("Schema violation in {node}: {reason}")]
    SchemaViolation { node: String, reason: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Invocation deadline ---
    #[error("Invocation timed out after {secs}s")]
    Timeout { secs: u64 },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may retry the same invocation unchanged.
    ///
    /// Transient capability failures and deadline overruns are retryable;
    /// schema violations, configuration problems and storage failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Provider(e) => e.is_transient(),
            Error::Retrieval(e) => e.is_transient(),
            Error::Timeout { .. } => true,
            Error::Memory(_)
            | Error::SchemaViolation { .. }
            | Error::Config { .. }
            | Error::Serialization(_)
            | Error::Internal(_) => false,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Network hiccups, rate limits, timeouts and 5xx responses may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Retrieval backend unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Search timed out: {0}")]
    Timeout(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Corpus could not be loaded: {0}")]
    Corpus(String),
}

impl RetrievalError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RetrievalError::Unavailable(_)
                | RetrievalError::EmbeddingFailed(_)
                | RetrievalError::Timeout(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn schema_violation_names_the_node() {
        let err = Error::SchemaViolation {
            node: "classify".into(),
            reason: "expected 'yes' or 'no', got 'maybe'".into(),
        };
        assert!(err.to_string().contains("classify"));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert!(Error::Provider(ProviderError::RateLimited { retry_after_secs: 5 }).is_retryable());
        assert!(Error::Provider(ProviderError::Network("reset".into())).is_retryable());
        assert!(Error::Retrieval(RetrievalError::Unavailable("down".into())).is_retryable());
        assert!(Error::Timeout { secs: 30 }.is_retryable());
    }

    #[test]
    fn permanent_failures_are_not_retryable() {
        assert!(!Error::SchemaViolation { node: "evaluate".into(), reason: "bad".into() }.is_retryable());
        assert!(!Error::Config { message: "no provider".into() }.is_retryable());
        assert!(!Error::Provider(ProviderError::AuthenticationFailed("nope".into())).is_retryable());
        assert!(!Error::Provider(ProviderError::ApiError { status_code: 400, message: "bad".into() }).is_retryable());
        assert!(Error::Provider(ProviderError::ApiError { status_code: 503, message: "busy".into() }).is_retryable());
    }
}
