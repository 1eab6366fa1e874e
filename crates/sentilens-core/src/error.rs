//! Error types for Sentilens

/// Result type alias using Sentilens' Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Sentilens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: wrong label value, missing required field, empty column
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown job id or out-of-range record index
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation requires a completed job
    #[error("not ready: {0}")]
    NotReady(String),

    /// Classification engine failed to initialize or a batch inference call failed
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Unequal-length true/predicted label sequences
    #[error("validation input mismatch: {expected} true labels but {actual} predicted labels")]
    ValidationInputMismatch { expected: usize, actual: usize },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new not-ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable snake_case name of the error kind, used in wire payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::NotReady(_) => "not_ready",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::ValidationInputMismatch { .. } => "validation_input_mismatch",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}
