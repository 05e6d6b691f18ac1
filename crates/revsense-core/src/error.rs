//! Error types for revsense

/// Result type alias using revsense's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for revsense operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A backend's artifacts are missing, corrupt or inconsistent at load time
    #[error("startup failure for backend '{backend}': {reason}")]
    StartupFailure { backend: String, reason: String },

    /// Caller supplied an unknown backend, a malformed identifier or a bad `k`
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A configured backend that failed to start was requested
    #[error("backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// Inference failure inside a loaded backend
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Recommendation store errors
    #[error("store error: {0}")]
    Store(String),

    /// Filesystem errors
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
    /// Create a new startup failure for a backend
    pub fn startup(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StartupFailure {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
