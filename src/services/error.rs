//! Error taxonomy shared by the core services

/// Error returned by moderation, publication, author and contact operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Bad input, surfaced to the caller and never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credentials or session token rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The actor lacks rights for the operation
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Referenced record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Storage or other infrastructure failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CoreError::Authorization(msg.into())
    }
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
