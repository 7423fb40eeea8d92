//! Error types for ext-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from ext-registry
    #[error(transparent)]
    Registry(#[from] ext_registry::Error),

    /// Error from ext-fs
    #[error(transparent)]
    Fs(#[from] ext_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
