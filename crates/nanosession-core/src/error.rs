use std::path::PathBuf;

/// Core error types for nanosession.
#[derive(Debug, thiserror::Error)]
pub enum NanosessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures raised while loading, saving or identifying a session.
///
/// `CorruptRecord` and `InvalidIdentifier` never escape the session manager:
/// both degrade to an anonymous session. `StoreUnavailable` is the only
/// variant a caller can observe, and only under the fail-closed policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Corrupt session record: {0}")]
    CorruptRecord(String),

    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid session identifier: {0}")]
    InvalidIdentifier(String),
}

impl SessionError {
    /// Errors that are always handled by falling back to an anonymous session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::CorruptRecord(_) | SessionError::InvalidIdentifier(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NanosessionError>;
