/// Error types for the NestTag box service
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoxError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User not confirmed: {0}")]
    UserNotConfirmed(String),

    #[error("Username already exists: {0}")]
    UsernameExists(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Confirmation code mismatch: {0}")]
    CodeMismatch(String),

    #[error("Confirmation code expired: {0}")]
    ExpiredCode(String),

    #[error("Signing error: {0}")]
    Signing(String),
}

impl BoxError {
    /// Whether the error was caused by the caller rather than the backend
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::NotFound(_)
            | Self::Forbidden(_)
            | Self::NotAuthorized(_)
            | Self::UserNotFound(_)
            | Self::UserNotConfirmed(_)
            | Self::UsernameExists(_)
            | Self::InvalidPassword(_)
            | Self::GroupNotFound(_)
            | Self::CodeMismatch(_)
            | Self::ExpiredCode(_) => true,
            Self::Database(_)
            | Self::Storage(_)
            | Self::Identity(_)
            | Self::Config(_)
            | Self::Signing(_) => false,
        }
    }
}

impl From<serde_json::Error> for BoxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::env::VarError> for BoxError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}
