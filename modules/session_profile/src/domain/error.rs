use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Password rejected: {message}")]
    WeakCredential { message: String },

    #[error("Email rejected: {message}")]
    InvalidEmail { message: String },

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("No access token provided")]
    MissingToken,

    #[error("Invalid or expired session")]
    InvalidOrExpiredSession,

    #[error("User not found")]
    UserNotFound,

    #[error("Identity provider error: {message}")]
    Identity { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
