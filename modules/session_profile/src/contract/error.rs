use thiserror::Error;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionProfileError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("User with this email already exists")]
    Conflict,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("User not found")]
    NotFound,

    #[error("Internal error")]
    Internal,
}

impl SessionProfileError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }
}

impl From<DomainError> for SessionProfileError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation { field, message } => {
                Self::validation(format!("{field}: {message}"))
            }
            DomainError::WeakCredential { message } | DomainError::InvalidEmail { message } => {
                Self::validation(message)
            }
            DomainError::DuplicateEmail => Self::Conflict,
            e @ (DomainError::InvalidCredentials
            | DomainError::MissingToken
            | DomainError::InvalidOrExpiredSession) => Self::unauthorized(e.to_string()),
            DomainError::UserNotFound => Self::NotFound,
            DomainError::Identity { .. } | DomainError::Storage { .. } => Self::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_details_are_hidden() {
        let e: SessionProfileError = DomainError::storage("disk full at /var/db").into();
        assert_eq!(e, SessionProfileError::Internal);
        assert_eq!(e.to_string(), "Internal error");
    }

    #[test]
    fn auth_failures_become_unauthorized() {
        let e: SessionProfileError = DomainError::InvalidOrExpiredSession.into();
        assert_eq!(
            e,
            SessionProfileError::unauthorized("Invalid or expired session")
        );
    }

    #[test]
    fn validation_keeps_the_field_name() {
        let e: SessionProfileError = DomainError::validation("buddyTone", "unknown tone").into();
        assert_eq!(e.to_string(), "Validation error: buddyTone: unknown tone");
    }
}
