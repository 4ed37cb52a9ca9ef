use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{Session, UserIdentity};

/// Failures reported by an identity provider, already classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("weak credential: {0}")]
    WeakCredential(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("invalid or expired session")]
    InvalidOrExpiredSession,

    #[error("user not found")]
    NotFound,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Port over the account store: credential checks, session issue and
/// token validation. Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Every known account. Linear in the number of users.
    async fn list_users(&self) -> Result<Vec<UserIdentity>, IdentityError>;

    /// Create an account; `metadata` is stored verbatim as user attributes.
    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<UserIdentity, IdentityError>;

    /// Administrative email confirmation.
    async fn confirm_email(&self, id: Uuid) -> Result<(), IdentityError>;

    /// Unknown email and wrong password both yield `InvalidCredentials`.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn get_user_by_token(&self, token: &str) -> Result<UserIdentity, IdentityError>;

    /// Administrative password change.
    async fn update_password(&self, id: Uuid, new_password: &str) -> Result<(), IdentityError>;
}
