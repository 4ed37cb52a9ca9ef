use std::collections::HashMap;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::contract::model::{Session, UserIdentity};
use crate::domain::ports::{IdentityError, IdentityProvider};

struct Account {
    identity: UserIdentity,
    password_hash: String,
}

struct IssuedToken {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// In-process identity provider for development and tests.
///
/// Passwords are Argon2 PHC strings. Bearer tokens are random and only
/// their SHA-256 digest is kept.
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<Uuid, Account>>,
    tokens: RwLock<HashMap<String, IssuedToken>>,
    session_ttl: Duration,
    min_password_length: usize,
}

impl MemoryIdentityProvider {
    pub fn new(session_ttl: Duration, min_password_length: usize) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            session_ttl,
            min_password_length,
        }
    }

    fn check_password(&self, password: &str) -> Result<(), IdentityError> {
        if password.chars().count() < self.min_password_length {
            return Err(IdentityError::WeakCredential(format!(
                "Password should be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }

    fn find_by_email(&self, email: &str) -> Option<(Uuid, String)> {
        self.accounts
            .read()
            .values()
            .find(|a| a.identity.email.eq_ignore_ascii_case(email))
            .map(|a| (a.identity.id, a.password_hash.clone()))
    }

    fn issue_session(&self, user: UserIdentity) -> Session {
        let access_token = hex::encode(rand::random::<[u8; 32]>());
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        let mut tokens = self.tokens.write();
        tokens.retain(|_, t| t.expires_at > now);
        tokens.insert(
            token_digest(&access_token),
            IssuedToken {
                user_id: user.id,
                expires_at,
            },
        );
        drop(tokens);

        Session {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.session_ttl.num_seconds(),
            expires_at: Some(expires_at),
            refresh_token: None,
            user,
        }
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new(Duration::hours(1), 6)
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

async fn hash_password(password: &str) -> Result<String, IdentityError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| IdentityError::Unavailable(e.to_string()))
    })
    .await
    .map_err(|e| IdentityError::Unavailable(e.to_string()))?
}

async fn verify_password(password: &str, phc: String) -> bool {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || match PasswordHash::new(&phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .unwrap_or(false)
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn list_users(&self) -> Result<Vec<UserIdentity>, IdentityError> {
        let mut users: Vec<UserIdentity> = self
            .accounts
            .read()
            .values()
            .map(|a| a.identity.clone())
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<UserIdentity, IdentityError> {
        let email = email.trim().to_lowercase();
        if !looks_like_email(&email) {
            return Err(IdentityError::InvalidEmail(
                "Unable to validate email address: invalid format".to_string(),
            ));
        }
        self.check_password(password)?;
        if self.find_by_email(&email).is_some() {
            return Err(IdentityError::DuplicateEmail);
        }

        let password_hash = hash_password(password).await?;
        let identity = UserIdentity {
            id: Uuid::new_v4(),
            email,
            created_at: Utc::now(),
            email_confirmed_at: None,
            last_sign_in_at: None,
            metadata,
        };

        let mut accounts = self.accounts.write();
        // Re-check under the write lock: hashing ran without it.
        if accounts
            .values()
            .any(|a| a.identity.email == identity.email)
        {
            return Err(IdentityError::DuplicateEmail);
        }
        accounts.insert(
            identity.id,
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        debug!(user_id = %identity.id, "Account created");
        Ok(identity)
    }

    async fn confirm_email(&self, id: Uuid) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write();
        let account = accounts.get_mut(&id).ok_or(IdentityError::NotFound)?;
        account
            .identity
            .email_confirmed_at
            .get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let (id, phc) = self
            .find_by_email(email.trim())
            .ok_or(IdentityError::InvalidCredentials)?;

        if !verify_password(password, phc).await {
            return Err(IdentityError::InvalidCredentials);
        }

        let identity = {
            let mut accounts = self.accounts.write();
            let account = accounts
                .get_mut(&id)
                .ok_or(IdentityError::InvalidCredentials)?;
            account.identity.last_sign_in_at = Some(Utc::now());
            account.identity.clone()
        };

        Ok(self.issue_session(identity))
    }

    async fn get_user_by_token(&self, token: &str) -> Result<UserIdentity, IdentityError> {
        let digest = token_digest(token);

        let user_id = {
            let tokens = self.tokens.read();
            let issued = tokens
                .get(&digest)
                .ok_or(IdentityError::InvalidOrExpiredSession)?;
            if issued.expires_at > Utc::now() {
                Some(issued.user_id)
            } else {
                None
            }
        };

        let Some(user_id) = user_id else {
            self.tokens.write().remove(&digest);
            return Err(IdentityError::InvalidOrExpiredSession);
        };

        self.accounts
            .read()
            .get(&user_id)
            .map(|a| a.identity.clone())
            .ok_or(IdentityError::InvalidOrExpiredSession)
    }

    async fn update_password(&self, id: Uuid, new_password: &str) -> Result<(), IdentityError> {
        self.check_password(new_password)?;
        if !self.accounts.read().contains_key(&id) {
            return Err(IdentityError::NotFound);
        }

        let password_hash = hash_password(new_password).await?;
        let mut accounts = self.accounts.write();
        let account = accounts.get_mut(&id).ok_or(IdentityError::NotFound)?;
        account.password_hash = password_hash;
        Ok(())
    }
}
