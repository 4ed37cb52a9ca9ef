use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use tracing::{debug, field::Empty, info, instrument, warn, Span};
use uuid::Uuid;

use crate::contract::model::{
    CompanionTone, JourneyEntry, NewAccount, Profile, ProfilePatch, SessionView, SignInOutcome,
    SignUpOutcome, UserIdentity,
};
use crate::domain::error::DomainError;
use crate::domain::ports::{IdentityError, IdentityProvider};
use crate::domain::redact;
use crate::domain::repo::UserDataRepository;

pub const REQUIRES_SIGN_IN_MESSAGE: &str = "Account created! Please sign in.";
pub const PASSWORD_RESET_MESSAGE: &str =
    "Password reset instructions would be sent to your email. (Email delivery is not configured)";
pub const PASSWORD_UPDATED_MESSAGE: &str =
    "Password updated successfully. You can now sign in with the new password.";

/// Journey payload keys owned by the system.
const RESERVED_ENTRY_KEYS: [&str; 3] = ["id", "userId", "createdAt"];
const ENTRY_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ENTRY_SUFFIX_LEN: usize = 8;

/// Domain service composing the identity provider and the user data store.
/// Depends only on ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    identity: Arc<dyn IdentityProvider>,
    repo: Arc<dyn UserDataRepository>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_name_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_name_length: 100,
        }
    }
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        repo: Arc<dyn UserDataRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            identity,
            repo,
            config,
        }
    }

    /// Create the account, confirm it, write the default profile and try to sign in.
    /// A failed automatic sign-in is not an error: the caller gets `RequiresSignIn`.
    #[instrument(name = "session_profile.service.sign_up", skip_all, fields(email = Empty))]
    pub async fn sign_up(&self, account: NewAccount) -> Result<SignUpOutcome, DomainError> {
        let email = required(account.email.as_deref(), "email")?;
        let password = required_secret(account.password.as_deref(), "password")?;
        let name = required(account.name.as_deref(), "name")?;
        self.validate_name(name)?;

        let email = normalize_email(email);
        Span::current().record("email", redact::email(&email).as_str());
        info!("Signing up new account");

        if self.find_user_by_email(&email).await?.is_some() {
            return Err(DomainError::DuplicateEmail);
        }

        let user = self
            .identity
            .sign_up_with_password(&email, password, serde_json::json!({ "name": name }))
            .await
            .map_err(|e| match e {
                IdentityError::DuplicateEmail => DomainError::DuplicateEmail,
                IdentityError::WeakCredential(message) => DomainError::WeakCredential { message },
                IdentityError::InvalidEmail(message) => DomainError::InvalidEmail { message },
                other => DomainError::identity(other.to_string()),
            })?;

        if let Err(e) = self.identity.confirm_email(user.id).await {
            warn!(user_id = %user.id, error = %e, "Email confirmation failed (continuing)");
        }

        let profile = Profile::with_defaults(user.id, email.clone(), name.to_string(), Utc::now());
        self.repo
            .save_profile(&profile)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;

        match self.identity.sign_in_with_password(&email, password).await {
            Ok(session) => {
                info!(user_id = %user.id, "Account created and signed in");
                Ok(SignUpOutcome::Active {
                    user: session.user.clone(),
                    profile,
                    session,
                })
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Automatic sign-in after signup failed");
                Ok(SignUpOutcome::RequiresSignIn { user, profile })
            }
        }
    }

    #[instrument(name = "session_profile.service.sign_in", skip_all, fields(email = Empty))]
    pub async fn sign_in(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<SignInOutcome, DomainError> {
        let email = required(email, "email")?;
        let password = required_secret(password, "password")?;

        let email = normalize_email(email);
        Span::current().record("email", redact::email(&email).as_str());
        info!("Sign-in attempt");

        if self.find_user_by_email(&email).await?.is_none() {
            debug!("No account for email");
            return Err(DomainError::InvalidCredentials);
        }

        let session = self
            .identity
            .sign_in_with_password(&email, password)
            .await
            .map_err(|e| match e {
                IdentityError::InvalidCredentials | IdentityError::NotFound => {
                    DomainError::InvalidCredentials
                }
                other => DomainError::identity(other.to_string()),
            })?;

        let profile = self.load_profile(session.user.id).await?;
        info!(user_id = %session.user.id, "Sign-in successful");
        Ok(SignInOutcome {
            user: session.user.clone(),
            session,
            profile,
        })
    }

    /// Acknowledge a sign-out. Tokens are not revoked server-side.
    #[instrument(name = "session_profile.service.sign_out", skip_all)]
    pub fn sign_out(&self, token: Option<&str>) {
        match token {
            Some(t) => info!(token = %redact::token(t), "Sign-out acknowledged"),
            None => info!("Sign-out acknowledged without token"),
        }
    }

    #[instrument(name = "session_profile.service.current_session", skip_all, fields(user_id = Empty))]
    pub async fn current_session(&self, token: &str) -> Result<SessionView, DomainError> {
        let user = self.authenticate(token).await?;
        let profile = self.load_profile(user.id).await?;
        debug!(has_profile = profile.is_some(), "Session resolved");
        Ok(SessionView { user, profile })
    }

    /// Merge `patch` into the stored profile (or a fresh default one) and persist it.
    #[instrument(name = "session_profile.service.update_profile", skip_all, fields(user_id = Empty))]
    pub async fn update_profile(
        &self,
        token: &str,
        patch: ProfilePatch,
    ) -> Result<Profile, DomainError> {
        let user = self.authenticate(token).await?;
        info!("Updating profile");

        let now = Utc::now();
        let mut profile = match self.load_profile(user.id).await? {
            Some(p) => p,
            None => {
                debug!("No stored profile, starting from defaults");
                Profile::with_defaults(user.id, user.email.clone(), fallback_name(&user), now)
            }
        };

        self.apply_patch(&mut profile, patch)?;
        profile.id = user.id;
        profile.updated_at = Some(now);

        self.repo
            .save_profile(&profile)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;

        info!("Profile updated");
        Ok(profile)
    }

    /// Store a journal entry; returns the assigned entry id.
    #[instrument(name = "session_profile.service.save_journey_entry", skip_all, fields(user_id = Empty))]
    pub async fn save_journey_entry(
        &self,
        token: &str,
        mut payload: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, DomainError> {
        let user = self.authenticate(token).await?;

        for key in RESERVED_ENTRY_KEYS {
            payload.remove(key);
        }

        let now = Utc::now();
        let entry = JourneyEntry {
            id: new_entry_id(now),
            user_id: user.id,
            created_at: now,
            payload,
        };

        self.repo
            .insert_journey_entry(&entry)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;

        info!(entry_id = %entry.id, "Journey entry saved");
        Ok(entry.id)
    }

    #[instrument(name = "session_profile.service.journey_entries", skip_all, fields(user_id = Empty))]
    pub async fn journey_entries(&self, token: &str) -> Result<Vec<JourneyEntry>, DomainError> {
        let user = self.authenticate(token).await?;

        let entries = self
            .repo
            .list_journey_entries(user.id)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;

        debug!("Loaded {} journey entries", entries.len());
        Ok(entries)
    }

    /// Acknowledge a reset request without revealing whether the account exists.
    #[instrument(name = "session_profile.service.request_password_reset", skip_all)]
    pub fn request_password_reset(&self, email: Option<&str>) -> Result<&'static str, DomainError> {
        let email = required(email, "email")?;
        info!(email = %redact::email(email), "Password reset requested");
        Ok(PASSWORD_RESET_MESSAGE)
    }

    #[instrument(name = "session_profile.service.list_accounts", skip_all)]
    pub async fn list_accounts(&self) -> Result<Vec<UserIdentity>, DomainError> {
        self.identity
            .list_users()
            .await
            .map_err(|e| DomainError::identity(e.to_string()))
    }

    /// Administrative password overwrite, looked up by email.
    #[instrument(name = "session_profile.service.fix_user_password", skip_all, fields(email = Empty))]
    pub async fn fix_user_password(
        &self,
        email: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), DomainError> {
        let email = required(email, "email")?;
        let new_password = required_secret(new_password, "newPassword")?;

        let email = normalize_email(email);
        Span::current().record("email", redact::email(&email).as_str());

        let user = self
            .find_user_by_email(&email)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        self.identity
            .update_password(user.id, new_password)
            .await
            .map_err(|e| match e {
                IdentityError::WeakCredential(message) => DomainError::WeakCredential { message },
                IdentityError::NotFound => DomainError::UserNotFound,
                other => DomainError::identity(other.to_string()),
            })?;

        info!(user_id = %user.id, "Password overwritten");
        Ok(())
    }

    // --- helpers ---

    async fn authenticate(&self, token: &str) -> Result<UserIdentity, DomainError> {
        if token.trim().is_empty() {
            return Err(DomainError::MissingToken);
        }

        let user = self
            .identity
            .get_user_by_token(token.trim())
            .await
            .map_err(|e| match e {
                IdentityError::InvalidOrExpiredSession
                | IdentityError::InvalidCredentials
                | IdentityError::NotFound => DomainError::InvalidOrExpiredSession,
                other => DomainError::identity(other.to_string()),
            })?;

        Span::current().record("user_id", tracing::field::display(user.id));
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserIdentity>, DomainError> {
        let users = self
            .identity
            .list_users()
            .await
            .map_err(|e| DomainError::identity(e.to_string()))?;

        Ok(users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>, DomainError> {
        self.repo
            .find_profile(user_id)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))
    }

    /// Validates the whole patch before touching `profile`.
    fn apply_patch(&self, profile: &mut Profile, patch: ProfilePatch) -> Result<(), DomainError> {
        let tone = patch
            .buddy_tone
            .as_deref()
            .map(|raw| {
                raw.parse::<CompanionTone>()
                    .map_err(|e| DomainError::validation("buddyTone", e.to_string()))
            })
            .transpose()?;
        let dob = patch.dob.as_deref().map(parse_dob).transpose()?;
        if let Some(name) = &patch.name {
            self.validate_name(name)?;
        }
        if let Some(buddy_name) = &patch.buddy_name {
            if buddy_name.trim().is_empty() {
                return Err(DomainError::validation("buddyName", "cannot be empty"));
            }
        }

        if let Some(name) = patch.name {
            profile.name = name.trim().to_string();
        }
        if let Some(buddy_name) = patch.buddy_name {
            profile.buddy_name = buddy_name.trim().to_string();
        }
        if let Some(tone) = tone {
            profile.buddy_tone = tone;
        }
        if let Some(avatar) = patch.buddy_avatar {
            profile.buddy_avatar = avatar;
        }
        if let Some(dark) = patch.is_dark_mode {
            profile.is_dark_mode = dark;
        }
        if let Some(dob) = dob {
            profile.dob = dob;
        }
        if let Some(profession) = patch.profession {
            let profession = profession.trim();
            profile.profession = (!profession.is_empty()).then(|| profession.to_string());
        }
        Ok(())
    }

    fn validate_name(&self, name: &str) -> Result<(), DomainError> {
        let len = name.trim().chars().count();
        if len == 0 {
            return Err(DomainError::validation("name", "cannot be empty"));
        }
        if len > self.config.max_name_length {
            return Err(DomainError::validation(
                "name",
                format!("must be at most {} characters", self.config.max_name_length),
            ));
        }
        Ok(())
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, DomainError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::validation(field, "is required"))
}

/// Like [`required`] but without trimming: whitespace is significant in secrets.
fn required_secret<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, DomainError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::validation(field, "is required"))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn fallback_name(user: &UserIdentity) -> String {
    user.signup_name()
        .map(str::to_string)
        .or_else(|| user.email.split('@').next().map(str::to_string))
        .unwrap_or_default()
}

/// Empty input clears the date.
fn parse_dob(raw: &str) -> Result<Option<NaiveDate>, DomainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| DomainError::validation("dob", format!("expected YYYY-MM-DD, got '{raw}'")))
}

fn new_entry_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ENTRY_SUFFIX_LEN)
        .map(|_| ENTRY_SUFFIX_ALPHABET[rng.random_range(0..ENTRY_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_ids_carry_millis_and_suffix() {
        let now = Utc::now();
        let id = new_entry_id(now);
        let (millis, suffix) = id.split_once('-').unwrap();
        assert_eq!(millis, now.timestamp_millis().to_string());
        assert_eq!(suffix.len(), ENTRY_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| ENTRY_SUFFIX_ALPHABET.contains(&b)));
        assert_ne!(new_entry_id(now), new_entry_id(now));
    }

    #[test]
    fn dob_parsing() {
        assert_eq!(
            parse_dob("1990-04-12").unwrap(),
            NaiveDate::from_ymd_opt(1990, 4, 12)
        );
        assert_eq!(parse_dob("  ").unwrap(), None);
        assert!(matches!(
            parse_dob("12/04/1990"),
            Err(DomainError::Validation { ref field, .. }) if field == "dob"
        ));
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  a@x.com "), "email").unwrap(), "a@x.com");
        assert!(required(Some("   "), "email").is_err());
        assert!(required(None, "email").is_err());
        assert_eq!(required_secret(Some(" pw "), "password").unwrap(), " pw ");
        assert!(required_secret(Some(""), "password").is_err());
    }

    #[test]
    fn fallback_name_prefers_signup_metadata() {
        let mut user = UserIdentity {
            id: Uuid::nil(),
            email: "ana@x.com".into(),
            created_at: Utc::now(),
            email_confirmed_at: None,
            last_sign_in_at: None,
            metadata: serde_json::json!({"name": "Ana"}),
        };
        assert_eq!(fallback_name(&user), "Ana");
        user.metadata = serde_json::Value::Null;
        assert_eq!(fallback_name(&user), "ana");
    }
}
