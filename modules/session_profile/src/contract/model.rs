use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account record owned by the identity provider (no serde/schema).
#[derive(Debug, Clone, PartialEq)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    /// Free-form attributes captured at signup, e.g. `{"name": "Ana"}`.
    pub metadata: serde_json::Value,
}

impl UserIdentity {
    /// Display name recorded at signup, if any.
    pub fn signup_name(&self) -> Option<&str> {
        self.metadata
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Bearer session issued by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds at issue time.
    pub expires_in: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub user: UserIdentity,
}

/// Tone the companion ("buddy") speaks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanionTone {
    #[default]
    Warm,
    Sibling,
    Mentor,
    Playful,
    Professional,
}

impl CompanionTone {
    pub const ALL: [CompanionTone; 5] = [
        CompanionTone::Warm,
        CompanionTone::Sibling,
        CompanionTone::Mentor,
        CompanionTone::Playful,
        CompanionTone::Professional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanionTone::Warm => "warm",
            CompanionTone::Sibling => "sibling",
            CompanionTone::Mentor => "mentor",
            CompanionTone::Playful => "playful",
            CompanionTone::Professional => "professional",
        }
    }
}

impl fmt::Display for CompanionTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTone(pub String);

impl fmt::Display for UnknownTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown companion tone '{}'", self.0)
    }
}

impl std::error::Error for UnknownTone {}

impl FromStr for CompanionTone {
    type Err = UnknownTone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTone(s.to_string()))
    }
}

pub const DEFAULT_BUDDY_NAME: &str = "Muskurahat";
pub const DEFAULT_BUDDY_AVATAR: &str = "playful";

/// User profile kept by this service, keyed by the identity id.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub buddy_name: String,
    pub buddy_tone: CompanionTone,
    pub buddy_avatar: String,
    pub is_dark_mode: bool,
    pub dob: Option<NaiveDate>,
    pub profession: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Fresh profile with default companion settings.
    pub fn with_defaults(id: Uuid, email: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            name,
            created_at: now,
            buddy_name: DEFAULT_BUDDY_NAME.to_string(),
            buddy_tone: CompanionTone::default(),
            buddy_avatar: DEFAULT_BUDDY_AVATAR.to_string(),
            is_dark_mode: false,
            dob: None,
            profession: None,
            updated_at: None,
        }
    }
}

/// Partial profile update. `None` keeps the stored value.
///
/// `buddy_tone` and `dob` arrive unparsed and are validated by the service;
/// an empty `dob` or `profession` clears the field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub buddy_name: Option<String>,
    pub buddy_tone: Option<String>,
    pub buddy_avatar: Option<String>,
    pub is_dark_mode: Option<bool>,
    pub dob: Option<String>,
    pub profession: Option<String>,
}

/// Signup input. Fields are optional so that missing ones surface as validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewAccount {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created and signed in.
    Active {
        user: UserIdentity,
        profile: Profile,
        session: Session,
    },
    /// Account created, but the automatic sign-in did not go through.
    RequiresSignIn { user: UserIdentity, profile: Profile },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignInOutcome {
    pub user: UserIdentity,
    pub session: Session,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub user: UserIdentity,
    pub profile: Option<Profile>,
}

/// Immutable journal entry: caller payload plus system fields.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyEntry {
    /// `<epoch-millis>-<random suffix>`
    pub id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Caller fields, without `id`, `userId` and `createdAt`.
    pub payload: serde_json::Map<String, serde_json::Value>,
}
