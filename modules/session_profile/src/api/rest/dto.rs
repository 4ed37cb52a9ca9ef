use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::contract::model::{
    JourneyEntry, NewAccount, Profile, ProfilePatch, Session, UserIdentity,
};

// Request fields are optional on purpose: a missing field becomes a
// field-level ValidationError instead of a body rejection.

/// REST DTO for signing up
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpReq {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// REST DTO for password sign-in
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInReq {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordReq {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixPasswordReq {
    pub email: Option<String>,
    pub new_password: Option<String>,
}

/// Partial profile update. Unknown keys (`id`, `email`, `createdAt`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatchReq {
    pub name: Option<String>,
    pub buddy_name: Option<String>,
    /// One of `warm`, `sibling`, `mentor`, `playful`, `professional`.
    pub buddy_tone: Option<String>,
    pub buddy_avatar: Option<String>,
    pub is_dark_mode: Option<bool>,
    /// `YYYY-MM-DD`; an empty string clears it.
    pub dob: Option<String>,
    /// An empty string clears it.
    pub profession: Option<String>,
}

/// Arbitrary JSON object stored as a journey entry.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct JourneyEntryReq(pub serde_json::Map<String, serde_json::Value>);

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    pub user_metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub buddy_name: String,
    pub buddy_tone: String,
    pub buddy_avatar: String,
    pub is_dark_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResp {
    pub success: bool,
    pub user: UserDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub profile: ProfileDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_sign_in: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInResp {
    pub success: bool,
    pub user: UserDto,
    pub session: SessionDto,
    pub access_token: String,
    /// `null` when no profile was ever stored.
    pub profile: Option<ProfileDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResp {
    pub success: bool,
    pub user: UserDto,
    pub profile: Option<ProfileDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResp {
    pub success: bool,
    pub profile: ProfileDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JourneySavedResp {
    pub success: bool,
    pub entry_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JourneyListResp {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<serde_json::Value>,
}

/// `{success, message}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResp {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResp {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugUserDto {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DebugUsersResp {
    pub count: usize,
    pub users: Vec<DebugUserDto>,
}

// Conversion implementations between REST DTOs and contract models

impl From<SignUpReq> for NewAccount {
    fn from(req: SignUpReq) -> Self {
        Self {
            email: req.email,
            password: req.password,
            name: req.name,
        }
    }
}

impl From<ProfilePatchReq> for ProfilePatch {
    fn from(req: ProfilePatchReq) -> Self {
        Self {
            name: req.name,
            buddy_name: req.buddy_name,
            buddy_tone: req.buddy_tone,
            buddy_avatar: req.buddy_avatar,
            is_dark_mode: req.is_dark_mode,
            dob: req.dob,
            profession: req.profession,
        }
    }
}

impl From<UserIdentity> for UserDto {
    fn from(u: UserIdentity) -> Self {
        Self {
            id: u.id,
            email: u.email,
            created_at: u.created_at,
            email_confirmed_at: u.email_confirmed_at,
            last_sign_in_at: u.last_sign_in_at,
            user_metadata: u.metadata,
        }
    }
}

impl From<UserIdentity> for DebugUserDto {
    fn from(u: UserIdentity) -> Self {
        Self {
            id: u.id,
            email: u.email,
            created_at: u.created_at,
            email_confirmed_at: u.email_confirmed_at,
            last_sign_in_at: u.last_sign_in_at,
        }
    }
}

impl From<Session> for SessionDto {
    fn from(s: Session) -> Self {
        Self {
            access_token: s.access_token,
            token_type: s.token_type,
            expires_in: s.expires_in,
            expires_at: s.expires_at,
            refresh_token: s.refresh_token,
        }
    }
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            email: p.email,
            name: p.name,
            created_at: p.created_at,
            buddy_name: p.buddy_name,
            buddy_tone: p.buddy_tone.as_str().to_string(),
            buddy_avatar: p.buddy_avatar,
            is_dark_mode: p.is_dark_mode,
            dob: p.dob.map(|d| d.format("%Y-%m-%d").to_string()),
            profession: p.profession,
            updated_at: p.updated_at,
        }
    }
}

/// Flatten an entry back into the stored JSON shape.
pub fn journey_entry_json(entry: JourneyEntry) -> serde_json::Value {
    let mut obj = entry.payload;
    obj.insert("id".into(), serde_json::Value::String(entry.id));
    obj.insert(
        "userId".into(),
        serde_json::Value::String(entry.user_id.to_string()),
    );
    obj.insert(
        "createdAt".into(),
        serde_json::to_value(entry.created_at).unwrap_or(serde_json::Value::Null),
    );
    serde_json::Value::Object(obj)
}
