use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// Profile with companion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub buddy_name: String,
    pub buddy_tone: String,
    pub buddy_avatar: String,
    pub is_dark_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Fields to change; `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buddy_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buddy_tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buddy_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dark_mode: Option<bool>,
    /// `YYYY-MM-DD`; empty string clears.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
}

/// Result of a successful sign-up, sign-in or session check.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: User,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthReply {
    pub user: User,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub requires_sign_in: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileReply {
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageReply {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntrySavedReply {
    pub entry_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntriesReply {
    #[serde(default)]
    pub entries: Vec<Map<String, Value>>,
}
