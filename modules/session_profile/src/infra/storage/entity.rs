use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored shape of `user:<id>:profile`.
///
/// Tone and date of birth stay strings so that legacy rows still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub buddy_name: String,
    #[serde(default)]
    pub buddy_tone: String,
    #[serde(default)]
    pub buddy_avatar: String,
    #[serde(default)]
    pub is_dark_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// System fields of a stored journey entry; caller fields sit beside them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRecord {
    pub id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}
