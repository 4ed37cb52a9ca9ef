use chrono::NaiveDate;
use tracing::warn;

use crate::contract::model::{
    CompanionTone, JourneyEntry, Profile, DEFAULT_BUDDY_AVATAR, DEFAULT_BUDDY_NAME,
};
use crate::infra::storage::entity::{JourneyRecord, ProfileRecord};

const DOB_FORMAT: &str = "%Y-%m-%d";

/// Convert a stored record to a contract model.
/// Unknown tones fall back to `warm`; an unparsable dob is dropped.
pub fn profile_to_contract(record: ProfileRecord) -> Profile {
    let buddy_tone = record.buddy_tone.parse().unwrap_or_else(|_| {
        if !record.buddy_tone.is_empty() {
            warn!(
                user_id = %record.id,
                tone = %record.buddy_tone,
                "Unknown stored companion tone, using warm"
            );
        }
        CompanionTone::Warm
    });

    let dob = record.dob.as_deref().and_then(|raw| {
        NaiveDate::parse_from_str(raw, DOB_FORMAT)
            .map_err(|_| warn!(user_id = %record.id, "Ignoring unparsable stored dob"))
            .ok()
    });

    Profile {
        id: record.id,
        email: record.email,
        name: record.name,
        created_at: record.created_at,
        buddy_name: non_empty_or(record.buddy_name, DEFAULT_BUDDY_NAME),
        buddy_tone,
        buddy_avatar: non_empty_or(record.buddy_avatar, DEFAULT_BUDDY_AVATAR),
        is_dark_mode: record.is_dark_mode,
        dob,
        profession: record.profession.filter(|p| !p.is_empty()),
        updated_at: record.updated_at,
    }
}

pub fn profile_to_record(profile: &Profile) -> ProfileRecord {
    ProfileRecord {
        id: profile.id,
        email: profile.email.clone(),
        name: profile.name.clone(),
        created_at: profile.created_at,
        buddy_name: profile.buddy_name.clone(),
        buddy_tone: profile.buddy_tone.as_str().to_string(),
        buddy_avatar: profile.buddy_avatar.clone(),
        is_dark_mode: profile.is_dark_mode,
        dob: profile.dob.map(|d| d.format(DOB_FORMAT).to_string()),
        profession: profile.profession.clone(),
        updated_at: profile.updated_at,
    }
}

pub fn journey_to_contract(record: JourneyRecord) -> JourneyEntry {
    JourneyEntry {
        id: record.id,
        user_id: record.user_id,
        created_at: record.created_at,
        payload: record.payload,
    }
}

pub fn journey_to_record(entry: &JourneyEntry) -> JourneyRecord {
    JourneyRecord {
        id: entry.id.clone(),
        user_id: entry.user_id,
        created_at: entry.created_at,
        payload: entry.payload.clone(),
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(tone: &str) -> ProfileRecord {
        ProfileRecord {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "Ana".into(),
            created_at: Utc::now(),
            buddy_name: String::new(),
            buddy_tone: tone.into(),
            buddy_avatar: "calm".into(),
            is_dark_mode: true,
            dob: Some("1990-04-12".into()),
            profession: Some(String::new()),
            updated_at: None,
        }
    }

    #[test]
    fn legacy_tone_and_blank_fields_fall_back() {
        let profile = profile_to_contract(record("grumpy"));
        assert_eq!(profile.buddy_tone, CompanionTone::Warm);
        assert_eq!(profile.buddy_name, DEFAULT_BUDDY_NAME);
        assert_eq!(profile.buddy_avatar, "calm");
        assert_eq!(profile.profession, None);
        assert_eq!(profile.dob, NaiveDate::from_ymd_opt(1990, 4, 12));
    }

    #[test]
    fn record_keeps_camel_case_wire_names() {
        let mut rec = record("mentor");
        rec.buddy_name = "Sunny".into();
        let profile = profile_to_contract(rec);
        let json = serde_json::to_value(profile_to_record(&profile)).unwrap();

        assert_eq!(json["buddyTone"], "mentor");
        assert_eq!(json["buddyName"], "Sunny");
        assert_eq!(json["isDarkMode"], true);
        assert_eq!(json["dob"], "1990-04-12");
        assert!(json.get("updatedAt").is_none());
        assert!(json.get("profession").is_none());
    }

    #[test]
    fn journey_payload_is_flattened_beside_system_fields() {
        let entry = JourneyEntry {
            id: "1700000000000-abcd1234".into(),
            user_id: Uuid::nil(),
            created_at: Utc::now(),
            payload: serde_json::json!({"mood": "calm", "note": "hi"})
                .as_object()
                .cloned()
                .unwrap(),
        };

        let json = serde_json::to_value(journey_to_record(&entry)).unwrap();
        assert_eq!(json["mood"], "calm");
        assert_eq!(json["id"], "1700000000000-abcd1234");
        assert_eq!(json["userId"], Uuid::nil().to_string());

        let back: JourneyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(journey_to_contract(back), entry);
    }
}
