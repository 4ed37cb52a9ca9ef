use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::contract::model::{JourneyEntry, Profile};
use crate::domain::repo::UserDataRepository;
use crate::infra::kv::KvStore;
use crate::infra::storage::entity::{JourneyRecord, ProfileRecord};
use crate::infra::storage::{keys, mapper};

/// `UserDataRepository` laid out over a [`KvStore`]:
/// `user:<id>:profile` and `user:<id>:journey:<entryId>`.
pub struct KvUserDataRepository {
    kv: Arc<dyn KvStore>,
}

impl KvUserDataRepository {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl UserDataRepository for KvUserDataRepository {
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let key = keys::profile(user_id);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let record: ProfileRecord =
            serde_json::from_value(raw).with_context(|| format!("decoding {key}"))?;
        Ok(Some(mapper::profile_to_contract(record)))
    }

    async fn save_profile(&self, profile: &Profile) -> anyhow::Result<()> {
        let value = serde_json::to_value(mapper::profile_to_record(profile))?;
        self.kv.set(&keys::profile(profile.id), &value).await?;
        Ok(())
    }

    async fn insert_journey_entry(&self, entry: &JourneyEntry) -> anyhow::Result<()> {
        let value = serde_json::to_value(mapper::journey_to_record(entry))?;
        self.kv
            .set(&keys::journey_entry(entry.user_id, &entry.id), &value)
            .await?;
        Ok(())
    }

    async fn list_journey_entries(&self, user_id: Uuid) -> anyhow::Result<Vec<JourneyEntry>> {
        let values = self.kv.get_by_prefix(&keys::journey_prefix(user_id)).await?;

        // Unreadable entries are skipped so one bad row does not hide the rest.
        let entries = values
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<JourneyRecord>(v) {
                Ok(record) => Some(mapper::journey_to_contract(record)),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Skipping malformed journey entry");
                    None
                }
            })
            .collect();
        Ok(entries)
    }
}
