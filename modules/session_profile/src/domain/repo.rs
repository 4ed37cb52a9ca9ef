use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::model::{JourneyEntry, Profile};

/// Port for the domain layer: per-user data the service persists.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UserDataRepository: Send + Sync {
    /// Load the profile of `user_id`, if one was ever written.
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    /// Insert or overwrite the profile (keyed by `profile.id`).
    async fn save_profile(&self, profile: &Profile) -> anyhow::Result<()>;
    /// Persist a fully-formed entry.
    ///
    /// Service assigns id/timestamps; repo persists.
    async fn insert_journey_entry(&self, entry: &JourneyEntry) -> anyhow::Result<()>;
    /// All entries of `user_id`, in store order.
    async fn list_journey_entries(&self, user_id: Uuid) -> anyhow::Result<Vec<JourneyEntry>>;
}
