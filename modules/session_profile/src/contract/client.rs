use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::contract::model::{
    JourneyEntry, NewAccount, Profile, ProfilePatch, SessionView, SignInOutcome, SignUpOutcome,
};

/// Public API of the session_profile module for in-process callers.
/// Errors are `SessionProfileError` wrapped in `anyhow`.
#[async_trait]
pub trait SessionProfileApi: Send + Sync {
    async fn sign_up(&self, account: NewAccount) -> anyhow::Result<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<SignInOutcome>;

    /// Resolve an access token into its user and stored profile
    async fn current_session(&self, access_token: &str) -> anyhow::Result<SessionView>;

    async fn update_profile(
        &self,
        access_token: &str,
        patch: ProfilePatch,
    ) -> anyhow::Result<Profile>;

    /// Returns the id of the stored entry
    async fn save_journey_entry(
        &self,
        access_token: &str,
        payload: Map<String, Value>,
    ) -> anyhow::Result<String>;

    async fn journey_entries(&self, access_token: &str) -> anyhow::Result<Vec<JourneyEntry>>;
}
