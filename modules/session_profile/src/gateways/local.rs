use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::contract::{
    client::SessionProfileApi,
    error::SessionProfileError,
    model::{
        JourneyEntry, NewAccount, Profile, ProfilePatch, SessionView, SignInOutcome,
        SignUpOutcome,
    },
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of `SessionProfileApi` that delegates to the domain service
pub struct SessionProfileLocalClient {
    service: Arc<Service>,
}

impl SessionProfileLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SessionProfileApi for SessionProfileLocalClient {
    async fn sign_up(&self, account: NewAccount) -> anyhow::Result<SignUpOutcome> {
        self.service.sign_up(account).await.map_err(to_anyhow)
    }

    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<SignInOutcome> {
        self.service
            .sign_in(Some(email), Some(password))
            .await
            .map_err(to_anyhow)
    }

    async fn current_session(&self, access_token: &str) -> anyhow::Result<SessionView> {
        self.service
            .current_session(access_token)
            .await
            .map_err(to_anyhow)
    }

    async fn update_profile(
        &self,
        access_token: &str,
        patch: ProfilePatch,
    ) -> anyhow::Result<Profile> {
        self.service
            .update_profile(access_token, patch)
            .await
            .map_err(to_anyhow)
    }

    async fn save_journey_entry(
        &self,
        access_token: &str,
        payload: Map<String, Value>,
    ) -> anyhow::Result<String> {
        self.service
            .save_journey_entry(access_token, payload)
            .await
            .map_err(to_anyhow)
    }

    async fn journey_entries(&self, access_token: &str) -> anyhow::Result<Vec<JourneyEntry>> {
        self.service
            .journey_entries(access_token)
            .await
            .map_err(to_anyhow)
    }
}

fn to_anyhow(e: DomainError) -> anyhow::Error {
    anyhow::Error::new(SessionProfileError::from(e))
}
