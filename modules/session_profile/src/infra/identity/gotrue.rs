use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::contract::model::{Session, UserIdentity};
use crate::domain::ports::{IdentityError, IdentityProvider};
use modkit::TracedClient;

/// HTTP adapter over a GoTrue-compatible auth API (`/auth/v1/...`).
///
/// Holds two credentials:
///  - anon key: public signup and password grant
///  - service-role key: token introspection and admin user management
pub struct GoTrueIdentityProvider {
    client: TracedClient,
    base: Url,
    anon_key: String,
    service_role_key: String,
    users_per_page: usize,
}

/// GoTrue's own default page size for the admin user listing.
const DEFAULT_USERS_PER_PAGE: usize = 50;

#[derive(Debug, Deserialize)]
struct WireUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl From<WireUser> for UserIdentity {
    fn from(u: WireUser) -> Self {
        Self {
            id: u.id,
            email: u.email.unwrap_or_default(),
            created_at: u.created_at,
            email_confirmed_at: u.email_confirmed_at,
            last_sign_in_at: u.last_sign_in_at,
            metadata: u.user_metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    user: WireUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Signup answers with a bare user, or with a session when autoconfirm is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpReply {
    Session { user: WireUser },
    User(WireUser),
}

#[derive(Debug, Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: serde_json::Value,
}

/// Endpoint family, used to read provider status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    SignUp,
    PasswordGrant,
    User,
    Admin,
}

impl GoTrueIdentityProvider {
    pub fn new(
        client: TracedClient,
        base: Url,
        anon_key: impl Into<String>,
        service_role_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base,
            anon_key: anon_key.into(),
            service_role_key: service_role_key.into(),
            users_per_page: DEFAULT_USERS_PER_PAGE,
        }
    }

    pub fn with_users_per_page(mut self, per_page: usize) -> Self {
        self.users_per_page = per_page.max(1);
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IdentityError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::Unavailable("invalid identity base URL".to_string()))?
            .pop_if_empty()
            .extend(["auth", "v1"].iter().chain(segments));
        Ok(url)
    }

    async fn call(
        &self,
        call: Call,
        method: Method,
        url: Url,
        api_key: &str,
        bearer: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, IdentityError> {
        let mut req = self
            .client
            .request(method, url.as_str())
            .header("apikey", api_key)
            .bearer_auth(bearer);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| IdentityError::Unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), ?call, "Identity provider rejected request");
        Err(classify(call, status, &text))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, IdentityError> {
        resp.json::<T>()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("unexpected response body: {e}")))
    }
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map a provider failure onto the identity error taxonomy.
fn classify(call: Call, status: StatusCode, body: &str) -> IdentityError {
    let message = provider_message(body);
    let lower = message.to_lowercase();

    if lower.contains("already registered") || lower.contains("already been registered") {
        return IdentityError::DuplicateEmail;
    }
    if lower.contains("weak password") || lower.contains("at least") {
        return IdentityError::WeakCredential(message);
    }
    if lower.contains("invalid email") || lower.contains("validate email") {
        return IdentityError::InvalidEmail(message);
    }

    match (call, status) {
        (Call::PasswordGrant, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) => {
            IdentityError::InvalidCredentials
        }
        (Call::User, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            IdentityError::InvalidOrExpiredSession
        }
        (Call::Admin, StatusCode::NOT_FOUND) => IdentityError::NotFound,
        _ => IdentityError::Unavailable(format!("HTTP {}: {}", status.as_u16(), message)),
    }
}

fn to_session(s: WireSession) -> Session {
    Session {
        access_token: s.access_token,
        token_type: s.token_type,
        expires_in: s.expires_in,
        expires_at: s
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        refresh_token: s.refresh_token,
        user: s.user.into(),
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    #[instrument(name = "session_profile.gotrue.list_users", skip_all)]
    async fn list_users(&self) -> Result<Vec<UserIdentity>, IdentityError> {
        let mut users = Vec::new();
        for page in 1usize.. {
            let mut url = self.endpoint(&["admin", "users"])?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &self.users_per_page.to_string());

            let resp = self
                .call(
                    Call::Admin,
                    Method::GET,
                    url,
                    &self.service_role_key,
                    &self.service_role_key,
                    None,
                )
                .await?;
            let list: UserList = Self::json(resp).await?;
            let fetched = list.users.len();
            users.extend(list.users.into_iter().map(UserIdentity::from));

            if fetched < self.users_per_page {
                break;
            }
        }
        debug!(count = users.len(), "Listed identity users");
        Ok(users)
    }

    #[instrument(name = "session_profile.gotrue.sign_up", skip_all)]
    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<UserIdentity, IdentityError> {
        let url = self.endpoint(&["signup"])?;
        let body = serde_json::to_value(SignUpBody {
            email,
            password,
            data: metadata,
        })
        .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let resp = self
            .call(
                Call::SignUp,
                Method::POST,
                url,
                &self.anon_key,
                &self.anon_key,
                Some(body),
            )
            .await?;

        let user = match Self::json::<SignUpReply>(resp).await? {
            SignUpReply::Session { user } | SignUpReply::User(user) => user,
        };
        Ok(user.into())
    }

    #[instrument(name = "session_profile.gotrue.confirm_email", skip_all, fields(user_id = %id))]
    async fn confirm_email(&self, id: Uuid) -> Result<(), IdentityError> {
        let url = self.endpoint(&["admin", "users", &id.to_string()])?;
        self.call(
            Call::Admin,
            Method::PUT,
            url,
            &self.service_role_key,
            &self.service_role_key,
            Some(serde_json::json!({ "email_confirm": true })),
        )
        .await?;
        Ok(())
    }

    #[instrument(name = "session_profile.gotrue.sign_in", skip_all)]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let mut url = self.endpoint(&["token"])?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let body = serde_json::to_value(PasswordCredentials { email, password })
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let resp = self
            .call(
                Call::PasswordGrant,
                Method::POST,
                url,
                &self.anon_key,
                &self.anon_key,
                Some(body),
            )
            .await?;
        let session: WireSession = Self::json(resp).await?;
        Ok(to_session(session))
    }

    #[instrument(name = "session_profile.gotrue.get_user", skip_all)]
    async fn get_user_by_token(&self, token: &str) -> Result<UserIdentity, IdentityError> {
        let url = self.endpoint(&["user"])?;
        let resp = self
            .call(Call::User, Method::GET, url, &self.service_role_key, token, None)
            .await?;
        let user: WireUser = Self::json(resp).await?;
        Ok(user.into())
    }

    #[instrument(name = "session_profile.gotrue.update_password", skip_all, fields(user_id = %id))]
    async fn update_password(&self, id: Uuid, new_password: &str) -> Result<(), IdentityError> {
        let url = self.endpoint(&["admin", "users", &id.to_string()])?;
        self.call(
            Call::Admin,
            Method::PUT,
            url,
            &self.service_role_key,
            &self.service_role_key,
            Some(serde_json::json!({ "password": new_password })),
        )
        .await?;
        Ok(())
    }
}
