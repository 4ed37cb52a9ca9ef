use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

use modkit::TracedClient;

use crate::error::ClientError;
use crate::model::{
    AuthReply, AuthState, EntriesReply, EntrySavedReply, MessageReply, Profile, ProfileReply,
    ProfileUpdate, User,
};
use crate::storage::SessionStorage;

pub const ACCESS_TOKEN_KEY: &str = "chhaav_access_token";
pub const USER_KEY: &str = "chhaav_user";
pub const PROFILE_KEY: &str = "chhaav_profile";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, USER_KEY, PROFILE_KEY];

/// Where the server lives and how to call its public routes.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Sent as bearer on routes that need no user session.
    pub anon_key: String,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            base_path: default_base_path(),
            anon_key: anon_key.into(),
        }
    }
}

fn default_base_path() -> String {
    "/make-server-52bd6d77".to_string()
}

/// Client-side session: talks to the session & profile routes and mirrors
/// the signed-in user into `S`.
pub struct SessionManager<S: SessionStorage> {
    http: TracedClient,
    base: String,
    anon_key: String,
    storage: S,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct NewAccount<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

/// Problem document fields the client cares about.
#[derive(Deserialize, Default)]
struct ProblemBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl<S: SessionStorage> SessionManager<S> {
    pub fn new(config: ClientConfig, storage: S) -> Result<Self, ClientError> {
        Self::with_http(config, storage, TracedClient::default())
    }

    pub fn with_http(
        config: ClientConfig,
        storage: S,
        http: TracedClient,
    ) -> Result<Self, ClientError> {
        let raw = format!(
            "{}/{}",
            config.server_url.trim_end_matches('/'),
            config.base_path.trim_matches('/')
        );
        let base = Url::parse(&raw)
            .map_err(|e| ClientError::Config(format!("invalid server url '{raw}': {e}")))?;

        Ok(Self {
            http,
            base: base.as_str().trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
            storage,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Create an account. Falls back to a password sign-in when the server
    /// created the account but could not open a session.
    #[instrument(name = "session_client.sign_up", skip_all)]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthState, ClientError> {
        let reply: AuthReply = self
            .call(
                Method::POST,
                "/auth/signup",
                &self.anon_key,
                Some(&NewAccount {
                    email,
                    password,
                    name,
                }),
            )
            .await?;

        if reply.requires_sign_in.unwrap_or(false) {
            info!("Account created without session, signing in");
            return self.sign_in(email, password).await;
        }

        if let Some(token) = &reply.access_token {
            self.store_session(token, &reply.user, reply.profile.as_ref())?;
        }
        Ok(AuthState {
            user: reply.user,
            profile: reply.profile,
        })
    }

    #[instrument(name = "session_client.sign_in", skip_all)]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthState, ClientError> {
        let reply: AuthReply = self
            .call(
                Method::POST,
                "/auth/signin",
                &self.anon_key,
                Some(&Credentials { email, password }),
            )
            .await?;

        let token = reply
            .access_token
            .as_deref()
            .ok_or_else(|| ClientError::InvalidResponse("sign-in reply without accessToken".into()))?;
        self.store_session(token, &reply.user, reply.profile.as_ref())?;

        info!("Signed in");
        Ok(AuthState {
            user: reply.user,
            profile: reply.profile,
        })
    }

    /// Tell the server (when a token is cached) and drop the local session.
    /// Never fails: a network or storage error only gets logged.
    #[instrument(name = "session_client.sign_out", skip_all)]
    pub async fn sign_out(&self) {
        if let Some(token) = self.cached_token() {
            if let Err(e) = self
                .call::<Value, ()>(Method::POST, "/auth/signout", &token, None)
                .await
            {
                warn!(error = %e, "Sign-out request failed, clearing local session anyway");
            }
        }
        self.clear_session();
    }

    /// Validate the cached token and refresh the cached user and profile.
    /// A rejected token clears the local session.
    #[instrument(name = "session_client.get_session", skip_all)]
    pub async fn get_session(&self) -> Result<AuthState, ClientError> {
        let token = self.cached_token().ok_or(ClientError::NoSession)?;

        let reply: AuthReply = match self
            .call::<AuthReply, ()>(Method::GET, "/auth/session", &token, None)
            .await
        {
            Ok(r) => r,
            Err(e @ ClientError::Server { .. }) => {
                info!(error = %e, "Session rejected by server, clearing local session");
                self.clear_session();
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.put_json(USER_KEY, &reply.user)?;
        if let Some(profile) = &reply.profile {
            self.put_json(PROFILE_KEY, profile)?;
        }
        Ok(AuthState {
            user: reply.user,
            profile: reply.profile,
        })
    }

    /// Apply `update` server-side; only the cached profile is refreshed.
    #[instrument(name = "session_client.update_profile", skip_all)]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        let token = self.cached_token().ok_or(ClientError::NotAuthenticated)?;

        let reply: ProfileReply = self
            .call(Method::PUT, "/auth/profile", &token, Some(update))
            .await?;
        self.put_json(PROFILE_KEY, &reply.profile)?;
        Ok(reply.profile)
    }

    /// Returns the server's acknowledgement message.
    #[instrument(name = "session_client.reset_password", skip_all)]
    pub async fn reset_password(&self, email: &str) -> Result<String, ClientError> {
        let reply: MessageReply = self
            .call(
                Method::POST,
                "/auth/reset-password",
                &self.anon_key,
                Some(&serde_json::json!({ "email": email })),
            )
            .await?;
        Ok(reply.message)
    }

    /// Store a journal entry; returns its id.
    #[instrument(name = "session_client.save_journey_entry", skip_all)]
    pub async fn save_journey_entry(&self, entry: &Map<String, Value>) -> Result<String, ClientError> {
        let token = self.cached_token().ok_or(ClientError::NotAuthenticated)?;
        let reply: EntrySavedReply = self
            .call(Method::POST, "/data/journey", &token, Some(entry))
            .await?;
        Ok(reply.entry_id)
    }

    #[instrument(name = "session_client.journey_entries", skip_all)]
    pub async fn journey_entries(&self) -> Result<Vec<Map<String, Value>>, ClientError> {
        let token = self.cached_token().ok_or(ClientError::NotAuthenticated)?;
        let reply: EntriesReply = self
            .call::<EntriesReply, ()>(Method::GET, "/data/journey", &token, None)
            .await?;
        Ok(reply.entries)
    }

    pub fn is_authenticated(&self) -> bool {
        self.cached_token().is_some()
    }

    pub fn stored_user(&self) -> Option<User> {
        self.read_json(USER_KEY)
    }

    pub fn stored_profile(&self) -> Option<Profile> {
        self.read_json(PROFILE_KEY)
    }

    // --- helpers ---

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        bearer: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base, path);
        let mut req = self.http.request(method, &url).bearer_auth(bearer);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = self.http.send(req).await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let problem: ProblemBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let message = problem
                .detail
                .or(problem.error)
                .or(problem.title)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            debug!(status = status.as_u16(), path, "Server rejected request");
            return Err(ClientError::Server {
                status: status.as_u16(),
                code: problem.code.unwrap_or_default(),
                message,
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::InvalidResponse(format!("{path}: {e}")))
    }

    fn cached_token(&self) -> Option<String> {
        match self.storage.get(ACCESS_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read cached token");
                None
            }
        }
    }

    fn store_session(
        &self,
        token: &str,
        user: &User,
        profile: Option<&Profile>,
    ) -> Result<(), ClientError> {
        self.storage.set(ACCESS_TOKEN_KEY, token)?;
        self.put_json(USER_KEY, user)?;
        match profile {
            Some(p) => self.put_json(PROFILE_KEY, p),
            None => self.storage.remove(PROFILE_KEY),
        }
    }

    fn clear_session(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear session key");
            }
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        let json = serde_json::to_string(value).map_err(ClientError::storage)?;
        self.storage.set(key, &json)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get(key).ok().flatten()?;
        serde_json::from_str(&raw)
            .map_err(|e| warn!(key, error = %e, "Ignoring unreadable cached value"))
            .ok()
    }
}
