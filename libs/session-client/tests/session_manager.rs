//! Session manager against a mocked server.

use httpmock::prelude::*;
use serde_json::{json, Map, Value};

use session_client::{
    ClientConfig, ClientError, FileStorage, MemoryStorage, ProfileUpdate, SessionManager,
    SessionStorage, ACCESS_TOKEN_KEY, PROFILE_KEY, USER_KEY,
};

const BASE: &str = "/make-server-52bd6d77";
const ANON: &str = "anon-key";

fn manager(server: &MockServer) -> SessionManager<MemoryStorage> {
    SessionManager::new(ClientConfig::new(server.base_url(), ANON), MemoryStorage::new()).unwrap()
}

/// Manager pointed at a port nothing listens on.
fn offline_manager() -> SessionManager<MemoryStorage> {
    SessionManager::new(
        ClientConfig::new("http://127.0.0.1:1", ANON),
        MemoryStorage::new(),
    )
    .unwrap()
}

fn user() -> Value {
    json!({
        "id": "0b7e6c64-4b9b-4d8e-9d3a-2f5c3f0f9a11",
        "email": "ana@example.com",
        "createdAt": "2025-01-02T03:04:05Z",
        "emailConfirmedAt": "2025-01-02T03:04:05Z",
        "userMetadata": {"name": "Ana"}
    })
}

fn profile(tone: &str) -> Value {
    json!({
        "id": "0b7e6c64-4b9b-4d8e-9d3a-2f5c3f0f9a11",
        "email": "ana@example.com",
        "name": "Ana",
        "createdAt": "2025-01-02T03:04:05Z",
        "buddyName": "Buddy",
        "buddyTone": tone,
        "buddyAvatar": "🌟",
        "isDarkMode": false
    })
}

fn seed_session(mgr: &SessionManager<MemoryStorage>, token: &str) {
    let s = mgr.storage();
    s.set(ACCESS_TOKEN_KEY, token).unwrap();
    s.set(USER_KEY, &user().to_string()).unwrap();
    s.set(PROFILE_KEY, &profile("friendly").to_string()).unwrap();
}

fn assert_cleared(mgr: &SessionManager<MemoryStorage>) {
    for key in [ACCESS_TOKEN_KEY, USER_KEY, PROFILE_KEY] {
        assert_eq!(mgr.storage().get(key).unwrap(), None, "{key} still cached");
    }
}

#[tokio::test]
async fn sign_in_caches_token_user_and_profile() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{BASE}/auth/signin"))
            .header("authorization", format!("Bearer {ANON}"))
            .json_body(json!({"email": "ana@example.com", "password": "secret1"}));
        then.status(200).json_body(json!({
            "success": true,
            "user": user(),
            "session": {"accessToken": "tok-1", "tokenType": "bearer", "expiresIn": 3600},
            "accessToken": "tok-1",
            "profile": profile("friendly")
        }));
    });

    let mgr = manager(&server);
    let state = mgr.sign_in("ana@example.com", "secret1").await.unwrap();

    m.assert();
    assert_eq!(state.user.email, "ana@example.com");
    assert!(mgr.is_authenticated());
    assert_eq!(
        mgr.storage().get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
        Some("tok-1")
    );
    assert_eq!(mgr.stored_user(), Some(state.user));
    assert_eq!(mgr.stored_profile().unwrap().buddy_tone, "friendly");
}

#[tokio::test]
async fn sign_in_without_profile_drops_stale_profile() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("{BASE}/auth/signin"));
        then.status(200).json_body(json!({
            "success": true,
            "user": user(),
            "session": {"accessToken": "tok-2", "tokenType": "bearer", "expiresIn": 3600},
            "accessToken": "tok-2",
            "profile": null
        }));
    });

    let mgr = manager(&server);
    seed_session(&mgr, "old");
    mgr.sign_in("ana@example.com", "secret1").await.unwrap();

    assert_eq!(mgr.stored_profile(), None);
    assert_eq!(
        mgr.storage().get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
        Some("tok-2")
    );
}

#[tokio::test]
async fn sign_in_failure_surfaces_problem_code() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("{BASE}/auth/signin"));
        then.status(401)
            .header("content-type", "application/problem+json")
            .json_body(json!({
                "type": "https://errors.chhaav.app/InvalidCredentials",
                "title": "Invalid credentials",
                "status": 401,
                "detail": "Invalid email or password",
                "code": "InvalidCredentials"
            }));
    });

    let mgr = manager(&server);
    let err = mgr.sign_in("ana@example.com", "nope").await.unwrap_err();

    assert_eq!(err.code(), Some("InvalidCredentials"));
    assert!(matches!(
        err,
        ClientError::Server { status: 401, ref message, .. } if message == "Invalid email or password"
    ));
    assert!(!mgr.is_authenticated());
}

#[tokio::test]
async fn sign_up_falls_back_to_sign_in_when_server_asks() {
    let server = MockServer::start();
    let signup = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{BASE}/auth/signup"))
            .json_body(json!({"email": "ana@example.com", "password": "secret1", "name": "Ana"}));
        then.status(200).json_body(json!({
            "success": true,
            "user": user(),
            "profile": profile("friendly"),
            "requiresSignIn": true,
            "message": "Account created. Please sign in."
        }));
    });
    let signin = server.mock(|when, then| {
        when.method(POST).path(format!("{BASE}/auth/signin"));
        then.status(200).json_body(json!({
            "success": true,
            "user": user(),
            "session": {"accessToken": "tok-3", "tokenType": "bearer", "expiresIn": 3600},
            "accessToken": "tok-3",
            "profile": profile("friendly")
        }));
    });

    let mgr = manager(&server);
    mgr.sign_up("ana@example.com", "secret1", "Ana").await.unwrap();

    signup.assert();
    signin.assert();
    assert_eq!(
        mgr.storage().get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
        Some("tok-3")
    );
}

#[tokio::test]
async fn sign_up_with_token_caches_session_directly() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("{BASE}/auth/signup"));
        then.status(200).json_body(json!({
            "success": true,
            "user": user(),
            "accessToken": "tok-4",
            "profile": profile("friendly")
        }));
    });

    let mgr = manager(&server);
    let state = mgr.sign_up("ana@example.com", "secret1", "Ana").await.unwrap();

    assert_eq!(state.profile.unwrap().buddy_name, "Buddy");
    assert!(mgr.is_authenticated());
}

#[tokio::test]
async fn get_session_without_token_does_not_touch_network() {
    let mgr = offline_manager();
    let err = mgr.get_session().await.unwrap_err();
    assert!(matches!(err, ClientError::NoSession));
}

#[tokio::test]
async fn get_session_refreshes_cached_user_and_profile() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{BASE}/auth/session"))
            .header("authorization", "Bearer tok-5");
        then.status(200).json_body(json!({
            "success": true,
            "user": user(),
            "profile": profile("mentor")
        }));
    });

    let mgr = manager(&server);
    seed_session(&mgr, "tok-5");
    let state = mgr.get_session().await.unwrap();

    m.assert();
    assert_eq!(state.profile.unwrap().buddy_tone, "mentor");
    assert_eq!(mgr.stored_profile().unwrap().buddy_tone, "mentor");
}

#[tokio::test]
async fn rejected_session_clears_local_state() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("{BASE}/auth/session"));
        then.status(401)
            .header("content-type", "application/problem+json")
            .json_body(json!({
                "title": "Invalid session",
                "status": 401,
                "detail": "Invalid or expired session",
                "code": "InvalidOrExpiredSession"
            }));
    });

    let mgr = manager(&server);
    seed_session(&mgr, "expired");
    let err = mgr.get_session().await.unwrap_err();

    assert_eq!(err.code(), Some("InvalidOrExpiredSession"));
    assert_cleared(&mgr);
}

#[tokio::test]
async fn sign_out_clears_local_state_even_when_server_is_down() {
    let mgr = offline_manager();
    seed_session(&mgr, "tok-6");

    mgr.sign_out().await;

    assert_cleared(&mgr);
    assert!(!mgr.is_authenticated());
}

#[tokio::test]
async fn sign_out_sends_cached_token() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{BASE}/auth/signout"))
            .header("authorization", "Bearer tok-7");
        then.status(200)
            .json_body(json!({"success": true, "message": "Signed out"}));
    });

    let mgr = manager(&server);
    seed_session(&mgr, "tok-7");
    mgr.sign_out().await;

    m.assert();
    assert_cleared(&mgr);
}

#[tokio::test]
async fn update_profile_requires_session() {
    let mgr = offline_manager();
    let err = mgr
        .update_profile(&ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotAuthenticated));
}

#[tokio::test]
async fn update_profile_sends_only_set_fields_and_caches_profile() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(PUT)
            .path(format!("{BASE}/auth/profile"))
            .header("authorization", "Bearer tok-8")
            .json_body(json!({"buddyTone": "mentor"}));
        then.status(200)
            .json_body(json!({"success": true, "profile": profile("mentor")}));
    });

    let mgr = manager(&server);
    seed_session(&mgr, "tok-8");
    let update = ProfileUpdate {
        buddy_tone: Some("mentor".into()),
        ..Default::default()
    };
    let updated = mgr.update_profile(&update).await.unwrap();

    m.assert();
    assert_eq!(updated.buddy_tone, "mentor");
    assert_eq!(mgr.stored_profile(), Some(updated));
    assert_eq!(
        mgr.storage().get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
        Some("tok-8")
    );
}

#[tokio::test]
async fn journey_entries_round_trip_through_server() {
    let server = MockServer::start();
    let save = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{BASE}/data/journey"))
            .header("authorization", "Bearer tok-9")
            .json_body(json!({"mood": "calm"}));
        then.status(200)
            .json_body(json!({"success": true, "entryId": "journey:u:1"}));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{BASE}/data/journey"));
        then.status(200).json_body(json!({
            "success": true,
            "entries": [{"mood": "calm", "createdBy": "u"}]
        }));
    });

    let mgr = manager(&server);
    seed_session(&mgr, "tok-9");

    let mut entry = Map::new();
    entry.insert("mood".into(), json!("calm"));
    let id = mgr.save_journey_entry(&entry).await.unwrap();
    let entries = mgr.journey_entries().await.unwrap();

    save.assert();
    assert_eq!(id, "journey:u:1");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["mood"], "calm");
}

#[tokio::test]
async fn reset_password_uses_anon_key() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{BASE}/auth/reset-password"))
            .header("authorization", format!("Bearer {ANON}"))
            .json_body(json!({"email": "ana@example.com"}));
        then.status(200).json_body(json!({
            "success": true,
            "message": "If an account exists, a reset link has been sent"
        }));
    });

    let msg = manager(&server)
        .reset_password("ana@example.com")
        .await
        .unwrap();

    m.assert();
    assert!(msg.starts_with("If an account exists"));
}

#[tokio::test]
async fn file_storage_session_survives_restart() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("{BASE}/auth/signin"));
        then.status(200).json_body(json!({
            "success": true,
            "user": user(),
            "session": {"accessToken": "tok-10", "tokenType": "bearer", "expiresIn": 3600},
            "accessToken": "tok-10",
            "profile": profile("friendly")
        }));
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let config = ClientConfig::new(server.base_url(), ANON);

    {
        let mgr = SessionManager::new(config.clone(), FileStorage::open(&path).unwrap()).unwrap();
        mgr.sign_in("ana@example.com", "secret1").await.unwrap();
    }

    let restarted = SessionManager::new(config, FileStorage::open(&path).unwrap()).unwrap();
    assert!(restarted.is_authenticated());
    assert_eq!(restarted.stored_user().unwrap().email, "ana@example.com");
}
