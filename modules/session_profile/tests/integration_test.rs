use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use session_profile::{
    api::rest::routes::{register_routes, RouteOptions},
    contract::{
        client::SessionProfileApi,
        error::SessionProfileError,
        model::{NewAccount, ProfilePatch, SignUpOutcome, UserIdentity},
    },
    domain::{
        ports::{IdentityError, IdentityProvider},
        service::{Service, ServiceConfig},
    },
    gateways::local::SessionProfileLocalClient,
    infra::{
        identity::MemoryIdentityProvider, kv::MemoryKvStore, storage::KvUserDataRepository,
    },
};

const BASE: &str = "/make-server-52bd6d77";

/// Mock OpenAPI registry for testing
struct MockOpenApiRegistry;

impl modkit::api::OpenApiRegistry for MockOpenApiRegistry {
    fn register_operation(&self, _spec: &modkit::api::OperationSpec) {}

    fn ensure_schema_raw(&self, name: &str, _schemas: modkit::api::SchemaCollection) -> String {
        name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn service_with(identity: Arc<dyn IdentityProvider>) -> Arc<Service> {
    let repo = Arc::new(KvUserDataRepository::new(Arc::new(MemoryKvStore::new())));
    Arc::new(Service::new(identity, repo, ServiceConfig::default()))
}

fn router_for(service: Arc<Service>, enable_debug_routes: bool) -> Router {
    let opts = RouteOptions {
        base_path: BASE.to_string(),
        enable_debug_routes,
    };
    register_routes(Router::new(), &MockOpenApiRegistry, service, &opts)
        .expect("Failed to register routes")
}

fn create_test_router() -> Router {
    router_for(service_with(Arc::new(MemoryIdentityProvider::default())), false)
}

async fn call(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder()
        .method(method)
        .uri(format!("{BASE}{path}"));
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn sign_up(app: &Router, email: &str, password: &str, name: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({"email": email, "password": password, "name": name})),
    )
    .await
}

async fn signed_up_token(app: &Router, email: &str) -> String {
    let (status, body) = sign_up(app, email, "pw123456", "Ana").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["accessToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn signup_creates_profile_with_companion_defaults() {
    let app = create_test_router();

    let (status, body) = sign_up(&app, "  Ana@X.com ", "pw123456", "Ana").await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "ana@x.com");
    assert_eq!(body["profile"]["id"], body["user"]["id"]);
    assert_eq!(body["profile"]["name"], "Ana");
    assert_eq!(body["profile"]["buddyName"], "Muskurahat");
    assert_eq!(body["profile"]["buddyTone"], "warm");
    assert_eq!(body["profile"]["buddyAvatar"], "playful");
    assert_eq!(body["profile"]["isDarkMode"], false);
    assert_eq!(body["accessToken"], body["session"]["accessToken"]);
    assert!(body.get("requiresSignIn").is_none());
}

#[tokio::test]
async fn duplicate_signup_is_rejected_regardless_of_password() {
    let app = create_test_router();
    signed_up_token(&app, "a@x.com").await;

    let (status, body) = sign_up(&app, "A@x.com", "different-pw", "Other").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DuplicateEmail");
    assert_eq!(body["detail"], "User with this email already exists");
}

#[tokio::test]
async fn signup_requires_every_field() {
    let app = create_test_router();

    let (status, body) = call(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({"email": "a@x.com", "password": "pw123456", "name": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");
    assert_eq!(body["errors"][0]["pointer"], "/name");
}

#[tokio::test]
async fn malformed_json_is_a_validation_problem() {
    let app = create_test_router();

    let req = Request::builder()
        .method("POST")
        .uri(format!("{BASE}/auth/signin"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn weak_password_is_reported_to_the_caller() {
    let app = create_test_router();

    let (status, body) = sign_up(&app, "a@x.com", "123", "Ana").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "WeakCredential");
}

#[tokio::test]
async fn signin_returns_session_and_profile() {
    let app = create_test_router();
    signed_up_token(&app, "a@x.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/auth/signin",
        None,
        Some(json!({"email": "a@x.com", "password": "pw123456"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["profile"]["buddyTone"], "warm");
    assert_eq!(body["session"]["tokenType"], "bearer");
    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn signin_with_wrong_password_or_unknown_email_is_unauthorized() {
    let app = create_test_router();
    signed_up_token(&app, "a@x.com").await;

    for (email, password) in [("a@x.com", "wrong-pw"), ("nobody@x.com", "pw123456")] {
        let (status, body) = call(
            &app,
            "POST",
            "/auth/signin",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "InvalidCredentials");
    }
}

#[tokio::test]
async fn signout_always_succeeds() {
    let app = create_test_router();

    let (status, body) = call(&app, "POST", "/auth/signout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = call(&app, "POST", "/auth/signout", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn session_requires_a_valid_token() {
    let app = create_test_router();
    let token = signed_up_token(&app, "a@x.com").await;

    let (status, body) = call(&app, "GET", "/auth/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MissingToken");

    let tampered = format!("{token}x");
    let (status, body) = call(&app, "GET", "/auth/session", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidOrExpiredSession");
    assert!(body.get("profile").is_none());

    let (status, body) = call(&app, "GET", "/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["profile"]["name"], "Ana");
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let identity = Arc::new(MemoryIdentityProvider::new(chrono::Duration::seconds(-1), 6));
    let app = router_for(service_with(identity), false);
    let token = signed_up_token(&app, "a@x.com").await;

    let (status, body) = call(&app, "GET", "/auth/session", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidOrExpiredSession");
}

#[tokio::test]
async fn tone_change_is_visible_in_next_session() {
    let app = create_test_router();
    let token = signed_up_token(&app, "a@x.com").await;

    let (status, body) = call(
        &app,
        "PUT",
        "/auth/profile",
        Some(&token),
        Some(json!({"buddyTone": "mentor"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["profile"]["updatedAt"].is_string());

    let (_, body) = call(&app, "GET", "/auth/session", Some(&token), None).await;
    assert_eq!(body["profile"]["buddyTone"], "mentor");
    assert_eq!(body["profile"]["name"], "Ana");
    assert_eq!(body["profile"]["buddyName"], "Muskurahat");
}

#[tokio::test]
async fn profile_update_keeps_identity_fields_pinned() {
    let app = create_test_router();
    let token = signed_up_token(&app, "a@x.com").await;
    let (_, session) = call(&app, "GET", "/auth/session", Some(&token), None).await;
    let own_id = session["user"]["id"].clone();

    let (status, body) = call(
        &app,
        "PUT",
        "/auth/profile",
        Some(&token),
        Some(json!({
            "id": "00000000-0000-0000-0000-000000000000",
            "email": "evil@x.com",
            "isDarkMode": true,
            "dob": "1990-04-01",
            "profession": "Designer"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["profile"]["id"], own_id);
    assert_eq!(body["profile"]["email"], "a@x.com");
    assert_eq!(body["profile"]["isDarkMode"], true);
    assert_eq!(body["profile"]["dob"], "1990-04-01");
    assert_eq!(body["profile"]["profession"], "Designer");

    let (_, body) = call(
        &app,
        "PUT",
        "/auth/profile",
        Some(&token),
        Some(json!({"dob": "", "profession": ""})),
    )
    .await;
    assert!(body["profile"].get("dob").is_none());
    assert!(body["profile"].get("profession").is_none());
    assert_eq!(body["profile"]["isDarkMode"], true);
}

#[tokio::test]
async fn invalid_profile_values_are_rejected_without_partial_writes() {
    let app = create_test_router();
    let token = signed_up_token(&app, "a@x.com").await;

    let cases = [
        (json!({"buddyTone": "grumpy", "name": "Changed"}), "/buddyTone"),
        (json!({"dob": "01/04/1990"}), "/dob"),
        (json!({"name": "  "}), "/name"),
    ];
    for (patch, pointer) in cases {
        let (status, body) = call(&app, "PUT", "/auth/profile", Some(&token), Some(patch)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["pointer"], pointer);
    }

    let (_, body) = call(&app, "GET", "/auth/session", Some(&token), None).await;
    assert_eq!(body["profile"]["name"], "Ana");
}

#[tokio::test]
async fn journey_entries_belong_to_their_creator() {
    let app = create_test_router();
    let token = signed_up_token(&app, "a@x.com").await;
    let other = signed_up_token(&app, "b@x.com").await;

    for i in 0..3 {
        let (status, body) = call(
            &app,
            "POST",
            "/data/journey",
            Some(&token),
            Some(json!({"mood": "calm", "step": i, "userId": "forged", "id": "forged"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["entryId"].as_str().is_some_and(|id| id != "forged"));
    }

    let (_, session) = call(&app, "GET", "/auth/session", Some(&token), None).await;
    let (status, body) = call(&app, "GET", "/data/journey", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    let ids: std::collections::HashSet<_> =
        entries.iter().map(|e| e["id"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 3);
    for e in entries {
        assert_eq!(e["userId"], session["user"]["id"]);
        assert_eq!(e["mood"], "calm");
    }

    let (_, body) = call(&app, "GET", "/data/journey", Some(&other), None).await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn journey_body_must_be_an_object() {
    let app = create_test_router();
    let token = signed_up_token(&app, "a@x.com").await;

    let (status, body) = call(&app, "POST", "/data/journey", Some(&token), Some(json!([1, 2]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");
}

#[tokio::test]
async fn reset_password_only_acknowledges() {
    let app = create_test_router();

    let (status, body) = call(
        &app,
        "POST",
        "/auth/reset-password",
        None,
        Some(json!({"email": "nobody@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("not configured"));

    let (status, _) = call(&app, "POST", "/auth/reset-password", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn debug_routes_are_gated() {
    let app = create_test_router();
    let (status, _) = call(&app, "GET", "/debug/users", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn debug_password_fix_lets_user_sign_in_again() {
    let app = router_for(
        service_with(Arc::new(MemoryIdentityProvider::default())),
        true,
    );
    signed_up_token(&app, "a@x.com").await;

    let (status, body) = call(&app, "GET", "/debug/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["users"][0]["email"], "a@x.com");

    let (status, body) = call(
        &app,
        "POST",
        "/debug/fix-user-password",
        None,
        Some(json!({"email": "nobody@x.com", "newPassword": "new-pass-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NotFound");

    let (status, _) = call(
        &app,
        "POST",
        "/debug/fix-user-password",
        None,
        Some(json!({"email": "a@x.com", "newPassword": "new-pass-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        "POST",
        "/auth/signin",
        None,
        Some(json!({"email": "a@x.com", "password": "new-pass-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

/// Delegates to the memory provider but refuses every password grant.
struct NoAutoSignIn(MemoryIdentityProvider);

#[async_trait::async_trait]
impl IdentityProvider for NoAutoSignIn {
    async fn list_users(&self) -> Result<Vec<UserIdentity>, IdentityError> {
        self.0.list_users().await
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<UserIdentity, IdentityError> {
        self.0.sign_up_with_password(email, password, metadata).await
    }

    async fn confirm_email(&self, user_id: uuid::Uuid) -> Result<(), IdentityError> {
        self.0.confirm_email(user_id).await
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<session_profile::contract::model::Session, IdentityError> {
        Err(IdentityError::Unavailable("auth service down".into()))
    }

    async fn get_user_by_token(&self, token: &str) -> Result<UserIdentity, IdentityError> {
        self.0.get_user_by_token(token).await
    }

    async fn update_password(
        &self,
        user_id: uuid::Uuid,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        self.0.update_password(user_id, new_password).await
    }
}

#[tokio::test]
async fn failed_auto_signin_asks_for_manual_signin() {
    let app = router_for(
        service_with(Arc::new(NoAutoSignIn(MemoryIdentityProvider::default()))),
        false,
    );

    let (status, body) = sign_up(&app, "a@x.com", "pw123456", "Ana").await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["requiresSignIn"], true);
    assert_eq!(body["message"], "Account created! Please sign in.");
    assert!(body.get("accessToken").is_none());
    assert_eq!(body["profile"]["buddyTone"], "warm");
}

#[tokio::test]
async fn local_client_exposes_contract_errors() {
    let service = service_with(Arc::new(MemoryIdentityProvider::default()));
    let client: Arc<dyn SessionProfileApi> = Arc::new(SessionProfileLocalClient::new(service));

    let outcome = client
        .sign_up(NewAccount {
            email: Some("a@x.com".into()),
            password: Some("pw123456".into()),
            name: Some("Ana".into()),
        })
        .await
        .unwrap();
    let SignUpOutcome::Active { session, .. } = outcome else {
        panic!("expected an active session");
    };

    let profile = client
        .update_profile(
            &session.access_token,
            ProfilePatch {
                buddy_name: Some("Chhaya".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(profile.buddy_name, "Chhaya");

    let err = client.sign_in("a@x.com", "nope-nope").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionProfileError>(),
        Some(SessionProfileError::Unauthorized { .. })
    ));
}
