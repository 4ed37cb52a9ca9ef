//! Handlers and service spans must never leak credentials or raw emails.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use tracing_test::traced_test;

use session_profile::api::rest::routes::{register_routes, RouteOptions};
use session_profile::domain::service::{Service, ServiceConfig};
use session_profile::infra::{
    identity::MemoryIdentityProvider, kv::MemoryKvStore, storage::KvUserDataRepository,
};

const EMAIL: &str = "secret.person@example.com";
const PASSWORD: &str = "hunter2-very-secret";

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

fn create_test_router() -> Router {
    let repo = Arc::new(KvUserDataRepository::new(Arc::new(MemoryKvStore::new())));
    let identity = Arc::new(MemoryIdentityProvider::default());
    let service = Arc::new(Service::new(identity, repo, ServiceConfig::default()));
    let opts = RouteOptions {
        base_path: String::new(),
        enable_debug_routes: false,
    };
    register_routes(Router::new(), &MockOpenApiRegistry, service, &opts).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[traced_test]
#[tokio::test]
async fn signup_and_signin_log_redacted_email_only() {
    let app = create_test_router();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/auth/signup",
            serde_json::json!({"email": EMAIL, "password": PASSWORD, "name": "Secret"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(post_json(
            "/auth/signin",
            serde_json::json!({"email": EMAIL, "password": "wrong-password"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    assert!(logs_contain("session_profile.service.sign_up"));
    assert!(logs_contain("s***@example.com"));
    assert!(!logs_contain(EMAIL));
    assert!(!logs_contain(PASSWORD));
    assert!(!logs_contain("wrong-password"));
}

#[traced_test]
#[tokio::test]
async fn signout_logs_token_prefix_only() {
    let app = create_test_router();
    let token = "abcdef0123456789abcdef";

    let req = Request::builder()
        .method("POST")
        .uri("/auth/signout")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(logs_contain("Sign-out acknowledged"));
    assert!(logs_contain("abcd***"));
    assert!(!logs_contain(token));
}

#[traced_test]
#[tokio::test]
async fn reset_request_does_not_log_raw_email() {
    let app = create_test_router();

    let resp = app
        .oneshot(post_json(
            "/auth/reset-password",
            serde_json::json!({"email": EMAIL}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(logs_contain("Password reset requested"));
    assert!(!logs_contain(EMAIL));
}

#[traced_test]
#[tokio::test]
async fn rejected_body_does_not_log_field_values() {
    let app = create_test_router();

    let resp = app
        .oneshot(post_json(
            "/auth/signin",
            serde_json::json!({"email": EMAIL, "password": 12345678}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(logs_contain("Rejected request body"));
    assert!(logs_contain("status=422"));
    assert!(!logs_contain("12345678"));
    assert!(!logs_contain(EMAIL));
}
