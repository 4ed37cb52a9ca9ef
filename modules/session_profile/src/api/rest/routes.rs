use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;
use axum::{Extension, Router};
use modkit::api::{Missing, OpenApiRegistry, OperationBuilder};
use std::sync::Arc;

/// Where and what to mount.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub base_path: String,
    pub enable_debug_routes: bool,
}

pub fn register_routes(
    mut router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    opts: &RouteOptions,
) -> anyhow::Result<Router> {
    let base = opts.base_path.trim_end_matches('/');
    if !base.is_empty() && !base.starts_with('/') {
        anyhow::bail!("base_path must start with '/' (got '{}')", opts.base_path);
    }
    let path = |p: &str| format!("{base}{p}");

    // GET /health - module liveness
    router = OperationBuilder::<Missing, Missing, ()>::get(path("/health"))
        .operation_id("session_profile.health")
        .summary("Service health")
        .tag("health")
        .handler(handlers::health)
        .json_response_with_schema::<dto::HealthResp>(openapi, 200, "Service is up")
        .register(router, openapi);

    // POST /auth/signup - create account
    router = OperationBuilder::<Missing, Missing, ()>::post(path("/auth/signup"))
        .operation_id("session_profile.sign_up")
        .summary("Sign up")
        .description("Create an account with default companion settings and sign it in")
        .tag("auth")
        .json_request::<dto::SignUpReq>(openapi, "Email, password and display name")
        .handler(handlers::sign_up)
        .json_response_with_schema::<dto::SignUpResp>(openapi, 200, "Account created")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // POST /auth/signin - password sign-in
    router = OperationBuilder::<Missing, Missing, ()>::post(path("/auth/signin"))
        .operation_id("session_profile.sign_in")
        .summary("Sign in")
        .tag("auth")
        .json_request::<dto::SignInReq>(openapi, "Email and password")
        .handler(handlers::sign_in)
        .json_response_with_schema::<dto::SignInResp>(openapi, 200, "Signed in")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // POST /auth/signout - acknowledge sign-out
    router = OperationBuilder::<Missing, Missing, ()>::post(path("/auth/signout"))
        .operation_id("session_profile.sign_out")
        .summary("Sign out")
        .description("Acknowledges the sign-out; tokens are not revoked server-side")
        .tag("auth")
        .handler(handlers::sign_out)
        .json_response_with_schema::<dto::MessageResp>(openapi, 200, "Signed out")
        .register(router, openapi);

    // GET /auth/session - resolve bearer token
    router = OperationBuilder::<Missing, Missing, ()>::get(path("/auth/session"))
        .operation_id("session_profile.get_session")
        .summary("Current session")
        .tag("auth")
        .bearer_auth()
        .handler(handlers::get_session)
        .json_response_with_schema::<dto::SessionResp>(openapi, 200, "Session is valid")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // PUT /auth/profile - partial profile update
    router = OperationBuilder::<Missing, Missing, ()>::put(path("/auth/profile"))
        .operation_id("session_profile.update_profile")
        .summary("Update profile")
        .description("Merge the given fields into the caller's profile")
        .tag("auth")
        .bearer_auth()
        .json_request::<dto::ProfilePatchReq>(openapi, "Fields to change")
        .handler(handlers::update_profile)
        .json_response_with_schema::<dto::ProfileResp>(openapi, 200, "Updated profile")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // POST /auth/reset-password - acknowledge reset request
    router = OperationBuilder::<Missing, Missing, ()>::post(path("/auth/reset-password"))
        .operation_id("session_profile.reset_password")
        .summary("Request password reset")
        .tag("auth")
        .json_request::<dto::ResetPasswordReq>(openapi, "Account email")
        .handler(handlers::reset_password)
        .json_response_with_schema::<dto::MessageResp>(openapi, 200, "Request acknowledged")
        .problem_response(openapi, 400, "Bad Request")
        .register(router, openapi);

    // POST /data/journey - store journal entry
    router = OperationBuilder::<Missing, Missing, ()>::post(path("/data/journey"))
        .operation_id("session_profile.save_journey_entry")
        .summary("Save journey entry")
        .tag("journey")
        .bearer_auth()
        .json_request::<dto::JourneyEntryReq>(openapi, "Any JSON object")
        .handler(handlers::save_journey_entry)
        .json_response_with_schema::<dto::JourneySavedResp>(openapi, 200, "Entry stored")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // GET /data/journey - list journal entries
    router = OperationBuilder::<Missing, Missing, ()>::get(path("/data/journey"))
        .operation_id("session_profile.list_journey_entries")
        .summary("List journey entries")
        .tag("journey")
        .bearer_auth()
        .handler(handlers::list_journey_entries)
        .json_response_with_schema::<dto::JourneyListResp>(openapi, 200, "All entries")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    if opts.enable_debug_routes {
        router = register_debug_routes(router, openapi, &path);
    }

    router = router.layer(Extension(service));

    Ok(router)
}

fn register_debug_routes(
    mut router: Router,
    openapi: &dyn OpenApiRegistry,
    path: &dyn Fn(&str) -> String,
) -> Router {
    tracing::warn!("Debug routes are enabled");

    router = OperationBuilder::<Missing, Missing, ()>::get(path("/debug/users"))
        .operation_id("session_profile.debug_users")
        .summary("List accounts (debug)")
        .tag("debug")
        .handler(handlers::debug_users)
        .json_response_with_schema::<dto::DebugUsersResp>(openapi, 200, "All accounts")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    OperationBuilder::<Missing, Missing, ()>::post(path("/debug/fix-user-password"))
        .operation_id("session_profile.fix_user_password")
        .summary("Overwrite a password (debug)")
        .tag("debug")
        .json_request::<dto::FixPasswordReq>(openapi, "Email and new password")
        .handler(handlers::fix_user_password)
        .json_response_with_schema::<dto::MessageResp>(openapi, 200, "Password updated")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 404, "Not Found")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi)
}
