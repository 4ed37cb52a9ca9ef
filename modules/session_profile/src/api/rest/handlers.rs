use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::Uri,
    response::Json,
    Extension,
};
use tracing::{info, warn};

use crate::api::rest::auth::{BearerToken, MaybeBearer};
use crate::api::rest::dto::{
    self, DebugUserDto, DebugUsersResp, FixPasswordReq, HealthResp, JourneyEntryReq,
    JourneyListResp, JourneySavedResp, MessageResp, ProfileDto, ProfilePatchReq, ProfileResp,
    ResetPasswordReq, SessionResp, SignInReq, SignInResp, SignUpReq, SignUpResp,
};
use crate::api::rest::error::{map_domain_error, map_json_rejection};
use crate::contract::model::SignUpOutcome;
use crate::domain::service::{Service, PASSWORD_UPDATED_MESSAGE, REQUIRES_SIGN_IN_MESSAGE};
use modkit::api::problem::ProblemResponse;

pub const SIGNED_OUT_MESSAGE: &str = "Signed out successfully";

type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn read_body<T>(body: JsonBody<T>, uri: &Uri) -> Result<T, ProblemResponse> {
    body.map(|Json(v)| v).map_err(|rej| {
        warn!(status = %rej.status(), path = uri.path(), "Rejected request body");
        map_json_rejection(&rej, uri.path())
    })
}

/// Create an account, its default profile and (when possible) a session
pub async fn sign_up(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    body: JsonBody<SignUpReq>,
) -> Result<Json<SignUpResp>, ProblemResponse> {
    info!("Handling sign-up");
    let req = read_body(body, &uri)?;

    match svc.sign_up(req.into()).await {
        Ok(SignUpOutcome::Active {
            user,
            profile,
            session,
        }) => Ok(Json(SignUpResp {
            success: true,
            user: user.into(),
            access_token: Some(session.access_token.clone()),
            session: Some(session.into()),
            profile: profile.into(),
            requires_sign_in: None,
            message: None,
        })),
        Ok(SignUpOutcome::RequiresSignIn { user, profile }) => Ok(Json(SignUpResp {
            success: true,
            user: user.into(),
            session: None,
            access_token: None,
            profile: profile.into(),
            requires_sign_in: Some(true),
            message: Some(REQUIRES_SIGN_IN_MESSAGE.to_string()),
        })),
        Err(e) => {
            warn!("Sign-up failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Exchange email and password for a session
pub async fn sign_in(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    body: JsonBody<SignInReq>,
) -> Result<Json<SignInResp>, ProblemResponse> {
    info!("Handling sign-in");
    let req = read_body(body, &uri)?;

    match svc
        .sign_in(req.email.as_deref(), req.password.as_deref())
        .await
    {
        Ok(out) => Ok(Json(SignInResp {
            success: true,
            user: out.user.into(),
            access_token: out.session.access_token.clone(),
            session: out.session.into(),
            profile: out.profile.map(ProfileDto::from),
        })),
        Err(e) => {
            warn!("Sign-in failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Always succeeds; the client drops its token
pub async fn sign_out(
    Extension(svc): Extension<Arc<Service>>,
    MaybeBearer(token): MaybeBearer,
) -> Json<MessageResp> {
    svc.sign_out(token.as_deref());
    Json(MessageResp {
        success: true,
        message: SIGNED_OUT_MESSAGE.to_string(),
    })
}

pub async fn get_session(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    BearerToken(token): BearerToken,
) -> Result<Json<SessionResp>, ProblemResponse> {
    match svc.current_session(&token).await {
        Ok(view) => Ok(Json(SessionResp {
            success: true,
            user: view.user.into(),
            profile: view.profile.map(ProfileDto::from),
        })),
        Err(e) => {
            warn!("Session check failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn update_profile(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    BearerToken(token): BearerToken,
    body: JsonBody<ProfilePatchReq>,
) -> Result<Json<ProfileResp>, ProblemResponse> {
    info!("Handling profile update");
    let req = read_body(body, &uri)?;

    match svc.update_profile(&token, req.into()).await {
        Ok(profile) => Ok(Json(ProfileResp {
            success: true,
            profile: profile.into(),
        })),
        Err(e) => {
            warn!("Profile update failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn save_journey_entry(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    BearerToken(token): BearerToken,
    body: JsonBody<JourneyEntryReq>,
) -> Result<Json<JourneySavedResp>, ProblemResponse> {
    let JourneyEntryReq(payload) = read_body(body, &uri)?;

    match svc.save_journey_entry(&token, payload).await {
        Ok(entry_id) => Ok(Json(JourneySavedResp {
            success: true,
            entry_id,
        })),
        Err(e) => {
            warn!("Saving journey entry failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn list_journey_entries(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    BearerToken(token): BearerToken,
) -> Result<Json<JourneyListResp>, ProblemResponse> {
    match svc.journey_entries(&token).await {
        Ok(entries) => Ok(Json(JourneyListResp {
            success: true,
            entries: entries.into_iter().map(dto::journey_entry_json).collect(),
        })),
        Err(e) => {
            warn!("Listing journey entries failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn reset_password(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    body: JsonBody<ResetPasswordReq>,
) -> Result<Json<MessageResp>, ProblemResponse> {
    let req = read_body(body, &uri)?;

    match svc.request_password_reset(req.email.as_deref()) {
        Ok(message) => Ok(Json(MessageResp {
            success: true,
            message: message.to_string(),
        })),
        Err(e) => Err(map_domain_error(&e, uri.path())),
    }
}

pub async fn health() -> Json<HealthResp> {
    Json(HealthResp {
        status: "ok".to_string(),
    })
}

pub async fn debug_users(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> Result<Json<DebugUsersResp>, ProblemResponse> {
    match svc.list_accounts().await {
        Ok(users) => {
            let users: Vec<DebugUserDto> = users.into_iter().map(DebugUserDto::from).collect();
            Ok(Json(DebugUsersResp {
                count: users.len(),
                users,
            }))
        }
        Err(e) => Err(map_domain_error(&e, uri.path())),
    }
}

pub async fn fix_user_password(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    body: JsonBody<FixPasswordReq>,
) -> Result<Json<MessageResp>, ProblemResponse> {
    let req = read_body(body, &uri)?;

    match svc
        .fix_user_password(req.email.as_deref(), req.new_password.as_deref())
        .await
    {
        Ok(()) => Ok(Json(MessageResp {
            success: true,
            message: PASSWORD_UPDATED_MESSAGE.to_string(),
        })),
        Err(e) => {
            warn!("Password fix failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
