//! `Authorization: Bearer <token>` extractors.

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use modkit::api::problem::ProblemResponse;

use crate::api::rest::error::map_domain_error;
use crate::domain::error::DomainError;

/// Required bearer token; rejects with a `MissingToken` problem.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Bearer token if the caller sent one.
#[derive(Debug, Clone)]
pub struct MaybeBearer(pub Option<String>);

fn bearer_from(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_from(&parts.headers)
            .map(BearerToken)
            .ok_or_else(|| map_domain_error(&DomainError::MissingToken, parts.uri.path()))
    }
}

impl<S> FromRequestParts<S> for MaybeBearer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeBearer(bearer_from(&parts.headers)))
    }
}
