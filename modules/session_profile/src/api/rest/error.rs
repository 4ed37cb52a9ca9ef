use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse, ValidationError};

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    ProblemResponse(problem(status, code, title, detail, instance))
}

fn problem(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> Problem {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.chhaav.app/{}", code))
        .with_code(code)
        .with_instance(instance);

    // Add trace ID from current tracing span if available
    if let Some(id) = tracing::Span::current().id() {
        problem.with_trace_id(id.into_u64().to_string())
    } else {
        problem
    }
}

use crate::domain::error::DomainError;

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::Validation { field, message } => {
            let detail = format!("{field} {message}");
            let p = problem(
                StatusCode::BAD_REQUEST,
                "ValidationError",
                "Validation error",
                detail.clone(),
                instance,
            )
            .with_errors(vec![ValidationError {
                detail,
                pointer: format!("/{field}"),
            }]);
            ProblemResponse(p)
        }
        DomainError::DuplicateEmail => from_parts(
            StatusCode::BAD_REQUEST,
            "DuplicateEmail",
            "Email already registered",
            "User with this email already exists",
            instance,
        ),
        DomainError::WeakCredential { message } => from_parts(
            StatusCode::BAD_REQUEST,
            "WeakCredential",
            "Password rejected",
            message.clone(),
            instance,
        ),
        DomainError::InvalidEmail { message } => from_parts(
            StatusCode::BAD_REQUEST,
            "InvalidEmail",
            "Email rejected",
            message.clone(),
            instance,
        ),
        DomainError::InvalidCredentials => from_parts(
            StatusCode::UNAUTHORIZED,
            "InvalidCredentials",
            "Invalid credentials",
            "Invalid login credentials",
            instance,
        ),
        DomainError::MissingToken => from_parts(
            StatusCode::UNAUTHORIZED,
            "MissingToken",
            "Unauthorized",
            "No access token provided",
            instance,
        ),
        DomainError::InvalidOrExpiredSession => from_parts(
            StatusCode::UNAUTHORIZED,
            "InvalidOrExpiredSession",
            "Unauthorized",
            "Invalid or expired session",
            instance,
        ),
        DomainError::UserNotFound => from_parts(
            StatusCode::NOT_FOUND,
            "NotFound",
            "Not found",
            "User not found",
            instance,
        ),
        DomainError::Identity { .. } | DomainError::Storage { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = %e, "Internal error while handling request");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
    }
}

/// Unreadable or non-object JSON bodies are validation errors too.
pub fn map_json_rejection(rejection: &JsonRejection, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "ValidationError",
        "Validation error",
        rejection.body_text(),
        instance,
    )
}
