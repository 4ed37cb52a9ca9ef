use axum::http::{header, HeaderName, Request};
use axum::{body::Body, middleware::Next, response::Response};
use modkit::api::problem::APPLICATION_PROBLEM_JSON;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::field::Empty;

/// Problem bodies are small; anything bigger is passed through untouched.
const MAX_PROBLEM_BODY: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct XRequestId(pub String);

pub fn header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

#[derive(Clone, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

fn request_id_of<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(header())
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Stores the request id in `Request.extensions` and records it on the current span
pub async fn push_req_id_to_extensions(mut req: Request<Body>, next: Next) -> Response {
    let rid = request_id_of(&req).unwrap_or_else(|| "n/a".to_string());

    req.extensions_mut().insert(XRequestId(rid.clone()));
    tracing::Span::current().record("request_id", tracing::field::display(&rid));

    next.run(req).await
}

/// Adds `requestId` to `application/problem+json` bodies that lack one.
pub async fn stamp_problem_request_id(req: Request<Body>, next: Next) -> Response {
    let rid = request_id_of(&req);
    let resp = next.run(req).await;

    let Some(rid) = rid else {
        return resp;
    };
    let is_problem = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(APPLICATION_PROBLEM_JSON));
    if !is_problem {
        return resp;
    }

    let (mut parts, body) = resp.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_PROBLEM_BODY).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer problem body");
            parts.headers.remove(header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let stamped = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(mut obj)) => {
            obj.entry("requestId")
                .or_insert_with(|| serde_json::Value::String(rid));
            serde_json::to_vec(&obj).ok()
        }
        _ => None,
    };

    match stamped {
        Some(body) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(body))
        }
        None => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Per-request `http_request` span carrying method, path and request id
#[allow(clippy::type_complexity)]
pub fn create_trace_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    impl Fn(&Request<Body>) -> tracing::Span + Clone,
> {
    use tower_http::trace::TraceLayer;

    TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        let rid = request_id_of(req).unwrap_or_else(|| "n/a".to_string());
        tracing::info_span!(
            "http_request",
            method = %req.method(),
            uri = %req.uri().path(),
            version = ?req.version(),
            module = "api_ingress",
            request_id = %rid,
            status = Empty,
            latency_ms = Empty
        )
    })
}
