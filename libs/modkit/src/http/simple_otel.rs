//! Minimal W3C trace-context propagation over plain headers.

use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::Span;

/// W3C Trace Context header name
pub const TRACEPARENT: &str = "traceparent";

/// Raw `traceparent` value from incoming headers, if present.
pub fn extract_trace_parent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TRACEPARENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Write a fresh sampled `traceparent` into outgoing headers.
pub fn inject_trace_context(headers: &mut HeaderMap, _span: &Span) {
    let trace_id = format!("{:032x}", rand::random::<u128>());
    let span_id = format!("{:016x}", rand::random::<u64>());
    let traceparent = format!("00-{trace_id}-{span_id}-01");

    if let Ok(value) = HeaderValue::from_str(&traceparent) {
        headers.insert(HeaderName::from_static(TRACEPARENT), value);
    }
}

/// Record the caller's trace id on `span` (needs a `trace_id` field).
pub fn set_parent_from_headers(span: &Span, headers: &HeaderMap) {
    if let Some(trace_id) = extract_trace_parent(headers)
        .as_deref()
        .and_then(parse_trace_id)
    {
        span.record("trace_id", trace_id.as_str());
    }
}

/// Trace id segment of a version-00 `traceparent`.
pub fn parse_trace_id(traceparent: &str) -> Option<String> {
    let mut parts = traceparent.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("00"), Some(trace_id), Some(_), Some(_)) if trace_id.len() == 32 => {
            Some(trace_id.to_string())
        }
        _ => None,
    }
}
