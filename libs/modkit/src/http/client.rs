//! Traced HTTP client: every outbound request gets its own `outgoing_http` span
//! and a `traceparent` header.

use crate::http::simple_otel;
use tracing::{Instrument, Level};

#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Execute a built request, injecting trace headers and recording the status.
    pub async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method(),
            http.url = %redact_query(req.url()),
            http.status_code = tracing::field::Empty,
            error = tracing::field::Empty,
            otel.kind = "client",
        );

        simple_otel::inject_trace_context(req.headers_mut(), &span);

        let response = self.inner.execute(req).instrument(span.clone()).await?;

        let status = response.status();
        span.record("http.status_code", status.as_u16());
        if status.is_client_error() || status.is_server_error() {
            span.record("error", true);
        }

        Ok(response)
    }

    /// Build and execute a request prepared with [`TracedClient::request`].
    pub async fn send(&self, builder: reqwest::RequestBuilder) -> reqwest::Result<reqwest::Response> {
        self.execute(builder.build()?).await
    }

    /// Start a request builder (headers, JSON body) to pass to [`TracedClient::send`].
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

// Query strings may carry grant types or keys; spans only keep the path.
fn redact_query(url: &reqwest::Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
