//! Request ID middleware with OpenTelemetry trace context

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use opentelemetry::trace::TraceContextExt;
use std::time::Instant;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::api::extractors::ORGANIZATION_HEADER;
use crate::request_context::{RequestContext, TenantContext};

/// Opens the root span for each request and assigns a server request id.
///
/// The id is exposed to handlers as [`RequestContext`] and returned in
/// `x-request-id`. A differing client-supplied id is echoed back in
/// `x-correlation-id`; the trace id goes out in `x-trace-id`.
#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        otel.kind = "server",
        http.response.status_code = tracing::field::Empty,
        organization_id = tracing::field::Empty,
        request_id = tracing::field::Empty,
    )
)]
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let current_span = Span::current();
    let start = Instant::now();

    let client_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let server_id = Uuid::new_v4().to_string();
    current_span.record("request_id", server_id.as_str());

    let organization_id = req
        .extensions()
        .get::<TenantContext>()
        .map(|t| t.organization_id.clone())
        .or_else(|| {
            req.headers()
                .get(ORGANIZATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        });
    if let Some(organization_id) = &organization_id {
        current_span.record("organization_id", organization_id.as_str());
    }

    let mut req = req;
    req.extensions_mut().insert(RequestContext {
        request_id: server_id.clone(),
    });

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    tracing::debug!(method = %method, path = %path, "Incoming request");

    let mut response = next.run(req).await;

    let status = response.status();
    current_span.record("http.response.status_code", status.as_u16());
    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&server_id) {
        headers.insert("x-request-id", value);
    }

    let trace_id = current_span
        .context()
        .span()
        .span_context()
        .trace_id()
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        headers.insert("x-trace-id", value);
    }

    if let Some(client_id) = client_id.filter(|id| *id != server_id) {
        if let Ok(value) = HeaderValue::from_str(&client_id) {
            headers.insert("x-correlation-id", value);
        }
    }

    response
}
