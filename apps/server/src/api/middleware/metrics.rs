//! Metrics middleware - tracks HTTP request metrics

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = crate::metrics::sanitize_path(req.uri().path());

    let in_flight = crate::metrics::HTTP_REQUESTS_IN_FLIGHT.with_label_values(&[&method, &path]);
    in_flight.inc();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    crate::metrics::HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());

    in_flight.dec();
    response
}
