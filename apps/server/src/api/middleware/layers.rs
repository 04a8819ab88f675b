//! Layer factories for middleware

use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
};

/// Tracing is handled by the `http_request` span opened in
/// `request_id_middleware`, so this layer is a no-op.
pub fn trace() -> tower::layer::util::Identity {
    tower::layer::util::Identity::new()
}

/// CORS for the configured origins. `*` allows any origin; an empty or fully
/// invalid list emits no CORS headers.
pub fn cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let header_values: Vec<axum::http::HeaderValue> = origins
        .iter()
        .filter_map(|origin| axum::http::HeaderValue::from_str(origin).ok())
        .collect();

    if header_values.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(header_values))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn compression() -> CompressionLayer {
    CompressionLayer::new()
}
