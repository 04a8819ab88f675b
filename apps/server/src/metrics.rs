//! Prometheus metrics for the search service

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "folio_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "folio_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Search Metrics

    /// Searches by entity type and outcome
    pub static ref SEARCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_search_total",
        "Total number of search requests",
        &["entity_type", "status"]
    )
    .expect("Failed to register SEARCH_TOTAL");

    pub static ref SEARCH_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "folio_search_duration_seconds",
        "End-to-end search duration in seconds, hydration included",
        &["entity_type"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register SEARCH_DURATION_SECONDS");

    /// Rows returned per page
    pub static ref SEARCH_RESULTS: HistogramVec = register_histogram_vec!(
        "folio_search_results",
        "Number of items returned by search",
        &["entity_type"],
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .expect("Failed to register SEARCH_RESULTS");

    /// Filters that did not constrain the query as written
    pub static ref FILTERS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_search_filters_dropped_total",
        "Filters that were ignored or resolved to nothing",
        &["reason"]
    )
    .expect("Failed to register FILTERS_DROPPED_TOTAL");

    // Database Metrics

    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "folio_db_query_duration_seconds",
        "Database query duration in seconds",
        &["query_type"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .expect("Failed to register DB_QUERY_DURATION_SECONDS");

    pub static ref DB_QUERY_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_db_query_errors_total",
        "Total number of database query errors",
        &["query_type", "error_type"]
    )
    .expect("Failed to register DB_QUERY_ERRORS_TOTAL");
}

/// Collapse a request path into a low-cardinality label.
pub fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => "/".to_string(),
        ["api", version, rest @ ..] => match rest {
            [] => format!("/api/{version}"),
            [resource] => format!("/api/{version}/{resource}"),
            [resource, ..] => format!("/api/{version}/{resource}/{{id}}"),
        },
        [first, ..] => format!("/{first}"),
    }
}

/// Label for a failed sqlx call.
pub fn db_error_type(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Database(_) => "database",
        sqlx::Error::PoolTimedOut => "pool_timeout",
        sqlx::Error::PoolClosed => "pool_closed",
        sqlx::Error::Io(_) => "io",
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => "decode",
        _ => "other",
    }
}
