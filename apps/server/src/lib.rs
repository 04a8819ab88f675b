//! Folio content search service
//!
//! Multi-tenant search over posts and their attributes:
//! - Declarative filter groups compiled to one predicate per request
//! - Custom field, taxonomy and relationship filters resolved inside the tenant
//! - Keyset pagination with opaque, versioned cursors
//! - Batched hydration of authors, post types and custom field values

#![allow(
    clippy::large_enum_variant, // Predicate variants differ in size; boxing buys nothing here
)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod request_context;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
