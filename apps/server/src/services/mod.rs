//! Service layer

pub mod hydration;
pub mod search;

pub use search::SearchService;
