//! Domain models for the content search service

pub mod post;
pub mod search;

pub use post::{
    Author, CustomField, FieldType, Post, PostFieldValue, PostRelationship, PostTypeSummary,
    Taxonomy, TaxonomyTerm,
};
pub use search::{
    EntityType, Filter, FilterGroup, FilterOperator, GroupOperator, SearchRequest,
    SearchResponse, SearchWarning, SortDirection, SortSpec, WarningKind,
};
