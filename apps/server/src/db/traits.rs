//! Storage seam for the search core

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::db::search::SearchPlan;
use crate::models::{Author, CustomField, PostFieldValue, PostTypeSummary, Taxonomy, TaxonomyTerm};
use crate::Result;

/// Read-only access to content rows.
///
/// Backends execute the same [`SearchPlan`]: the Postgres store renders it to
/// SQL, the in-memory store evaluates it in process. Every lookup that takes an
/// `organization_id` must stay inside that tenant.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Custom field definitions of the tenant with any of the slugs.
    async fn custom_fields_by_slugs(
        &self,
        organization_id: &str,
        slugs: &[String],
    ) -> Result<Vec<CustomField>>;

    async fn taxonomy_by_slug(&self, organization_id: &str, slug: &str)
        -> Result<Option<Taxonomy>>;

    /// Terms of one taxonomy with any of the slugs.
    async fn terms_by_slugs(&self, taxonomy_id: &str, slugs: &[String])
        -> Result<Vec<TaxonomyTerm>>;

    /// The subset of `ids` naming posts of the tenant.
    async fn post_ids_by_ids(&self, organization_id: &str, ids: &[String]) -> Result<Vec<String>>;

    /// Ids of the tenant's published posts with any of the slugs.
    async fn published_post_ids_by_slugs(
        &self,
        organization_id: &str,
        slugs: &[String],
    ) -> Result<Vec<String>>;

    /// Execute a plan. Rows are keyed by property name and carry exactly
    /// `plan.columns`, in plan order.
    async fn fetch_posts(&self, plan: &SearchPlan) -> Result<Vec<Map<String, JsonValue>>>;

    async fn authors_by_ids(&self, ids: &[String]) -> Result<Vec<Author>>;

    async fn post_types_by_ids(
        &self,
        organization_id: &str,
        ids: &[String],
    ) -> Result<Vec<PostTypeSummary>>;

    /// Value rows for any of the posts and any of the fields.
    async fn field_values_for_posts(
        &self,
        post_ids: &[String],
        field_ids: &[String],
    ) -> Result<Vec<PostFieldValue>>;
}
