//! PostgreSQL `ContentStore`

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::time::Instant;

use crate::db::search::{BindValue, QueryBuilder, SearchPlan};
use crate::db::traits::ContentStore;
use crate::models::{
    Author, CustomField, FieldType, PostFieldValue, PostTypeSummary, Taxonomy, TaxonomyTerm,
};
use crate::Result;

#[derive(Clone)]
pub struct PostgresContentStore {
    pool: PgPool,
}

impl PostgresContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn observe(query_type: &str, started: Instant) {
    crate::metrics::DB_QUERY_DURATION_SECONDS
        .with_label_values(&[query_type])
        .observe(started.elapsed().as_secs_f64());
}

/// The `item` column of a search row. Anything but a JSON object is an error,
/// so a page is never shorter than the rows counted for `hasMore`.
fn row_item(row: &PgRow) -> Result<Map<String, JsonValue>> {
    match row.try_get::<JsonValue, _>("item").map_err(crate::Error::Database)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(crate::Error::Internal(format!(
            "search row is not a JSON object: {other}"
        ))),
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn custom_fields_by_slugs(
        &self,
        organization_id: &str,
        slugs: &[String],
    ) -> Result<Vec<CustomField>> {
        let query = r#"
            SELECT id, organization_id, slug, name, field_type
            FROM custom_fields
            WHERE organization_id = $1
              AND slug = ANY($2)
        "#;

        let started = Instant::now();
        let rows = sqlx::query(query)
            .bind(organization_id)
            .bind(slugs)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;
        observe("custom_fields", started);

        Ok(rows
            .iter()
            .map(|row| CustomField {
                id: row.get("id"),
                organization_id: row.get("organization_id"),
                slug: row.get("slug"),
                name: row.get("name"),
                field_type: FieldType::from_db(row.get::<&str, _>("field_type")),
            })
            .collect())
    }

    async fn taxonomy_by_slug(
        &self,
        organization_id: &str,
        slug: &str,
    ) -> Result<Option<Taxonomy>> {
        let query = r#"
            SELECT id, organization_id, name, slug, is_hierarchical
            FROM taxonomies
            WHERE organization_id = $1
              AND slug = $2
            LIMIT 1
        "#;

        let started = Instant::now();
        let row = sqlx::query(query)
            .bind(organization_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::Error::Database)?;
        observe("taxonomy", started);

        Ok(row.map(|row| Taxonomy {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            name: row.get("name"),
            slug: row.get("slug"),
            is_hierarchical: row.get("is_hierarchical"),
        }))
    }

    async fn terms_by_slugs(
        &self,
        taxonomy_id: &str,
        slugs: &[String],
    ) -> Result<Vec<TaxonomyTerm>> {
        let query = r#"
            SELECT id, taxonomy_id, name, slug, parent_id
            FROM taxonomy_terms
            WHERE taxonomy_id = $1
              AND slug = ANY($2)
        "#;

        let started = Instant::now();
        let rows = sqlx::query(query)
            .bind(taxonomy_id)
            .bind(slugs)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;
        observe("taxonomy_terms", started);

        Ok(rows
            .iter()
            .map(|row| TaxonomyTerm {
                id: row.get("id"),
                taxonomy_id: row.get("taxonomy_id"),
                name: row.get("name"),
                slug: row.get("slug"),
                parent_id: row.get("parent_id"),
            })
            .collect())
    }

    async fn post_ids_by_ids(&self, organization_id: &str, ids: &[String]) -> Result<Vec<String>> {
        let started = Instant::now();
        let found: Vec<String> =
            sqlx::query_scalar("SELECT id FROM posts WHERE organization_id = $1 AND id = ANY($2)")
                .bind(organization_id)
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(crate::Error::Database)?;
        observe("relationship_targets", started);
        Ok(found)
    }

    async fn published_post_ids_by_slugs(
        &self,
        organization_id: &str,
        slugs: &[String],
    ) -> Result<Vec<String>> {
        let query = r#"
            SELECT id
            FROM posts
            WHERE organization_id = $1
              AND status = 'published'
              AND slug = ANY($2)
        "#;

        let started = Instant::now();
        let found: Vec<String> = sqlx::query_scalar(query)
            .bind(organization_id)
            .bind(slugs)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;
        observe("relationship_targets", started);
        Ok(found)
    }

    async fn fetch_posts(&self, plan: &SearchPlan) -> Result<Vec<Map<String, JsonValue>>> {
        let (sql, bind_values) = QueryBuilder::new(plan).build_sql();
        tracing::trace!(sql = %sql, binds = bind_values.len(), "Executing search query");

        let mut query = sqlx::query(&sql);
        for value in bind_values {
            query = match value {
                BindValue::Text(v) => query.bind(v),
                BindValue::TextArray(vs) => query.bind(vs),
                BindValue::Int(v) => query.bind(v),
                BindValue::Float(v) => query.bind(v),
                BindValue::Bool(v) => query.bind(v),
            };
        }

        let started = Instant::now();
        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            crate::metrics::DB_QUERY_ERRORS_TOTAL
                .with_label_values(&["search", crate::metrics::db_error_type(&e)])
                .inc();
            crate::Error::Database(e)
        })?;
        observe("search", started);

        rows.iter().map(row_item).collect()
    }

    async fn authors_by_ids(&self, ids: &[String]) -> Result<Vec<Author>> {
        let started = Instant::now();
        let rows = sqlx::query("SELECT id, name, email, avatar_url FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;
        observe("hydrate_authors", started);

        Ok(rows
            .iter()
            .map(|row| Author {
                id: row.get("id"),
                name: row.get("name"),
                email: row.get("email"),
                avatar_url: row.get("avatar_url"),
            })
            .collect())
    }

    async fn post_types_by_ids(
        &self,
        organization_id: &str,
        ids: &[String],
    ) -> Result<Vec<PostTypeSummary>> {
        let query = r#"
            SELECT id, organization_id, name, slug
            FROM post_types
            WHERE organization_id = $1
              AND id = ANY($2)
        "#;

        let started = Instant::now();
        let rows = sqlx::query(query)
            .bind(organization_id)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;
        observe("hydrate_post_types", started);

        Ok(rows
            .iter()
            .map(|row| PostTypeSummary {
                id: row.get("id"),
                organization_id: row.get("organization_id"),
                name: row.get("name"),
                slug: row.get("slug"),
            })
            .collect())
    }

    async fn field_values_for_posts(
        &self,
        post_ids: &[String],
        field_ids: &[String],
    ) -> Result<Vec<PostFieldValue>> {
        let query = r#"
            SELECT post_id, custom_field_id, value
            FROM post_field_values
            WHERE post_id = ANY($1)
              AND custom_field_id = ANY($2)
        "#;

        let started = Instant::now();
        let rows = sqlx::query(query)
            .bind(post_ids)
            .bind(field_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;
        observe("hydrate_custom_fields", started);

        Ok(rows
            .iter()
            .map(|row| PostFieldValue {
                post_id: row.get("post_id"),
                custom_field_id: row.get("custom_field_id"),
                value: row.get("value"),
            })
            .collect())
    }
}
