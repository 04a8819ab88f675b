//! Postgres-backed test app. Only available when
//! `FOLIO__DATABASE__TEST_DATABASE_URL` is set; each app gets its own schema.

use anyhow::Context as _;
use futures::FutureExt as _;
use folio::{
    models::{Author, CustomField, Post, PostTypeSummary, SearchRequest, SearchResponse, Taxonomy, TaxonomyTerm},
    request_context::TenantContext,
    AppState,
};
use sqlx::{Connection as _, PgPool};
use url::Url;
use uuid::Uuid;

use crate::support::shared;

pub struct PgTestApp {
    pub state: AppState,
    pub pool: PgPool,
    schema: String,
    admin_database_url: String,
}

impl PgTestApp {
    /// `None` when no test database is configured.
    pub async fn new() -> anyhow::Result<Option<Self>> {
        let shared = shared::shared().await?;
        let mut config = shared.base_config.clone();
        let Some(admin_database_url) = config.database.test_database_url.clone() else {
            return Ok(None);
        };

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        config.database.url = with_search_path(&admin_database_url, &schema)?;
        config.database.run_migrations = true;
        config.database.pool_min_size = 0;
        config.database.pool_max_size = 2;
        config.database.statement_timeout_seconds = 30;

        let state = AppState::new(config)
            .await
            .context("initialize AppState")?;
        let pool = state.db_pool.clone().context("postgres-backed state has a pool")?;

        Ok(Some(Self {
            state,
            pool,
            schema,
            admin_database_url,
        }))
    }

    pub async fn cleanup(self) -> anyhow::Result<()> {
        self.pool.close().await;

        let mut admin_conn = sqlx::PgConnection::connect(&self.admin_database_url)
            .await
            .context("connect admin db for schema drop")?;
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .execute(&mut admin_conn)
            .await
            .context("drop test schema")?;

        Ok(())
    }

    pub async fn search(
        &self,
        tenant: &TenantContext,
        request: SearchRequest,
    ) -> folio::Result<SearchResponse> {
        self.state.search_service.search(tenant, request).await
    }

    pub async fn insert_author(&self, author: &Author) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO users (id, name, email, avatar_url) VALUES ($1, $2, $3, $4)")
            .bind(&author.id)
            .bind(&author.name)
            .bind(&author.email)
            .bind(&author.avatar_url)
            .execute(&self.pool)
            .await
            .context("insert author")?;
        Ok(())
    }

    pub async fn insert_post_type(&self, post_type: &PostTypeSummary) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO post_types (id, organization_id, name, slug) VALUES ($1, $2, $3, $4)")
            .bind(&post_type.id)
            .bind(&post_type.organization_id)
            .bind(&post_type.name)
            .bind(&post_type.slug)
            .execute(&self.pool)
            .await
            .context("insert post type")?;
        Ok(())
    }

    pub async fn insert_post(&self, post: &Post) -> anyhow::Result<()> {
        let query = r#"
            INSERT INTO posts (
                id, organization_id, post_type_id, author_id, title, slug, content, excerpt,
                status, workflow_status, parent_id, featured_image_id, meta_title,
                meta_description, canonical_url, share_count, created_at, updated_at,
                published_at, scheduled_publish_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        "#;
        sqlx::query(query)
            .bind(&post.id)
            .bind(&post.organization_id)
            .bind(&post.post_type_id)
            .bind(&post.author_id)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.content)
            .bind(&post.excerpt)
            .bind(&post.status)
            .bind(&post.workflow_status)
            .bind(&post.parent_id)
            .bind(&post.featured_image_id)
            .bind(&post.meta_title)
            .bind(&post.meta_description)
            .bind(&post.canonical_url)
            .bind(post.share_count)
            .bind(post.created_at)
            .bind(post.updated_at)
            .bind(post.published_at)
            .bind(post.scheduled_publish_at)
            .execute(&self.pool)
            .await
            .context("insert post")?;
        Ok(())
    }

    pub async fn insert_custom_field(&self, field: &CustomField) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO custom_fields (id, organization_id, slug, name, field_type) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&field.id)
        .bind(&field.organization_id)
        .bind(&field.slug)
        .bind(&field.name)
        .bind(field.field_type.as_str())
        .execute(&self.pool)
        .await
        .context("insert custom field")?;
        Ok(())
    }

    pub async fn set_field_value(&self, post_id: &str, field_id: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO post_field_values (id, post_id, custom_field_id, value) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(post_id)
        .bind(field_id)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("insert field value")?;
        Ok(())
    }

    pub async fn insert_taxonomy(&self, taxonomy: &Taxonomy) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO taxonomies (id, organization_id, name, slug, is_hierarchical) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&taxonomy.id)
        .bind(&taxonomy.organization_id)
        .bind(&taxonomy.name)
        .bind(&taxonomy.slug)
        .bind(taxonomy.is_hierarchical)
        .execute(&self.pool)
        .await
        .context("insert taxonomy")?;
        Ok(())
    }

    pub async fn insert_term(&self, term: &TaxonomyTerm) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO taxonomy_terms (id, taxonomy_id, name, slug, parent_id) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&term.id)
        .bind(&term.taxonomy_id)
        .bind(&term.name)
        .bind(&term.slug)
        .bind(&term.parent_id)
        .execute(&self.pool)
        .await
        .context("insert term")?;
        Ok(())
    }

    pub async fn tag(&self, post_id: &str, term_id: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO post_taxonomies (post_id, taxonomy_term_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(term_id)
            .execute(&self.pool)
            .await
            .context("tag post")?;
        Ok(())
    }

    pub async fn relate(&self, from: &str, to: &str, relationship_type: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO post_relationships (id, from_post_id, to_post_id, relationship_type) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(from)
        .bind(to)
        .bind(relationship_type)
        .execute(&self.pool)
        .await
        .context("relate posts")?;
        Ok(())
    }
}

/// Run `f` against a fresh schema, or skip when no test database is configured.
pub async fn with_pg_test_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a PgTestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let Some(app) = PgTestApp::new().await? else {
        eprintln!("skipping: FOLIO__DATABASE__TEST_DATABASE_URL is not set");
        return Ok(());
    };

    let result = std::panic::AssertUnwindSafe(f(&app)).catch_unwind().await;
    let cleanup_result = app.cleanup().await;

    if let Err(e) = cleanup_result {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}
