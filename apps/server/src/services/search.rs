//! Search service - content search orchestration
//!
//! Runs one request end to end:
//! - validates the request and applies the caller's scope
//! - compiles filter groups, free text and the cursor into a plan
//! - executes it for `limit + 1` rows to detect another page
//! - mints the next cursor and hydrates relations in batches

use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{InvalidFilterPolicy, SearchConfig};
use crate::db::search::plan::resolve_sort;
use crate::db::search::{
    Column, Comparison, ConditionCompiler, Cursor, Predicate, Projection, Scalar, SearchPlan,
};
use crate::db::traits::ContentStore;
use crate::models::{SearchRequest, SearchResponse, WarningKind};
use crate::request_context::{PostAccess, TenantContext};
use crate::services::hydration::{self, AUTHOR_KEY, CUSTOM_FIELDS_KEY, POST_TYPE_KEY};
use crate::{Error, Result};

pub struct SearchService {
    store: Arc<dyn ContentStore>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(store: Arc<dyn ContentStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run a search for the tenant, bounded by the configured query timeout.
    #[tracing::instrument(
        name = "search",
        skip_all,
        fields(
            organization_id = %tenant.organization_id,
            entity_type = request.entity_type.as_str(),
        )
    )]
    pub async fn search(
        &self,
        tenant: &TenantContext,
        request: SearchRequest,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        let entity_type = request.entity_type.as_str();
        let timeout = Duration::from_millis(self.config.query_timeout_ms);

        let result = match tokio::time::timeout(timeout, self.execute(tenant, request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "search did not finish within {} ms",
                self.config.query_timeout_ms
            ))),
        };

        let status = match &result {
            Ok(_) => "success",
            Err(Error::Timeout(_)) => "timeout",
            Err(e) if e.status().is_client_error() => "client_error",
            Err(_) => "server_error",
        };
        crate::metrics::SEARCH_TOTAL
            .with_label_values(&[entity_type, status])
            .inc();
        crate::metrics::SEARCH_DURATION_SECONDS
            .with_label_values(&[entity_type])
            .observe(started.elapsed().as_secs_f64());
        if let Ok(response) = &result {
            crate::metrics::SEARCH_RESULTS
                .with_label_values(&[entity_type])
                .observe(response.data.len() as f64);
        }

        result
    }

    async fn execute(&self, tenant: &TenantContext, request: SearchRequest) -> Result<SearchResponse> {
        request.check()?;

        let entity_type = request.entity_type;
        if !entity_type.searches_posts() {
            return Err(Error::Validation(format!(
                "entity type '{}' is not searchable here; use 'posts' or 'all'",
                entity_type.as_str()
            )));
        }

        let access = tenant.post_access();
        if access == PostAccess::Nothing {
            tracing::debug!("API key scopes grant no post access, returning empty page");
            return Ok(SearchResponse::empty());
        }

        let limit = self.clamp_limit(request.limit);
        let organization_id = tenant.organization_id.as_str();

        let mut compiler = ConditionCompiler::new(self.store.as_ref(), organization_id);
        let compiled = compiler.compile_groups(&request.filter_groups).await?;

        for warning in &compiled.warnings {
            crate::metrics::FILTERS_DROPPED_TOTAL
                .with_label_values(&[warning.kind.as_str()])
                .inc();
        }
        if self.config.invalid_filter_policy == InvalidFilterPolicy::Reject && compiled.has_invalid()
        {
            let reasons: Vec<&str> = compiled
                .warnings
                .iter()
                .filter(|w| w.kind == WarningKind::Invalid)
                .map(|w| w.message.as_str())
                .collect();
            return Err(Error::InvalidFilter(reasons.join("; ")));
        }

        let mut predicates = vec![compiled.predicate];
        if access == PostAccess::PublishedOnly {
            predicates.push(Predicate::column(
                Column::Status,
                Comparison::Eq(Scalar::Text("published".to_string())),
            ));
        }
        if let Some(needle) = request.search.as_deref().map(str::trim) {
            if !needle.is_empty() {
                predicates.push(Predicate::TextSearch {
                    columns: Column::FULL_TEXT.to_vec(),
                    needle: needle.to_string(),
                });
            }
        }

        let sort = resolve_sort(&request.sorts);
        let seek = request.after.as_deref().and_then(|token| {
            let seek = Cursor::decode(token).and_then(|cursor| cursor.seek_for(entity_type, &sort));
            if seek.is_none() {
                tracing::debug!("Ignoring unusable cursor, starting from the first page");
            }
            seek
        });

        let projection = Projection::from_properties(
            request.properties.as_deref(),
            self.config.attach_default_relations,
        );

        let plan = SearchPlan {
            organization_id: organization_id.to_string(),
            predicate: Predicate::and(predicates),
            columns: SearchPlan::required_columns(&sort, &projection),
            sort,
            seek,
            fetch_limit: limit + 1,
        };

        let mut rows = self.store.fetch_posts(&plan).await?;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let next_cursor = if has_more {
            rows.last()
                .and_then(|row| Cursor::from_row(entity_type, &plan.sort, row))
                .map(|cursor| cursor.encode())
                .transpose()?
        } else {
            None
        };

        let mut fields = compiler.into_resolver();
        hydration::hydrate(
            self.store.as_ref(),
            organization_id,
            &mut fields,
            &projection,
            &mut rows,
        )
        .await?;

        for row in rows.iter_mut() {
            strip_hidden(row, &projection);
        }

        tracing::info!(
            limit,
            rows = rows.len(),
            has_more,
            warnings = compiled.warnings.len(),
            "Search completed"
        );

        Ok(SearchResponse {
            data: rows,
            next_cursor,
            has_more,
            warnings: compiled.warnings,
        })
    }

    fn clamp_limit(&self, requested: Option<i64>) -> usize {
        let limit = requested
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1));
        usize::try_from(limit).unwrap_or(1)
    }
}

/// Drop columns fetched only for sorting or hydration.
fn strip_hidden(row: &mut Map<String, JsonValue>, projection: &Projection) {
    row.retain(|key, _| {
        matches!(key.as_str(), AUTHOR_KEY | POST_TYPE_KEY | CUSTOM_FIELDS_KEY)
            || projection.columns.iter().any(|c| c.property() == key.as_str())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryContentStore;

    fn service(config: SearchConfig) -> SearchService {
        SearchService::new(Arc::new(MemoryContentStore::new()), config)
    }

    #[test]
    fn test_clamp_limit() {
        let svc = service(SearchConfig::default());
        assert_eq!(svc.clamp_limit(None), 20);
        assert_eq!(svc.clamp_limit(Some(0)), 1);
        assert_eq!(svc.clamp_limit(Some(-5)), 1);
        assert_eq!(svc.clamp_limit(Some(50)), 50);
        assert_eq!(svc.clamp_limit(Some(10_000)), 100);
    }

    #[test]
    fn test_strip_hidden_keeps_projection_and_relations() {
        let projection = Projection {
            columns: vec![Column::Id, Column::Title],
            author: true,
            post_type: false,
            custom_fields: Vec::new(),
        };
        let mut row = serde_json::json!({
            "id": "p1",
            "title": "Hello",
            "createdAt": 5,
            "authorId": "u1",
            "author": { "id": "u1" }
        })
        .as_object()
        .cloned()
        .unwrap();

        strip_hidden(&mut row, &projection);

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "title", "author"]);
    }

    #[tokio::test]
    async fn test_unsupported_entity_type_is_rejected() {
        let svc = service(SearchConfig::default());
        let request = SearchRequest {
            entity_type: crate::models::EntityType::Media,
            ..Default::default()
        };
        let err = svc
            .search(&TenantContext::new("org"), request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_scope_without_post_access_returns_empty_page() {
        let svc = service(SearchConfig::default());
        let tenant = TenantContext::new("org").with_scopes(["media:read"]);
        let response = svc.search(&tenant, SearchRequest::default()).await.unwrap();
        assert!(response.data.is_empty());
        assert!(!response.has_more);
        assert!(response.next_cursor.is_none());
    }
}
