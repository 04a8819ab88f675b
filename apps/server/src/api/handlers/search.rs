//! Search handlers
//!
//! - `POST /api/v1/search`: declarative search with filter groups, sorts,
//!   projection and cursor pagination
//! - `GET /api/v1/search?q=...`: simple free-text search kept for older clients

use axum::{
    body::Bytes,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::{
    api::{extractors::Tenant, response::Envelope},
    models::{Filter, FilterGroup, FilterOperator, SearchRequest, SearchResponse},
    state::AppState,
    Error, Result,
};

/// POST /api/v1/search
pub async fn search(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    body: Bytes,
) -> Result<Envelope<SearchResponse>> {
    let request: SearchRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::Validation(format!("Invalid search request: {e}")))?;

    let response = state.search_service.search(&tenant, request).await?;
    Ok(Envelope::ok(response))
}

#[derive(Debug, Default, Deserialize)]
pub struct SimpleSearchParams {
    pub q: Option<String>,
    pub post_type: Option<String>,
    pub status: Option<String>,
    pub author_id: Option<String>,
    #[serde(alias = "per_page")]
    pub limit: Option<String>,
    #[serde(alias = "cursor")]
    pub after: Option<String>,
}

impl SimpleSearchParams {
    /// Translate query parameters into a declarative request. `q` is required;
    /// the remaining parameters become equality filters in one AND group.
    pub fn into_request(self) -> Result<SearchRequest> {
        let query = self
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::Validation("Search query is required".to_string()))?;

        let limit = self
            .limit
            .map(|raw| {
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| Error::Validation(format!("Invalid limit '{raw}'")))
            })
            .transpose()?;

        let filters: Vec<Filter> = [
            ("postTypeId", self.post_type),
            ("status", self.status),
            ("authorId", self.author_id),
        ]
        .into_iter()
        .filter_map(|(property, value)| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| Filter::new(property, FilterOperator::Eq, JsonValue::String(v)))
        })
        .collect();

        Ok(SearchRequest {
            search: Some(query),
            limit,
            after: self.after,
            filter_groups: if filters.is_empty() {
                Vec::new()
            } else {
                vec![FilterGroup::all(filters)]
            },
            ..Default::default()
        })
    }
}

/// GET /api/v1/search
pub async fn simple_search(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Query(params): Query<SimpleSearchParams>,
) -> Result<Envelope<SearchResponse>> {
    let request = params.into_request()?;
    let response = state.search_service.search(&tenant, request).await?;
    Ok(Envelope::ok(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupOperator;
    use serde_json::json;

    #[test]
    fn test_query_is_required() {
        let err = SimpleSearchParams {
            q: Some("  ".to_string()),
            ..Default::default()
        }
        .into_request()
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_params_become_and_filters() {
        let request = SimpleSearchParams {
            q: Some("rust".to_string()),
            status: Some("published".to_string()),
            author_id: Some("u1".to_string()),
            limit: Some("5".to_string()),
            ..Default::default()
        }
        .into_request()
        .unwrap();

        assert_eq!(request.search.as_deref(), Some("rust"));
        assert_eq!(request.limit, Some(5));
        assert_eq!(request.filter_groups.len(), 1);
        let group = &request.filter_groups[0];
        assert_eq!(group.operator, GroupOperator::And);
        let properties: Vec<&str> = group.filters.iter().map(|f| f.property.as_str()).collect();
        assert_eq!(properties, vec!["status", "authorId"]);
        assert_eq!(group.filters[0].value, Some(json!("published")));
    }

    #[test]
    fn test_bad_limit_is_rejected() {
        let err = SimpleSearchParams {
            q: Some("rust".to_string()),
            limit: Some("ten".to_string()),
            ..Default::default()
        }
        .into_request()
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
