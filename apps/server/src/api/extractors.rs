//! Custom Axum extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::request_context::TenantContext;
use crate::Error;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const SCOPES_HEADER: &str = "x-api-key-scopes";

/// Tenant of the current request.
///
/// Prefers a [`TenantContext`] extension set by the authentication layer and
/// falls back to the `x-organization-id` / `x-api-key-scopes` headers.
pub struct Tenant(pub TenantContext);

#[async_trait]
impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<TenantContext>() {
            return Ok(Tenant(context.clone()));
        }
        tenant_from_headers(&parts.headers)
            .map(Tenant)
            .ok_or_else(|| Error::Unauthorized("missing organization context".to_string()))
    }
}

fn tenant_from_headers(headers: &HeaderMap) -> Option<TenantContext> {
    let organization_id = headers
        .get(ORGANIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())?;

    let scopes: Option<Vec<String>> = headers
        .get(SCOPES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        });

    Some(TenantContext {
        organization_id: organization_id.to_string(),
        scopes,
    })
}
