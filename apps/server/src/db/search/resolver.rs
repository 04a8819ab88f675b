//! Per-request custom field resolution.
//!
//! Maps a tenant-scoped slug to its definition. The cache lives inside one
//! search call and is dropped with it, so definitions never leak between
//! tenants or go stale across requests. Misses are cached too.

use std::collections::HashMap;

use crate::db::traits::ContentStore;
use crate::models::CustomField;
use crate::Result;

pub struct CustomFieldResolver<'a> {
    store: &'a dyn ContentStore,
    organization_id: &'a str,
    cache: HashMap<String, Option<CustomField>>,
}

impl<'a> CustomFieldResolver<'a> {
    pub fn new(store: &'a dyn ContentStore, organization_id: &'a str) -> Self {
        Self {
            store,
            organization_id,
            cache: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, slug: &str) -> Result<Option<CustomField>> {
        if let Some(cached) = self.cache.get(slug) {
            return Ok(cached.clone());
        }
        let found = self.resolve_many(&[slug.to_string()]).await?;
        Ok(found.into_iter().next())
    }

    /// Resolve several slugs with at most one store lookup for the misses.
    /// Unknown slugs are omitted from the result.
    pub async fn resolve_many(&mut self, slugs: &[String]) -> Result<Vec<CustomField>> {
        let mut missing: Vec<String> = Vec::new();
        for slug in slugs {
            if !self.cache.contains_key(slug) && !missing.contains(slug) {
                missing.push(slug.clone());
            }
        }

        if !missing.is_empty() {
            let fields = self
                .store
                .custom_fields_by_slugs(self.organization_id, &missing)
                .await?;
            tracing::debug!(
                requested = missing.len(),
                resolved = fields.len(),
                "Resolved custom field definitions"
            );
            for slug in missing {
                let field = fields.iter().find(|f| f.slug == slug).cloned();
                self.cache.insert(slug, field);
            }
        }

        let mut resolved: Vec<CustomField> = Vec::with_capacity(slugs.len());
        for slug in slugs {
            if let Some(Some(field)) = self.cache.get(slug) {
                if !resolved.iter().any(|f| f.id == field.id) {
                    resolved.push(field.clone());
                }
            }
        }
        Ok(resolved)
    }
}
