use axum::body::Bytes;
use folio::models::{
    EntityType, Filter, FilterGroup, FilterOperator, Post, SearchRequest, SortDirection, SortSpec,
};
use serde_json::Value;

pub const ORG: &str = "org-acme";
pub const OTHER_ORG: &str = "org-globex";
pub const DEFAULT_AUTHOR: &str = "user-ada";
pub const DEFAULT_POST_TYPE: &str = "type-article";

/// Converts a JSON value to request body bytes
pub fn to_json_body(value: &Value) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Builder for posts; defaults to a draft article by the default author.
pub struct PostBuilder {
    post: Post,
}

impl PostBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            post: Post::new(id.clone(), ORG, DEFAULT_POST_TYPE, DEFAULT_AUTHOR, id),
        }
    }

    pub fn organization(mut self, organization_id: impl Into<String>) -> Self {
        self.post.organization_id = organization_id.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.post.title = title.into();
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.post.slug = slug.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.post.content = Some(content.into());
        self
    }

    pub fn excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.post.excerpt = Some(excerpt.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.post.status = status.into();
        self
    }

    pub fn published(self) -> Self {
        self.status("published")
    }

    pub fn author(mut self, author_id: impl Into<String>) -> Self {
        self.post.author_id = author_id.into();
        self
    }

    pub fn post_type(mut self, post_type_id: impl Into<String>) -> Self {
        self.post.post_type_id = post_type_id.into();
        self
    }

    pub fn created_at(mut self, created_at: i64) -> Self {
        self.post.created_at = created_at;
        self.post.updated_at = created_at;
        self
    }

    pub fn published_at(mut self, published_at: i64) -> Self {
        self.post.published_at = Some(published_at);
        self
    }

    pub fn share_count(mut self, share_count: i64) -> Self {
        self.post.share_count = share_count;
        self
    }

    pub fn build(self) -> Post {
        self.post
    }
}

/// Builder for search requests.
#[derive(Default)]
pub struct SearchBuilder {
    request: SearchRequest,
}

impl SearchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.request.entity_type = entity_type;
        self
    }

    /// Adds an AND group holding one filter.
    pub fn filter(self, property: &str, operator: FilterOperator, value: Value) -> Self {
        self.group(FilterGroup::all(vec![Filter::new(property, operator, value)]))
    }

    pub fn group(mut self, group: FilterGroup) -> Self {
        self.request.filter_groups.push(group);
        self
    }

    pub fn text(mut self, search: impl Into<String>) -> Self {
        self.request.search = Some(search.into());
        self
    }

    pub fn sort(mut self, property: &str, direction: SortDirection) -> Self {
        self.request.sorts.push(SortSpec::new(property, direction));
        self
    }

    pub fn properties(mut self, properties: &[&str]) -> Self {
        self.request.properties = Some(properties.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.request.limit = Some(limit);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.request.after = Some(cursor.into());
        self
    }

    pub fn build(self) -> SearchRequest {
        self.request
    }
}
