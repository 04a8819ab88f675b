//! Per-request context injected by middleware.

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Scope that grants every post of the tenant.
pub const SCOPE_POSTS_READ: &str = "posts:read";
/// Scope that grants only published posts.
pub const SCOPE_POSTS_READ_PUBLISHED: &str = "posts:read:published";

/// Tenant identity resolved by the authentication layer in front of us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub organization_id: String,
    /// API-key scopes. `None` for session callers, who see everything.
    pub scopes: Option<Vec<String>>,
}

/// What a caller may read from the posts table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAccess {
    All,
    PublishedOnly,
    Nothing,
}

impl TenantContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            scopes: None,
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn post_access(&self) -> PostAccess {
        let Some(scopes) = &self.scopes else {
            return PostAccess::All;
        };
        if scopes.iter().any(|s| s == SCOPE_POSTS_READ) {
            PostAccess::All
        } else if scopes.iter().any(|s| s == SCOPE_POSTS_READ_PUBLISHED) {
            PostAccess::PublishedOnly
        } else {
            PostAccess::Nothing
        }
    }
}
