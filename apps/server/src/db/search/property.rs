//! Property path classification.
//!
//! A filter, sort or projection names a property as a dotted path. The path is
//! parsed once into a [`PropertyRef`] and every later stage matches on the tag.

/// Typed column of the `posts` table exposed to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Title,
    Slug,
    Content,
    Excerpt,
    Status,
    WorkflowStatus,
    PostTypeId,
    AuthorId,
    ParentId,
    FeaturedImageId,
    MetaTitle,
    MetaDescription,
    CanonicalUrl,
    ShareCount,
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    ScheduledPublishAt,
}

/// Storage class of a column; drives value coercion and sort sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// Epoch milliseconds.
    Timestamp,
}

impl Column {
    pub const ALL: [Column; 19] = [
        Column::Id,
        Column::Title,
        Column::Slug,
        Column::Content,
        Column::Excerpt,
        Column::Status,
        Column::WorkflowStatus,
        Column::PostTypeId,
        Column::AuthorId,
        Column::ParentId,
        Column::FeaturedImageId,
        Column::MetaTitle,
        Column::MetaDescription,
        Column::CanonicalUrl,
        Column::ShareCount,
        Column::CreatedAt,
        Column::UpdatedAt,
        Column::PublishedAt,
        Column::ScheduledPublishAt,
    ];

    /// Columns scanned by the free-text `search` term.
    pub const FULL_TEXT: [Column; 3] = [Column::Title, Column::Content, Column::Excerpt];

    pub fn from_property(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.property() == name)
    }

    /// Name used in requests and response items.
    pub fn property(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Title => "title",
            Column::Slug => "slug",
            Column::Content => "content",
            Column::Excerpt => "excerpt",
            Column::Status => "status",
            Column::WorkflowStatus => "workflowStatus",
            Column::PostTypeId => "postTypeId",
            Column::AuthorId => "authorId",
            Column::ParentId => "parentId",
            Column::FeaturedImageId => "featuredImageId",
            Column::MetaTitle => "metaTitle",
            Column::MetaDescription => "metaDescription",
            Column::CanonicalUrl => "canonicalUrl",
            Column::ShareCount => "shareCount",
            Column::CreatedAt => "createdAt",
            Column::UpdatedAt => "updatedAt",
            Column::PublishedAt => "publishedAt",
            Column::ScheduledPublishAt => "scheduledPublishAt",
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Title => "title",
            Column::Slug => "slug",
            Column::Content => "content",
            Column::Excerpt => "excerpt",
            Column::Status => "status",
            Column::WorkflowStatus => "workflow_status",
            Column::PostTypeId => "post_type_id",
            Column::AuthorId => "author_id",
            Column::ParentId => "parent_id",
            Column::FeaturedImageId => "featured_image_id",
            Column::MetaTitle => "meta_title",
            Column::MetaDescription => "meta_description",
            Column::CanonicalUrl => "canonical_url",
            Column::ShareCount => "share_count",
            Column::CreatedAt => "created_at",
            Column::UpdatedAt => "updated_at",
            Column::PublishedAt => "published_at",
            Column::ScheduledPublishAt => "scheduled_publish_at",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::ShareCount => ColumnKind::Integer,
            Column::CreatedAt
            | Column::UpdatedAt
            | Column::PublishedAt
            | Column::ScheduledPublishAt => ColumnKind::Timestamp,
            _ => ColumnKind::Text,
        }
    }
}

/// Which field of the target post a relationship filter matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipTarget {
    Id,
    Slug,
    Unsupported(String),
}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyRef {
    Standard(Column),
    /// `customFields.<slug>`
    CustomField(String),
    /// `taxonomies.<category>[.<term>]`
    Taxonomy {
        category: String,
        term: Option<String>,
    },
    /// `relationships.<type>.<field>`
    Relationship {
        relationship_type: String,
        target: RelationshipTarget,
    },
    /// Any other dotted path, e.g. `author.name`. Only meaningful to hydration.
    Nested(String),
    /// An undotted name that is not a known column.
    Unknown(String),
}

const CUSTOM_FIELDS_PREFIX: &str = "customFields.";
const TAXONOMIES_PREFIX: &str = "taxonomies.";
const RELATIONSHIPS_PREFIX: &str = "relationships.";

impl PropertyRef {
    pub fn parse(property: &str) -> Self {
        if let Some(slug) = property.strip_prefix(CUSTOM_FIELDS_PREFIX) {
            if slug.is_empty() || slug.contains('.') {
                return Self::Nested(property.to_string());
            }
            return Self::CustomField(slug.to_string());
        }

        if let Some(rest) = property.strip_prefix(TAXONOMIES_PREFIX) {
            let mut parts = rest.splitn(2, '.');
            let category = parts.next().unwrap_or_default();
            let term = parts.next();
            if category.is_empty() || term.is_some_and(|t| t.is_empty() || t.contains('.')) {
                return Self::Nested(property.to_string());
            }
            return Self::Taxonomy {
                category: category.to_string(),
                term: term.map(str::to_string),
            };
        }

        if let Some(rest) = property.strip_prefix(RELATIONSHIPS_PREFIX) {
            let parts: Vec<&str> = rest.split('.').collect();
            if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
                return Self::Nested(property.to_string());
            }
            let target = match parts[1] {
                "id" => RelationshipTarget::Id,
                "slug" => RelationshipTarget::Slug,
                other => RelationshipTarget::Unsupported(other.to_string()),
            };
            return Self::Relationship {
                relationship_type: parts[0].to_string(),
                target,
            };
        }

        if property.contains('.') {
            return Self::Nested(property.to_string());
        }

        match Column::from_property(property) {
            Some(column) => Self::Standard(column),
            None => Self::Unknown(property.to_string()),
        }
    }
}
