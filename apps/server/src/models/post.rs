//! Content rows read by the search core.
//!
//! Every entity here is created and mutated by the CRUD layer; search only reads
//! them. Timestamps are epoch milliseconds.

use serde::{Deserialize, Serialize};

/// A content item (post) owned by one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub organization_id: String,
    pub post_type_id: String,
    pub author_id: String,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub status: String,
    pub workflow_status: Option<String>,
    pub parent_id: Option<String>,
    pub featured_image_id: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub share_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub published_at: Option<i64>,
    pub scheduled_publish_at: Option<i64>,
}

impl Post {
    /// A draft post with every optional column empty.
    pub fn new(
        id: impl Into<String>,
        organization_id: impl Into<String>,
        post_type_id: impl Into<String>,
        author_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            post_type_id: post_type_id.into(),
            author_id: author_id.into(),
            slug: slugify(&title),
            title,
            content: None,
            excerpt: None,
            status: "draft".to_string(),
            workflow_status: None,
            parent_id: None,
            featured_image_id: None,
            meta_title: None,
            meta_description: None,
            canonical_url: None,
            share_count: 0,
            created_at: 0,
            updated_at: 0,
            published_at: None,
            scheduled_publish_at: None,
        }
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Author projection attached during hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// Post type projection attached during hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTypeSummary {
    pub id: String,
    #[serde(skip)]
    pub organization_id: String,
    pub name: String,
    pub slug: String,
}

/// Declared value type of a custom field.
///
/// Unknown type names stored by older clients read as [`FieldType::Text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    Select,
    MultiSelect,
    Json,
}

impl FieldType {
    pub fn from_db(value: &str) -> Self {
        match value {
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "date" | "datetime" => Self::Date,
            "select" => Self::Select,
            "multi_select" | "multi-select" => Self::MultiSelect,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Json => "json",
        }
    }

    /// Whether stored values are JSON-encoded and decoded on read.
    pub fn decodes_json(&self) -> bool {
        matches!(
            self,
            Self::Number | Self::Boolean | Self::Select | Self::MultiSelect | Self::Json
        )
    }
}

/// Tenant-scoped custom field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub id: String,
    pub organization_id: String,
    pub slug: String,
    pub name: String,
    pub field_type: FieldType,
}

/// Sparse value row: at most one per `(post_id, custom_field_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFieldValue {
    pub post_id: String,
    pub custom_field_id: String,
    pub value: String,
}

/// Tenant-scoped category (e.g. `region`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub slug: String,
    pub is_hierarchical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyTerm {
    pub id: String,
    pub taxonomy_id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
}

/// Directed edge between two posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRelationship {
    pub from_post_id: String,
    pub to_post_id: String,
    pub relationship_type: String,
}
