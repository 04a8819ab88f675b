//! In-process `ContentStore`.
//!
//! Evaluates search plans directly against rows held in memory, with the same
//! semantics the Postgres store renders to SQL: three-valued comparisons,
//! existence-style custom field tests, NULL sort keys coalesced to the key's
//! sentinel and bytewise text ordering. Used by tests and by embedders that
//! keep content in process.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::search::compiler::{parse_epoch_millis, parse_numeric};
use crate::db::search::{
    AttributeTest, Column, Comparison, Predicate, Scalar, SearchPlan, Seek, SortKey, ValueCast,
};
use crate::db::traits::ContentStore;
use crate::models::{
    Author, CustomField, Post, PostFieldValue, PostRelationship, PostTypeSummary, SortDirection,
    Taxonomy, TaxonomyTerm,
};
use crate::Result;

#[derive(Default)]
struct Dataset {
    posts: Vec<Post>,
    authors: Vec<Author>,
    post_types: Vec<PostTypeSummary>,
    custom_fields: Vec<CustomField>,
    /// Keyed by `(post_id, custom_field_id)`.
    field_values: HashMap<(String, String), String>,
    taxonomies: Vec<Taxonomy>,
    terms: Vec<TaxonomyTerm>,
    /// `(post_id, term_id)`
    tags: Vec<(String, String)>,
    relationships: Vec<PostRelationship>,
}

#[derive(Default)]
pub struct MemoryContentStore {
    data: RwLock<Dataset>,
    queries: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Dataset> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Dataset> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, query: &'static str) {
        let mut queries = self.queries.lock().unwrap_or_else(|e| e.into_inner());
        *queries.entry(query).or_insert(0) += 1;
    }

    /// How many times a `ContentStore` method has been called.
    pub fn query_count(&self, query: &str) -> usize {
        let queries = self.queries.lock().unwrap_or_else(|e| e.into_inner());
        queries.get(query).copied().unwrap_or(0)
    }

    /// Insert or replace a post by id.
    pub fn insert_post(&self, post: Post) {
        let mut data = self.write();
        data.posts.retain(|p| p.id != post.id);
        data.posts.push(post);
    }

    pub fn insert_author(&self, author: Author) {
        let mut data = self.write();
        data.authors.retain(|a| a.id != author.id);
        data.authors.push(author);
    }

    pub fn insert_post_type(&self, post_type: PostTypeSummary) {
        let mut data = self.write();
        data.post_types.retain(|t| t.id != post_type.id);
        data.post_types.push(post_type);
    }

    pub fn insert_custom_field(&self, field: CustomField) {
        let mut data = self.write();
        data.custom_fields.retain(|f| f.id != field.id);
        data.custom_fields.push(field);
    }

    /// Set the single value row of a field on a post.
    pub fn set_field_value(
        &self,
        post_id: impl Into<String>,
        field_id: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.write()
            .field_values
            .insert((post_id.into(), field_id.into()), value.into());
    }

    pub fn insert_taxonomy(&self, taxonomy: Taxonomy) {
        let mut data = self.write();
        data.taxonomies.retain(|t| t.id != taxonomy.id);
        data.taxonomies.push(taxonomy);
    }

    pub fn insert_term(&self, term: TaxonomyTerm) {
        let mut data = self.write();
        data.terms.retain(|t| t.id != term.id);
        data.terms.push(term);
    }

    pub fn tag(&self, post_id: impl Into<String>, term_id: impl Into<String>) {
        let tag = (post_id.into(), term_id.into());
        let mut data = self.write();
        if !data.tags.contains(&tag) {
            data.tags.push(tag);
        }
    }

    pub fn relate(
        &self,
        from_post_id: impl Into<String>,
        to_post_id: impl Into<String>,
        relationship_type: impl Into<String>,
    ) {
        self.write().relationships.push(PostRelationship {
            from_post_id: from_post_id.into(),
            to_post_id: to_post_id.into(),
            relationship_type: relationship_type.into(),
        });
    }
}

fn column_value(post: &Post, column: Column) -> Option<Scalar> {
    let text = |s: &str| Some(Scalar::Text(s.to_string()));
    let opt_text = |s: &Option<String>| s.as_deref().map(|s| Scalar::Text(s.to_string()));
    match column {
        Column::Id => text(&post.id),
        Column::Title => text(&post.title),
        Column::Slug => text(&post.slug),
        Column::Content => opt_text(&post.content),
        Column::Excerpt => opt_text(&post.excerpt),
        Column::Status => text(&post.status),
        Column::WorkflowStatus => opt_text(&post.workflow_status),
        Column::PostTypeId => text(&post.post_type_id),
        Column::AuthorId => text(&post.author_id),
        Column::ParentId => opt_text(&post.parent_id),
        Column::FeaturedImageId => opt_text(&post.featured_image_id),
        Column::MetaTitle => opt_text(&post.meta_title),
        Column::MetaDescription => opt_text(&post.meta_description),
        Column::CanonicalUrl => opt_text(&post.canonical_url),
        Column::ShareCount => Some(Scalar::Int(post.share_count)),
        Column::CreatedAt => Some(Scalar::Int(post.created_at)),
        Column::UpdatedAt => Some(Scalar::Int(post.updated_at)),
        Column::PublishedAt => post.published_at.map(Scalar::Int),
        Column::ScheduledPublishAt => post.scheduled_publish_at.map(Scalar::Int),
    }
}

fn sort_value(post: &Post, key: &SortKey) -> Scalar {
    column_value(post, key.column).unwrap_or_else(|| key.sentinel())
}

fn cast_value(raw: &str, cast: ValueCast) -> Option<Scalar> {
    match cast {
        ValueCast::Text => Some(Scalar::Text(raw.to_string())),
        ValueCast::Numeric => parse_numeric(raw).map(Scalar::Float),
        ValueCast::Epoch => parse_epoch_millis(raw).map(Scalar::Int),
    }
}

/// Three-valued comparison: `None` is SQL's unknown.
fn compare(value: Option<Scalar>, comparison: &Comparison) -> Option<bool> {
    match comparison {
        Comparison::IsNull => return Some(value.is_none()),
        Comparison::IsNotNull => return Some(value.is_some()),
        _ => {}
    }
    let value = value?;
    let ord = |other: &Scalar| value.compare(other);
    match comparison {
        Comparison::Eq(v) => ord(v).map(|o| o == Ordering::Equal),
        Comparison::Ne(v) => ord(v).map(|o| o != Ordering::Equal),
        Comparison::Gt(v) => ord(v).map(|o| o == Ordering::Greater),
        Comparison::Gte(v) => ord(v).map(|o| o != Ordering::Less),
        Comparison::Lt(v) => ord(v).map(|o| o == Ordering::Less),
        Comparison::Lte(v) => ord(v).map(|o| o != Ordering::Greater),
        Comparison::In(values) => Some(values.iter().any(|v| ord(v) == Some(Ordering::Equal))),
        Comparison::NotIn(values) => {
            Some(!values.iter().any(|v| ord(v) == Some(Ordering::Equal)))
        }
        Comparison::Between(low, high) => {
            let above = ord(low)? != Ordering::Less;
            let below = ord(high)? != Ordering::Greater;
            Some(above && below)
        }
        Comparison::Like { pattern, negated } => match &value {
            Scalar::Text(s) => Some(pattern.matches(s) != *negated),
            _ => None,
        },
        Comparison::IsNull | Comparison::IsNotNull => None,
    }
}

fn any_of(results: impl Iterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for result in results {
        match result {
            Some(true) => return Some(true),
            None => unknown = true,
            Some(false) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(false)
    }
}

fn all_of(results: impl Iterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for result in results {
        match result {
            Some(false) => return Some(false),
            None => unknown = true,
            Some(true) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(true)
    }
}

fn eval(data: &Dataset, post: &Post, predicate: &Predicate) -> Option<bool> {
    match predicate {
        Predicate::True => Some(true),
        Predicate::False => Some(false),
        Predicate::And(parts) => all_of(parts.iter().map(|p| eval(data, post, p))),
        Predicate::Or(parts) => any_of(parts.iter().map(|p| eval(data, post, p))),
        Predicate::Not(inner) => eval(data, post, inner).map(|b| !b),
        Predicate::Column { column, comparison } => {
            compare(column_value(post, *column), comparison)
        }
        Predicate::Attribute { field_id, test } => {
            let raw = data
                .field_values
                .get(&(post.id.clone(), field_id.clone()));
            Some(match (raw, test) {
                (None, _) => false,
                (Some(_), AttributeTest::Exists) => true,
                (Some(raw), AttributeTest::Value { cast, comparison }) => {
                    compare(cast_value(raw, *cast), comparison) == Some(true)
                }
            })
        }
        Predicate::Tagged { term_ids } => Some(
            data.tags
                .iter()
                .any(|(post_id, term_id)| *post_id == post.id && term_ids.contains(term_id)),
        ),
        Predicate::Related {
            relationship_type,
            target_ids,
        } => Some(data.relationships.iter().any(|edge| {
            edge.from_post_id == post.id
                && edge.relationship_type == *relationship_type
                && target_ids.contains(&edge.to_post_id)
        })),
        Predicate::TextSearch { columns, needle } => {
            let pattern = crate::db::search::LikePattern::Contains(needle.clone());
            any_of(columns.iter().map(|column| {
                compare(
                    column_value(post, *column),
                    &Comparison::Like {
                        pattern: pattern.clone(),
                        negated: false,
                    },
                )
            }))
        }
    }
}

/// Whether `post` sorts strictly after the seek position.
fn after_seek(post: &Post, sort: &[SortKey], seek: &Seek) -> bool {
    for (key, bound) in sort.iter().zip(&seek.values) {
        match sort_value(post, key).compare(bound) {
            Some(Ordering::Equal) => continue,
            Some(ord) => {
                return match key.direction {
                    SortDirection::Desc => ord == Ordering::Less,
                    SortDirection::Asc => ord == Ordering::Greater,
                }
            }
            None => return false,
        }
    }
    post.id.as_bytes() > seek.last_id.as_bytes()
}

fn order(a: &Post, b: &Post, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let ord = sort_value(a, key)
            .compare(&sort_value(b, key))
            .unwrap_or(Ordering::Equal);
        let ord = match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.as_bytes().cmp(b.id.as_bytes())
}

fn project(post: &Post, columns: &[Column]) -> Map<String, JsonValue> {
    columns
        .iter()
        .map(|column| {
            let value = column_value(post, *column)
                .map(|s| s.to_json())
                .unwrap_or(JsonValue::Null);
            (column.property().to_string(), value)
        })
        .collect()
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn custom_fields_by_slugs(
        &self,
        organization_id: &str,
        slugs: &[String],
    ) -> Result<Vec<CustomField>> {
        self.record("custom_fields_by_slugs");
        Ok(self
            .read()
            .custom_fields
            .iter()
            .filter(|f| f.organization_id == organization_id && slugs.contains(&f.slug))
            .cloned()
            .collect())
    }

    async fn taxonomy_by_slug(
        &self,
        organization_id: &str,
        slug: &str,
    ) -> Result<Option<Taxonomy>> {
        self.record("taxonomy_by_slug");
        Ok(self
            .read()
            .taxonomies
            .iter()
            .find(|t| t.organization_id == organization_id && t.slug == slug)
            .cloned())
    }

    async fn terms_by_slugs(
        &self,
        taxonomy_id: &str,
        slugs: &[String],
    ) -> Result<Vec<TaxonomyTerm>> {
        self.record("terms_by_slugs");
        Ok(self
            .read()
            .terms
            .iter()
            .filter(|t| t.taxonomy_id == taxonomy_id && slugs.contains(&t.slug))
            .cloned()
            .collect())
    }

    async fn post_ids_by_ids(&self, organization_id: &str, ids: &[String]) -> Result<Vec<String>> {
        self.record("post_ids_by_ids");
        Ok(self
            .read()
            .posts
            .iter()
            .filter(|p| p.organization_id == organization_id && ids.contains(&p.id))
            .map(|p| p.id.clone())
            .collect())
    }

    async fn published_post_ids_by_slugs(
        &self,
        organization_id: &str,
        slugs: &[String],
    ) -> Result<Vec<String>> {
        self.record("published_post_ids_by_slugs");
        Ok(self
            .read()
            .posts
            .iter()
            .filter(|p| {
                p.organization_id == organization_id
                    && p.status == "published"
                    && slugs.contains(&p.slug)
            })
            .map(|p| p.id.clone())
            .collect())
    }

    async fn fetch_posts(&self, plan: &SearchPlan) -> Result<Vec<Map<String, JsonValue>>> {
        self.record("fetch_posts");
        let data = self.read();

        let mut matched: Vec<&Post> = data
            .posts
            .iter()
            .filter(|post| post.organization_id == plan.organization_id)
            .filter(|post| eval(&data, post, &plan.predicate) == Some(true))
            .filter(|post| match &plan.seek {
                Some(seek) => after_seek(post, &plan.sort, seek),
                None => true,
            })
            .collect();

        matched.sort_by(|a, b| order(a, b, &plan.sort));

        Ok(matched
            .into_iter()
            .take(plan.fetch_limit)
            .map(|post| project(post, &plan.columns))
            .collect())
    }

    async fn authors_by_ids(&self, ids: &[String]) -> Result<Vec<Author>> {
        self.record("authors_by_ids");
        Ok(self
            .read()
            .authors
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn post_types_by_ids(
        &self,
        organization_id: &str,
        ids: &[String],
    ) -> Result<Vec<PostTypeSummary>> {
        self.record("post_types_by_ids");
        Ok(self
            .read()
            .post_types
            .iter()
            .filter(|t| t.organization_id == organization_id && ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn field_values_for_posts(
        &self,
        post_ids: &[String],
        field_ids: &[String],
    ) -> Result<Vec<PostFieldValue>> {
        self.record("field_values_for_posts");
        Ok(self
            .read()
            .field_values
            .iter()
            .filter(|((post_id, field_id), _)| {
                post_ids.contains(post_id) && field_ids.contains(field_id)
            })
            .map(|((post_id, field_id), value)| PostFieldValue {
                post_id: post_id.clone(),
                custom_field_id: field_id.clone(),
                value: value.clone(),
            })
            .collect())
    }
}
