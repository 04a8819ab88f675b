//! Batched relation hydration for a page of posts.
//!
//! Each relation kind costs at most one store lookup for the whole page, and
//! the lookups run concurrently.

use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};

use crate::db::search::{Column, CustomFieldResolver, Projection};
use crate::db::traits::ContentStore;
use crate::models::{Author, CustomField, FieldType, PostFieldValue, PostTypeSummary};
use crate::{Error, Result};

pub const AUTHOR_KEY: &str = "author";
pub const POST_TYPE_KEY: &str = "postType";
pub const CUSTOM_FIELDS_KEY: &str = "customFields";

/// Attach the relations named by `projection` to every row in place.
pub async fn hydrate(
    store: &dyn ContentStore,
    organization_id: &str,
    fields: &mut CustomFieldResolver<'_>,
    projection: &Projection,
    rows: &mut [Map<String, JsonValue>],
) -> Result<()> {
    if rows.is_empty() || !projection.has_relations() {
        return Ok(());
    }

    let author_ids = if projection.author {
        distinct_strings(rows, Column::AuthorId)
    } else {
        Vec::new()
    };
    let post_type_ids = if projection.post_type {
        distinct_strings(rows, Column::PostTypeId)
    } else {
        Vec::new()
    };

    let definitions = if projection.custom_fields.is_empty() {
        Vec::new()
    } else {
        fields.resolve_many(&projection.custom_fields).await?
    };
    let field_ids: Vec<String> = definitions.iter().map(|f| f.id.clone()).collect();
    let post_ids = if field_ids.is_empty() {
        Vec::new()
    } else {
        distinct_strings(rows, Column::Id)
    };

    let (authors, post_types, values) = tokio::try_join!(
        async {
            if author_ids.is_empty() {
                Ok(Vec::new())
            } else {
                store.authors_by_ids(&author_ids).await
            }
        },
        async {
            if post_type_ids.is_empty() {
                Ok(Vec::new())
            } else {
                store.post_types_by_ids(organization_id, &post_type_ids).await
            }
        },
        async {
            if post_ids.is_empty() {
                Ok(Vec::new())
            } else {
                store.field_values_for_posts(&post_ids, &field_ids).await
            }
        },
    )?;

    tracing::debug!(
        rows = rows.len(),
        authors = authors.len(),
        post_types = post_types.len(),
        field_values = values.len(),
        "Hydrated relations"
    );

    let authors = index_authors(authors)?;
    let post_types = index_post_types(post_types)?;
    let values = index_values(&definitions, values);

    for row in rows.iter_mut() {
        if projection.author {
            let author = lookup(row, Column::AuthorId, &authors);
            row.insert(AUTHOR_KEY.to_string(), author);
        }
        if projection.post_type {
            let post_type = lookup(row, Column::PostTypeId, &post_types);
            row.insert(POST_TYPE_KEY.to_string(), post_type);
        }
        if !definitions.is_empty() {
            let post_id = row.get(Column::Id.property()).and_then(JsonValue::as_str);
            if let Some(custom) = post_id.and_then(|id| values.get(id)) {
                row.insert(
                    CUSTOM_FIELDS_KEY.to_string(),
                    JsonValue::Object(custom.clone()),
                );
            }
        }
    }

    Ok(())
}

/// Decode a stored value according to its field type. Values that fail to
/// parse stay as raw text.
pub fn decode_field_value(field_type: FieldType, raw: &str) -> JsonValue {
    if field_type.decodes_json() {
        serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
    } else {
        JsonValue::String(raw.to_string())
    }
}

fn distinct_strings(rows: &[Map<String, JsonValue>], column: Column) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(column.property()).and_then(JsonValue::as_str))
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

fn lookup(
    row: &Map<String, JsonValue>,
    column: Column,
    index: &HashMap<String, JsonValue>,
) -> JsonValue {
    row.get(column.property())
        .and_then(JsonValue::as_str)
        .and_then(|id| index.get(id))
        .cloned()
        .unwrap_or(JsonValue::Null)
}

fn index_authors(authors: Vec<Author>) -> Result<HashMap<String, JsonValue>> {
    authors
        .into_iter()
        .map(|author| {
            let value = serde_json::to_value(&author)
                .map_err(|e| Error::Internal(format!("Failed to serialize author: {e}")))?;
            Ok((author.id, value))
        })
        .collect()
}

fn index_post_types(post_types: Vec<PostTypeSummary>) -> Result<HashMap<String, JsonValue>> {
    post_types
        .into_iter()
        .map(|post_type| {
            let value = serde_json::to_value(&post_type)
                .map_err(|e| Error::Internal(format!("Failed to serialize post type: {e}")))?;
            Ok((post_type.id, value))
        })
        .collect()
}

/// post id -> (field slug -> decoded value)
fn index_values(
    definitions: &[CustomField],
    values: Vec<PostFieldValue>,
) -> HashMap<String, Map<String, JsonValue>> {
    let by_id: HashMap<&str, &CustomField> =
        definitions.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut index: HashMap<String, Map<String, JsonValue>> = HashMap::new();
    for value in values {
        let Some(field) = by_id.get(value.custom_field_id.as_str()) else {
            continue;
        };
        index.entry(value.post_id).or_default().insert(
            field.slug.clone(),
            decode_field_value(field.field_type, &value.value),
        );
    }
    index
}
