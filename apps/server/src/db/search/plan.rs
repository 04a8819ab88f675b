//! Executable search plan handed to a `ContentStore`.

use crate::models::{SortDirection, SortSpec};

use super::predicate::{Predicate, Scalar};
use super::property::{Column, ColumnKind, PropertyRef};

/// One ordering key. Every plan is additionally ordered by `id` ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: Column,
    pub direction: SortDirection,
}

impl SortKey {
    pub const DEFAULT: SortKey = SortKey {
        column: Column::CreatedAt,
        direction: SortDirection::Desc,
    };

    /// Value NULLs sort as. Sorting and seeking both use the coalesced value.
    pub fn sentinel(&self) -> Scalar {
        match self.column.kind() {
            ColumnKind::Text => Scalar::Text(String::new()),
            ColumnKind::Integer | ColumnKind::Timestamp => Scalar::Int(0),
        }
    }
}

/// Resolve requested sorts into keys. Unknown properties fall back to the
/// default key; repeated columns keep their first occurrence.
pub fn resolve_sort(sorts: &[SortSpec]) -> Vec<SortKey> {
    let mut keys: Vec<SortKey> = Vec::with_capacity(sorts.len().max(1));
    for spec in sorts {
        let key = match Column::from_property(&spec.property) {
            Some(column) => SortKey {
                column,
                direction: spec.direction,
            },
            None => {
                tracing::debug!(
                    property = %spec.property,
                    "Unknown sort property, falling back to createdAt desc"
                );
                SortKey::DEFAULT
            }
        };
        if !keys.iter().any(|k| k.column == key.column) {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        keys.push(SortKey::DEFAULT);
    }
    keys
}

/// Position after which the next page starts: one value per sort key, plus
/// the id tie-break.
#[derive(Debug, Clone, PartialEq)]
pub struct Seek {
    pub values: Vec<Scalar>,
    pub last_id: String,
}

/// Columns and relations a response item carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub columns: Vec<Column>,
    pub author: bool,
    pub post_type: bool,
    pub custom_fields: Vec<String>,
}

impl Projection {
    /// `None` selects every column plus the default relations when enabled;
    /// an empty list selects every column and no relations.
    pub fn from_properties(properties: Option<&[String]>, attach_default_relations: bool) -> Self {
        let Some(properties) = properties else {
            return Self {
                columns: Column::ALL.to_vec(),
                author: attach_default_relations,
                post_type: attach_default_relations,
                custom_fields: Vec::new(),
            };
        };

        if properties.is_empty() {
            return Self {
                columns: Column::ALL.to_vec(),
                author: false,
                post_type: false,
                custom_fields: Vec::new(),
            };
        }

        let mut projection = Self {
            columns: vec![Column::Id],
            author: false,
            post_type: false,
            custom_fields: Vec::new(),
        };

        for property in properties {
            match PropertyRef::parse(property) {
                PropertyRef::Standard(column) => {
                    if !projection.columns.contains(&column) {
                        projection.columns.push(column);
                    }
                }
                PropertyRef::CustomField(slug) => {
                    if !projection.custom_fields.contains(&slug) {
                        projection.custom_fields.push(slug);
                    }
                }
                PropertyRef::Nested(path) | PropertyRef::Unknown(path) => {
                    let root = path.split('.').next().unwrap_or_default();
                    match root {
                        "author" => projection.author = true,
                        "postType" => projection.post_type = true,
                        _ => {}
                    }
                }
                PropertyRef::Taxonomy { .. } | PropertyRef::Relationship { .. } => {}
            }
        }

        projection
    }

    pub fn has_relations(&self) -> bool {
        self.author || self.post_type || !self.custom_fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub organization_id: String,
    pub predicate: Predicate,
    pub sort: Vec<SortKey>,
    pub seek: Option<Seek>,
    /// Columns fetched per row: the projection plus sort and hydration keys.
    pub columns: Vec<Column>,
    /// Page size plus one.
    pub fetch_limit: usize,
}

impl SearchPlan {
    /// Columns every plan needs regardless of projection.
    pub fn required_columns(sort: &[SortKey], projection: &Projection) -> Vec<Column> {
        let mut columns = projection.columns.clone();
        let mut add = |column: Column| {
            if !columns.contains(&column) {
                columns.push(column);
            }
        };
        add(Column::Id);
        for key in sort {
            add(key.column);
        }
        if projection.author {
            add(Column::AuthorId);
        }
        if projection.post_type {
            add(Column::PostTypeId);
        }
        columns
    }
}
