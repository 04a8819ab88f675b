use folio::db::MemoryContentStore;
use folio::models::{Author, CustomField, FieldType, PostTypeSummary, Taxonomy, TaxonomyTerm};

use crate::support::builders::{PostBuilder, DEFAULT_AUTHOR, DEFAULT_POST_TYPE, ORG};

pub fn author(id: &str, name: &str) -> Author {
    Author {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{id}@example.org"),
        avatar_url: None,
    }
}

pub fn post_type(id: &str, organization_id: &str, slug: &str) -> PostTypeSummary {
    PostTypeSummary {
        id: id.to_string(),
        organization_id: organization_id.to_string(),
        name: slug.to_string(),
        slug: slug.to_string(),
    }
}

pub fn custom_field(
    id: &str,
    organization_id: &str,
    slug: &str,
    field_type: FieldType,
) -> CustomField {
    CustomField {
        id: id.to_string(),
        organization_id: organization_id.to_string(),
        slug: slug.to_string(),
        name: slug.to_string(),
        field_type,
    }
}

pub fn taxonomy(id: &str, organization_id: &str, slug: &str) -> Taxonomy {
    Taxonomy {
        id: id.to_string(),
        organization_id: organization_id.to_string(),
        name: slug.to_string(),
        slug: slug.to_string(),
        is_hierarchical: false,
    }
}

pub fn term(id: &str, taxonomy_id: &str, slug: &str) -> TaxonomyTerm {
    TaxonomyTerm {
        id: id.to_string(),
        taxonomy_id: taxonomy_id.to_string(),
        name: slug.to_string(),
        slug: slug.to_string(),
        parent_id: None,
    }
}

/// Default author and post type for `ORG`.
pub fn seed_basics(store: &MemoryContentStore) {
    store.insert_author(author(DEFAULT_AUTHOR, "Ada Lovelace"));
    store.insert_post_type(post_type(DEFAULT_POST_TYPE, ORG, "article"));
}

/// Posts `P1..P5` with `createdAt` 5..1, so the default order is P1..P5.
pub fn seed_five_posts(store: &MemoryContentStore) {
    seed_basics(store);
    for (i, created_at) in (1..=5).zip((1..=5).rev()) {
        store.insert_post(
            PostBuilder::new(format!("P{i}"))
                .created_at(created_at)
                .build(),
        );
    }
}
