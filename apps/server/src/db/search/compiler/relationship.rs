//! Filters on directed post relationships (`relationships.<type>.<id|slug>`).

use serde_json::Value as JsonValue;

use crate::db::search::predicate::Predicate;
use crate::db::search::property::RelationshipTarget;
use crate::db::traits::ContentStore;
use crate::models::FilterOperator;
use crate::Result;

use super::value::strings_of;
use super::{membership, CompileOutcome};

pub(super) async fn compile(
    store: &dyn ContentStore,
    organization_id: &str,
    relationship_type: &str,
    target: &RelationshipTarget,
    operator: FilterOperator,
    value: Option<&JsonValue>,
) -> Result<CompileOutcome> {
    let property = format!("relationships.{relationship_type}");
    if let RelationshipTarget::Unsupported(field) = target {
        return Ok(CompileOutcome::Invalid(format!(
            "{property}: targets can be matched by id or slug, not {field}"
        )));
    }
    let Some(negated) = membership(operator) else {
        return Ok(CompileOutcome::Invalid(format!(
            "{property}: operator {} is not supported, use eq, in, ne or not_in",
            operator.as_str()
        )));
    };
    let Some(keys) = strings_of(value) else {
        return Ok(CompileOutcome::Invalid(format!(
            "{property}: value must be a string or a list of strings"
        )));
    };

    // Targets resolve inside the tenant; slugs only match published posts.
    let target_ids = match target {
        RelationshipTarget::Slug => {
            store
                .published_post_ids_by_slugs(organization_id, &keys)
                .await?
        }
        _ => store.post_ids_by_ids(organization_id, &keys).await?,
    };

    if target_ids.is_empty() {
        return Ok(CompileOutcome::Unsatisfiable(format!(
            "{property}: no target post matches {}",
            keys.join(", ")
        )));
    }

    let related = Predicate::Related {
        relationship_type: relationship_type.to_string(),
        target_ids,
    };
    Ok(CompileOutcome::Matched(if negated {
        related.negate()
    } else {
        related
    }))
}
