//! Filters on category tagging (`taxonomies.<category>[.<term>]`).

use serde_json::Value as JsonValue;

use crate::db::search::predicate::Predicate;
use crate::db::traits::ContentStore;
use crate::models::FilterOperator;
use crate::Result;

use super::value::strings_of;
use super::{membership, CompileOutcome};

pub(super) async fn compile(
    store: &dyn ContentStore,
    organization_id: &str,
    category: &str,
    term: Option<&str>,
    operator: FilterOperator,
    value: Option<&JsonValue>,
) -> Result<CompileOutcome> {
    let Some(negated) = membership(operator) else {
        return Ok(CompileOutcome::Invalid(format!(
            "taxonomies.{category}: operator {} is not supported, use eq, in, ne or not_in",
            operator.as_str()
        )));
    };

    let slugs = match term {
        Some(term) => vec![term.to_string()],
        None => match strings_of(value) {
            Some(slugs) => slugs,
            None => {
                return Ok(CompileOutcome::Invalid(format!(
                    "taxonomies.{category}: value must be a term slug or a list of term slugs"
                )))
            }
        },
    };

    let Some(taxonomy) = store.taxonomy_by_slug(organization_id, category).await? else {
        return Ok(CompileOutcome::Unsatisfiable(format!(
            "taxonomy '{category}' does not exist"
        )));
    };

    let terms = store.terms_by_slugs(&taxonomy.id, &slugs).await?;
    if terms.is_empty() {
        return Ok(CompileOutcome::Unsatisfiable(format!(
            "no term of taxonomy '{category}' matches {}",
            slugs.join(", ")
        )));
    }

    let tagged = Predicate::Tagged {
        term_ids: terms.into_iter().map(|t| t.id).collect(),
    };
    Ok(CompileOutcome::Matched(if negated {
        tagged.negate()
    } else {
        tagged
    }))
}
