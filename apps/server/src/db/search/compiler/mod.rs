//! Condition compiler: filter leaves and groups to predicates.
//!
//! Each leaf compiles to one of three outcomes. References that resolve to
//! nothing inside the tenant become [`CompileOutcome::Unsatisfiable`] and match
//! no rows. Operator/value pairs that make no sense for the property become
//! [`CompileOutcome::Invalid`] and are dropped from their group; the caller
//! decides whether that is a warning or a rejected request.

mod custom_field;
mod relationship;
mod standard;
mod taxonomy;
mod value;

pub(crate) use value::{parse_epoch_millis, parse_numeric};

use crate::db::search::predicate::Predicate;
use crate::db::search::property::PropertyRef;
use crate::db::search::resolver::CustomFieldResolver;
use crate::db::traits::ContentStore;
use crate::models::{Filter, FilterGroup, FilterOperator, GroupOperator, SearchWarning, WarningKind};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    Matched(Predicate),
    /// A referenced attribute, category, term or target does not exist.
    Unsatisfiable(String),
    /// The filter cannot apply to the property.
    Invalid(String),
}

/// Combined predicate for all groups plus what happened to each dropped or
/// unresolved leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilters {
    pub predicate: Predicate,
    pub warnings: Vec<SearchWarning>,
}

impl CompiledFilters {
    pub fn has_invalid(&self) -> bool {
        self.warnings.iter().any(|w| w.kind == WarningKind::Invalid)
    }
}

/// Set-membership operators for taxonomy and relationship filters. Returns
/// whether the membership is negated.
fn membership(operator: FilterOperator) -> Option<bool> {
    match operator {
        FilterOperator::Eq | FilterOperator::In => Some(false),
        FilterOperator::Ne | FilterOperator::NotIn => Some(true),
        _ => None,
    }
}

pub struct ConditionCompiler<'a> {
    store: &'a dyn ContentStore,
    organization_id: &'a str,
    fields: CustomFieldResolver<'a>,
}

impl<'a> ConditionCompiler<'a> {
    pub fn new(store: &'a dyn ContentStore, organization_id: &'a str) -> Self {
        Self {
            store,
            organization_id,
            fields: CustomFieldResolver::new(store, organization_id),
        }
    }

    /// Compile one filter leaf.
    pub async fn compile(&mut self, filter: &Filter) -> Result<CompileOutcome> {
        let value = filter.value.as_ref();
        match PropertyRef::parse(&filter.property) {
            PropertyRef::Standard(column) => Ok(standard::compile(column, filter.operator, value)),
            PropertyRef::CustomField(slug) => match self.fields.resolve(&slug).await? {
                Some(field) => Ok(custom_field::compile(&field, filter.operator, value)),
                None => Ok(CompileOutcome::Unsatisfiable(format!(
                    "custom field '{slug}' does not exist"
                ))),
            },
            PropertyRef::Taxonomy { category, term } => {
                taxonomy::compile(
                    self.store,
                    self.organization_id,
                    &category,
                    term.as_deref(),
                    filter.operator,
                    value,
                )
                .await
            }
            PropertyRef::Relationship {
                relationship_type,
                target,
            } => {
                relationship::compile(
                    self.store,
                    self.organization_id,
                    &relationship_type,
                    &target,
                    filter.operator,
                    value,
                )
                .await
            }
            PropertyRef::Nested(path) => Ok(CompileOutcome::Invalid(format!(
                "{path}: nested properties can be projected but not filtered"
            ))),
            PropertyRef::Unknown(name) => Ok(CompileOutcome::Invalid(format!(
                "{name}: unknown property"
            ))),
        }
    }

    /// Compile all groups. Leaves combine with their group's operator after
    /// invalid ones are dropped; a group left empty adds no constraint; groups
    /// always combine with AND.
    pub async fn compile_groups(&mut self, groups: &[FilterGroup]) -> Result<CompiledFilters> {
        let mut compiled_groups = Vec::with_capacity(groups.len());
        let mut warnings = Vec::new();

        for group in groups {
            let mut leaves = Vec::with_capacity(group.filters.len());
            for filter in &group.filters {
                match self.compile(filter).await? {
                    CompileOutcome::Matched(predicate) => leaves.push(predicate),
                    CompileOutcome::Unsatisfiable(message) => {
                        tracing::debug!(property = %filter.property, %message, "Filter matches nothing");
                        leaves.push(Predicate::False);
                        warnings.push(SearchWarning {
                            property: filter.property.clone(),
                            kind: WarningKind::Unresolved,
                            message,
                        });
                    }
                    CompileOutcome::Invalid(message) => {
                        tracing::debug!(property = %filter.property, %message, "Dropping invalid filter");
                        warnings.push(SearchWarning {
                            property: filter.property.clone(),
                            kind: WarningKind::Invalid,
                            message,
                        });
                    }
                }
            }

            if leaves.is_empty() {
                continue;
            }
            compiled_groups.push(match group.operator {
                GroupOperator::And => Predicate::and(leaves),
                GroupOperator::Or => Predicate::or(leaves),
            });
        }

        Ok(CompiledFilters {
            predicate: Predicate::and(compiled_groups),
            warnings,
        })
    }

    /// Hand the warmed-up field cache on to hydration.
    pub fn into_resolver(self) -> CustomFieldResolver<'a> {
        self.fields
    }
}
