//! Filters on typed `posts` columns.

use serde_json::Value as JsonValue;

use crate::db::search::predicate::{Comparison, LikePattern, Predicate, Scalar};
use crate::db::search::property::{Column, ColumnKind};
use crate::models::FilterOperator;

use super::value::{iso_epoch_of, list_of, pair_of, scalar_for_kind, text_of};
use super::CompileOutcome;

pub(super) fn compile(
    column: Column,
    operator: FilterOperator,
    value: Option<&JsonValue>,
) -> CompileOutcome {
    match comparison(column, operator, value) {
        Ok(comparison) => CompileOutcome::Matched(Predicate::column(column, comparison)),
        Err(reason) => CompileOutcome::Invalid(format!("{}: {}", column.property(), reason)),
    }
}

fn comparison(
    column: Column,
    operator: FilterOperator,
    value: Option<&JsonValue>,
) -> Result<Comparison, String> {
    let kind = column.kind();
    let scalar = |v: &JsonValue| -> Result<Scalar, String> {
        scalar_for_kind(kind, v).ok_or_else(|| format!("value {v} does not fit a {kind:?} column"))
    };
    let required = || value.ok_or_else(|| format!("{} needs a value", operator.as_str()));

    match operator {
        FilterOperator::Eq => match value {
            None => Ok(Comparison::IsNull),
            Some(v) => Ok(Comparison::Eq(scalar(v)?)),
        },
        FilterOperator::Ne => match value {
            None => Ok(Comparison::IsNotNull),
            Some(v) => Ok(Comparison::Ne(scalar(v)?)),
        },
        FilterOperator::Gt => Ok(Comparison::Gt(scalar(required()?)?)),
        FilterOperator::Gte => Ok(Comparison::Gte(scalar(required()?)?)),
        FilterOperator::Lt => Ok(Comparison::Lt(scalar(required()?)?)),
        FilterOperator::Lte => Ok(Comparison::Lte(scalar(required()?)?)),
        FilterOperator::In | FilterOperator::NotIn => {
            let items = list_of(value)
                .ok_or_else(|| format!("{} needs a non-empty list", operator.as_str()))?;
            let scalars = items.iter().map(scalar).collect::<Result<Vec<_>, _>>()?;
            Ok(if operator == FilterOperator::In {
                Comparison::In(scalars)
            } else {
                Comparison::NotIn(scalars)
            })
        }
        FilterOperator::Contains
        | FilterOperator::NotContains
        | FilterOperator::StartsWith
        | FilterOperator::EndsWith => {
            if kind != ColumnKind::Text {
                return Err(format!("{} applies to text columns only", operator.as_str()));
            }
            let needle = required()?;
            let needle = match needle {
                JsonValue::Bool(_) => None,
                other => text_of(other),
            }
            .ok_or_else(|| format!("{} needs a string", operator.as_str()))?;
            let (pattern, negated) = match operator {
                FilterOperator::Contains => (LikePattern::Contains(needle), false),
                FilterOperator::NotContains => (LikePattern::Contains(needle), true),
                FilterOperator::StartsWith => (LikePattern::StartsWith(needle), false),
                _ => (LikePattern::EndsWith(needle), false),
            };
            Ok(Comparison::Like { pattern, negated })
        }
        FilterOperator::Between => {
            let (low, high) = pair_of(value).ok_or("between needs exactly two values")?;
            Ok(Comparison::Between(scalar(low)?, scalar(high)?))
        }
        FilterOperator::IsNull => Ok(Comparison::IsNull),
        FilterOperator::IsNotNull => Ok(Comparison::IsNotNull),
        FilterOperator::DateEq
        | FilterOperator::DateGt
        | FilterOperator::DateGte
        | FilterOperator::DateLt
        | FilterOperator::DateLte
        | FilterOperator::DateBetween => date_comparison(kind, operator, value),
    }
}

fn date_comparison(
    kind: ColumnKind,
    operator: FilterOperator,
    value: Option<&JsonValue>,
) -> Result<Comparison, String> {
    if kind != ColumnKind::Timestamp {
        return Err(format!(
            "{} applies to timestamp columns only",
            operator.as_str()
        ));
    }
    let epoch = |v: &JsonValue| -> Result<Scalar, String> {
        iso_epoch_of(v)
            .map(Scalar::Int)
            .ok_or_else(|| format!("{v} is not an ISO-8601 date"))
    };

    if operator == FilterOperator::DateBetween {
        let (from, to) = pair_of(value).ok_or("date_between needs exactly two dates")?;
        return Ok(Comparison::Between(epoch(from)?, epoch(to)?));
    }

    let at = epoch(value.ok_or_else(|| format!("{} needs a date", operator.as_str()))?)?;
    Ok(match operator {
        FilterOperator::DateEq => Comparison::Eq(at),
        FilterOperator::DateGt => Comparison::Gt(at),
        FilterOperator::DateGte => Comparison::Gte(at),
        FilterOperator::DateLt => Comparison::Lt(at),
        _ => Comparison::Lte(at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matched(outcome: CompileOutcome) -> Predicate {
        match outcome {
            CompileOutcome::Matched(p) => p,
            other => panic!("expected a predicate, got {other:?}"),
        }
    }

    #[test]
    fn test_eq_null_becomes_is_null() {
        let p = matched(compile(Column::ParentId, FilterOperator::Eq, None));
        assert_eq!(p, Predicate::column(Column::ParentId, Comparison::IsNull));
        let p = matched(compile(Column::ParentId, FilterOperator::Ne, None));
        assert_eq!(p, Predicate::column(Column::ParentId, Comparison::IsNotNull));
    }

    #[test]
    fn test_date_operator_converts_to_epoch() {
        let p = matched(compile(
            Column::PublishedAt,
            FilterOperator::DateGte,
            Some(&json!("1970-01-01T00:00:01Z")),
        ));
        assert_eq!(
            p,
            Predicate::column(Column::PublishedAt, Comparison::Gte(Scalar::Int(1000)))
        );
    }

    #[test]
    fn test_between_requires_two_values() {
        let outcome = compile(
            Column::ShareCount,
            FilterOperator::Between,
            Some(&json!([1, 2, 3])),
        );
        assert!(matches!(outcome, CompileOutcome::Invalid(_)));

        let p = matched(compile(
            Column::ShareCount,
            FilterOperator::Between,
            Some(&json!([1, "5"])),
        ));
        assert_eq!(
            p,
            Predicate::column(
                Column::ShareCount,
                Comparison::Between(Scalar::Int(1), Scalar::Int(5))
            )
        );
    }

    #[test]
    fn test_type_mismatches_are_invalid() {
        for (column, operator, value) in [
            (Column::ShareCount, FilterOperator::Contains, json!("1")),
            (Column::Title, FilterOperator::DateEq, json!("2024-01-01")),
            (Column::CreatedAt, FilterOperator::DateEq, json!("soon")),
            (Column::ShareCount, FilterOperator::Eq, json!("many")),
            (Column::Title, FilterOperator::In, json!([])),
            (Column::Title, FilterOperator::Contains, json!(true)),
        ] {
            let outcome = compile(column, operator, Some(&value));
            assert!(
                matches!(outcome, CompileOutcome::Invalid(_)),
                "{column:?} {operator:?} {value}"
            );
        }
    }

    #[test]
    fn test_not_contains() {
        let p = matched(compile(
            Column::Title,
            FilterOperator::NotContains,
            Some(&json!("draft")),
        ));
        assert_eq!(
            p,
            Predicate::column(
                Column::Title,
                Comparison::Like {
                    pattern: LikePattern::Contains("draft".to_string()),
                    negated: true
                }
            )
        );
    }
}
