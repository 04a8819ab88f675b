//! Filters on sparse custom field values.
//!
//! A field has at most one value row per post. `is_null`/`is_not_null` test
//! whether the row exists; every other operator tests the row's value, read
//! through the comparator chosen by the field's declared type.

use serde_json::Value as JsonValue;

use crate::db::search::predicate::{AttributeTest, Comparison, LikePattern, Predicate, Scalar, ValueCast};
use crate::models::{CustomField, FieldType, FilterOperator};

use super::value::{epoch_of, iso_epoch_of, list_of, number_of, pair_of, text_of};
use super::CompileOutcome;

/// A value test plus whether posts must *lack* a matching row.
struct FieldMatch {
    cast: ValueCast,
    comparison: Comparison,
    absent: bool,
}

impl FieldMatch {
    fn present(cast: ValueCast, comparison: Comparison) -> Self {
        Self {
            cast,
            comparison,
            absent: false,
        }
    }

    fn absent(cast: ValueCast, comparison: Comparison) -> Self {
        Self {
            cast,
            comparison,
            absent: true,
        }
    }
}

/// Per-type comparison strategy.
trait ValueComparator {
    fn compare(
        &self,
        operator: FilterOperator,
        value: Option<&JsonValue>,
    ) -> Result<FieldMatch, String>;
}

pub(super) fn compile(
    field: &CustomField,
    operator: FilterOperator,
    value: Option<&JsonValue>,
) -> CompileOutcome {
    let exists = Predicate::Attribute {
        field_id: field.id.clone(),
        test: AttributeTest::Exists,
    };
    match operator {
        FilterOperator::IsNull => return CompileOutcome::Matched(exists.negate()),
        FilterOperator::IsNotNull => return CompileOutcome::Matched(exists),
        _ => {}
    }

    match comparator_for(field.field_type).compare(operator, value) {
        Ok(m) => {
            let predicate = Predicate::Attribute {
                field_id: field.id.clone(),
                test: AttributeTest::Value {
                    cast: m.cast,
                    comparison: m.comparison,
                },
            };
            CompileOutcome::Matched(if m.absent {
                predicate.negate()
            } else {
                predicate
            })
        }
        Err(reason) => CompileOutcome::Invalid(format!(
            "customFields.{} ({}): {}",
            field.slug,
            field.field_type.as_str(),
            reason
        )),
    }
}

fn comparator_for(field_type: FieldType) -> &'static dyn ValueComparator {
    match field_type {
        FieldType::Text | FieldType::Select => &TextComparator,
        FieldType::Number => &NumberComparator,
        FieldType::Boolean => &BooleanComparator,
        FieldType::Date => &DateComparator,
        FieldType::MultiSelect | FieldType::Json => &JsonComparator,
    }
}

fn unsupported(operator: FilterOperator) -> String {
    format!("operator {} is not supported for this field type", operator.as_str())
}

fn needs(operator: FilterOperator, what: &str) -> String {
    format!("{} needs {}", operator.as_str(), what)
}

/// Operators every field type supports, compared on the raw stored text.
fn raw_text(operator: FilterOperator, value: Option<&JsonValue>) -> Result<FieldMatch, String> {
    let text = |v: Option<&JsonValue>| {
        v.and_then(text_of)
            .map(Scalar::Text)
            .ok_or_else(|| needs(operator, "a scalar value"))
    };
    let texts = |v: Option<&JsonValue>| -> Result<Vec<Scalar>, String> {
        list_of(v)
            .ok_or_else(|| needs(operator, "a non-empty list"))?
            .iter()
            .map(|item| {
                text_of(item)
                    .map(Scalar::Text)
                    .ok_or_else(|| needs(operator, "scalar list items"))
            })
            .collect()
    };
    let like = |v: Option<&JsonValue>| {
        v.and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| needs(operator, "a string"))
    };

    match operator {
        FilterOperator::Eq => Ok(FieldMatch::present(ValueCast::Text, Comparison::Eq(text(value)?))),
        FilterOperator::Ne => Ok(FieldMatch::present(ValueCast::Text, Comparison::Ne(text(value)?))),
        FilterOperator::In => Ok(FieldMatch::present(ValueCast::Text, Comparison::In(texts(value)?))),
        FilterOperator::NotIn => Ok(FieldMatch::absent(ValueCast::Text, Comparison::In(texts(value)?))),
        FilterOperator::Contains => Ok(FieldMatch::present(
            ValueCast::Text,
            Comparison::Like {
                pattern: LikePattern::Contains(like(value)?),
                negated: false,
            },
        )),
        FilterOperator::NotContains => Ok(FieldMatch::absent(
            ValueCast::Text,
            Comparison::Like {
                pattern: LikePattern::Contains(like(value)?),
                negated: false,
            },
        )),
        _ => Err(unsupported(operator)),
    }
}

fn affixes(operator: FilterOperator, value: Option<&JsonValue>) -> Result<FieldMatch, String> {
    let needle = value
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| needs(operator, "a string"))?;
    let pattern = match operator {
        FilterOperator::StartsWith => LikePattern::StartsWith(needle),
        _ => LikePattern::EndsWith(needle),
    };
    Ok(FieldMatch::present(
        ValueCast::Text,
        Comparison::Like {
            pattern,
            negated: false,
        },
    ))
}

/// Ordering operators over a cast value, with `parse` converting operands.
fn ordered(
    cast: ValueCast,
    operator: FilterOperator,
    value: Option<&JsonValue>,
    parse: impl Fn(&JsonValue) -> Option<Scalar>,
) -> Result<FieldMatch, String> {
    let one = |v: Option<&JsonValue>| {
        v.and_then(&parse)
            .ok_or_else(|| needs(operator, "a comparable value"))
    };
    let comparison = match operator {
        FilterOperator::Gt | FilterOperator::DateGt => Comparison::Gt(one(value)?),
        FilterOperator::Gte | FilterOperator::DateGte => Comparison::Gte(one(value)?),
        FilterOperator::Lt | FilterOperator::DateLt => Comparison::Lt(one(value)?),
        FilterOperator::Lte | FilterOperator::DateLte => Comparison::Lte(one(value)?),
        FilterOperator::Eq | FilterOperator::DateEq => Comparison::Eq(one(value)?),
        FilterOperator::Ne => Comparison::Ne(one(value)?),
        FilterOperator::Between | FilterOperator::DateBetween => {
            let (low, high) = pair_of(value).ok_or_else(|| needs(operator, "exactly two values"))?;
            Comparison::Between(one(Some(low))?, one(Some(high))?)
        }
        FilterOperator::In | FilterOperator::NotIn => {
            let items = list_of(value)
                .ok_or_else(|| needs(operator, "a non-empty list"))?
                .iter()
                .map(|item| one(Some(item)))
                .collect::<Result<Vec<_>, _>>()?;
            if operator == FilterOperator::NotIn {
                return Ok(FieldMatch::absent(cast, Comparison::In(items)));
            }
            Comparison::In(items)
        }
        _ => return Err(unsupported(operator)),
    };
    Ok(FieldMatch::present(cast, comparison))
}

fn numeric(value: &JsonValue) -> Option<Scalar> {
    number_of(value).map(Scalar::Float)
}

struct TextComparator;

impl ValueComparator for TextComparator {
    fn compare(
        &self,
        operator: FilterOperator,
        value: Option<&JsonValue>,
    ) -> Result<FieldMatch, String> {
        match operator {
            FilterOperator::StartsWith | FilterOperator::EndsWith => affixes(operator, value),
            FilterOperator::Gt
            | FilterOperator::Gte
            | FilterOperator::Lt
            | FilterOperator::Lte
            | FilterOperator::Between => ordered(ValueCast::Numeric, operator, value, numeric),
            _ => raw_text(operator, value),
        }
    }
}

/// Number fields compare numerically, so `"10"`, `"10.0"` and `10` agree.
struct NumberComparator;

impl ValueComparator for NumberComparator {
    fn compare(
        &self,
        operator: FilterOperator,
        value: Option<&JsonValue>,
    ) -> Result<FieldMatch, String> {
        match operator {
            FilterOperator::Contains | FilterOperator::NotContains => raw_text(operator, value),
            FilterOperator::Eq
            | FilterOperator::Ne
            | FilterOperator::In
            | FilterOperator::NotIn
            | FilterOperator::Gt
            | FilterOperator::Gte
            | FilterOperator::Lt
            | FilterOperator::Lte
            | FilterOperator::Between => ordered(ValueCast::Numeric, operator, value, numeric),
            _ => Err(unsupported(operator)),
        }
    }
}

struct BooleanComparator;

impl ValueComparator for BooleanComparator {
    fn compare(
        &self,
        operator: FilterOperator,
        value: Option<&JsonValue>,
    ) -> Result<FieldMatch, String> {
        let flag = |v: Option<&JsonValue>| match v {
            Some(JsonValue::Bool(b)) => Some(*b),
            Some(JsonValue::String(s)) if s == "true" || s == "false" => Some(s == "true"),
            _ => None,
        };
        match operator {
            FilterOperator::Eq | FilterOperator::Ne => {
                let flag = flag(value).ok_or_else(|| needs(operator, "true or false"))?;
                let operand = Scalar::Text(flag.to_string());
                Ok(FieldMatch::present(
                    ValueCast::Text,
                    if operator == FilterOperator::Eq {
                        Comparison::Eq(operand)
                    } else {
                        Comparison::Ne(operand)
                    },
                ))
            }
            _ => raw_text(operator, value),
        }
    }
}

/// Dates are stored as ISO-8601 text and compared as epoch milliseconds.
struct DateComparator;

impl ValueComparator for DateComparator {
    fn compare(
        &self,
        operator: FilterOperator,
        value: Option<&JsonValue>,
    ) -> Result<FieldMatch, String> {
        match operator {
            op if op.is_date() => ordered(ValueCast::Epoch, operator, value, |v| {
                iso_epoch_of(v).map(Scalar::Int)
            }),
            FilterOperator::Gt
            | FilterOperator::Gte
            | FilterOperator::Lt
            | FilterOperator::Lte
            | FilterOperator::Between => ordered(ValueCast::Epoch, operator, value, |v| {
                epoch_of(v).map(Scalar::Int)
            }),
            FilterOperator::StartsWith | FilterOperator::EndsWith => affixes(operator, value),
            _ => raw_text(operator, value),
        }
    }
}

/// Multi-select and JSON values are matched on their encoded text only.
struct JsonComparator;

impl ValueComparator for JsonComparator {
    fn compare(
        &self,
        operator: FilterOperator,
        value: Option<&JsonValue>,
    ) -> Result<FieldMatch, String> {
        raw_text(operator, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(field_type: FieldType) -> CustomField {
        CustomField {
            id: "cf-1".to_string(),
            organization_id: "org".to_string(),
            slug: "f".to_string(),
            name: "F".to_string(),
            field_type,
        }
    }

    fn value_test(cast: ValueCast, comparison: Comparison) -> Predicate {
        Predicate::Attribute {
            field_id: "cf-1".to_string(),
            test: AttributeTest::Value { cast, comparison },
        }
    }

    #[test]
    fn test_null_checks_test_row_existence() {
        let exists = Predicate::Attribute {
            field_id: "cf-1".to_string(),
            test: AttributeTest::Exists,
        };
        assert_eq!(
            compile(&field(FieldType::Text), FilterOperator::IsNotNull, None),
            CompileOutcome::Matched(exists.clone())
        );
        assert_eq!(
            compile(&field(FieldType::Json), FilterOperator::IsNull, None),
            CompileOutcome::Matched(exists.negate())
        );
    }

    #[test]
    fn test_text_eq_and_not_contains() {
        assert_eq!(
            compile(&field(FieldType::Text), FilterOperator::Eq, Some(&json!("US"))),
            CompileOutcome::Matched(value_test(
                ValueCast::Text,
                Comparison::Eq(Scalar::Text("US".to_string()))
            ))
        );
        assert_eq!(
            compile(
                &field(FieldType::Text),
                FilterOperator::NotContains,
                Some(&json!("x"))
            ),
            CompileOutcome::Matched(
                value_test(
                    ValueCast::Text,
                    Comparison::Like {
                        pattern: LikePattern::Contains("x".to_string()),
                        negated: false
                    }
                )
                .negate()
            )
        );
    }

    #[test]
    fn test_number_uses_numeric_cast() {
        assert_eq!(
            compile(&field(FieldType::Number), FilterOperator::Gte, Some(&json!("10"))),
            CompileOutcome::Matched(value_test(
                ValueCast::Numeric,
                Comparison::Gte(Scalar::Float(10.0))
            ))
        );
        assert!(matches!(
            compile(&field(FieldType::Number), FilterOperator::Eq, Some(&json!("ten"))),
            CompileOutcome::Invalid(_)
        ));
        assert!(matches!(
            compile(&field(FieldType::Number), FilterOperator::StartsWith, Some(&json!("1"))),
            CompileOutcome::Invalid(_)
        ));
    }

    #[test]
    fn test_boolean_accepts_strings() {
        assert_eq!(
            compile(&field(FieldType::Boolean), FilterOperator::Eq, Some(&json!("true"))),
            CompileOutcome::Matched(value_test(
                ValueCast::Text,
                Comparison::Eq(Scalar::Text("true".to_string()))
            ))
        );
        assert!(matches!(
            compile(&field(FieldType::Boolean), FilterOperator::Eq, Some(&json!("yes"))),
            CompileOutcome::Invalid(_)
        ));
    }

    #[test]
    fn test_date_operators() {
        assert_eq!(
            compile(
                &field(FieldType::Date),
                FilterOperator::DateBetween,
                Some(&json!(["1970-01-01", "1970-01-02"]))
            ),
            CompileOutcome::Matched(value_test(
                ValueCast::Epoch,
                Comparison::Between(Scalar::Int(0), Scalar::Int(86_400_000))
            ))
        );
        assert!(matches!(
            compile(&field(FieldType::Text), FilterOperator::DateGt, Some(&json!("1970-01-01"))),
            CompileOutcome::Invalid(_)
        ));
    }

    #[test]
    fn test_json_only_supports_raw_text() {
        assert!(matches!(
            compile(&field(FieldType::MultiSelect), FilterOperator::Contains, Some(&json!("red"))),
            CompileOutcome::Matched(_)
        ));
        assert!(matches!(
            compile(&field(FieldType::Json), FilterOperator::Gt, Some(&json!(1))),
            CompileOutcome::Invalid(_)
        ));
    }
}
