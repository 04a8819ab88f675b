//! Backend-neutral predicate IR.
//!
//! The condition compiler produces [`Predicate`] trees; each `ContentStore`
//! backend renders or evaluates them. Comparisons against a missing value are
//! unknown (SQL three-valued logic), so `ne` and `not_contains` never match
//! rows where the column is NULL.

use serde_json::Value as JsonValue;
use std::cmp::Ordering;

use super::property::Column;

/// A typed comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Text(s) => JsonValue::String(s.clone()),
            Scalar::Int(i) => JsonValue::from(*i),
            Scalar::Float(f) => JsonValue::from(*f),
            Scalar::Bool(b) => JsonValue::Bool(*b),
        }
    }

    /// Ordering between two operands of compatible kinds. Text compares by
    /// bytes, matching the `"C"` collation used for keyset ordering.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
            (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b),
            (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LikePattern {
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

impl LikePattern {
    pub fn needle(&self) -> &str {
        match self {
            LikePattern::Contains(s) | LikePattern::StartsWith(s) | LikePattern::EndsWith(s) => s,
        }
    }

    /// Case-insensitive match, the in-process equivalent of `ILIKE`.
    pub fn matches(&self, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        let needle = self.needle().to_lowercase();
        match self {
            LikePattern::Contains(_) => haystack.contains(&needle),
            LikePattern::StartsWith(_) => haystack.starts_with(&needle),
            LikePattern::EndsWith(_) => haystack.ends_with(&needle),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Eq(Scalar),
    Ne(Scalar),
    Gt(Scalar),
    Gte(Scalar),
    Lt(Scalar),
    Lte(Scalar),
    In(Vec<Scalar>),
    NotIn(Vec<Scalar>),
    /// Inclusive on both ends.
    Between(Scalar, Scalar),
    Like {
        pattern: LikePattern,
        negated: bool,
    },
    IsNull,
    IsNotNull,
}

impl Comparison {
    /// Range comparisons, whose result depends on text collation.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Comparison::Gt(_)
                | Comparison::Gte(_)
                | Comparison::Lt(_)
                | Comparison::Lte(_)
                | Comparison::Between(..)
        )
    }
}

/// How a stored custom field value is read before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCast {
    /// Raw stored text.
    Text,
    /// Parsed as a double; unparsable values compare as NULL.
    Numeric,
    /// ISO-8601 text converted to epoch milliseconds; unparsable values compare as NULL.
    Epoch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeTest {
    /// A value row exists for the field.
    Exists,
    /// A value row exists and its value satisfies the comparison.
    Value {
        cast: ValueCast,
        comparison: Comparison,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Column {
        column: Column,
        comparison: Comparison,
    },
    Attribute {
        field_id: String,
        test: AttributeTest,
    },
    /// Tagged with any of the terms.
    Tagged {
        term_ids: Vec<String>,
    },
    /// Has an outgoing edge of the type to any of the targets.
    Related {
        relationship_type: String,
        target_ids: Vec<String>,
    },
    /// Case-insensitive substring match on any of the columns.
    TextSearch {
        columns: Vec<Column>,
        needle: String,
    },
}

impl Predicate {
    pub fn column(column: Column, comparison: Comparison) -> Self {
        Predicate::Column { column, comparison }
    }

    /// Conjunction with constant folding.
    pub fn and(parts: Vec<Predicate>) -> Self {
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::True,
            1 => out.remove(0),
            _ => Predicate::And(out),
        }
    }

    /// Disjunction with constant folding.
    pub fn or(parts: Vec<Predicate>) -> Self {
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::False,
            1 => out.remove(0),
            _ => Predicate::Or(out),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}
