//! SQL query builder for content searches.
//!
//! Renders a [`SearchPlan`] into one Postgres statement with numbered bind
//! parameters:
//! - tenant scope on `posts.organization_id`
//! - the predicate tree, with `EXISTS` subqueries for custom field values,
//!   taxonomy tags and relationship edges
//! - the keyset seek and `ORDER BY <sort keys>, id`
//! - `LIMIT page_size + 1`
//!
//! Each row comes back as a single `json_build_object` column named `item`.

use crate::models::SortDirection;

use super::escape::{contains_pattern, prefix_pattern, suffix_pattern};
use super::plan::{SearchPlan, Seek, SortKey};
use super::predicate::{AttributeTest, Comparison, LikePattern, Predicate, ValueCast};
use super::property::{Column, ColumnKind};

mod bind;

use bind::{push_scalar, push_text, push_text_array};

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    TextArray(Vec<String>),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Stored values matching this read as numbers; others compare as NULL.
/// Values out of `double precision` range fail `folio_try_float` and read
/// as NULL too.
const NUMERIC_PATTERN: &str = r"^\s*-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?\s*$";

/// Stored values matching this read as timestamps; others compare as NULL.
/// Impossible calendar dates fail `folio_try_epoch_millis` and read as NULL.
const ISO_DATE_PATTERN: &str = r"^\s*[0-9]{4}-[0-9]{2}-[0-9]{2}([T ]([01][0-9]|2[0-3]):[0-5][0-9](:[0-5][0-9](\.[0-9]{1,6})?)?(Z|[+-](0[0-9]|1[0-5])(:?[0-5][0-9])?)?)?\s*$";

const LIKE_ESCAPE: &str = "ESCAPE E'\\\\'";

pub struct QueryBuilder<'a> {
    plan: &'a SearchPlan,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(plan: &'a SearchPlan) -> Self {
        Self { plan }
    }

    pub fn build_sql(&self) -> (String, Vec<BindValue>) {
        let mut writer = SqlWriter::default();
        let plan = self.plan;

        let org_idx = push_text(&mut writer.bind_params, plan.organization_id.clone());
        let mut conditions = vec![format!("p.organization_id = ${}", org_idx)];

        if plan.predicate != Predicate::True {
            conditions.push(writer.predicate(&plan.predicate));
        }
        if let Some(seek) = &plan.seek {
            if let Some(clause) = writer.seek(&plan.sort, seek) {
                conditions.push(clause);
            }
        }

        let sql = format!(
            "SELECT {} AS item FROM posts p WHERE {} ORDER BY {} LIMIT {}",
            select_object(&plan.columns),
            conditions.join(" AND "),
            order_by(&plan.sort),
            plan.fetch_limit
        );

        (sql, writer.bind_params)
    }
}

fn select_object(columns: &[Column]) -> String {
    let pairs: Vec<String> = columns
        .iter()
        .map(|c| format!("'{}', p.{}", c.property(), c.sql_name()))
        .collect();
    format!("json_build_object({})", pairs.join(", "))
}

/// Expression a sort key orders and seeks by. NULLs collapse onto the key's
/// sentinel; text orders bytewise.
fn sort_expr(key: &SortKey) -> String {
    let column = key.column.sql_name();
    match key.column.kind() {
        ColumnKind::Text => format!("COALESCE(p.{}, '') COLLATE \"C\"", column),
        ColumnKind::Integer | ColumnKind::Timestamp => format!("COALESCE(p.{}, 0)", column),
    }
}

const ID_EXPR: &str = "p.id COLLATE \"C\"";

fn order_by(sort: &[SortKey]) -> String {
    let mut parts: Vec<String> = sort
        .iter()
        .map(|key| {
            let direction = match key.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} {}", sort_expr(key), direction)
        })
        .collect();
    parts.push(format!("{} ASC", ID_EXPR));
    parts.join(", ")
}

#[derive(Default)]
struct SqlWriter {
    bind_params: Vec<BindValue>,
    alias_seq: usize,
}

impl SqlWriter {
    fn alias(&mut self, prefix: &str) -> String {
        self.alias_seq += 1;
        format!("{}{}", prefix, self.alias_seq)
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::True => "1=1".to_string(),
            Predicate::False => "1=0".to_string(),
            Predicate::And(parts) => self.junction(parts, " AND "),
            Predicate::Or(parts) => self.junction(parts, " OR "),
            Predicate::Not(inner) => format!("NOT ({})", self.predicate(inner)),
            Predicate::Column { column, comparison } => {
                let expr = match column.kind() {
                    ColumnKind::Text if comparison.is_ordered() => {
                        format!("p.{} COLLATE \"C\"", column.sql_name())
                    }
                    _ => format!("p.{}", column.sql_name()),
                };
                self.comparison(&expr, comparison)
            }
            Predicate::Attribute { field_id, test } => {
                let v = self.alias("v");
                let field_idx = push_text(&mut self.bind_params, field_id.clone());
                let mut sql = format!(
                    "EXISTS (SELECT 1 FROM post_field_values {v} WHERE {v}.post_id = p.id AND {v}.custom_field_id = ${field_idx}"
                );
                if let AttributeTest::Value { cast, comparison } = test {
                    let expr = cast_expr(&v, *cast);
                    sql.push_str(" AND ");
                    sql.push_str(&self.comparison(&expr, comparison));
                }
                sql.push(')');
                sql
            }
            Predicate::Tagged { term_ids } => {
                let t = self.alias("t");
                let idx = push_text_array(&mut self.bind_params, term_ids.clone());
                format!(
                    "EXISTS (SELECT 1 FROM post_taxonomies {t} WHERE {t}.post_id = p.id AND {t}.taxonomy_term_id = ANY(${idx}))"
                )
            }
            Predicate::Related {
                relationship_type,
                target_ids,
            } => {
                let r = self.alias("r");
                let type_idx = push_text(&mut self.bind_params, relationship_type.clone());
                let ids_idx = push_text_array(&mut self.bind_params, target_ids.clone());
                format!(
                    "EXISTS (SELECT 1 FROM post_relationships {r} WHERE {r}.from_post_id = p.id AND {r}.relationship_type = ${type_idx} AND {r}.to_post_id = ANY(${ids_idx}))"
                )
            }
            Predicate::TextSearch { columns, needle } => {
                let idx = push_text(&mut self.bind_params, contains_pattern(needle));
                let parts: Vec<String> = columns
                    .iter()
                    .map(|c| format!("p.{} ILIKE ${} {}", c.sql_name(), idx, LIKE_ESCAPE))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }

    fn junction(&mut self, parts: &[Predicate], separator: &str) -> String {
        let rendered: Vec<String> = parts.iter().map(|p| self.predicate(p)).collect();
        format!("({})", rendered.join(separator))
    }

    fn comparison(&mut self, expr: &str, comparison: &Comparison) -> String {
        match comparison {
            Comparison::Eq(v) => format!("{} = ${}", expr, push_scalar(&mut self.bind_params, v)),
            Comparison::Ne(v) => format!("{} <> ${}", expr, push_scalar(&mut self.bind_params, v)),
            Comparison::Gt(v) => format!("{} > ${}", expr, push_scalar(&mut self.bind_params, v)),
            Comparison::Gte(v) => format!("{} >= ${}", expr, push_scalar(&mut self.bind_params, v)),
            Comparison::Lt(v) => format!("{} < ${}", expr, push_scalar(&mut self.bind_params, v)),
            Comparison::Lte(v) => format!("{} <= ${}", expr, push_scalar(&mut self.bind_params, v)),
            Comparison::In(values) | Comparison::NotIn(values) => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("${}", push_scalar(&mut self.bind_params, v)))
                    .collect();
                let op = if matches!(comparison, Comparison::In(_)) {
                    "IN"
                } else {
                    "NOT IN"
                };
                format!("{} {} ({})", expr, op, placeholders.join(", "))
            }
            Comparison::Between(low, high) => {
                let low_idx = push_scalar(&mut self.bind_params, low);
                let high_idx = push_scalar(&mut self.bind_params, high);
                format!("{} BETWEEN ${} AND ${}", expr, low_idx, high_idx)
            }
            Comparison::Like { pattern, negated } => {
                let raw = match pattern {
                    LikePattern::Contains(s) => contains_pattern(s),
                    LikePattern::StartsWith(s) => prefix_pattern(s),
                    LikePattern::EndsWith(s) => suffix_pattern(s),
                };
                let idx = push_text(&mut self.bind_params, raw);
                let op = if *negated { "NOT ILIKE" } else { "ILIKE" };
                format!("{} {} ${} {}", expr, op, idx, LIKE_ESCAPE)
            }
            Comparison::IsNull => format!("{} IS NULL", expr),
            Comparison::IsNotNull => format!("{} IS NOT NULL", expr),
        }
    }

    /// `(k1 <op> $v1) OR (k1 = $v1 AND k2 <op> $v2) OR ... OR (all equal AND id > $last)`
    fn seek(&mut self, sort: &[SortKey], seek: &Seek) -> Option<String> {
        if seek.values.len() != sort.len() {
            return None;
        }

        let keys: Vec<(String, usize, SortDirection)> = sort
            .iter()
            .zip(&seek.values)
            .map(|(key, value)| {
                (
                    sort_expr(key),
                    push_scalar(&mut self.bind_params, value),
                    key.direction,
                )
            })
            .collect();
        let id_idx = push_text(&mut self.bind_params, seek.last_id.clone());

        let mut branches = Vec::with_capacity(keys.len() + 1);
        for i in 0..=keys.len() {
            let mut terms: Vec<String> = keys[..i]
                .iter()
                .map(|(expr, idx, _)| format!("{} = ${}", expr, idx))
                .collect();
            match keys.get(i) {
                Some((expr, idx, direction)) => {
                    let op = match direction {
                        SortDirection::Desc => "<",
                        SortDirection::Asc => ">",
                    };
                    terms.push(format!("{} {} ${}", expr, op, idx));
                }
                None => terms.push(format!("{} > ${}", ID_EXPR, id_idx)),
            }
            branches.push(format!("({})", terms.join(" AND ")));
        }

        Some(format!("({})", branches.join(" OR ")))
    }
}

fn cast_expr(alias: &str, cast: ValueCast) -> String {
    match cast {
        ValueCast::Text => format!("{alias}.value"),
        ValueCast::Numeric => format!(
            "(CASE WHEN {alias}.value ~ '{NUMERIC_PATTERN}' THEN folio_try_float({alias}.value) END)"
        ),
        ValueCast::Epoch => format!(
            "(CASE WHEN {alias}.value ~ '{ISO_DATE_PATTERN}' THEN folio_try_epoch_millis({alias}.value) END)"
        ),
    }
}
