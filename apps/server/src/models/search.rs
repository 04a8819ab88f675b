//! Search request and response shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::Validate;

use crate::{Error, Result};

/// Entity family a search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Posts,
    Media,
    Users,
    Taxonomies,
    All,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Media => "media",
            Self::Users => "users",
            Self::Taxonomies => "taxonomies",
            Self::All => "all",
        }
    }

    /// `all` only ever searched content items.
    pub fn searches_posts(&self) -> bool {
        matches!(self, Self::Posts | Self::All)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Between,
    IsNull,
    IsNotNull,
    DateEq,
    DateGt,
    DateGte,
    DateLt,
    DateLte,
    DateBetween,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Between => "between",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::DateEq => "date_eq",
            Self::DateGt => "date_gt",
            Self::DateGte => "date_gte",
            Self::DateLt => "date_lt",
            Self::DateLte => "date_lte",
            Self::DateBetween => "date_between",
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            Self::DateEq
                | Self::DateGt
                | Self::DateGte
                | Self::DateLt
                | Self::DateLte
                | Self::DateBetween
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupOperator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// One filter leaf: `{property, operator, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Filter {
    #[validate(length(min = 1, message = "property must not be empty"))]
    pub property: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Option<JsonValue>,
}

impl Filter {
    pub fn new(property: impl Into<String>, operator: FilterOperator, value: JsonValue) -> Self {
        Self {
            property: property.into(),
            operator,
            value: if value.is_null() { None } else { Some(value) },
        }
    }

    /// Values are scalars or flat lists of strings and numbers.
    fn check_value_shape(&self) -> std::result::Result<(), String> {
        match &self.value {
            None
            | Some(JsonValue::String(_))
            | Some(JsonValue::Number(_))
            | Some(JsonValue::Bool(_)) => Ok(()),
            Some(JsonValue::Array(items)) => {
                if items
                    .iter()
                    .all(|item| item.is_string() || item.is_number())
                {
                    Ok(())
                } else {
                    Err(format!(
                        "filter '{}' list values must contain only strings or numbers",
                        self.property
                    ))
                }
            }
            Some(_) => Err(format!(
                "filter '{}' value must be a string, number, boolean, list or null",
                self.property
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FilterGroup {
    #[serde(default)]
    pub operator: GroupOperator,
    #[validate(length(min = 1, message = "a filter group needs at least one filter"), nested)]
    pub filters: Vec<Filter>,
}

impl FilterGroup {
    pub fn all(filters: Vec<Filter>) -> Self {
        Self {
            operator: GroupOperator::And,
            filters,
        }
    }

    pub fn any(filters: Vec<Filter>) -> Self {
        Self {
            operator: GroupOperator::Or,
            filters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SortSpec {
    #[validate(length(min = 1, message = "sort property must not be empty"))]
    pub property: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }
}

/// Declarative search request.
///
/// `limit` is clamped by the orchestrator, never rejected. `properties` left
/// unset attaches the default relations; an empty list selects every column
/// and no relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub entity_type: EntityType,
    #[serde(default)]
    #[validate(nested)]
    pub filter_groups: Vec<FilterGroup>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub sorts: Vec<SortSpec>,
    #[serde(default)]
    pub properties: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default, alias = "cursor")]
    pub after: Option<String>,
}

impl SearchRequest {
    /// Reject malformed request shapes before any compilation happens.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::Validation(e.to_string()))?;

        for filter in self.filter_groups.iter().flat_map(|g| g.filters.iter()) {
            filter.check_value_shape().map_err(Error::Validation)?;
        }

        if let Some(properties) = &self.properties {
            if properties.iter().any(|p| p.trim().is_empty()) {
                return Err(Error::Validation(
                    "properties must not contain empty names".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Operator/value pair not applicable to the property; the filter was dropped.
    Invalid,
    /// A referenced attribute, category, term or target does not exist.
    Unresolved,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchWarning {
    pub property: String,
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub data: Vec<Map<String, JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SearchWarning>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}
