//! Opaque keyset pagination token.
//!
//! The token is URL-safe base64 over a small JSON document. Clients treat it as
//! a black box; the server treats any token it cannot use (malformed, other
//! schema version, other entity type, other sort) as absent.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::EntityType;
use crate::{Error, Result};

use super::plan::{Seek, SortKey};
use super::predicate::Scalar;
use super::property::{Column, ColumnKind};

pub const CURSOR_VERSION: u32 = 1;

/// Value of one secondary sort key at the last row of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorKey {
    pub property: String,
    pub value: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    #[serde(rename = "v")]
    pub version: u32,
    pub entity_type: EntityType,
    pub last_id: String,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub sort_value: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_property: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<CursorKey>,
}

/// Keeps an explicit `null` as `Some(Null)` so that decoding restores exactly
/// what was encoded.
fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

impl Cursor {
    pub fn encode(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| Error::Internal(format!("Failed to encode cursor: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decode a token, returning `None` for anything unusable.
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim().as_bytes()).ok()?;
        let cursor: Cursor = serde_json::from_slice(&bytes).ok()?;
        if cursor.version != CURSOR_VERSION {
            return None;
        }
        Some(cursor)
    }

    /// Mint a cursor positioned at `row`, which must carry every sort column.
    pub fn from_row(
        entity_type: EntityType,
        sort: &[SortKey],
        row: &Map<String, JsonValue>,
    ) -> Option<Self> {
        let last_id = row.get(Column::Id.property())?.as_str()?.to_string();
        let (primary, secondary) = sort.split_first()?;

        Some(Self {
            version: CURSOR_VERSION,
            entity_type,
            last_id,
            sort_value: Some(key_value(primary, row)),
            sort_property: Some(primary.column.property().to_string()),
            then: secondary
                .iter()
                .map(|key| CursorKey {
                    property: key.column.property().to_string(),
                    value: key_value(key, row),
                })
                .collect(),
        })
    }

    /// Turn the cursor into a seek position for `sort`, or `None` when it was
    /// minted for a different entity type or sort.
    pub fn seek_for(&self, entity_type: EntityType, sort: &[SortKey]) -> Option<Seek> {
        if self.entity_type != entity_type {
            return None;
        }
        let (primary, secondary) = sort.split_first()?;
        if self.sort_property.as_deref() != Some(primary.column.property())
            || self.then.len() != secondary.len()
        {
            return None;
        }

        let mut values = Vec::with_capacity(sort.len());
        values.push(scalar_for(primary, self.sort_value.as_ref()?)?);
        for (key, mark) in secondary.iter().zip(&self.then) {
            if mark.property != key.column.property() {
                return None;
            }
            values.push(scalar_for(key, &mark.value)?);
        }

        Some(Seek {
            values,
            last_id: self.last_id.clone(),
        })
    }
}

fn key_value(key: &SortKey, row: &Map<String, JsonValue>) -> JsonValue {
    match row.get(key.column.property()) {
        Some(value) if !value.is_null() => value.clone(),
        _ => key.sentinel().to_json(),
    }
}

fn scalar_for(key: &SortKey, value: &JsonValue) -> Option<Scalar> {
    match key.column.kind() {
        ColumnKind::Text => value.as_str().map(|s| Scalar::Text(s.to_string())),
        ColumnKind::Integer | ColumnKind::Timestamp => value.as_i64().map(Scalar::Int),
    }
}
