//! Filter value coercion.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value as JsonValue;

use crate::db::search::predicate::Scalar;
use crate::db::search::property::ColumnKind;

/// Coerce a JSON operand to the storage class of a column.
pub(super) fn scalar_for_kind(kind: ColumnKind, value: &JsonValue) -> Option<Scalar> {
    match kind {
        ColumnKind::Text => match value {
            JsonValue::String(s) => Some(Scalar::Text(s.clone())),
            JsonValue::Number(n) => Some(Scalar::Text(n.to_string())),
            _ => None,
        },
        ColumnKind::Integer => integer_of(value).map(Scalar::Int),
        ColumnKind::Timestamp => epoch_of(value).map(Scalar::Int),
    }
}

pub(super) fn integer_of(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Epoch milliseconds from an ISO-8601 string or a plain integer.
pub(super) fn epoch_of(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::String(s) => parse_epoch_millis(s).or_else(|| s.trim().parse::<i64>().ok()),
        JsonValue::Number(_) => integer_of(value),
        _ => None,
    }
}

/// Epoch milliseconds from an ISO-8601 string only.
pub(super) fn iso_epoch_of(value: &JsonValue) -> Option<i64> {
    value.as_str().and_then(parse_epoch_millis)
}

pub(super) fn number_of(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => parse_numeric(s),
        _ => None,
    }
}

/// Text form of a scalar operand, as custom field values are stored.
pub(super) fn text_of(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-empty list operand.
pub(super) fn list_of(value: Option<&JsonValue>) -> Option<&[JsonValue]> {
    match value {
        Some(JsonValue::Array(items)) if !items.is_empty() => Some(items.as_slice()),
        _ => None,
    }
}

/// Exactly two operands, as `between` requires.
pub(super) fn pair_of(value: Option<&JsonValue>) -> Option<(&JsonValue, &JsonValue)> {
    match value {
        Some(JsonValue::Array(items)) if items.len() == 2 => Some((&items[0], &items[1])),
        _ => None,
    }
}

/// Slugs or ids given as one string or a list of strings.
pub(super) fn strings_of(value: Option<&JsonValue>) -> Option<Vec<String>> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(vec![s.clone()]),
        JsonValue::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Parse an ISO-8601 date (`YYYY-MM-DD`) or date-time. The time follows a
/// `T` or a space as `HH:MM`, `HH:MM:SS` or `HH:MM:SS.ffffff`, optionally
/// with an offset (`Z`, `+HH`, `+HHMM`, `+HH:MM`). Values without an offset
/// are UTC.
pub(crate) fn parse_epoch_millis(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let date = parse_date(s.get(..10)?)?;
    let rest = s.get(10..)?;
    if rest.is_empty() {
        return Some(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
    }

    let rest = rest.strip_prefix(['T', ' '])?;
    let (time, offset) = match rest.find(['Z', '+', '-']) {
        Some(i) => (&rest[..i], Some(&rest[i..])),
        None => (rest, None),
    };
    let time = parse_time(time)?;
    let offset_secs = match offset {
        Some(offset) => parse_offset(offset)?,
        None => 0,
    };

    let local = date.and_time(time).and_utc().timestamp_millis();
    Some(local - offset_secs * 1000)
}

/// Exactly `width` ASCII digits.
fn fixed_digits(s: &str, width: usize) -> Option<u32> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let year = fixed_digits(s.get(..4)?, 4)?;
    let month = fixed_digits(s.get(5..7)?, 2)?;
    let day = fixed_digits(s.get(8..)?, 2)?;
    if &s[4..5] != "-" || &s[7..8] != "-" || year == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let mut parts = s.splitn(3, ':');
    let hour = fixed_digits(parts.next()?, 2)?;
    let minute = fixed_digits(parts.next()?, 2)?;
    let (second, micros) = match parts.next() {
        None => (0, 0),
        Some(seconds) => match seconds.split_once('.') {
            None => (fixed_digits(seconds, 2)?, 0),
            Some((whole, fraction)) => {
                if fraction.is_empty() || fraction.len() > 6 {
                    return None;
                }
                let micros = fixed_digits(fraction, fraction.len())? * 10u32.pow(6 - fraction.len() as u32);
                (fixed_digits(whole, 2)?, micros)
            }
        },
    };
    NaiveTime::from_hms_micro_opt(hour, minute, second, micros)
}

/// Offset in seconds east of UTC. Hours are capped at 15.
fn parse_offset(s: &str) -> Option<i64> {
    if s == "Z" {
        return Some(0);
    }
    let sign = match s.get(..1)? {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let body = &s[1..];
    let (hours, minutes) = match body.len() {
        2 => (body, "00"),
        4 => (body.get(..2)?, body.get(2..)?),
        5 if body.get(2..3)? == ":" => (body.get(..2)?, body.get(3..)?),
        _ => return None,
    };
    let hours = fixed_digits(hours, 2)?;
    let minutes = fixed_digits(minutes, 2)?;
    if hours > 15 || minutes > 59 {
        return None;
    }
    Some(sign * i64::from(hours * 3600 + minutes * 60))
}

/// Parse a plain decimal number (`-12`, `3.5`, `1e3`). Anything else,
/// including `NaN`, `inf` and exponents outside the `f64` range, is not
/// numeric.
pub(crate) fn parse_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
        None => (unsigned, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (mantissa, None),
    };

    let digits = |d: &str| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || fraction.is_some_and(|f| !digits(f)) {
        return None;
    }
    if let Some(exp) = exponent {
        let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if !digits(exp) {
            return None;
        }
    }

    let parsed = s.parse::<f64>().ok()?;
    let underflow = parsed == 0.0 && mantissa.bytes().any(|b| matches!(b, b'1'..=b'9'));
    if !parsed.is_finite() || underflow {
        return None;
    }
    Some(parsed)
}
