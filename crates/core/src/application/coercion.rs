// Coercion Engine
// Lenient conversion of values whose transport lost type information
// (query strings, headers, form fields)

use crate::domain::{RemoteValue, ValueType};
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

/// Coerce a raw value to its declared type
///
/// Missing values pass through as `Undefined`. Values that cannot be
/// converted are passed through unchanged, except structured (`object` /
/// `array`) strings that fail to parse as JSON.
pub fn coerce(raw: RemoteValue, declared: ValueType) -> Result<RemoteValue, serde_json::Error> {
    let text = match raw {
        RemoteValue::String(text) => text,
        RemoteValue::Number(n) if declared == ValueType::Date => {
            return Ok(n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(RemoteValue::Date)
                .unwrap_or(RemoteValue::Number(n)));
        }
        other => return Ok(other),
    };

    let coerced = match declared {
        ValueType::Boolean => match text.as_str() {
            "true" => RemoteValue::Bool(true),
            "false" => RemoteValue::Bool(false),
            _ => RemoteValue::String(text),
        },
        ValueType::Number => match parse_number(&text) {
            Some(n) => RemoteValue::Number(n),
            None => RemoteValue::String(text),
        },
        ValueType::Date => match parse_date(&text) {
            Some(date) => RemoteValue::Date(date),
            None => RemoteValue::String(text),
        },
        ValueType::Object => RemoteValue::from(serde_json::from_str::<Value>(&text)?),
        ValueType::Array if text.trim_start().starts_with('[') => {
            RemoteValue::from(serde_json::from_str::<Value>(&text)?)
        }
        _ => RemoteValue::String(text),
    };
    Ok(coerced)
}

fn parse_number(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(int.into());
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}
