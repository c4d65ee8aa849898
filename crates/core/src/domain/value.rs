// Remote Value Model
// Dynamic values flowing through argument mappings and results

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Argument mapping: arg name -> value (every declared arg present, maybe `Undefined`)
pub type ArgMap = BTreeMap<String, RemoteValue>;

/// Whole-object handles an argument may reference instead of carrying data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    Request,
    Response,
    Context,
}

/// A result object that knows how to render itself (e.g. a persisted model)
pub trait Model: Send + Sync + fmt::Debug {
    /// JSON rendering, also used as the input of generic XML rendering
    fn to_json(&self) -> Value;

    /// Custom XML rendering, emitted verbatim when present
    fn to_xml(&self) -> Option<String> {
        None
    }
}

/// Dynamic value with an explicit "undefined" state
#[derive(Debug, Clone, Default)]
pub enum RemoteValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<RemoteValue>),
    Object(BTreeMap<String, RemoteValue>),
    Model(Arc<dyn Model>),
    Handle(HandleKind),
}

/// ISO-8601 with millisecond precision and `Z` suffix
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl RemoteValue {
    pub fn object() -> Self {
        RemoteValue::Object(BTreeMap::new())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, RemoteValue::Undefined)
    }

    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RemoteValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RemoteValue::Number(n) => n.as_i64(),
            RemoteValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, RemoteValue>> {
        match self {
            RemoteValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&RemoteValue> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// JSON rendering. `Undefined` members are dropped from objects.
    pub fn to_json(&self) -> Value {
        match self {
            RemoteValue::Undefined | RemoteValue::Null | RemoteValue::Handle(_) => Value::Null,
            RemoteValue::Bool(b) => Value::Bool(*b),
            RemoteValue::Number(n) => Value::Number(n.clone()),
            RemoteValue::String(s) => Value::String(s.clone()),
            RemoteValue::Date(d) => Value::String(format_date(d)),
            RemoteValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            RemoteValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .filter(|(_, v)| v.is_defined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            RemoteValue::Model(model) => model.to_json(),
        }
    }

    /// Plain-text rendering used for header values
    pub fn to_text(&self) -> String {
        match self {
            RemoteValue::String(s) => s.clone(),
            RemoteValue::Date(d) => format_date(d),
            other => other.to_json().to_string(),
        }
    }

    /// Replace models by their JSON rendering, at the top level and through arrays
    pub fn expand_models(&self) -> RemoteValue {
        match self {
            RemoteValue::Model(model) => RemoteValue::from(model.to_json()),
            RemoteValue::Array(items) => {
                RemoteValue::Array(items.iter().map(Self::expand_models).collect())
            }
            other => other.clone(),
        }
    }
}

impl PartialEq for RemoteValue {
    fn eq(&self, other: &Self) -> bool {
        use RemoteValue::*;
        match (self, other) {
            (Undefined, Undefined) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Model(a), Model(b)) => Arc::ptr_eq(a, b),
            (Handle(a), Handle(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for RemoteValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<Value> for RemoteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RemoteValue::Null,
            Value::Bool(b) => RemoteValue::Bool(b),
            Value::Number(n) => RemoteValue::Number(n),
            Value::String(s) => RemoteValue::String(s),
            Value::Array(items) => RemoteValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(fields) => {
                RemoteValue::Object(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&Value> for RemoteValue {
    fn from(value: &Value) -> Self {
        RemoteValue::from(value.clone())
    }
}

impl From<&str> for RemoteValue {
    fn from(s: &str) -> Self {
        RemoteValue::String(s.to_string())
    }
}

impl From<String> for RemoteValue {
    fn from(s: String) -> Self {
        RemoteValue::String(s)
    }
}

impl From<bool> for RemoteValue {
    fn from(b: bool) -> Self {
        RemoteValue::Bool(b)
    }
}

impl From<i64> for RemoteValue {
    fn from(n: i64) -> Self {
        RemoteValue::Number(n.into())
    }
}

impl From<DateTime<Utc>> for RemoteValue {
    fn from(date: DateTime<Utc>) -> Self {
        RemoteValue::Date(date)
    }
}

impl<T: Into<RemoteValue>> From<Option<T>> for RemoteValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Debug)]
    struct Widget;

    impl Model for Widget {
        fn to_json(&self) -> Value {
            json!({"kind": "widget"})
        }
    }

    #[test]
    fn test_json_drops_undefined_members() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), RemoteValue::from(1i64));
        fields.insert("b".to_string(), RemoteValue::Undefined);
        fields.insert("c".to_string(), RemoteValue::Null);

        assert_eq!(RemoteValue::Object(fields).to_json(), json!({"a": 1, "c": null}));
    }

    #[test]
    fn test_date_renders_iso_millis() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_date(&date), "2024-01-02T03:04:05.000Z");
        assert_eq!(RemoteValue::from(date).to_json(), json!("2024-01-02T03:04:05.000Z"));
    }

    #[test]
    fn test_expand_models_through_arrays() {
        let value = RemoteValue::Array(vec![RemoteValue::Model(Arc::new(Widget)), 2i64.into()]);
        assert_eq!(
            value.expand_models(),
            RemoteValue::from(json!([{"kind": "widget"}, 2]))
        );
    }

    #[test]
    fn test_json_conversion_preserves_structure() {
        let raw = json!({"name": "x", "tags": ["a", "b"], "n": 1.5, "ok": true});
        assert_eq!(RemoteValue::from(raw.clone()).to_json(), raw);
    }
}
