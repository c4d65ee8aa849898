// XML Rendering
// Generic object-to-XML rendering for negotiated XML responses

use crate::domain::{format_date, RemoteValue};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use thiserror::Error;

/// Root element of generically rendered documents
pub const ROOT_ELEMENT: &str = "response";

/// Body written for a `null` result
pub const NULL_DOCUMENT: &str = "<null/>";

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Invalid XML element name: {0:?}")]
    InvalidName(String),

    #[error("XML write failed: {0}")]
    Write(String),
}

/// Render a result as an XML document
///
/// A model with its own XML rendering is emitted verbatim. Otherwise models
/// are expanded to JSON, a bare array is wrapped as `{result: [...]}` and the
/// value is rendered under `<response>` with two-space indentation. Arrays
/// become repeated elements; dates render as ISO-8601.
pub fn to_xml(data: &RemoteValue) -> Result<String, XmlError> {
    if let RemoteValue::Model(model) = data {
        if let Some(xml) = model.to_xml() {
            return Ok(xml);
        }
    }

    let data = match data.expand_models() {
        RemoteValue::Array(items) => {
            let mut envelope = BTreeMap::new();
            envelope.insert("result".to_string(), RemoteValue::Array(items));
            RemoteValue::Object(envelope)
        }
        other => other,
    };

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(write_error)?;
    write_element(&mut writer, ROOT_ELEMENT, &data)?;

    String::from_utf8(writer.into_inner()).map_err(write_error)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &RemoteValue,
) -> Result<(), XmlError> {
    validate_name(name)?;
    match value {
        RemoteValue::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        RemoteValue::Object(fields) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_error)?;
            for (key, field) in fields.iter().filter(|(_, v)| v.is_defined()) {
                write_element(writer, key, field)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_error)
        }
        RemoteValue::Model(model) => write_element(writer, name, &RemoteValue::from(model.to_json())),
        RemoteValue::Undefined | RemoteValue::Null | RemoteValue::Handle(_) => writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(write_error),
        scalar => {
            let text = match scalar {
                RemoteValue::Date(date) => format_date(date),
                RemoteValue::String(s) => s.clone(),
                other => other.to_json().to_string(),
            };
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(write_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_error)
        }
    }
}

fn validate_name(name: &str) -> Result<(), XmlError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if valid_start && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        Ok(())
    } else {
        Err(XmlError::InvalidName(name.to_string()))
    }
}

fn write_error(err: impl std::fmt::Display) -> XmlError {
    XmlError::Write(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Model;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Custom;

    impl Model for Custom {
        fn to_json(&self) -> Value {
            json!({"ignored": true})
        }

        fn to_xml(&self) -> Option<String> {
            Some("<custom/>".to_string())
        }
    }

    #[derive(Debug)]
    struct Plain;

    impl Model for Plain {
        fn to_json(&self) -> Value {
            json!({"id": 7})
        }
    }

    #[test]
    fn test_object_renders_under_root() {
        let xml = to_xml(&RemoteValue::from(json!({"name": "gear", "count": 3}))).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        assert!(xml.contains("<response>"));
        assert!(xml.contains("\n  <count>3</count>"));
        assert!(xml.contains("<name>gear</name>"));
        assert!(xml.trim_end().ends_with("</response>"));
    }

    #[test]
    fn test_array_wrapped_in_result() {
        let xml = to_xml(&RemoteValue::from(json!([1, 2, 3]))).unwrap();
        assert_eq!(xml.matches("<result>").count(), 3);
        assert!(xml.contains("<result>1</result>"));
        assert!(xml.contains("<result>3</result>"));
    }

    #[test]
    fn test_dates_render_iso() {
        let date = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("at".to_string(), RemoteValue::Date(date));

        let xml = to_xml(&RemoteValue::Object(fields)).unwrap();
        assert!(xml.contains("<at>2023-12-31T23:59:58.000Z</at>"));
    }

    #[test]
    fn test_custom_xml_used_verbatim() {
        let xml = to_xml(&RemoteValue::Model(Arc::new(Custom))).unwrap();
        assert_eq!(xml, "<custom/>");
    }

    #[test]
    fn test_model_expanded_through_json() {
        let xml = to_xml(&RemoteValue::Model(Arc::new(Plain))).unwrap();
        assert!(xml.contains("<id>7</id>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = to_xml(&RemoteValue::from(json!({"q": "a<b & c"}))).unwrap();
        assert!(xml.contains("<q>a&lt;b &amp; c</q>"));
    }

    #[test]
    fn test_invalid_element_name_fails() {
        let err = to_xml(&RemoteValue::from(json!({"1bad key": 1}))).unwrap_err();
        assert!(matches!(err, XmlError::InvalidName(name) if name == "1bad key"));
    }
}
