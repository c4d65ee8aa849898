//! Response Negotiator
//!
//! Maps an accept token (negotiated from the `Accept` header, or forced
//! through the `_format` query parameter) to a body writer and content type.
//!
//! | token | writer | content type |
//! |---|---|---|
//! | `*/*`, `application/json`, `json`, absent | JSON | `application/json` |
//! | `application/vnd.api+json` | JSON | `application/vnd.api+json` |
//! | `application/javascript`, `text/javascript` | JSONP | `application/json` |
//! | `application/xml`, `xml` | XML | `application/xml` |
//! | `text/xml` | XML | `text/xml` |
//! | anything else | 406 | `text/plain` |

use std::cmp::Ordering;

/// Reserved query parameter forcing the response format
pub const FORMAT_PARAM: &str = "_format";

/// Token standing for "nothing acceptable"
pub const UNACCEPTABLE: &str = "invalid";

/// Formats known to the binding layer, XML entries included
pub const DEFAULT_SUPPORTED_TYPES: &[&str] = &[
    "application/json",
    "application/javascript",
    "application/xml",
    "text/javascript",
    "text/xml",
    "json",
    "xml",
    "*/*",
];

/// Binding-context options
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Custom supported-format list; never filtered
    pub supported_types: Option<Vec<String>>,
    /// Keep XML formats in the default list
    pub xml: bool,
    /// Include error stacks in error bodies
    pub expose_stack: bool,
}

impl ContextOptions {
    pub fn with_xml(mut self) -> Self {
        self.xml = true;
        self
    }

    pub fn with_supported_types(mut self, types: &[&str]) -> Self {
        self.supported_types = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Effective supported-format set
    ///
    /// XML-based tokens are dropped from the default list unless XML is
    /// enabled. A caller-supplied list is used as is, even when it carries
    /// XML tokens.
    pub fn supported_types(&self) -> Vec<String> {
        match &self.supported_types {
            Some(custom) => custom.clone(),
            None => DEFAULT_SUPPORTED_TYPES
                .iter()
                .filter(|token| self.xml || !is_xml_token(token))
                .map(|token| token.to_string())
                .collect(),
        }
    }
}

fn is_xml_token(token: &str) -> bool {
    token
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("xml"))
}

/// Body writer selected for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Jsonp,
    Xml,
    NotAcceptable,
}

/// Writer plus the content type to apply when none is set yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    pub format: ResponseFormat,
    pub content_type: &'static str,
}

/// Resolve an accept token to a writer and content type
pub fn resolve(accepts: Option<&str>) -> Negotiated {
    let (format, content_type) = match accepts {
        None | Some("*/*") | Some("application/json") | Some("json") => {
            (ResponseFormat::Json, "application/json")
        }
        Some("application/vnd.api+json") => (ResponseFormat::Json, "application/vnd.api+json"),
        Some("application/javascript") | Some("text/javascript") => {
            (ResponseFormat::Jsonp, "application/json")
        }
        Some("application/xml") | Some("xml") => (ResponseFormat::Xml, "application/xml"),
        Some("text/xml") => (ResponseFormat::Xml, "text/xml"),
        Some(_) => (ResponseFormat::NotAcceptable, "text/plain"),
    };
    Negotiated {
        format,
        content_type,
    }
}

/// Pick the best supported token for an `Accept` header
///
/// Media ranges are ranked by `q` (stable on header order). Short tokens
/// (`json`, `xml`) match their `application/*` media type. The returned
/// token is the supported entry as written. Without a header the first
/// supported token wins.
pub fn negotiate(accept: Option<&str>, supported: &[String]) -> Option<String> {
    let header = match accept.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return supported.first().cloned(),
    };

    let mut ranges: Vec<(&str, f32, usize)> = header
        .split(',')
        .enumerate()
        .filter_map(|(index, part)| parse_range(part).map(|(range, q)| (range, q, index)))
        .filter(|(_, q, _)| *q > 0.0)
        .collect();
    ranges.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.2.cmp(&b.2))
    });

    ranges.iter().find_map(|(range, _, _)| {
        supported
            .iter()
            .find(|token| range_matches(range, expand(token.as_str())))
            .cloned()
    })
}

fn parse_range(part: &str) -> Option<(&str, f32)> {
    let mut pieces = part.split(';');
    let range = pieces.next()?.trim();
    if range.is_empty() {
        return None;
    }
    let q = pieces
        .filter_map(|param| param.trim().strip_prefix("q="))
        .find_map(|q| q.trim().parse::<f32>().ok())
        .unwrap_or(1.0);
    Some((range, q))
}

fn expand(token: &str) -> &str {
    match token {
        "json" => "application/json",
        "xml" => "application/xml",
        other => other,
    }
}

fn range_matches(range: &str, media: &str) -> bool {
    if range == "*/*" || range == "*" {
        return true;
    }
    let (range_type, range_sub) = range.split_once('/').unwrap_or((range, "*"));
    let (media_type, media_sub) = media.split_once('/').unwrap_or((media, ""));
    range_type.eq_ignore_ascii_case(media_type)
        && (range_sub == "*" || range_sub.eq_ignore_ascii_case(media_sub))
}
