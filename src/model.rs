//! Shapes of the Sentry API responses this tool reads.
//!
//! The API does not promise that any field is present or well typed, so every
//! field here is optional and decoded leniently: a missing key, a `null`, or a
//! value of the wrong JSON type all become `None` instead of failing the whole
//! response. Renderers pick placeholders through [`or`].

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

/// Value of an optional text field, or `default` when it is absent.
pub fn or<'a>(field: &'a Option<String>, default: &'a str) -> &'a str {
    field.as_deref().unwrap_or(default)
}

/// Render an arbitrary JSON value for display: strings bare, everything else as JSON text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

mod lenient {
    use super::*;

    /// Strings, numbers and booleans all decode to their text; anything else is `None`.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
    }

    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }

    pub fn map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    }
}

/// One row of `GET /projects/{org}/{project}/issues/`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct IssueSummary {
    #[serde(rename = "shortId", default, deserialize_with = "lenient::text")]
    pub short_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub count: Option<String>,
    #[serde(rename = "userCount", default, deserialize_with = "lenient::text")]
    pub user_count: Option<String>,
    #[serde(rename = "lastSeen", default, deserialize_with = "lenient::text")]
    pub last_seen: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub culprit: Option<String>,
}

/// `GET /issues/{id}/events/latest/`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(rename = "eventID", default, deserialize_with = "lenient::text")]
    pub event_id: Option<String>,
    #[serde(rename = "dateCreated", default, deserialize_with = "lenient::text")]
    pub date_created: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub user: Option<User>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub tags: Vec<Tag>,
    #[serde(default, deserialize_with = "lenient::map")]
    pub contexts: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub entries: Vec<Entry>,
}

impl Event {
    pub fn exceptions(&self) -> impl Iterator<Item = &ExceptionValue> {
        self.entries.iter().flat_map(|entry| match entry {
            Entry::Exception(data) => data.values.as_slice(),
            _ => &[][..],
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "lenient::text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
}

impl User {
    /// Email, then id, then "Anonymous". Empty strings do not count.
    pub fn label(&self) -> &str {
        [&self.email, &self.id]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|value| !value.is_empty())
            .unwrap_or("Anonymous")
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Tag {
    #[serde(default, deserialize_with = "lenient::text")]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// A typed section of an event, keyed by its `type` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Exception(ExceptionData),
    Breadcrumbs(BreadcrumbData),
    Request(RequestData),
    Other(Value),
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = raw.get("data").cloned().unwrap_or(Value::Null);

        let decoded = match kind.as_str() {
            "exception" => serde_json::from_value(data).map(Entry::Exception),
            "breadcrumbs" => serde_json::from_value(data).map(Entry::Breadcrumbs),
            "request" => serde_json::from_value(data).map(Entry::Request),
            _ => return Ok(Entry::Other(raw)),
        };

        Ok(decoded.unwrap_or_else(|e| {
            warn!(entry_type = %kind, error = %e, "unreadable entry payload, skipping");
            Entry::Other(raw)
        }))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ExceptionData {
    #[serde(default, deserialize_with = "lenient::list")]
    pub values: Vec<ExceptionValue>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ExceptionValue {
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub stacktrace: Option<Stacktrace>,
}

impl ExceptionValue {
    /// Frames as received, outermost call first.
    pub fn frames(&self) -> &[Frame] {
        self.stacktrace
            .as_ref()
            .map(|st| st.frames.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Stacktrace {
    #[serde(default, deserialize_with = "lenient::list")]
    pub frames: Vec<Frame>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Frame {
    #[serde(default, deserialize_with = "lenient::text")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub lineno: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub function: Option<String>,
    #[serde(rename = "inApp", default, deserialize_with = "lenient::flag")]
    pub in_app: bool,
    #[serde(default, deserialize_with = "lenient::text")]
    pub context_line: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct BreadcrumbData {
    #[serde(default, deserialize_with = "lenient::list")]
    pub values: Vec<Breadcrumb>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Breadcrumb {
    #[serde(default, deserialize_with = "lenient::text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Value,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct RequestData {
    #[serde(default, deserialize_with = "lenient::text")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: Option<String>,
}
