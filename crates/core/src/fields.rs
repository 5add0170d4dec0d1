//! Field-scoped error messages.
//!
//! Both client-side validation and server-side rejections end up as a
//! [`FieldErrors`] map so callers can highlight the offending input the same
//! way regardless of where the problem was detected.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mapping from field path to a human-readable message.
///
/// Server paths look like `data/email`; client paths are bare field names.
/// [`FieldErrors::get`] resolves either form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Insert only when a check produced a message.
    pub fn insert_opt(&mut self, field: &str, message: Option<String>) {
        if let Some(message) = message {
            self.insert(field, message);
        }
    }

    /// Message for a field, matching either the exact path or its last
    /// segment (`email` finds `data/email`).
    pub fn get(&self, field: &str) -> Option<&str> {
        if let Some(message) = self.0.get(field) {
            return Some(message.as_str());
        }
        self.0
            .iter()
            .find(|(path, _)| path.rsplit('/').next() == Some(field))
            .map(|(_, message)| message.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build from the `fields` object of a server error body.
    ///
    /// Values are either plain strings or objects such as
    /// `{"code": "REQUIRED", "message": "..."}`; the most descriptive string
    /// found is kept.
    pub fn from_server(fields: &Value) -> Self {
        let mut errors = Self::new();
        if let Value::Object(map) = fields {
            for (path, detail) in map {
                errors.insert(path.clone(), describe(detail));
            }
        }
        errors
    }
}

fn describe(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        Value::Object(obj) => ["message", "code"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| obj.values().find_map(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| detail.to_string()),
        other => other.to_string(),
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

impl FromIterator<(String, String)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
