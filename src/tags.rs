//! Tag mapping codec
//!
//! Every mudata table carries an open-ended set of extra columns stored as a
//! JSON object in its `tags` field. Extra columns have no meaning for missing
//! values, so a key with an empty or null value is equivalent to an absent key
//! and the canonical text form drops it.

use crate::error::{MudataError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key/value metadata attached to every entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode tag text into a mapping
    ///
    /// Blank text is the empty mapping. Anything else must be a JSON object;
    /// string values are kept, null values dropped, numbers and booleans kept
    /// as their JSON text. Nested arrays or objects are rejected.
    pub fn decode(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let value: Value =
            serde_json::from_str(text).map_err(|e| MudataError::InvalidTagSyntax {
                reason: format!("'{}' is not valid JSON ({})", text, e),
            })?;

        match value {
            Value::Object(object) => Self::from_object(object),
            other => Err(MudataError::InvalidTagSyntax {
                reason: format!("expected a JSON object, found {}", value_type(&other)),
            }),
        }
    }

    /// Build a mapping from an already-parsed JSON value
    ///
    /// Accepts tag text (a JSON string holding an object), an object, or null.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::String(text) => Self::decode(&text),
            Value::Object(object) => Self::from_object(object),
            other => Err(MudataError::UnsupportedTagValueType {
                found: value_type(&other).to_string(),
            }),
        }
    }

    fn from_object(object: serde_json::Map<String, Value>) -> Result<Self> {
        let mut tags = BTreeMap::new();
        for (key, value) in object {
            match value {
                Value::Null => {}
                Value::String(s) => {
                    if !s.is_empty() {
                        tags.insert(key, s);
                    }
                }
                Value::Number(n) => {
                    tags.insert(key, n.to_string());
                }
                Value::Bool(b) => {
                    tags.insert(key, b.to_string());
                }
                other => {
                    return Err(MudataError::UnsupportedTagValueType {
                        found: format!("{} for key '{}'", value_type(&other), key),
                    });
                }
            }
        }
        Ok(Self(tags))
    }

    /// Canonical JSON object text with empty-valued keys omitted
    pub fn encode(&self) -> String {
        let canonical: BTreeMap<&str, &str> = self
            .0
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        // a map of strings always serialises
        serde_json::to_string(&canonical).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set or clear one tag
    ///
    /// A null or empty value removes an existing key; any other non-null value
    /// is stored. A null value for an absent key changes nothing.
    pub fn set_tag(&mut self, key: &str, value: Option<&str>) {
        match value {
            None | Some("") if self.0.contains_key(key) => {
                self.0.remove(key);
            }
            Some(v) => {
                self.0.insert(key.to_string(), v.to_string());
            }
            None => {}
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for Tags {
    type Err = MudataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(_, v)| !v.is_empty())
                .collect(),
        )
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
