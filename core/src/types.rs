//! Mautic resources and the request payloads the bridge sends.
//!
//! # Design
//! Mautic returns IDs as numbers in some payloads and strings in others, and
//! the feed configuration stores them as strings; `ResourceId` absorbs the
//! difference. Segment lists come back as an object keyed by ID rather than
//! an array, so `SegmentList` accepts both shapes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier of a Mautic resource (segment, contact).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for ResourceId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ResourceId::from(n),
            Raw::Text(s) => ResourceId(s),
        })
    }
}

impl ResourceId {
    /// Reads an ID out of an arbitrary JSON value.
    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }
}

/// A Mautic segment (contact list).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub alias: String,
}

/// Response of `GET segments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SegmentList {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "segments_from_seq_or_map")]
    pub lists: Vec<Segment>,
}

fn segments_from_seq_or_map<'de, D>(deserializer: D) -> Result<Vec<Segment>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lists {
        Seq(Vec<Segment>),
        Map(BTreeMap<String, Segment>),
        Empty(()),
    }

    Ok(match Lists::deserialize(deserializer)? {
        Lists::Seq(lists) => lists,
        Lists::Map(lists) => {
            let mut lists: Vec<Segment> = lists.into_values().collect();
            lists.sort_by_key(|s| numeric_order(&s.id));
            lists
        }
        Lists::Empty(_) => Vec::new(),
    })
}

fn numeric_order(id: &ResourceId) -> (u64, String) {
    (id.as_str().parse().unwrap_or(u64::MAX), id.as_str().to_string())
}

/// Response of `GET segments/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SegmentEnvelope {
    pub list: Segment,
}

/// A Mautic-side contact attribute that can be mapped to a form field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomFieldDefinition {
    pub id: ResourceId,
    pub name: String,
}

/// Response of `GET /marketing/field_definitions`. Null entries and entries
/// without an ID are dropped rather than failing the whole list.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct CustomFieldList {
    #[serde(default)]
    custom_fields: Option<Vec<Option<CustomFieldDefinition>>>,
}

impl CustomFieldList {
    pub(crate) fn into_definitions(self) -> Vec<CustomFieldDefinition> {
        self.custom_fields
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter(|def| !def.id.is_blank())
            .collect()
    }
}

/// Contact attributes sent to `contacts/new`, keyed by Mautic field alias or
/// custom field ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Contact(BTreeMap<String, String>);

impl Contact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Contact {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Decoded body of a successful `contacts/new` call, kept as Mautic sent it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CreatedContact(Value);

impl CreatedContact {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    /// The new contact's ID: `contact.id`, or a top-level `id`.
    pub fn id(&self) -> Option<ResourceId> {
        self.0
            .pointer("/contact/id")
            .and_then(ResourceId::from_json)
            .or_else(|| self.0.get("id").and_then(ResourceId::from_json))
    }

    pub fn body(&self) -> &Value {
        &self.0
    }

    pub fn into_body(self) -> Value {
        self.0
    }
}
