//! Pack document shapes.
//!
//! Required fields are deserialized with defaults on purpose: an absent `category` must
//! reach the validator as an empty string so the error can name the field, instead of
//! surfacing as an opaque parse failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form metadata attached to value sets and values.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key holding an explicit identifier prefix for a value set.
pub const PREFIX_KEY: &str = "prefix";

/// Returns `true` for `UPPER_SNAKE` codes: a leading letter, then letters and digits,
/// with single underscores between non-empty segments.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    let mut segments = code.split('_');
    let Some(head) = segments.next() else {
        return false;
    };
    if !head.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return false;
    }
    std::iter::once(head).chain(segments).all(|segment| {
        !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}

/// An abstract business noun with no enumerated members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Concept {
    pub code: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A named enumerable classification dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueSet {
    pub code: String,
    #[serde(default, alias = "jurisdiction")]
    pub domain: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ValueSet {
    /// The explicit identifier prefix, if the pack author declared one.
    ///
    /// Returns `None` when the key is absent or not a string; the validator rejects
    /// the latter before a value set ever reaches the registry.
    #[must_use]
    pub fn explicit_prefix(&self) -> Option<&str> {
        self.metadata.get(PREFIX_KEY).and_then(serde_json::Value::as_str)
    }
}

/// One concrete member of a value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Value {
    pub code: String,
    #[serde(default)]
    pub value_set_code: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Value {
    #[must_use]
    pub fn key(&self) -> ValueKey {
        ValueKey::new(&self.value_set_code, &self.code)
    }
}

/// Composite natural key of a [`Value`]: `(value_set_code, code)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueKey {
    pub value_set_code: String,
    pub code: String,
}

impl ValueKey {
    pub fn new(value_set_code: impl Into<String>, code: impl Into<String>) -> Self {
        Self { value_set_code: value_set_code.into(), code: code.into() }
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.value_set_code, self.code)
    }
}

/// A versioned, distributable ontology fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pack {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub description: String,
    /// Lower priorities merge first and therefore win the "first declared" slot.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub value_sets: Vec<ValueSet>,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Pack {
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.concepts.len() + self.value_sets.len() + self.values.len()
    }
}
