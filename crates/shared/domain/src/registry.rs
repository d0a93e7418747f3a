//! The merged registry of one build.
//!
//! A [`Registry`] is produced by the pack merger and passed by value (or reference) through
//! code generation, synchronization and drift detection. There is no process-wide registry.

use crate::model::{Concept, Value, ValueKey, ValueSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A `MAJOR.MINOR.PATCH` kernel version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KernelVersion {
    major: u64,
    minor: u64,
    patch: u64,
}

impl KernelVersion {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// The kernel line this version belongs to (`1.4.2` → `v1`).
    ///
    /// Exactly one snapshot per line may be current in the database.
    #[must_use]
    pub fn line(&self) -> String {
        format!("v{}", self.major)
    }

    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }
}

impl Default for KernelVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Returned when a kernel version string is not `MAJOR.MINOR.PATCH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKernelVersionError(pub String);

impl fmt::Display for ParseKernelVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid kernel version '{}' (expected MAJOR.MINOR.PATCH)", self.0)
    }
}

impl std::error::Error for ParseKernelVersionError {}

impl FromStr for KernelVersion {
    type Err = ParseKernelVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseKernelVersionError(s.to_owned());
        let mut parts = s.trim().strip_prefix('v').unwrap_or(s.trim()).split('.');
        let mut next = || -> Result<u64, ParseKernelVersionError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl TryFrom<String> for KernelVersion {
    type Error = ParseKernelVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KernelVersion> for String {
    fn from(value: KernelVersion) -> Self {
        value.to_string()
    }
}

/// Pack provenance recorded in the registry, in merge order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackRef {
    pub id: String,
    pub version: String,
}

/// Identity of one compiled registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMeta {
    pub kernel_version: KernelVersion,
    pub snapshot_id: String,
    pub packs: Vec<PackRef>,
}

/// The merged, validated union of all concepts, value sets and values of one build.
///
/// Invariants (upheld by the merger):
/// * concept and value set codes are unique;
/// * `(value_set_code, code)` is unique across values;
/// * every value references a value set of this registry;
/// * concepts and value sets are sorted by code, values by set, sort order, then code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub meta: RegistryMeta,
    pub concepts: Vec<Concept>,
    pub value_sets: Vec<ValueSet>,
    pub values: Vec<Value>,
}

impl Registry {
    #[must_use]
    pub fn snapshot_id(&self) -> &str {
        &self.meta.snapshot_id
    }

    #[must_use]
    pub fn kernel_line(&self) -> String {
        self.meta.kernel_version.line()
    }

    #[must_use]
    pub fn concept_codes(&self) -> BTreeSet<String> {
        self.concepts.iter().map(|c| c.code.clone()).collect()
    }

    #[must_use]
    pub fn value_set_codes(&self) -> BTreeSet<String> {
        self.value_sets.iter().map(|s| s.code.clone()).collect()
    }

    #[must_use]
    pub fn value_keys(&self) -> BTreeSet<ValueKey> {
        self.values.iter().map(Value::key).collect()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.concepts.len() + self.value_sets.len() + self.values.len()
    }
}
