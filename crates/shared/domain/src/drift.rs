//! Drift reports. Drift is data: it is returned, printed and turned into exit codes,
//! but never raised as an error.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Classification of the difference between the database and the compiled registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DriftType {
    /// Entity sets and snapshot id match.
    None,
    /// Entity sets match, the recorded snapshot id differs.
    VersionMismatch,
    /// Entity sets differ.
    EntityMismatch,
    /// No current snapshot row (or more than one) exists.
    Stale,
}

/// Itemized difference for one entity kind, from the registry's point of view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDiff {
    /// Present in the registry, missing from the database.
    pub added: Vec<String>,
    /// Present in the database, gone from the registry.
    pub removed: Vec<String>,
}

impl EntityDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftDetails {
    pub kernel_line: String,
    pub database_snapshot: Option<String>,
    pub registry_snapshot: String,
    pub current_rows: usize,
    pub concepts: EntityDiff,
    pub value_sets: EntityDiff,
    pub values: EntityDiff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftResult {
    pub has_drift: bool,
    pub drift_type: DriftType,
    pub details: DriftDetails,
    pub recommendations: Vec<String>,
}

impl DriftResult {
    /// Process exit code for the CLI: `0` when in sync, `2` when drift remains.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.has_drift { 2 } else { 0 }
    }
}
