//! Persisted snapshot bookkeeping, as seen after decoding database rows.

use crate::model::ValueKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the kernel metadata table: a snapshot that was applied to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub kernel_version: String,
    pub kernel_line: String,
    pub snapshot_id: String,
    pub applied_at: DateTime<Utc>,
    pub is_current: bool,
}

/// Typed view of the database contents relevant to drift detection.
///
/// Entity sets contain active rows only. `current` holds every row flagged current for the
/// kernel line; a healthy database has exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseState {
    pub kernel_line: String,
    pub current: Vec<MetadataRow>,
    pub concepts: BTreeSet<String>,
    pub value_sets: BTreeSet<String>,
    pub values: BTreeSet<ValueKey>,
}

impl DatabaseState {
    /// The single current row, if the line is in a settled state.
    #[must_use]
    pub fn current_row(&self) -> Option<&MetadataRow> {
        match self.current.as_slice() {
            [row] => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.concepts.len() + self.value_sets.len() + self.values.len()
    }
}
