//! The storage seam of the synchronizer.
//!
//! A [`KernelStore`] persists registry entities and the per-line snapshot metadata. Reads come
//! back as raw records ([`RawMetadataRow`], [`RawEntityRow`]) that still have to pass through
//! [`crate::decode`] before the rest of the pipeline trusts them.

mod memory;
mod surreal;

pub use memory::{FailurePlan, MemoryStore};
pub use surreal::SurrealStore;

use crate::error::SyncError;
use kreg_domain::{Concept, EntityKinds, MetadataRow, Value, ValueSet};
use std::future::Future;
use strum_macros::{Display, EnumIter};
use surrealdb::types::SurrealValue;

/// One registry table, as addressed by the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EntityTable {
    Concepts,
    ValueSets,
    Values,
}

impl EntityTable {
    /// Database table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Concepts => "concept_registry",
            Self::ValueSets => "value_set_registry",
            Self::Values => "value_set_value",
        }
    }

    #[must_use]
    pub const fn kind(self) -> EntityKinds {
        match self {
            Self::Concepts => EntityKinds::CONCEPTS,
            Self::ValueSets => EntityKinds::VALUE_SETS,
            Self::Values => EntityKinds::VALUES,
        }
    }

    /// Tables selected by `kinds`, in sync order.
    pub fn selected(kinds: EntityKinds) -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter().filter(move |t| kinds.contains(t.kind()))
    }
}

/// Snapshot tag written onto every upserted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStamp {
    pub kernel_version: String,
    pub snapshot_id: String,
}

/// Kernel metadata row exactly as the store returned it.
#[derive(Debug, Clone, Default, PartialEq, Eq, SurrealValue)]
pub struct RawMetadataRow {
    pub kernel_version: Option<String>,
    pub kernel_line: Option<String>,
    pub snapshot_id: Option<String>,
    pub applied_at: Option<String>,
    pub is_current: Option<bool>,
}

impl From<&MetadataRow> for RawMetadataRow {
    fn from(row: &MetadataRow) -> Self {
        Self {
            kernel_version: Some(row.kernel_version.clone()),
            kernel_line: Some(row.kernel_line.clone()),
            snapshot_id: Some(row.snapshot_id.clone()),
            applied_at: Some(row.applied_at.to_rfc3339()),
            is_current: Some(row.is_current),
        }
    }
}

/// Natural key of an active entity row. `value_set_code` is only set for values.
#[derive(Debug, Clone, Default, PartialEq, Eq, SurrealValue)]
pub struct RawEntityRow {
    pub code: Option<String>,
    pub value_set_code: Option<String>,
}

/// Everything drift detection needs, undecoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawState {
    pub current: Vec<RawMetadataRow>,
    pub concepts: Vec<RawEntityRow>,
    pub value_sets: Vec<RawEntityRow>,
    pub values: Vec<RawEntityRow>,
}

/// Persistence operations used by [`Synchronizer`](crate::Synchronizer).
///
/// Each upsert call is one batch and one round-trip. Upserts are idempotent and keyed on the
/// natural key (`code`, or `value_set_code` + `code` for values); every written row is
/// tagged with the [`RowStamp`] and marked active.
pub trait KernelStore: Send + Sync {
    /// Whether [`swap_current`](Self::swap_current) is atomic on this store.
    fn supports_transactions(&self) -> bool;

    fn upsert_concepts(
        &self,
        rows: &[Concept],
        stamp: &RowStamp,
    ) -> impl Future<Output = Result<usize, SyncError>> + Send;

    fn upsert_value_sets(
        &self,
        rows: &[ValueSet],
        stamp: &RowStamp,
    ) -> impl Future<Output = Result<usize, SyncError>> + Send;

    fn upsert_values(
        &self,
        rows: &[Value],
        stamp: &RowStamp,
    ) -> impl Future<Output = Result<usize, SyncError>> + Send;

    /// Clears `is_current` on every current row of `kernel_line` except the `keep` snapshot.
    /// Returns the number of rows changed.
    fn deactivate_current(
        &self,
        kernel_line: &str,
        keep: Option<&str>,
    ) -> impl Future<Output = Result<usize, SyncError>> + Send;

    /// Upserts `row` as-is, without touching other rows of the line.
    fn activate_snapshot(&self, row: &MetadataRow) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Deactivates every current row of the line and upserts `row`, as one transaction.
    fn swap_current(&self, row: &MetadataRow) -> impl Future<Output = Result<(), SyncError>> + Send;

    fn current_rows(
        &self,
        kernel_line: &str,
    ) -> impl Future<Output = Result<Vec<RawMetadataRow>, SyncError>> + Send;

    /// Current rows of `kernel_line` plus the natural keys of all active entity rows.
    fn fetch_state(&self, kernel_line: &str) -> impl Future<Output = Result<RawState, SyncError>> + Send;

    /// Marks active rows of `table` not tagged with `snapshot_id` inactive. Returns the count.
    fn retire_stale(
        &self,
        table: EntityTable,
        snapshot_id: &str,
    ) -> impl Future<Output = Result<usize, SyncError>> + Send;
}

/// Record key of a kernel metadata row.
pub(crate) fn metadata_key(kernel_line: &str, snapshot_id: &str) -> String {
    format!("{kernel_line}-{snapshot_id}")
}
