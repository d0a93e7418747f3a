//! Schema-checked conversion of raw store records into domain types.
//!
//! Nothing fetched from a store is used before it passes through here.

use crate::error::SyncError;
use crate::store::{RawEntityRow, RawMetadataRow, RawState};
use chrono::{DateTime, Utc};
use kreg_domain::model::is_valid_code;
use kreg_domain::{DatabaseState, MetadataRow, ValueKey};
use std::collections::BTreeSet;

const METADATA: &str = "kernel_metadata";

fn required<T>(value: Option<T>, table: &'static str, field: &'static str) -> Result<T, SyncError> {
    value.ok_or_else(|| SyncError::decode(table, field, "missing"))
}

fn code(value: Option<String>, table: &'static str, field: &'static str) -> Result<String, SyncError> {
    let value = required(value, table, field)?;
    if !is_valid_code(&value) {
        return Err(SyncError::decode(table, field, format!("'{value}' is not an UPPER_SNAKE code")));
    }
    Ok(value)
}

/// Decodes one kernel metadata row.
pub fn decode_metadata(raw: RawMetadataRow) -> Result<MetadataRow, SyncError> {
    let applied_at = required(raw.applied_at, METADATA, "applied_at")?;
    let applied_at = DateTime::parse_from_rfc3339(&applied_at)
        .map_err(|e| SyncError::decode(METADATA, "applied_at", format!("'{applied_at}': {e}")))?
        .with_timezone(&Utc);

    let snapshot_id = required(raw.snapshot_id, METADATA, "snapshot_id")?;
    if snapshot_id.is_empty() {
        return Err(SyncError::decode(METADATA, "snapshot_id", "empty"));
    }

    Ok(MetadataRow {
        kernel_version: required(raw.kernel_version, METADATA, "kernel_version")?,
        kernel_line: required(raw.kernel_line, METADATA, "kernel_line")?,
        snapshot_id,
        applied_at,
        is_current: required(raw.is_current, METADATA, "is_current")?,
    })
}

pub fn decode_metadata_rows(raw: Vec<RawMetadataRow>) -> Result<Vec<MetadataRow>, SyncError> {
    raw.into_iter().map(decode_metadata).collect()
}

fn decode_codes(rows: Vec<RawEntityRow>, table: &'static str) -> Result<BTreeSet<String>, SyncError> {
    rows.into_iter().map(|row| code(row.code, table, "code")).collect()
}

fn decode_value_keys(rows: Vec<RawEntityRow>) -> Result<BTreeSet<ValueKey>, SyncError> {
    const TABLE: &str = "value_set_value";
    rows.into_iter()
        .map(|row| {
            Ok(ValueKey::new(code(row.value_set_code, TABLE, "value_set_code")?, code(row.code, TABLE, "code")?))
        })
        .collect()
}

/// Decodes everything drift detection reads for `kernel_line`.
pub fn decode_state(kernel_line: &str, raw: RawState) -> Result<DatabaseState, SyncError> {
    Ok(DatabaseState {
        kernel_line: kernel_line.to_owned(),
        current: decode_metadata_rows(raw.current)?,
        concepts: decode_codes(raw.concepts, "concept_registry")?,
        value_sets: decode_codes(raw.value_sets, "value_set_registry")?,
        values: decode_value_keys(raw.values)?,
    })
}
