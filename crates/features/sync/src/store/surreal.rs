use super::{EntityTable, KernelStore, RawEntityRow, RawMetadataRow, RawState, RowStamp, metadata_key};
use crate::error::{SyncError, SyncErrorExt};
use kreg_database::Database;
use kreg_domain::{Concept, Metadata, MetadataRow, Value, ValueSet};
use surrealdb::types::SurrealValue;
use tracing::{debug, instrument};

const METADATA_FIELDS: &str = "kernel_version, kernel_line, snapshot_id, applied_at, is_current";

#[derive(Debug, SurrealValue)]
struct ConceptRecord {
    code: String,
    category: String,
    domain: String,
    description: String,
    tags: Vec<String>,
}

#[derive(Debug, SurrealValue)]
struct ValueSetRecord {
    code: String,
    domain: String,
    description: String,
    metadata: String,
}

#[derive(Debug, SurrealValue)]
struct ValueRecord {
    key: String,
    value_set_code: String,
    code: String,
    label: String,
    description: String,
    sort_order: Option<i64>,
    metadata: String,
}

#[derive(Debug, SurrealValue)]
struct MetadataRecord {
    kernel_version: String,
    kernel_line: String,
    snapshot_id: String,
    applied_at: String,
    is_current: bool,
}

impl From<&MetadataRow> for MetadataRecord {
    fn from(row: &MetadataRow) -> Self {
        Self {
            kernel_version: row.kernel_version.clone(),
            kernel_line: row.kernel_line.clone(),
            snapshot_id: row.snapshot_id.clone(),
            applied_at: row.applied_at.to_rfc3339(),
            is_current: row.is_current,
        }
    }
}

fn encode_metadata(metadata: &Metadata) -> Result<String, SyncError> {
    serde_json::to_string(metadata).context("Encoding metadata")
}

/// [`KernelStore`] over the migrated `SurrealDB` schema.
///
/// Every batch is one query inside one transaction; the current-snapshot swap is a single
/// transaction too.
#[derive(Debug, Clone)]
pub struct SurrealStore {
    db: Database,
}

impl SurrealStore {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Runs one batch statement: `FOR $row IN $rows { UPSERT ... }` in a transaction.
    async fn upsert_batch<R>(
        &self,
        table: EntityTable,
        key: &str,
        content: &str,
        rows: Vec<R>,
        stamp: &RowStamp,
    ) -> Result<usize, SyncError>
    where
        R: SurrealValue + Send + 'static,
    {
        let count = rows.len();
        let query = format!(
            "BEGIN TRANSACTION;
            FOR $row IN $rows {{
                UPSERT type::record('{table}', {key}) CONTENT {{
                    {content},
                    kernel_version: $kernel_version,
                    snapshot_id: $snapshot_id,
                    is_active: true
                }};
            }};
            COMMIT TRANSACTION;",
            table = table.table(),
        );

        self.db
            .query(query)
            .bind(("rows", rows))
            .bind(("kernel_version", stamp.kernel_version.clone()))
            .bind(("snapshot_id", stamp.snapshot_id.clone()))
            .await
            .context(format!("Upserting {table} batch"))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("{table} batch rejected"))?;

        debug!(%table, count, "Batch upserted");
        Ok(count)
    }

    async fn entity_rows(&self, query: &str) -> Result<Vec<RawEntityRow>, SyncError> {
        self.db
            .query(query)
            .await
            .context("Fetching entity rows")?
            .take::<Vec<RawEntityRow>>(0)
            .context("Reading entity rows")
    }
}

impl KernelStore for SurrealStore {
    fn supports_transactions(&self) -> bool {
        true
    }

    #[instrument(skip_all, fields(rows = rows.len()))]
    async fn upsert_concepts(&self, rows: &[Concept], stamp: &RowStamp) -> Result<usize, SyncError> {
        let records = rows
            .iter()
            .map(|c| ConceptRecord {
                code: c.code.clone(),
                category: c.category.clone(),
                domain: c.domain.clone(),
                description: c.description.clone(),
                tags: c.tags.clone(),
            })
            .collect();
        self.upsert_batch(
            EntityTable::Concepts,
            "$row.code",
            "code: $row.code, category: $row.category, domain: $row.domain,
            description: $row.description, tags: $row.tags",
            records,
            stamp,
        )
        .await
    }

    #[instrument(skip_all, fields(rows = rows.len()))]
    async fn upsert_value_sets(
        &self,
        rows: &[ValueSet],
        stamp: &RowStamp,
    ) -> Result<usize, SyncError> {
        let records = rows
            .iter()
            .map(|s| {
                Ok(ValueSetRecord {
                    code: s.code.clone(),
                    domain: s.domain.clone(),
                    description: s.description.clone(),
                    metadata: encode_metadata(&s.metadata)?,
                })
            })
            .collect::<Result<Vec<_>, SyncError>>()?;
        self.upsert_batch(
            EntityTable::ValueSets,
            "$row.code",
            "code: $row.code, domain: $row.domain, description: $row.description,
            metadata: $row.metadata",
            records,
            stamp,
        )
        .await
    }

    #[instrument(skip_all, fields(rows = rows.len()))]
    async fn upsert_values(&self, rows: &[Value], stamp: &RowStamp) -> Result<usize, SyncError> {
        let records = rows
            .iter()
            .map(|v| {
                Ok(ValueRecord {
                    key: v.key().to_string(),
                    value_set_code: v.value_set_code.clone(),
                    code: v.code.clone(),
                    label: v.label.clone(),
                    description: v.description.clone(),
                    sort_order: v.sort_order,
                    metadata: encode_metadata(&v.metadata)?,
                })
            })
            .collect::<Result<Vec<_>, SyncError>>()?;
        self.upsert_batch(
            EntityTable::Values,
            "$row.key",
            "value_set_code: $row.value_set_code, code: $row.code, label: $row.label,
            description: $row.description, sort_order: $row.sort_order, metadata: $row.metadata",
            records,
            stamp,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn deactivate_current(
        &self,
        kernel_line: &str,
        keep: Option<&str>,
    ) -> Result<usize, SyncError> {
        let changed = self
            .db
            .query(
                "RETURN (UPDATE kernel_metadata SET is_current = false
                    WHERE kernel_line = $line AND is_current = true AND snapshot_id != $keep).len();",
            )
            .bind(("line", kernel_line.to_owned()))
            .bind(("keep", keep.map(str::to_owned)))
            .await
            .context("Deactivating current snapshot")?
            .take::<Option<i64>>(0)
            .context("Reading deactivated row count")?
            .unwrap_or_default();
        Ok(usize::try_from(changed).unwrap_or_default())
    }

    #[instrument(skip_all, fields(snapshot_id = %row.snapshot_id))]
    async fn activate_snapshot(&self, row: &MetadataRow) -> Result<(), SyncError> {
        self.db
            .query("UPSERT type::record('kernel_metadata', $key) CONTENT $row;")
            .bind(("key", metadata_key(&row.kernel_line, &row.snapshot_id)))
            .bind(("row", MetadataRecord::from(row)))
            .await
            .context("Activating snapshot")?
            .check()
            .map_err(surrealdb::Error::from)
            .context("Snapshot activation rejected")?;
        Ok(())
    }

    #[instrument(skip_all, fields(snapshot_id = %row.snapshot_id))]
    async fn swap_current(&self, row: &MetadataRow) -> Result<(), SyncError> {
        self.db
            .query(
                "BEGIN TRANSACTION;
                UPDATE kernel_metadata SET is_current = false WHERE kernel_line = $line AND is_current = true;
                UPSERT type::record('kernel_metadata', $key) CONTENT $row;
                COMMIT TRANSACTION;",
            )
            .bind(("line", row.kernel_line.clone()))
            .bind(("key", metadata_key(&row.kernel_line, &row.snapshot_id)))
            .bind(("row", MetadataRecord::from(row)))
            .await
            .context("Swapping current snapshot")?
            .check()
            .map_err(surrealdb::Error::from)
            .context("Snapshot swap rejected")?;
        Ok(())
    }

    async fn current_rows(&self, kernel_line: &str) -> Result<Vec<RawMetadataRow>, SyncError> {
        self.db
            .query(format!(
                "SELECT {METADATA_FIELDS} FROM kernel_metadata
                WHERE kernel_line = $line AND is_current = true ORDER BY applied_at"
            ))
            .bind(("line", kernel_line.to_owned()))
            .await
            .context("Fetching current snapshot rows")?
            .take::<Vec<RawMetadataRow>>(0)
            .context("Reading current snapshot rows")
    }

    #[instrument(skip(self))]
    async fn fetch_state(&self, kernel_line: &str) -> Result<RawState, SyncError> {
        Ok(RawState {
            current: self.current_rows(kernel_line).await?,
            concepts: self.entity_rows("SELECT code FROM concept_registry WHERE is_active = true").await?,
            value_sets: self
                .entity_rows("SELECT code FROM value_set_registry WHERE is_active = true")
                .await?,
            values: self
                .entity_rows("SELECT value_set_code, code FROM value_set_value WHERE is_active = true")
                .await?,
        })
    }

    #[instrument(skip(self))]
    async fn retire_stale(&self, table: EntityTable, snapshot_id: &str) -> Result<usize, SyncError> {
        let retired = self
            .db
            .query(format!(
                "RETURN (UPDATE {} SET is_active = false
                    WHERE is_active = true AND snapshot_id != $snapshot_id).len();",
                table.table()
            ))
            .bind(("snapshot_id", snapshot_id.to_owned()))
            .await
            .context(format!("Retiring stale {table}"))?
            .take::<Option<i64>>(0)
            .context(format!("Reading retired {table} count"))?
            .unwrap_or_default();
        Ok(usize::try_from(retired).unwrap_or_default())
    }
}
