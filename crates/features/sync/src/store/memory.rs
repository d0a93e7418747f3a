use super::{EntityTable, KernelStore, RawEntityRow, RawMetadataRow, RawState, RowStamp, metadata_key};
use crate::error::SyncError;
use fxhash::{FxHashMap, FxHashSet};
use kreg_domain::{Concept, MetadataRow, Value, ValueKey, ValueSet};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Upsert calls and toggles a [`MemoryStore`] should reject.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    batches: FxHashSet<(EntityTable, usize)>,
    activation: bool,
}

impl FailurePlan {
    /// Fails the `call`-th (zero-based) upsert into `table`.
    #[must_use]
    pub fn fail_batch(mut self, table: EntityTable, call: usize) -> Self {
        self.batches.insert((table, call));
        self
    }

    /// Fails every `activate_snapshot` and `swap_current` call.
    #[must_use]
    pub const fn fail_activation(mut self) -> Self {
        self.activation = true;
        self
    }
}

#[derive(Debug, Clone)]
struct Stored<T> {
    entity: T,
    stamp: RowStamp,
    is_active: bool,
}

impl<T> Stored<T> {
    fn new(entity: T, stamp: &RowStamp) -> Self {
        Self { entity, stamp: stamp.clone(), is_active: true }
    }
}

#[derive(Debug, Default)]
struct Tables {
    concepts: BTreeMap<String, Stored<Concept>>,
    value_sets: BTreeMap<String, Stored<ValueSet>>,
    values: BTreeMap<ValueKey, Stored<Value>>,
    metadata: BTreeMap<String, MetadataRow>,
    calls: FxHashMap<EntityTable, usize>,
}

impl Tables {
    /// Counts the call and applies the failure plan to it.
    fn admit(&mut self, plan: &FailurePlan, table: EntityTable) -> Result<(), SyncError> {
        let call = self.calls.entry(table).or_default();
        let current = *call;
        *call += 1;
        if plan.batches.contains(&(table, current)) {
            return Err(SyncError::store(format!("injected failure on {table} batch #{current}")));
        }
        Ok(())
    }

    fn deactivate(&mut self, kernel_line: &str, keep: Option<&str>) -> usize {
        let mut changed = 0;
        for row in self.metadata.values_mut() {
            let kept = keep == Some(row.snapshot_id.as_str());
            if row.kernel_line == kernel_line && row.is_current && !kept {
                row.is_current = false;
                changed += 1;
            }
        }
        changed
    }

    fn upsert_metadata(&mut self, row: &MetadataRow) {
        self.metadata.insert(metadata_key(&row.kernel_line, &row.snapshot_id), row.clone());
    }
}

/// In-process [`KernelStore`] for tests and dry runs.
///
/// Transactional by default; [`MemoryStore::non_transactional`] makes the synchronizer take
/// the two-step toggle path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    plan: FailurePlan,
    transactional: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self { transactional: true, ..Self::default() }
    }

    #[must_use]
    pub fn non_transactional() -> Self {
        Self { transactional: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_failures(mut self, plan: FailurePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Every metadata row, current or not, ordered by record key.
    pub async fn metadata_rows(&self) -> Vec<MetadataRow> {
        self.tables.lock().await.metadata.values().cloned().collect()
    }

    /// Number of rows in `table`, and how many of them are active.
    pub async fn row_counts(&self, table: EntityTable) -> (usize, usize) {
        let tables = self.tables.lock().await;
        match table {
            EntityTable::Concepts => count(tables.concepts.values().map(|r| r.is_active)),
            EntityTable::ValueSets => count(tables.value_sets.values().map(|r| r.is_active)),
            EntityTable::Values => count(tables.values.values().map(|r| r.is_active)),
        }
    }

    /// Number of upsert calls `table` received so far, failed ones included.
    pub async fn upsert_calls(&self, table: EntityTable) -> usize {
        self.tables.lock().await.calls.get(&table).copied().unwrap_or_default()
    }

    fn check_activation(&self) -> Result<(), SyncError> {
        if self.plan.activation {
            return Err(SyncError::store("injected activation failure"));
        }
        Ok(())
    }
}

fn count(active: impl Iterator<Item = bool>) -> (usize, usize) {
    active.fold((0, 0), |(total, live), is_active| (total + 1, live + usize::from(is_active)))
}

fn entity_row(code: &str, value_set_code: Option<&str>) -> RawEntityRow {
    RawEntityRow { code: Some(code.to_owned()), value_set_code: value_set_code.map(str::to_owned) }
}

impl KernelStore for MemoryStore {
    fn supports_transactions(&self) -> bool {
        self.transactional
    }

    async fn upsert_concepts(&self, rows: &[Concept], stamp: &RowStamp) -> Result<usize, SyncError> {
        let mut tables = self.tables.lock().await;
        tables.admit(&self.plan, EntityTable::Concepts)?;
        for concept in rows {
            tables.concepts.insert(concept.code.clone(), Stored::new(concept.clone(), stamp));
        }
        Ok(rows.len())
    }

    async fn upsert_value_sets(
        &self,
        rows: &[ValueSet],
        stamp: &RowStamp,
    ) -> Result<usize, SyncError> {
        let mut tables = self.tables.lock().await;
        tables.admit(&self.plan, EntityTable::ValueSets)?;
        for set in rows {
            tables.value_sets.insert(set.code.clone(), Stored::new(set.clone(), stamp));
        }
        Ok(rows.len())
    }

    async fn upsert_values(&self, rows: &[Value], stamp: &RowStamp) -> Result<usize, SyncError> {
        let mut tables = self.tables.lock().await;
        tables.admit(&self.plan, EntityTable::Values)?;
        for value in rows {
            tables.values.insert(value.key(), Stored::new(value.clone(), stamp));
        }
        Ok(rows.len())
    }

    async fn deactivate_current(
        &self,
        kernel_line: &str,
        keep: Option<&str>,
    ) -> Result<usize, SyncError> {
        Ok(self.tables.lock().await.deactivate(kernel_line, keep))
    }

    async fn activate_snapshot(&self, row: &MetadataRow) -> Result<(), SyncError> {
        self.check_activation()?;
        self.tables.lock().await.upsert_metadata(row);
        Ok(())
    }

    async fn swap_current(&self, row: &MetadataRow) -> Result<(), SyncError> {
        self.check_activation()?;
        let mut tables = self.tables.lock().await;
        tables.deactivate(&row.kernel_line, None);
        tables.upsert_metadata(row);
        Ok(())
    }

    async fn current_rows(&self, kernel_line: &str) -> Result<Vec<RawMetadataRow>, SyncError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .metadata
            .values()
            .filter(|row| row.kernel_line == kernel_line && row.is_current)
            .collect();
        rows.sort_by_key(|row| row.applied_at);
        Ok(rows.into_iter().map(RawMetadataRow::from).collect())
    }

    async fn fetch_state(&self, kernel_line: &str) -> Result<RawState, SyncError> {
        let current = self.current_rows(kernel_line).await?;
        let tables = self.tables.lock().await;
        Ok(RawState {
            current,
            concepts: tables
                .concepts
                .iter()
                .filter(|(_, row)| row.is_active)
                .map(|(code, _)| entity_row(code, None))
                .collect(),
            value_sets: tables
                .value_sets
                .iter()
                .filter(|(_, row)| row.is_active)
                .map(|(code, _)| entity_row(code, None))
                .collect(),
            values: tables
                .values
                .iter()
                .filter(|(_, row)| row.is_active)
                .map(|(key, _)| entity_row(&key.code, Some(&key.value_set_code)))
                .collect(),
        })
    }

    async fn retire_stale(&self, table: EntityTable, snapshot_id: &str) -> Result<usize, SyncError> {
        fn retire<K, T>(rows: &mut BTreeMap<K, Stored<T>>, snapshot_id: &str) -> usize {
            let mut retired = 0;
            let stale = rows.values_mut().filter(|r| r.is_active && r.stamp.snapshot_id != snapshot_id);
            for row in stale {
                row.is_active = false;
                retired += 1;
            }
            retired
        }

        let mut tables = self.tables.lock().await;
        Ok(match table {
            EntityTable::Concepts => retire(&mut tables.concepts, snapshot_id),
            EntityTable::ValueSets => retire(&mut tables.value_sets, snapshot_id),
            EntityTable::Values => retire(&mut tables.values, snapshot_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(snapshot_id: &str, minute: u32) -> MetadataRow {
        MetadataRow {
            kernel_version: "1.0.0".to_owned(),
            kernel_line: "v1".to_owned(),
            snapshot_id: snapshot_id.to_owned(),
            applied_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, minute, 0).unwrap(),
            is_current: true,
        }
    }

    #[tokio::test]
    async fn swap_leaves_one_current_row() {
        let store = MemoryStore::new();
        store.activate_snapshot(&row("a", 0)).await.unwrap();
        store.swap_current(&row("b", 1)).await.unwrap();

        let current = store.current_rows("v1").await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].snapshot_id.as_deref(), Some("b"));
        assert_eq!(store.metadata_rows().await.len(), 2);
    }

    #[tokio::test]
    async fn deactivate_keeps_the_named_snapshot() {
        let store = MemoryStore::non_transactional();
        store.activate_snapshot(&row("a", 0)).await.unwrap();
        store.activate_snapshot(&row("b", 1)).await.unwrap();
        assert_eq!(store.current_rows("v1").await.unwrap().len(), 2);

        assert_eq!(store.deactivate_current("v1", Some("b")).await.unwrap(), 1);
        let current = store.current_rows("v1").await.unwrap();
        assert_eq!(current[0].snapshot_id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn injected_batch_failure_writes_nothing() {
        let plan = FailurePlan::default().fail_batch(EntityTable::Concepts, 0);
        let store = MemoryStore::new().with_failures(plan);
        let stamp = RowStamp { kernel_version: "1.0.0".to_owned(), snapshot_id: "s".to_owned() };
        let concept = Concept {
            code: "INVOICE".to_owned(),
            category: "document".to_owned(),
            domain: "finance".to_owned(),
            description: String::new(),
            tags: vec![],
        };

        assert!(store.upsert_concepts(std::slice::from_ref(&concept), &stamp).await.is_err());
        assert_eq!(store.row_counts(EntityTable::Concepts).await, (0, 0));
        assert_eq!(store.upsert_concepts(&[concept], &stamp).await.unwrap(), 1);
        assert_eq!(store.upsert_calls(EntityTable::Concepts).await, 2);
    }
}
