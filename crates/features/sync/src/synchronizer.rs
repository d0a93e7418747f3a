use crate::decode::{decode_metadata_rows, decode_state};
use crate::error::{SyncError, SyncErrorExt};
use crate::options::SyncOptions;
use crate::state::SnapshotState;
use crate::store::{EntityTable, KernelStore, RowStamp};
use chrono::Utc;
use kreg_domain::{DatabaseState, MetadataRow, Registry};
use std::fmt;
use std::future::Future;
use tracing::{debug, info, instrument, warn};

/// One failed batch. Recorded in the report; never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBatchError {
    pub table: EntityTable,
    /// Index of the first row of the batch within its entity list.
    pub offset: usize,
    pub size: usize,
    pub message: String,
}

impl fmt::Display for SyncBatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batch at offset {} ({} rows) failed: {}",
            self.table, self.offset, self.size, self.message
        )
    }
}

/// Outcome of [`Synchronizer::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kernel_line: String,
    pub snapshot_id: String,
    pub concepts_synced: usize,
    pub value_sets_synced: usize,
    pub values_synced: usize,
    pub total_synced: usize,
    pub errors: Vec<SyncBatchError>,
    /// Whether this run made its snapshot current.
    pub activated: bool,
    /// States observed between the steps of a non-transactional toggle.
    pub transitions: Vec<SnapshotState>,
    /// State of the kernel line after the run.
    pub snapshot: SnapshotState,
    pub retired: usize,
}

impl SyncReport {
    fn new(registry: &Registry) -> Self {
        Self {
            kernel_line: registry.kernel_line(),
            snapshot_id: registry.snapshot_id().to_owned(),
            concepts_synced: 0,
            value_sets_synced: 0,
            values_synced: 0,
            total_synced: 0,
            errors: Vec::new(),
            activated: false,
            transitions: Vec::new(),
            snapshot: SnapshotState::NoCurrent,
            retired: 0,
        }
    }

    /// `true` when every batch succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, table: EntityTable, written: usize) {
        match table {
            EntityTable::Concepts => self.concepts_synced += written,
            EntityTable::ValueSets => self.value_sets_synced += written,
            EntityTable::Values => self.values_synced += written,
        }
        self.total_synced += written;
    }
}

/// Pushes a [`Registry`] into a [`KernelStore`] and keeps one current snapshot per kernel line.
#[derive(Debug)]
pub struct Synchronizer<S> {
    store: S,
    options: SyncOptions,
}

impl<S: KernelStore> Synchronizer<S> {
    pub fn new(store: S, options: SyncOptions) -> Result<Self, SyncError> {
        options.validate()?;
        Ok(Self { store, options })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Upserts the selected entity kinds batch by batch, then makes the registry's snapshot
    /// current for its kernel line.
    ///
    /// Failed batches end up in [`SyncReport::errors`] and do not stop sibling batches or
    /// other kinds. Activation only happens when nothing failed, unless
    /// [`SyncOptions::activate_on_partial`] is set.
    #[instrument(skip_all, fields(snapshot_id = %registry.snapshot_id(), kernel_line = %registry.kernel_line()))]
    pub async fn sync(&self, registry: &Registry) -> Result<SyncReport, SyncError> {
        let line = registry.kernel_line();
        if self.options.skip_deactivation {
            let state = self.snapshot_state(&line).await?;
            if state.current_rows() > 0 {
                return Err(SyncError::InvalidOptions {
                    message: "skip_deactivation is only allowed while seeding an empty database".into(),
                    context: Some(format!("{line} already has {} current row(s)", state.current_rows()).into()),
                });
            }
        }

        let stamp = RowStamp {
            kernel_version: registry.meta.kernel_version.to_string(),
            snapshot_id: registry.snapshot_id().to_owned(),
        };
        let mut report = SyncReport::new(registry);

        for table in EntityTable::selected(self.options.kinds) {
            match table {
                EntityTable::Concepts => {
                    self.upsert_batches(table, &registry.concepts, &mut report, |rows| {
                        self.store.upsert_concepts(rows, &stamp)
                    })
                    .await;
                },
                EntityTable::ValueSets => {
                    self.upsert_batches(table, &registry.value_sets, &mut report, |rows| {
                        self.store.upsert_value_sets(rows, &stamp)
                    })
                    .await;
                },
                EntityTable::Values => {
                    self.upsert_batches(table, &registry.values, &mut report, |rows| {
                        self.store.upsert_values(rows, &stamp)
                    })
                    .await;
                },
            }
        }

        if report.is_complete() || self.options.activate_on_partial {
            let row = MetadataRow {
                kernel_version: stamp.kernel_version.clone(),
                kernel_line: line.clone(),
                snapshot_id: stamp.snapshot_id.clone(),
                applied_at: Utc::now(),
                is_current: true,
            };
            self.toggle(&row, &mut report).await?;
            report.activated = true;

            if self.options.retire_stale {
                for table in EntityTable::selected(self.options.kinds) {
                    report.retired += self.store.retire_stale(table, &stamp.snapshot_id).await?;
                }
            }
        } else {
            warn!(failed = report.errors.len(), "Snapshot left inactive after failed batches");
        }

        report.snapshot = self.snapshot_state(&line).await?;
        if report.activated && report.snapshot.current().is_none_or(|r| r.snapshot_id != stamp.snapshot_id) {
            warn!(current_rows = report.snapshot.current_rows(), "Line did not settle on the new snapshot");
        }

        info!(
            concepts = report.concepts_synced,
            value_sets = report.value_sets_synced,
            values = report.values_synced,
            errors = report.errors.len(),
            activated = report.activated,
            retired = report.retired,
            "Registry synchronized"
        );
        Ok(report)
    }

    async fn upsert_batches<'a, T, F, Fut>(
        &self,
        table: EntityTable,
        rows: &'a [T],
        report: &mut SyncReport,
        mut upsert: F,
    ) where
        F: FnMut(&'a [T]) -> Fut,
        Fut: Future<Output = Result<usize, SyncError>>,
    {
        let size = self.options.batch_size;
        for (index, batch) in rows.chunks(size).enumerate() {
            let offset = index * size;
            match upsert(batch).await {
                Ok(written) => report.record(table, written),
                Err(err) => {
                    warn!(%table, offset, size = batch.len(), error = %err, "Batch failed");
                    report.errors.push(SyncBatchError {
                        table,
                        offset,
                        size: batch.len(),
                        message: err.to_string(),
                    });
                },
            }
        }
    }

    /// Makes `row` the only current snapshot of its line.
    async fn toggle(&self, row: &MetadataRow, report: &mut SyncReport) -> Result<(), SyncError> {
        if self.options.skip_deactivation {
            return self.store.activate_snapshot(row).await.context("Seeding first snapshot");
        }
        if self.store.supports_transactions() {
            return self.store.swap_current(row).await.context("Swapping current snapshot");
        }

        self.store.activate_snapshot(row).await.context("Activating new snapshot")?;
        let intermediate = self.snapshot_state(&row.kernel_line).await?;
        debug!(current_rows = intermediate.current_rows(), "Toggle in progress");
        report.transitions.push(intermediate);

        let cleared = self
            .store
            .deactivate_current(&row.kernel_line, Some(&row.snapshot_id))
            .await
            .context("Deactivating previous snapshot")?;
        debug!(cleared, "Previous snapshot rows cleared");
        Ok(())
    }

    /// Current-snapshot state of `kernel_line`.
    pub async fn snapshot_state(&self, kernel_line: &str) -> Result<SnapshotState, SyncError> {
        let rows = decode_metadata_rows(self.store.current_rows(kernel_line).await?)?;
        Ok(SnapshotState::from_rows(rows))
    }

    /// The single current row of `kernel_line`, or `None` when there is none.
    ///
    /// # Errors
    /// [`SyncError::Transitioning`] when more than one row is flagged current.
    pub async fn get_current_kernel_version(
        &self,
        kernel_line: &str,
    ) -> Result<Option<MetadataRow>, SyncError> {
        match self.snapshot_state(kernel_line).await? {
            SnapshotState::NoCurrent => Ok(None),
            SnapshotState::OneCurrent(row) => Ok(Some(row)),
            SnapshotState::Transitioning { rows } => Err(SyncError::Transitioning {
                kernel_line: kernel_line.to_owned(),
                rows: rows.len(),
                context: None,
            }),
        }
    }

    /// Decoded database state of `kernel_line`, ready for drift detection.
    pub async fn fetch_state(&self, kernel_line: &str) -> Result<DatabaseState, SyncError> {
        decode_state(kernel_line, self.store.fetch_state(kernel_line).await?)
    }
}
