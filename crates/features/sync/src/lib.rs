//! # Database Synchronizer
//!
//! Persists a compiled [`Registry`](kreg_domain::Registry) into a [`KernelStore`] in fixed-size
//! batches and maintains exactly one current snapshot per kernel line.
//!
//! ## Key Features
//! - **Partial-failure tolerance**: a failed batch is recorded in the [`SyncReport`] and the
//!   remaining batches and kinds still run.
//! - **Explicit toggle states**: [`SnapshotState`] models `NoCurrent`, `Transitioning` and
//!   `OneCurrent`. Transactional stores swap atomically; others pass through `Transitioning`,
//!   which the report records.
//! - **Decoded reads**: rows coming back from a store are checked by [`decode`] before use.
//!
//! ```rust
//! use kreg_domain::{KernelVersion, Registry, RegistryMeta};
//! use kreg_sync::{MemoryStore, SyncOptions, Synchronizer};
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let registry = Registry {
//!     meta: RegistryMeta { kernel_version: KernelVersion::new(1, 0, 0), snapshot_id: "s1".into(), packs: vec![] },
//!     concepts: vec![],
//!     value_sets: vec![],
//!     values: vec![],
//! };
//! let sync = Synchronizer::new(MemoryStore::new(), SyncOptions::default()).unwrap();
//! let report = sync.sync(&registry).await.unwrap();
//! assert!(report.activated);
//! assert_eq!(sync.get_current_kernel_version("v1").await.unwrap().unwrap().snapshot_id, "s1");
//! # }
//! ```

pub mod decode;
mod error;
mod options;
mod state;
pub mod store;
mod synchronizer;

pub use error::{SyncError, SyncErrorExt};
pub use options::{BATCH_SIZE_RANGE, DEFAULT_BATCH_SIZE, SyncOptions};
pub use state::SnapshotState;
pub use store::{EntityTable, FailurePlan, KernelStore, MemoryStore, RowStamp, SurrealStore};
pub use synchronizer::{SyncBatchError, SyncReport, Synchronizer};
