//! Facade crate for the kernel registry compiler.
//! Re-exports the pipeline stages and wires them together from a [`KregConfig`].
//! Keep this crate thin: it should compose other crates, not implement pipeline logic.
//!
//! ## Usage
//! - [`compile`] loads and merges the configured packs into a [`Registry`].
//! - [`generate`] turns a registry into source files under `codegen.out_dir`.
//! - [`connect`] opens the configured database and returns a [`Synchronizer`] over it.
//! - [`check_drift`] fetches the database state and compares it with a registry.

use chrono::{DateTime, Utc};
use kreg_codegen::{GenerationContext, WrittenFile};
use kreg_database::Database;
use kreg_domain::config::KregConfig;
use kreg_domain::drift::DriftResult;
use kreg_domain::{KernelVersion, Pack, Registry};
use kreg_packs::MergeOptions;
use kreg_sync::{SurrealStore, SyncOptions, Synchronizer};
use std::borrow::Cow;
use std::path::Path;
use tracing::{info, instrument};

pub use kreg_codegen as codegen;
pub use kreg_database as database;
pub use kreg_domain as domain;
pub use kreg_drift as drift;
pub use kreg_kernel as kernel;
pub use kreg_packs as packs;
pub use kreg_sync as sync;

/// Failures of any pipeline stage, with the stage's own error as source.
#[kreg_derive::kreg_error]
pub enum PipelineError {
    #[error("Invalid kernel version{}: {source}", format_context(.context))]
    Version { source: kreg_domain::registry::ParseKernelVersionError, context: Option<Cow<'static, str>> },

    #[error("Pack loading failed{}: {source}", format_context(.context))]
    Pack { source: kreg_packs::PackError, context: Option<Cow<'static, str>> },

    #[error("Merge conflict{}: {source}", format_context(.context))]
    Merge { source: kreg_packs::MergeError, context: Option<Cow<'static, str>> },

    #[error("Code generation failed{}: {source}", format_context(.context))]
    Codegen { source: kreg_codegen::CodegenError, context: Option<Cow<'static, str>> },

    #[error("Database unavailable{}: {source}", format_context(.context))]
    Database { source: kreg_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Synchronization failed{}: {source}", format_context(.context))]
    Sync { source: kreg_sync::SyncError, context: Option<Cow<'static, str>> },
}

/// Loaded packs (in merge order) and the registry merged from them.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub packs: Vec<Pack>,
    pub registry: Registry,
}

/// Merge options derived from the `[kernel]` section.
pub fn merge_options(config: &KregConfig) -> Result<MergeOptions, PipelineError> {
    let kernel_version: KernelVersion =
        config.kernel.version.parse::<KernelVersion>().context("kernel.version")?;
    Ok(MergeOptions { kernel_version, snapshot_id: config.kernel.snapshot_id.clone() })
}

/// Loads every pack under `dir` and merges them.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn compile_dir(dir: &Path, config: &KregConfig) -> Result<Compiled, PipelineError> {
    let options = merge_options(config)?;
    let packs = kreg_packs::load_packs(dir).await?;
    let registry = kreg_packs::merge_packs(&packs, &options)?;
    info!(
        packs = packs.len(),
        entities = registry.entity_count(),
        snapshot_id = %registry.snapshot_id(),
        "Registry compiled"
    );
    Ok(Compiled { packs, registry })
}

/// [`compile_dir`] on `packs.dir`.
pub async fn compile(config: &KregConfig) -> Result<Compiled, PipelineError> {
    compile_dir(&config.packs.dir, config).await
}

/// Generates both source modules and writes them under `codegen.out_dir`.
pub fn generate(
    registry: &Registry,
    config: &KregConfig,
    generated_at: DateTime<Utc>,
) -> Result<Vec<WrittenFile>, PipelineError> {
    let ctx = GenerationContext::new(registry, generated_at);
    let artifacts = kreg_codegen::generate(registry, &ctx)?;
    Ok(kreg_codegen::write_artifacts(&artifacts, &config.codegen)?)
}

/// Connects to the configured database (running pending migrations) and builds a
/// [`Synchronizer`] over it.
pub async fn connect(
    config: &KregConfig,
    options: SyncOptions,
) -> Result<Synchronizer<SurrealStore>, PipelineError> {
    let db = Database::builder().config(&config.database).init().await?;
    Ok(Synchronizer::new(SurrealStore::new(db), options)?)
}

/// Fetches the decoded database state of the registry's kernel line and classifies drift.
pub async fn check_drift<S: kreg_sync::KernelStore>(
    sync: &Synchronizer<S>,
    registry: &Registry,
) -> Result<DriftResult, PipelineError> {
    let state = sync.fetch_state(&registry.kernel_line()).await?;
    Ok(kreg_drift::detect_drift(&state, registry))
}
