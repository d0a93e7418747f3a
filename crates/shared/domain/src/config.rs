use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level configuration shared by the CLI and the pipeline stages.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KregConfigInner {
    pub kernel: KernelConfig,
    pub packs: PacksConfig,
    pub codegen: CodegenConfig,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct KregConfig {
    #[serde(flatten, default)]
    inner: Arc<KregConfigInner>,
}

impl Deref for KregConfig {
    type Target = KregConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for KregConfig {
    fn deref_mut(&mut self) -> &mut KregConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Identity of the kernel being compiled.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// `MAJOR.MINOR.PATCH`; the major component selects the kernel line.
    pub version: String,
    /// Pins the snapshot id instead of deriving it from the registry contents.
    pub snapshot_id: Option<String>,
}

/// Where pack documents live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacksConfig {
    pub dir: PathBuf,
}

/// Generated source output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub out_dir: PathBuf,
    pub concepts_file: String,
    pub values_file: String,
}

/// `SurrealDB` connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<DatabaseCredentials>,
}

/// `SurrealDB` root credentials (optional when using unauthenticated engines like mem://).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

/// Synchronizer knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub batch_size: usize,
    /// Only for seeding an empty database.
    pub skip_deactivation: bool,
    pub retire_stale: bool,
    pub activate_on_partial: bool,
}

/// Logging output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub filter: Option<String>,
    pub dir: Option<PathBuf>,
    pub json: bool,
}

// --- Default ---

impl Default for KernelConfig {
    fn default() -> Self {
        Self { version: "1.0.0".to_owned(), snapshot_id: None }
    }
}

impl Default for PacksConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("packs") }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("generated"),
            concepts_file: "concepts.rs".to_owned(),
            values_file: "values.rs".to_owned(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mem://".to_owned(),
            namespace: "kreg".to_owned(),
            database: "kernel".to_owned(),
            credentials: None,
        }
    }
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { batch_size: 100, skip_deactivation: false, retire_stale: false, activate_on_partial: false }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), filter: None, dir: None, json: false }
    }
}
