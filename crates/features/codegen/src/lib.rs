//! # Code Generator
//!
//! Compiles a [`Registry`] into two Rust source modules of string constants: one for concepts,
//! one for value sets and their values. Generation is pure. The clock is an input
//! ([`GenerationContext::generated_at`]), so the same registry and context always produce
//! byte-identical output.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use kreg_codegen::{GenerationContext, generate};
//! use kreg_domain::{KernelVersion, Registry, RegistryMeta};
//!
//! let registry = Registry {
//!     meta: RegistryMeta { kernel_version: KernelVersion::new(1, 0, 0), snapshot_id: "abc".into(), packs: vec![] },
//!     concepts: vec![],
//!     value_sets: vec![],
//!     values: vec![],
//! };
//! let ctx = GenerationContext::new(&registry, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
//! let artifacts = generate(&registry, &ctx).unwrap();
//! assert!(artifacts.concepts.contains("pub const CONCEPT_COUNT: usize = 0;"));
//! ```

mod error;
pub mod prefix;
mod render;
mod writer;

pub use error::{CodegenError, CodegenErrorExt};
pub use prefix::{PREFIX_ALGORITHM_VERSION, derive_prefix, derive_prefix_from_code};
pub use render::{
    concept_identifier, generate_concepts, generate_values, module_name, value_identifier,
    value_set_identifier,
};
pub use writer::{WrittenFile, write_artifacts};

use chrono::{DateTime, SecondsFormat, Utc};
use kreg_domain::Registry;
use tracing::{info, instrument};

/// Inputs of one generation run that do not come from the registry entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    pub generated_at: DateTime<Utc>,
    pub kernel_version: String,
    pub snapshot_id: String,
}

impl GenerationContext {
    /// Context for `registry`, stamped with `generated_at`.
    #[must_use]
    pub fn new(registry: &Registry, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            kernel_version: registry.meta.kernel_version.to_string(),
            snapshot_id: registry.snapshot_id().to_owned(),
        }
    }

    /// Second precision, `Z` suffix.
    #[must_use]
    pub fn generated_at_rfc3339(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Source text of both generated modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifacts {
    pub concepts: String,
    pub values: String,
}

/// Generates both modules for `registry`.
#[instrument(skip_all, fields(snapshot_id = %ctx.snapshot_id))]
pub fn generate(registry: &Registry, ctx: &GenerationContext) -> Result<GeneratedArtifacts, CodegenError> {
    let concepts = generate_concepts(&registry.concepts, ctx)?;
    let values = generate_values(&registry.value_sets, &registry.values, ctx)?;
    info!(
        concepts = registry.concepts.len(),
        value_sets = registry.value_sets.len(),
        values = registry.values.len(),
        "Identifiers generated"
    );
    Ok(GeneratedArtifacts { concepts, values })
}
