//! # Domain Models
//!
//! Pure data types of the kernel registry: concepts, value sets, values, packs, the merged
//! [`registry::Registry`], persisted snapshot rows and drift reports.
//! Keep it lean: no I/O, networking, or pipeline logic. Just data and the helpers that
//! protect its invariants.

pub mod config;
pub mod drift;
pub mod kinds;
pub mod model;
pub mod registry;
pub mod snapshot;

pub use kinds::EntityKinds;
pub use model::{Concept, Metadata, Pack, Value, ValueKey, ValueSet};
pub use registry::{KernelVersion, PackRef, Registry, RegistryMeta};
pub use snapshot::{DatabaseState, MetadataRow};
