//! # Packs
//!
//! The front half of the compiler: validate pack documents, load them from disk and merge
//! them into one canonical [`Registry`](kreg_domain::Registry).
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use kreg_packs::{MergeOptions, load_packs, merge_packs};
//!
//! let packs = load_packs("packs").await?;
//! let registry = merge_packs(&packs, &MergeOptions::default())?;
//! println!("snapshot {}", registry.snapshot_id());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod loader;
pub mod merger;
pub mod validator;

pub use error::{PackError, PackErrorExt};
pub use loader::{PackFormat, discover_packs, load_pack, load_packs, parse_pack};
pub use merger::{MergeError, MergeErrorExt, MergeOptions, merge_packs};
pub use validator::{EntityKind, Validate, ValidationError, ValidationErrorExt};
