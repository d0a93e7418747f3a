//! Kernel utilities shared across pipeline stages.
//! Keep this crate lightweight; today it owns layered configuration loading.
//!
//! ## Config loading
//! ```rust,no_run
//! use kreg_kernel::config::load_kreg_config;
//!
//! let cfg = load_kreg_config(None::<&str>).unwrap();
//! println!("packs live in {}", cfg.packs.dir.display());
//! ```
pub mod config;

pub use kreg_domain as domain;
