//! One module per subcommand. Each returns the process exit code.

pub mod drift;
pub mod generate;
pub mod status;
pub mod sync;
pub mod validate;

use crate::args::PacksArgs;
use crate::{EXIT_DRIFT, EXIT_OK};
use anyhow::{Context, Result};
use kreg::Compiled;
use kreg::domain::config::KregConfig;
use kreg::domain::drift::{DriftResult, EntityDiff};
use std::process::ExitCode;

/// Applies `--packs` and compiles the registry.
pub(crate) async fn compile(mut config: KregConfig, args: &PacksArgs) -> Result<(KregConfig, Compiled)> {
    if let Some(dir) = &args.packs {
        config.packs.dir.clone_from(dir);
    }
    let compiled = kreg::compile(&config)
        .await
        .with_context(|| format!("Compiling packs from {}", config.packs.dir.display()))?;
    Ok((config, compiled))
}

pub(crate) fn drift_exit(result: &DriftResult) -> ExitCode {
    ExitCode::from(if result.has_drift { EXIT_DRIFT } else { EXIT_OK })
}

fn print_diff(kind: &str, diff: &EntityDiff) {
    if diff.is_empty() {
        return;
    }
    println!("  {kind}: +{} -{}", diff.added.len(), diff.removed.len());
    for code in &diff.added {
        println!("    + {code}");
    }
    for code in &diff.removed {
        println!("    - {code}");
    }
}

pub(crate) fn print_drift(result: &DriftResult) {
    let details = &result.details;
    println!("drift: {} (kernel line {})", result.drift_type, details.kernel_line);
    println!("  database snapshot: {}", details.database_snapshot.as_deref().unwrap_or("-"));
    println!("  registry snapshot: {}", details.registry_snapshot);
    if details.current_rows != 1 {
        println!("  current rows: {}", details.current_rows);
    }
    print_diff("concepts", &details.concepts);
    print_diff("value sets", &details.value_sets);
    print_diff("values", &details.values);
    for hint in &result.recommendations {
        println!("hint: {hint}");
    }
}
