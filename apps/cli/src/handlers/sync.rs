use super::{compile, drift_exit, print_drift};
use crate::args::SyncArgs;
use anyhow::Result;
use kreg::domain::config::KregConfig;
use kreg::sync::{SnapshotState, SyncOptions, SyncReport};
use std::process::ExitCode;
use tracing::warn;

fn options(config: &KregConfig, args: &SyncArgs) -> SyncOptions {
    let mut options = SyncOptions::from(&config.sync);
    if let Some(kinds) = args.only {
        options.kinds = kinds;
    }
    if let Some(size) = args.batch_size {
        options.batch_size = size;
    }
    options.skip_deactivation |= args.skip_deactivation;
    options.retire_stale |= args.retire_stale;
    options.activate_on_partial |= args.activate_on_partial;
    options
}

fn print_report(report: &SyncReport) {
    println!(
        "synced {} rows (concepts {}, value sets {}, values {})",
        report.total_synced, report.concepts_synced, report.value_sets_synced, report.values_synced
    );
    for error in &report.errors {
        println!("  failed: {error}");
    }
    if report.retired > 0 {
        println!("  retired {} stale rows", report.retired);
    }
    match &report.snapshot {
        SnapshotState::OneCurrent(row) => println!("  current snapshot: {}", row.snapshot_id),
        SnapshotState::NoCurrent => println!("  no current snapshot"),
        SnapshotState::Transitioning { rows } => println!("  transitioning: {} current rows", rows.len()),
    }
}

pub async fn run(config: KregConfig, args: &SyncArgs) -> Result<ExitCode> {
    let (config, compiled) = compile(config, &args.packs).await?;
    let sync = kreg::connect(&config, options(&config, args)).await?;

    let before = kreg::check_drift(&sync, &compiled.registry).await?;
    print_drift(&before);
    if !args.apply {
        return Ok(drift_exit(&before));
    }

    let report = sync.sync(&compiled.registry).await?;
    print_report(&report);
    if !report.activated {
        warn!(failed = report.errors.len(), "Snapshot not activated; re-run after fixing failed batches");
    }

    let after = kreg::check_drift(&sync, &compiled.registry).await?;
    if after.has_drift {
        print_drift(&after);
    }
    Ok(drift_exit(&after))
}
