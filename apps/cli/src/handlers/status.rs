use anyhow::{Context, Result};
use kreg::domain::KernelVersion;
use kreg::domain::config::KregConfig;
use kreg::sync::SyncOptions;
use std::process::ExitCode;

pub async fn run(config: &KregConfig) -> Result<ExitCode> {
    let version: KernelVersion = config.kernel.version.parse().context("kernel.version")?;
    let line = version.line();
    let sync = kreg::connect(config, SyncOptions::from(&config.sync)).await?;

    match sync.get_current_kernel_version(&line).await? {
        Some(row) => {
            println!("kernel line {line}: snapshot {} (kernel {})", row.snapshot_id, row.kernel_version);
            println!("  applied at {}", row.applied_at.to_rfc3339());
        },
        None => println!("kernel line {line}: no current snapshot"),
    }
    Ok(ExitCode::SUCCESS)
}
