use super::{compile, drift_exit, print_drift};
use crate::args::DriftArgs;
use anyhow::{Context, Result};
use kreg::domain::config::KregConfig;
use kreg::sync::SyncOptions;
use std::process::ExitCode;

pub async fn run(config: KregConfig, args: &DriftArgs) -> Result<ExitCode> {
    let (config, compiled) = compile(config, &args.packs).await?;
    let sync = kreg::connect(&config, SyncOptions::from(&config.sync)).await?;
    let result = kreg::check_drift(&sync, &compiled.registry).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result).context("Encoding drift report")?);
    } else {
        print_drift(&result);
    }
    Ok(drift_exit(&result))
}
