use super::compile;
use crate::args::GenerateArgs;
use anyhow::{Context, Result};
use chrono::Utc;
use kreg::domain::config::KregConfig;
use std::process::ExitCode;

pub async fn run(config: KregConfig, args: &GenerateArgs) -> Result<ExitCode> {
    let (mut config, compiled) = compile(config, &args.packs).await?;
    if let Some(out) = &args.out {
        config.codegen.out_dir.clone_from(out);
    }

    let generated_at = args.timestamp.unwrap_or_else(Utc::now);
    let written = kreg::generate(&compiled.registry, &config, generated_at)
        .context("Generating registry constants")?;

    for file in &written {
        let status = if file.changed { "wrote" } else { "unchanged" };
        println!("{status} {}", file.path.display());
    }
    Ok(ExitCode::SUCCESS)
}
