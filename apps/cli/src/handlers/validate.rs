use super::compile;
use crate::args::PacksArgs;
use anyhow::Result;
use kreg::Compiled;
use kreg::domain::config::KregConfig;
use std::process::ExitCode;

pub async fn run(config: KregConfig, args: &PacksArgs) -> Result<ExitCode> {
    let (_, Compiled { packs, registry }) = compile(config, args).await?;

    println!(
        "registry {} (kernel {}, line {})",
        registry.snapshot_id(),
        registry.meta.kernel_version,
        registry.kernel_line()
    );
    let ids: Vec<String> = packs.iter().map(|p| format!("{}@{}", p.id, p.version)).collect();
    println!("  packs: {}", ids.join(", "));
    println!(
        "  concepts: {}, value sets: {}, values: {}",
        registry.concepts.len(),
        registry.value_sets.len(),
        registry.values.len()
    );
    Ok(ExitCode::SUCCESS)
}
