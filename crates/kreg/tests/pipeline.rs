use chrono::{TimeZone, Utc};
use kreg::domain::config::KregConfig;
use kreg::domain::drift::DriftType;
use kreg::sync::{MemoryStore, SyncOptions, Synchronizer};
use kreg::{PipelineError, check_drift, compile, generate};
use std::fs;
use tempfile::tempdir;

const CORE: &str = r#"
id = "core"
version = "1.0.0"
domain = "core"

[[concepts]]
code = "INVOICE"
category = "document"
domain = "finance"

[[value_sets]]
code = "ACCOUNT_TYPE"
domain = "finance"

[[values]]
code = "ASSET"
value_set_code = "ACCOUNT_TYPE"
label = "Asset"
"#;

fn config(root: &std::path::Path) -> KregConfig {
    let mut config = KregConfig::default();
    config.packs.dir = root.join("packs");
    config.codegen.out_dir = root.join("generated");
    config.kernel.snapshot_id = Some("pinned".to_owned());
    config
}

#[tokio::test]
async fn compile_generate_sync_and_check() {
    let root = tempdir().unwrap();
    let config = config(root.path());
    fs::create_dir_all(&config.packs.dir).unwrap();
    fs::write(config.packs.dir.join("core.toml"), CORE).unwrap();

    let compiled = compile(&config).await.unwrap();
    assert_eq!(compiled.packs.len(), 1);
    assert_eq!(compiled.registry.snapshot_id(), "pinned");

    let at = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let written = generate(&compiled.registry, &config, at).unwrap();
    assert_eq!(written.len(), 2);
    let values = fs::read_to_string(config.codegen.out_dir.join("values.rs")).unwrap();
    assert!(values.contains("pub const AT_ASSET: &str = \"ASSET\";"));

    let sync = Synchronizer::new(MemoryStore::new(), SyncOptions::default()).unwrap();
    assert_eq!(check_drift(&sync, &compiled.registry).await.unwrap().drift_type, DriftType::Stale);
    sync.sync(&compiled.registry).await.unwrap();
    assert_eq!(check_drift(&sync, &compiled.registry).await.unwrap().drift_type, DriftType::None);
}

#[tokio::test]
async fn bad_kernel_version_is_reported_before_loading() {
    let root = tempdir().unwrap();
    let mut config = config(root.path());
    config.kernel.version = "one".to_owned();

    let err = compile(&config).await.unwrap_err();
    assert!(matches!(err, PipelineError::Version { .. }), "{err}");
    assert!(err.to_string().contains("kernel.version"));
}
