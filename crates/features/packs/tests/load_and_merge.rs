use kreg_domain::{KernelVersion, Pack};
use kreg_packs::{MergeError, MergeOptions, PackError, PackFormat, load_packs, merge_packs, parse_pack};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CORE: &str = r#"{
    "id": "core",
    "name": "Core",
    "version": "1.0.0",
    "domain": "core",
    "concepts": [
        { "code": "INVOICE", "category": "document", "domain": "procurement" },
        { "code": "PURCHASE_ORDER", "category": "document", "domain": "procurement" }
    ],
    "value_sets": [
        { "code": "DOCUMENT_STATUS", "domain": "procurement" }
    ],
    "values": [
        { "code": "DRAFT", "value_set_code": "DOCUMENT_STATUS", "label": "Draft", "sort_order": 1 },
        { "code": "APPROVED", "value_set_code": "DOCUMENT_STATUS", "label": "Approved", "sort_order": 2 }
    ]
}"#;

const FINANCE: &str = r#"
id = "finance"
version = "2.1.0"
domain = "finance"
priority = 10

[[value_sets]]
code = "ACCOUNT_TYPE"
domain = "finance"

[[values]]
code = "LIABILITY"
value_set_code = "ACCOUNT_TYPE"
label = "Liability"

[[values]]
code = "ASSET"
value_set_code = "ACCOUNT_TYPE"
label = "Asset"

[[values]]
code = "ARCHIVED"
value_set_code = "DOCUMENT_STATUS"
label = "Archived"
"#;

fn write(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

fn options() -> MergeOptions {
    MergeOptions { kernel_version: KernelVersion::new(1, 0, 0), snapshot_id: None }
}

#[tokio::test]
async fn loads_nested_packs_and_merges_them() {
    let dir = tempdir().unwrap();
    write(dir.path(), "core.json", CORE);
    write(dir.path(), "domains/finance.toml", FINANCE);
    write(dir.path(), "README.md", "# not a pack");

    let packs = load_packs(dir.path()).await.unwrap();
    let ids: Vec<_> = packs.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["core", "finance"]);

    let registry = merge_packs(&packs, &options()).unwrap();
    assert_eq!(registry.concepts.len(), 2);
    assert_eq!(registry.value_sets.len(), 2);
    assert_eq!(registry.values.len(), 5);
    assert_eq!(registry.kernel_line(), "v1");
    assert_eq!(registry.meta.packs.len(), 2);

    let order: Vec<_> = registry.values.iter().map(|v| v.key().to_string()).collect();
    assert_eq!(
        order,
        [
            "ACCOUNT_TYPE.ASSET",
            "ACCOUNT_TYPE.LIABILITY",
            "DOCUMENT_STATUS.DRAFT",
            "DOCUMENT_STATUS.APPROVED",
            "DOCUMENT_STATUS.ARCHIVED",
        ]
    );
}

#[tokio::test]
async fn duplicate_concept_across_packs_names_both_packs() {
    let dir = tempdir().unwrap();
    write(dir.path(), "core.json", CORE);
    write(
        dir.path(),
        "finance.json",
        r#"{
            "id": "finance", "version": "1.0.0", "domain": "finance", "priority": 5,
            "concepts": [{ "code": "INVOICE", "category": "document", "domain": "finance" }]
        }"#,
    );

    let packs = load_packs(dir.path()).await.unwrap();
    let err = merge_packs(&packs, &options()).unwrap_err();
    match &err {
        MergeError::DuplicateConcept { code, pack, first_pack, .. } => {
            assert_eq!(code, "INVOICE");
            assert_eq!(pack, "finance");
            assert_eq!(first_pack, "core");
        },
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("INVOICE") && message.contains("finance"), "{message}");
}

#[tokio::test]
async fn invalid_pack_aborts_the_load() {
    let dir = tempdir().unwrap();
    write(dir.path(), "core.json", CORE);
    write(dir.path(), "broken.json", &CORE.replace("\"core\"", "\"broken\"").replace("DRAFT", "draft"));

    let err = load_packs(dir.path()).await.unwrap_err();
    assert!(matches!(err, PackError::Invalid { ref pack, .. } if pack == "broken"), "{err}");
}

#[tokio::test]
async fn same_pack_id_in_two_files_is_rejected() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/core.json", CORE);
    write(dir.path(), "b/core.json", CORE);

    let err = load_packs(dir.path()).await.unwrap_err();
    assert!(matches!(err, PackError::DuplicatePack { .. }), "{err}");
}

#[tokio::test]
async fn missing_directory_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_packs(dir.path().join("nope")).await.unwrap_err();
    assert!(matches!(err, PackError::Walk { .. }), "{err}");
}

#[test]
fn unknown_value_set_is_fatal() {
    let finance = parse_pack(FINANCE, PackFormat::Toml, "finance.toml").unwrap();
    let err = merge_packs(&[finance], &options()).unwrap_err();
    assert!(
        matches!(err, MergeError::UnknownValueSet { ref value_set_code, ref pack, .. }
            if value_set_code == "DOCUMENT_STATUS" && pack == "finance"),
        "{err}"
    );
}

#[test]
fn duplicate_value_set_is_fatal() {
    let core = parse_pack(CORE, PackFormat::Json, "core.json").unwrap();
    let mut copy: Pack = core.clone();
    copy.id = "core-eu".to_owned();
    copy.concepts.clear();
    copy.values.clear();

    let err = merge_packs(&[core, copy], &options()).unwrap_err();
    assert!(matches!(err, MergeError::DuplicateValueSet { ref code, .. } if code == "DOCUMENT_STATUS"));
}

#[test]
fn duplicate_value_key_is_fatal_but_same_code_in_other_set_is_not() {
    let core = parse_pack(CORE, PackFormat::Json, "core.json").unwrap();
    let extra = parse_pack(
        r#"{
            "id": "extra", "version": "1.0.0", "domain": "x",
            "value_sets": [{ "code": "REVIEW_STATUS", "domain": "x" }],
            "values": [{ "code": "DRAFT", "value_set_code": "REVIEW_STATUS", "label": "Draft" }]
        }"#,
        PackFormat::Json,
        "extra.json",
    )
    .unwrap();
    assert!(merge_packs(&[core.clone(), extra], &options()).is_ok());

    let clash = parse_pack(
        r#"{
            "id": "clash", "version": "1.0.0", "domain": "x",
            "values": [{ "code": "DRAFT", "value_set_code": "DOCUMENT_STATUS", "label": "Draft again" }]
        }"#,
        PackFormat::Json,
        "clash.json",
    )
    .unwrap();
    let err = merge_packs(&[core, clash], &options()).unwrap_err();
    assert!(matches!(err, MergeError::DuplicateValue { ref first_pack, .. } if first_pack == "core"));
}

#[test]
fn pinned_snapshot_id_wins_and_derived_one_is_content_addressed() {
    let core = parse_pack(CORE, PackFormat::Json, "core.json").unwrap();

    let derived = merge_packs(std::slice::from_ref(&core), &options()).unwrap();
    assert_eq!(derived.snapshot_id().len(), 16);

    let pinned = merge_packs(
        std::slice::from_ref(&core),
        &MergeOptions { snapshot_id: Some("release-42".to_owned()), ..options() },
    )
    .unwrap();
    assert_eq!(pinned.snapshot_id(), "release-42");

    let mut edited = core;
    edited.concepts[0].description = "Changed".to_owned();
    let changed = merge_packs(&[edited], &options()).unwrap();
    assert_ne!(changed.snapshot_id(), derived.snapshot_id());
}
