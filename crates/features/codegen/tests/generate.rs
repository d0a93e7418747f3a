use chrono::{DateTime, TimeZone, Utc};
use kreg_codegen::{CodegenError, GenerationContext, generate, generate_concepts, write_artifacts};
use kreg_domain::Registry;
use kreg_domain::config::CodegenConfig;
use kreg_packs::{MergeOptions, PackFormat, merge_packs, parse_pack};
use tempfile::tempdir;

const PACK: &str = r#"{
    "id": "core",
    "version": "1.0.0",
    "domain": "core",
    "concepts": [
        { "code": "SUPPLIER", "category": "party", "domain": "procurement", "description": "A selling party." },
        { "code": "INVOICE", "category": "document", "domain": "procurement" },
        { "code": "PURCHASE_ORDER", "category": "document", "domain": "procurement" }
    ],
    "value_sets": [
        { "code": "ACCOUNT_TYPE", "domain": "finance" },
        { "code": "DOCUMENT_STATUS", "domain": "procurement", "description": "Lifecycle of a document." },
        { "code": "INVOICE_KIND", "domain": "finance", "metadata": { "prefix": "IK" } }
    ],
    "values": [
        { "code": "ASSET", "value_set_code": "ACCOUNT_TYPE", "label": "Asset" },
        { "code": "LIABILITY", "value_set_code": "ACCOUNT_TYPE", "label": "Liability" },
        { "code": "DRAFT", "value_set_code": "DOCUMENT_STATUS", "label": "Draft", "sort_order": 1 },
        { "code": "APPROVED", "value_set_code": "DOCUMENT_STATUS", "label": "Approved", "sort_order": 2 },
        { "code": "CREDIT_NOTE", "value_set_code": "INVOICE_KIND", "label": "Credit note" }
    ]
}"#;

fn registry() -> Registry {
    let pack = parse_pack(PACK, PackFormat::Json, "core.json").unwrap();
    let options = MergeOptions { snapshot_id: Some("snap-1".to_owned()), ..MergeOptions::default() };
    merge_packs(&[pack], &options).unwrap()
}

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn generation_is_byte_identical() {
    let registry = registry();
    let ctx = GenerationContext::new(&registry, at());
    let first = generate(&registry, &ctx).unwrap();
    let second = generate(&registry.clone(), &ctx.clone()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn concept_module_contents() {
    let registry = registry();
    let out = generate(&registry, &GenerationContext::new(&registry, at())).unwrap().concepts;

    assert!(out.contains("pub const GENERATED_AT: &str = \"2026-03-01T12:00:00Z\";"));
    assert!(out.contains("pub const SNAPSHOT_ID: &str = \"snap-1\";"));
    assert!(out.contains("pub const KERNEL_VERSION: &str = \"1.0.0\";"));
    assert!(out.contains("pub const PREFIX_ALGORITHM_VERSION: u32 = 1;"));
    assert!(out.contains("pub const CONCEPT_COUNT: usize = 3;"));
    assert!(out.contains("pub const CONCEPT_INVOICE: &str = \"INVOICE\";"));
    assert!(out.contains("/// A selling party.\npub const CONCEPT_SUPPLIER"));
    assert!(out.contains("    (\"PURCHASE_ORDER\", \"CONCEPT_PURCHASE_ORDER\"),"));
    assert!(out.contains("    (\"SUPPLIER\", \"party\"),"));

    let document = out.find("// --- document ---").unwrap();
    let party = out.find("// --- party ---").unwrap();
    assert!(document < party);
}

#[test]
fn category_grouping_never_changes_identifiers() {
    let registry = registry();
    let ctx = GenerationContext::new(&registry, at());
    let original = generate_concepts(&registry.concepts, &ctx).unwrap();

    let mut regrouped = registry.concepts.clone();
    for concept in &mut regrouped {
        concept.category = "misc".to_owned();
    }
    let changed = generate_concepts(&regrouped, &ctx).unwrap();

    let table = |src: &str| {
        let start = src.find("pub const CONCEPTS").unwrap();
        let end = src[start..].find("];").unwrap();
        src[start..start + end].to_owned()
    };
    assert_eq!(table(&original), table(&changed));
}

#[test]
fn value_module_contents() {
    let registry = registry();
    let out = generate(&registry, &GenerationContext::new(&registry, at())).unwrap().values;

    assert!(out.contains("pub const VALUE_SET_COUNT: usize = 3;"));
    assert!(out.contains("pub const VALUE_COUNT: usize = 5;"));
    assert!(out.contains("pub const VALUESET_ACCOUNT_TYPE: &str = \"ACCOUNT_TYPE\";"));
    assert!(out.contains("pub mod account_type {"));
    assert!(out.contains("    pub const PREFIX: &str = \"AT\";"));
    assert!(out.contains("    pub const AT_ASSET: &str = \"ASSET\";"));
    assert!(out.contains("    pub const AT_LIABILITY: &str = \"LIABILITY\";"));
    assert!(out.contains("    pub const DS_DRAFT: &str = \"DRAFT\";"));
    assert!(out.contains("    pub const IK_CREDIT_NOTE: &str = \"CREDIT_NOTE\";"));
    assert!(out.contains("/// Lifecycle of a document.\npub mod document_status {"));

    let draft = out.find("DS_DRAFT").unwrap();
    let approved = out.find("DS_APPROVED").unwrap();
    assert!(draft < approved, "sort order must be preserved");
}

#[test]
fn account_type_table_has_exactly_two_distinct_entries() {
    let registry = registry();
    let out = generate(&registry, &GenerationContext::new(&registry, at())).unwrap().values;

    let module = &out[out.find("pub mod account_type {").unwrap()..];
    let module = &module[..module.find("\n}\n").unwrap()];
    let table = &module[module.find("pub const VALUES").unwrap()..];
    let rows: Vec<&str> = table.lines().filter(|l| l.trim_start().starts_with("(\"")).collect();
    assert_eq!(rows, ["        (\"ASSET\", \"AT_ASSET\"),", "        (\"LIABILITY\", \"AT_LIABILITY\"),"]);
}

#[test]
fn concept_named_like_a_builtin_collides() {
    let mut registry = registry();
    registry.concepts[0].code = "COUNT".to_owned();
    let err = generate(&registry, &GenerationContext::new(&registry, at())).unwrap_err();
    assert!(
        matches!(err, CodegenError::IdentifierCollision { ref identifier, .. } if identifier == "CONCEPT_COUNT"),
        "{err}"
    );
}

#[test]
fn category_text_cannot_leave_its_comment() {
    let mut registry = registry();
    registry.concepts[1].category = "document ---\npub const INJECTED: u8 = 1; // x".to_owned();
    registry.concepts[2].description = "Selling\rparty.".to_owned();
    let out = generate(&registry, &GenerationContext::new(&registry, at())).unwrap().concepts;

    assert!(!out.lines().any(|l| l.starts_with("pub const INJECTED")), "{out}");
    assert!(out.contains("// --- document --- pub const INJECTED: u8 = 1; // x ---\n"));
    assert!(out.contains("/// Selling\n/// party.\npub const CONCEPT_SUPPLIER"));
    assert!(!out.contains('\r'));
}

#[test]
fn write_artifacts_skips_unchanged_files() {
    let dir = tempdir().unwrap();
    let config = CodegenConfig { out_dir: dir.path().join("generated"), ..CodegenConfig::default() };
    let registry = registry();
    let artifacts = generate(&registry, &GenerationContext::new(&registry, at())).unwrap();

    let first = write_artifacts(&artifacts, &config).unwrap();
    assert!(first.iter().all(|f| f.changed));
    assert_eq!(
        std::fs::read_to_string(config.out_dir.join("concepts.rs")).unwrap(),
        artifacts.concepts
    );

    let second = write_artifacts(&artifacts, &config).unwrap();
    assert!(second.iter().all(|f| !f.changed));
    assert!(!config.out_dir.join("values.rs.tmp").exists());
}
