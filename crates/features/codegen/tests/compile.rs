use chrono::{TimeZone, Utc};
use kreg_codegen::{GenerationContext, generate, write_artifacts};
use kreg_domain::config::CodegenConfig;
use kreg_domain::{Concept, KernelVersion, Registry, RegistryMeta, Value, ValueSet};
use std::fmt::Write as _;
use std::path::Path;

fn concept(code: &str, category: &str, description: &str) -> Concept {
    Concept {
        code: code.to_owned(),
        category: category.to_owned(),
        domain: "procurement".to_owned(),
        description: description.to_owned(),
        tags: vec![],
    }
}

fn value_set(code: &str, description: &str) -> ValueSet {
    ValueSet {
        code: code.to_owned(),
        domain: "finance".to_owned(),
        description: description.to_owned(),
        metadata: serde_json::Map::new(),
    }
}

fn value(set: &str, code: &str, label: &str) -> Value {
    Value {
        code: code.to_owned(),
        value_set_code: set.to_owned(),
        label: label.to_owned(),
        description: String::new(),
        sort_order: None,
        metadata: serde_json::Map::new(),
    }
}

/// Built by hand so that text the validator would reject still reaches the renderer.
fn registry() -> Registry {
    Registry {
        meta: RegistryMeta {
            kernel_version: KernelVersion::new(1, 2, 0),
            snapshot_id: "0123456789abcdef".to_owned(),
            packs: vec![],
        },
        concepts: vec![
            concept("INVOICE", "document ---\npub const INJECTED: u8 = 1; // x", "Bill.\rOwed \"now\"."),
            concept("LEDGER", "book", "Ends with a backslash \\ */ /* {braces} and ✓"),
            concept("SUPPLIER", "party", ""),
        ],
        value_sets: vec![
            value_set("ACCOUNT_TYPE", "Kinds of account.\r\n\r\nSecond paragraph."),
            value_set("EMPTY_SET", ""),
            value_set("TYPE", "Named like a keyword."),
        ],
        values: vec![
            value("ACCOUNT_TYPE", "ASSET", "Asset \"owned\""),
            value("ACCOUNT_TYPE", "LIABILITY", "Liability\r"),
            value("TYPE", "PRIMARY", "Zählung \\ primary"),
        ],
    }
}

const CHECKS: &str = r#"
fn main() {
    assert_eq!(concepts::CONCEPT_COUNT, 3);
    assert_eq!(concepts::CONCEPT_INVOICE, "INVOICE");
    assert_eq!(concepts::CONCEPT_CATEGORIES[0], ("INVOICE", "document ---\npub const INJECTED: u8 = 1; // x"));
    assert_eq!(values::VALUE_SET_COUNT, 3);
    assert_eq!(values::VALUE_COUNT, 3);
    assert_eq!(values::account_type::VALUES, &[("ASSET", "AT_ASSET"), ("LIABILITY", "AT_LIABILITY")]);
    assert_eq!(values::account_type::AT_ASSET, "ASSET");
    assert!(values::empty_set::VALUES.is_empty());
    assert_eq!(values::type_::CODE, "TYPE");
    assert_eq!(values::type_::TYP_PRIMARY, "PRIMARY");
}
"#;

#[test]
fn generated_modules_compile() {
    let root = Path::new(env!("CARGO_TARGET_TMPDIR")).join("generated-modules");
    let config = CodegenConfig { out_dir: root.join("kernel"), ..CodegenConfig::default() };

    let registry = registry();
    let ctx = GenerationContext::new(&registry, Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    let artifacts = generate(&registry, &ctx).unwrap();
    assert!(!artifacts.concepts.lines().any(|l| l.starts_with("pub const INJECTED")));
    write_artifacts(&artifacts, &config).unwrap();

    let mut main = String::from("#![allow(dead_code)]\n\n");
    for (module, file) in [("concepts", &config.concepts_file), ("values", &config.values_file)] {
        let path = config.out_dir.join(file);
        writeln!(main, "#[path = {:?}]\nmod {module};", path.display().to_string()).unwrap();
    }
    main.push_str(CHECKS);
    let main_path = root.join("generated_modules.rs");
    std::fs::write(&main_path, main).unwrap();

    trybuild::TestCases::new().pass(&main_path);
}
