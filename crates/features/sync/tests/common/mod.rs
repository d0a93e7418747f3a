#![allow(dead_code, unreachable_pub)]

use kreg_domain::{Concept, KernelVersion, Metadata, Pack, Registry, Value, ValueSet};
use kreg_packs::{MergeOptions, merge_packs};

pub fn concept(code: &str) -> Concept {
    Concept {
        code: code.to_owned(),
        category: "document".to_owned(),
        domain: "finance".to_owned(),
        description: String::new(),
        tags: vec![],
    }
}

/// A registry with the given concepts and `values` generated members of one `BULK` set.
pub fn registry(snapshot_id: &str, concepts: &[&str], values: usize) -> Registry {
    let pack = Pack {
        id: "core".to_owned(),
        name: "Core".to_owned(),
        version: "1.0.0".to_owned(),
        domain: "core".to_owned(),
        description: String::new(),
        priority: 0,
        concepts: concepts.iter().copied().map(concept).collect(),
        value_sets: vec![ValueSet {
            code: "BULK".to_owned(),
            domain: "finance".to_owned(),
            description: "Generated members".to_owned(),
            metadata: Metadata::new(),
        }],
        values: (0..values)
            .map(|i| Value {
                code: format!("V{i:04}"),
                value_set_code: "BULK".to_owned(),
                label: format!("Value {i}"),
                description: String::new(),
                sort_order: None,
                metadata: Metadata::new(),
            })
            .collect(),
    };
    let options = MergeOptions {
        kernel_version: KernelVersion::new(1, 0, 0),
        snapshot_id: Some(snapshot_id.to_owned()),
    };
    merge_packs(&[pack], &options).unwrap()
}
