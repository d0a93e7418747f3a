//! Merges validated packs into one canonical [`Registry`].
//!
//! Packs are consumed in the order given (the loader's `(priority, id)` order). The first pack
//! to declare a code owns it; any later declaration of the same code is fatal, there is no
//! override or silent last-write-wins.

use kreg_domain::{Concept, KernelVersion, Pack, PackRef, Registry, RegistryMeta, Value, ValueKey, ValueSet};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{debug, info, instrument};

/// Number of hex characters of the content hash used as derived snapshot id.
pub const SNAPSHOT_ID_LEN: usize = 16;

#[kreg_derive::kreg_error]
pub enum MergeError {
    #[error("Duplicate concept code \"{code}\" in pack '{pack}' (first declared by '{first_pack}'){}", format_context(.context))]
    DuplicateConcept { code: String, pack: String, first_pack: String, context: Option<Cow<'static, str>> },

    #[error("Duplicate value set code \"{code}\" in pack '{pack}' (first declared by '{first_pack}'){}", format_context(.context))]
    DuplicateValueSet { code: String, pack: String, first_pack: String, context: Option<Cow<'static, str>> },

    #[error("Duplicate value \"{value_set_code}.{code}\" in pack '{pack}' (first declared by '{first_pack}'){}", format_context(.context))]
    DuplicateValue {
        value_set_code: String,
        code: String,
        pack: String,
        first_pack: String,
        context: Option<Cow<'static, str>>,
    },

    #[error("Value \"{value_set_code}.{code}\" in pack '{pack}' references unknown value set \"{value_set_code}\"{}", format_context(.context))]
    UnknownValueSet { value_set_code: String, code: String, pack: String, context: Option<Cow<'static, str>> },

    #[error("Snapshot hashing failed{}: {source}", format_context(.context))]
    Snapshot { source: serde_json::Error, context: Option<Cow<'static, str>> },
}

/// Identity inputs of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub kernel_version: KernelVersion,
    /// A pinned snapshot id; derived from the merged content when `None`.
    pub snapshot_id: Option<String>,
}

/// An entity together with the id of the pack that declared it.
struct Owned<T> {
    entity: T,
    pack: String,
}

#[derive(Default)]
struct Merger {
    concepts: BTreeMap<String, Owned<Concept>>,
    value_sets: BTreeMap<String, Owned<ValueSet>>,
    values: BTreeMap<ValueKey, Owned<Value>>,
}

impl Merger {
    fn add_pack(&mut self, pack: &Pack) -> Result<(), MergeError> {
        for concept in &pack.concepts {
            match self.concepts.entry(concept.code.clone()) {
                Entry::Occupied(first) => {
                    return Err(MergeError::DuplicateConcept {
                        code: concept.code.clone(),
                        pack: pack.id.clone(),
                        first_pack: first.get().pack.clone(),
                        context: None,
                    });
                },
                Entry::Vacant(slot) => {
                    slot.insert(Owned { entity: concept.clone(), pack: pack.id.clone() });
                },
            }
        }

        for set in &pack.value_sets {
            match self.value_sets.entry(set.code.clone()) {
                Entry::Occupied(first) => {
                    return Err(MergeError::DuplicateValueSet {
                        code: set.code.clone(),
                        pack: pack.id.clone(),
                        first_pack: first.get().pack.clone(),
                        context: None,
                    });
                },
                Entry::Vacant(slot) => {
                    slot.insert(Owned { entity: set.clone(), pack: pack.id.clone() });
                },
            }
        }

        for value in &pack.values {
            match self.values.entry(value.key()) {
                Entry::Occupied(first) => {
                    return Err(MergeError::DuplicateValue {
                        value_set_code: value.value_set_code.clone(),
                        code: value.code.clone(),
                        pack: pack.id.clone(),
                        first_pack: first.get().pack.clone(),
                        context: None,
                    });
                },
                Entry::Vacant(slot) => {
                    slot.insert(Owned { entity: value.clone(), pack: pack.id.clone() });
                },
            }
        }

        Ok(())
    }

    /// Values may reference sets from any pack, so references are checked once all packs are in.
    fn check_references(&self) -> Result<(), MergeError> {
        match self.values.values().find(|v| !self.value_sets.contains_key(&v.entity.value_set_code)) {
            Some(orphan) => Err(MergeError::UnknownValueSet {
                value_set_code: orphan.entity.value_set_code.clone(),
                code: orphan.entity.code.clone(),
                pack: orphan.pack.clone(),
                context: None,
            }),
            None => Ok(()),
        }
    }
}

/// Merges `packs`, in order, into a registry.
#[instrument(skip_all, fields(packs = packs.len(), kernel_version = %options.kernel_version))]
pub fn merge_packs(packs: &[Pack], options: &MergeOptions) -> Result<Registry, MergeError> {
    let mut merger = Merger::default();
    for pack in packs {
        merger.add_pack(pack)?;
        debug!(pack = %pack.id, entities = pack.entity_count(), "Pack merged");
    }
    merger.check_references()?;

    let concepts: Vec<Concept> = merger.concepts.into_values().map(|o| o.entity).collect();
    let value_sets: Vec<ValueSet> = merger.value_sets.into_values().map(|o| o.entity).collect();
    let mut values: Vec<Value> = merger.values.into_values().map(|o| o.entity).collect();
    values.sort_by(compare_values);

    let snapshot_id = match &options.snapshot_id {
        Some(pinned) => pinned.clone(),
        None => snapshot_hash(&concepts, &value_sets, &values)?,
    };

    let registry = Registry {
        meta: RegistryMeta {
            kernel_version: options.kernel_version.clone(),
            snapshot_id,
            packs: packs.iter().map(|p| PackRef { id: p.id.clone(), version: p.version.clone() }).collect(),
        },
        concepts,
        value_sets,
        values,
    };

    info!(
        snapshot_id = %registry.snapshot_id(),
        concepts = registry.concepts.len(),
        value_sets = registry.value_sets.len(),
        values = registry.values.len(),
        "Registry merged"
    );
    Ok(registry)
}

/// Registry value order: set code, then explicit sort order (present before absent), then code.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    a.value_set_code
        .cmp(&b.value_set_code)
        .then_with(|| match (a.sort_order, b.sort_order) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.code.cmp(&b.code))
}

#[derive(Serialize)]
struct Canonical<'a> {
    concepts: &'a [Concept],
    value_sets: &'a [ValueSet],
    values: &'a [Value],
}

/// First [`SNAPSHOT_ID_LEN`] hex chars of the SHA-256 of the canonical JSON of the sorted entities.
///
/// Metadata maps serialize with sorted keys, so the hash depends on content only.
pub fn snapshot_hash(concepts: &[Concept], value_sets: &[ValueSet], values: &[Value]) -> Result<String, MergeError> {
    let canonical = serde_json::to_vec(&Canonical { concepts, value_sets, values })?;
    let mut digest = hex::encode(Sha256::digest(&canonical));
    digest.truncate(SNAPSHOT_ID_LEN);
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(set: &str, code: &str, sort_order: Option<i64>) -> Value {
        Value {
            code: code.to_owned(),
            value_set_code: set.to_owned(),
            label: code.to_owned(),
            description: String::new(),
            sort_order,
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn values_with_sort_order_come_first() {
        let mut values = vec![
            value("STATUS", "ZULU", None),
            value("STATUS", "ALPHA", None),
            value("STATUS", "LATE", Some(9)),
            value("ACCOUNT_TYPE", "X", None),
            value("STATUS", "EARLY", Some(1)),
        ];
        values.sort_by(compare_values);
        let keys: Vec<_> = values.iter().map(|v| v.key().to_string()).collect();
        assert_eq!(keys, ["ACCOUNT_TYPE.X", "STATUS.EARLY", "STATUS.LATE", "STATUS.ALPHA", "STATUS.ZULU"]);
    }

    #[test]
    fn snapshot_hash_is_stable_and_short() {
        let values = vec![value("STATUS", "OPEN", Some(1))];
        let a = snapshot_hash(&[], &[], &values).unwrap();
        let b = snapshot_hash(&[], &[], &values).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), SNAPSHOT_ID_LEN);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));

        let other = snapshot_hash(&[], &[], &[value("STATUS", "CLOSED", Some(1))]).unwrap();
        assert_ne!(a, other);
    }
}
