//! # Drift Detector
//!
//! Compares a decoded [`DatabaseState`] with a compiled [`Registry`]. Pure: no I/O, no clock.
//! Drift is returned as a [`DriftResult`]; it is never an error.
//!
//! Classification, first match wins:
//! 1. [`DriftType::Stale`]: the kernel line has no current snapshot, or several.
//! 2. [`DriftType::EntityMismatch`]: active database entities differ from the registry.
//! 3. [`DriftType::VersionMismatch`]: same entities, different snapshot id.
//! 4. [`DriftType::None`].

use fxhash::FxHashSet;
use kreg_domain::drift::{DriftDetails, DriftResult, DriftType, EntityDiff};
use kreg_domain::{DatabaseState, Registry};
use std::fmt::Display;
use tracing::{debug, instrument};

pub use kreg_domain::drift;

/// Additions and removals between two key sets, each sorted.
fn diff<K>(registry: impl IntoIterator<Item = K>, database: impl IntoIterator<Item = K>) -> EntityDiff
where
    K: Display + Eq + std::hash::Hash,
{
    let registry: FxHashSet<K> = registry.into_iter().collect();
    let database: FxHashSet<K> = database.into_iter().collect();

    let mut added: Vec<String> = registry.difference(&database).map(ToString::to_string).collect();
    let mut removed: Vec<String> = database.difference(&registry).map(ToString::to_string).collect();
    added.sort_unstable();
    removed.sort_unstable();
    EntityDiff { added, removed }
}

fn recommendations(drift_type: DriftType, details: &DriftDetails) -> Vec<String> {
    let line = &details.kernel_line;
    let mut out = Vec::new();
    match drift_type {
        DriftType::None => {},
        DriftType::Stale if details.current_rows == 0 => {
            out.push(format!("No current snapshot for {line}: run `kreg sync --apply`."));
            out.push("Use `--skip-deactivation` only when seeding an empty database.".to_owned());
        },
        DriftType::Stale => {
            out.push(format!(
                "{} snapshots are flagged current for {line}: run `kreg sync --apply` to settle the line.",
                details.current_rows
            ));
        },
        DriftType::EntityMismatch => {
            let diffs = [&details.concepts, &details.value_sets, &details.values];
            let added: usize = diffs.iter().map(|d| d.added.len()).sum();
            let removed: usize = diffs.iter().map(|d| d.removed.len()).sum();
            if added > 0 {
                out.push(format!(
                    "{added} registry entities are missing from the database: run `kreg sync --apply`."
                ));
            }
            if removed > 0 {
                out.push(format!(
                    "{removed} database entities are no longer in the registry: \
                     run `kreg sync --apply --retire-stale`."
                ));
            }
        },
        DriftType::VersionMismatch => {
            out.push(format!(
                "Entities match but {line} records snapshot {}: run `kreg sync --apply` to record {}.",
                details.database_snapshot.as_deref().unwrap_or("-"),
                details.registry_snapshot
            ));
        },
    }
    out
}

/// Classifies the drift between `state` and `registry`.
#[instrument(skip_all, fields(kernel_line = %state.kernel_line, snapshot_id = %registry.snapshot_id()))]
#[must_use]
pub fn detect_drift(state: &DatabaseState, registry: &Registry) -> DriftResult {
    let details = DriftDetails {
        kernel_line: registry.kernel_line(),
        database_snapshot: state.current_row().map(|row| row.snapshot_id.clone()),
        registry_snapshot: registry.snapshot_id().to_owned(),
        current_rows: state.current.len(),
        concepts: diff(
            registry.concepts.iter().map(|c| c.code.as_str()),
            state.concepts.iter().map(String::as_str),
        ),
        value_sets: diff(
            registry.value_sets.iter().map(|s| s.code.as_str()),
            state.value_sets.iter().map(String::as_str),
        ),
        values: diff(registry.value_keys(), state.values.iter().cloned()),
    };

    let entities_differ = [&details.concepts, &details.value_sets, &details.values]
        .into_iter()
        .any(|diff| !diff.is_empty());
    let drift_type = match state.current_row() {
        None => DriftType::Stale,
        Some(_) if entities_differ => DriftType::EntityMismatch,
        Some(row) if row.snapshot_id != registry.snapshot_id() => DriftType::VersionMismatch,
        Some(_) => DriftType::None,
    };
    debug!(%drift_type, current_rows = details.current_rows, "Drift classified");

    DriftResult {
        has_drift: drift_type != DriftType::None,
        drift_type,
        recommendations: recommendations(drift_type, &details),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kreg_domain::{Concept, KernelVersion, MetadataRow, RegistryMeta, ValueKey};

    fn registry(snapshot_id: &str, concepts: &[&str]) -> Registry {
        Registry {
            meta: RegistryMeta {
                kernel_version: KernelVersion::new(1, 0, 0),
                snapshot_id: snapshot_id.to_owned(),
                packs: vec![],
            },
            concepts: concepts
                .iter()
                .map(|code| Concept {
                    code: (*code).to_owned(),
                    category: "document".to_owned(),
                    domain: "finance".to_owned(),
                    description: String::new(),
                    tags: vec![],
                })
                .collect(),
            value_sets: vec![],
            values: vec![],
        }
    }

    fn current(snapshot_id: &str) -> MetadataRow {
        MetadataRow {
            kernel_version: "1.0.0".to_owned(),
            kernel_line: "v1".to_owned(),
            snapshot_id: snapshot_id.to_owned(),
            applied_at: Utc::now(),
            is_current: true,
        }
    }

    fn state(rows: Vec<MetadataRow>, concepts: &[&str]) -> DatabaseState {
        DatabaseState {
            kernel_line: "v1".to_owned(),
            current: rows,
            concepts: concepts.iter().map(|c| (*c).to_owned()).collect(),
            ..DatabaseState::default()
        }
    }

    #[test]
    fn empty_database_is_stale() {
        let result = detect_drift(&DatabaseState::default(), &registry("s1", &["INVOICE"]));
        assert_eq!(result.drift_type, DriftType::Stale);
        assert!(result.has_drift);
        assert_eq!(result.exit_code(), 2);
        assert_eq!(result.details.concepts.added, ["INVOICE"]);
        assert!(result.recommendations[0].contains("No current snapshot for v1"));
    }

    #[test]
    fn several_current_rows_are_stale_even_when_entities_match() {
        let db = state(vec![current("s1"), current("s2")], &["INVOICE"]);
        let result = detect_drift(&db, &registry("s2", &["INVOICE"]));
        assert_eq!(result.drift_type, DriftType::Stale);
        assert_eq!(result.details.current_rows, 2);
        assert_eq!(result.details.database_snapshot, None);
    }

    #[test]
    fn entity_mismatch_outranks_version_mismatch() {
        let db = state(vec![current("s1")], &["INVOICE", "LEGACY"]);
        let result = detect_drift(&db, &registry("s2", &["INVOICE", "SUPPLIER"]));
        assert_eq!(result.drift_type, DriftType::EntityMismatch);
        assert_eq!(result.details.concepts.added, ["SUPPLIER"]);
        assert_eq!(result.details.concepts.removed, ["LEGACY"]);
        assert_eq!(result.recommendations.len(), 2);
    }

    #[test]
    fn snapshot_change_alone_is_a_version_mismatch() {
        let db = state(vec![current("v1-snapshot")], &["INVOICE"]);
        let result = detect_drift(&db, &registry("v2-snapshot", &["INVOICE"]));
        assert_eq!(result.drift_type, DriftType::VersionMismatch);
        assert_eq!(result.details.database_snapshot.as_deref(), Some("v1-snapshot"));
        assert!(result.recommendations[0].contains("v2-snapshot"));
    }

    #[test]
    fn matching_state_has_no_drift() {
        let mut db = state(vec![current("s1")], &["INVOICE"]);
        db.values.insert(ValueKey::new("ACCOUNT_TYPE", "ASSET"));
        let mut registry = registry("s1", &["INVOICE"]);
        registry.values.push(kreg_domain::Value {
            code: "ASSET".to_owned(),
            value_set_code: "ACCOUNT_TYPE".to_owned(),
            label: "Asset".to_owned(),
            description: String::new(),
            sort_order: None,
            metadata: kreg_domain::Metadata::new(),
        });

        let result = detect_drift(&db, &registry);
        assert_eq!(result.drift_type, DriftType::None);
        assert!(!result.has_drift);
        assert_eq!(result.exit_code(), 0);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn value_diffs_use_the_dotted_key() {
        let mut db = state(vec![current("s1")], &[]);
        db.values.insert(ValueKey::new("ACCOUNT_TYPE", "EQUITY"));
        let result = detect_drift(&db, &registry("s1", &[]));
        assert_eq!(result.details.values.removed, ["ACCOUNT_TYPE.EQUITY"]);
    }
}
