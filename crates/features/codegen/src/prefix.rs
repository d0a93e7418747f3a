//! Value identifier prefixes.
//!
//! Generated value identifiers are `{PREFIX}_{CODE}` and become a long-lived contract with
//! every consumer of the generated modules. Any change to [`derive_prefix_from_code`] must bump
//! [`PREFIX_ALGORITHM_VERSION`].

use kreg_domain::ValueSet;

/// Version of the prefix derivation rules, emitted into every generated header.
pub const PREFIX_ALGORITHM_VERSION: u32 = 1;

const MAX_SEGMENT_PREFIX: usize = 4;
const SINGLE_SEGMENT_PREFIX: usize = 3;

/// The prefix of a value set: its explicit `metadata.prefix`, else the derived one.
#[must_use]
pub fn derive_prefix(value_set: &ValueSet) -> String {
    value_set.explicit_prefix().map_or_else(|| derive_prefix_from_code(&value_set.code), str::to_owned)
}

/// Derives a prefix from an `UPPER_SNAKE` code.
///
/// Multi-segment codes take the first character of each segment, capped at four
/// (`ACCOUNT_TYPE` → `AT`). Single-segment codes take their first three characters
/// (`INVOICE` → `INV`).
#[must_use]
pub fn derive_prefix_from_code(code: &str) -> String {
    let segments: Vec<&str> = code.split('_').filter(|s| !s.is_empty()).collect();
    let prefix: String = match segments.as_slice() {
        [single] => single.chars().take(SINGLE_SEGMENT_PREFIX).collect(),
        many => many.iter().filter_map(|s| s.chars().next()).take(MAX_SEGMENT_PREFIX).collect(),
    };
    prefix.to_uppercase()
}
