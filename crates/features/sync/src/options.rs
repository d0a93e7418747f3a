use crate::error::SyncError;
use kreg_domain::EntityKinds;
use kreg_domain::config::SyncConfig;
use std::ops::RangeInclusive;
use typed_builder::TypedBuilder;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const BATCH_SIZE_RANGE: RangeInclusive<usize> = 1..=1000;

/// Knobs of one synchronization run.
///
/// ```rust
/// use kreg_domain::EntityKinds;
/// use kreg_sync::SyncOptions;
///
/// let options = SyncOptions::builder().batch_size(250).kinds(EntityKinds::VALUES).build();
/// assert!(options.validate().is_ok());
/// assert!(!options.skip_deactivation);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct SyncOptions {
    #[builder(default = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Entity kinds to upsert (and retire, when enabled).
    #[builder(default)]
    pub kinds: EntityKinds,
    /// Activate without deactivating. Refused when the line already has a current row.
    #[builder(default)]
    pub skip_deactivation: bool,
    /// Mark rows not written by this snapshot inactive after a successful activation.
    #[builder(default)]
    pub retire_stale: bool,
    /// Activate the new snapshot even when some batches failed.
    #[builder(default)]
    pub activate_on_partial: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self::builder()
            .batch_size(config.batch_size)
            .skip_deactivation(config.skip_deactivation)
            .retire_stale(config.retire_stale)
            .activate_on_partial(config.activate_on_partial)
            .build()
    }
}

impl SyncOptions {
    pub fn validate(&self) -> Result<(), SyncError> {
        if !BATCH_SIZE_RANGE.contains(&self.batch_size) {
            return Err(SyncError::InvalidOptions {
                message: format!(
                    "batch size {} outside {}..={}",
                    self.batch_size,
                    BATCH_SIZE_RANGE.start(),
                    BATCH_SIZE_RANGE.end()
                )
                .into(),
                context: None,
            });
        }
        if self.kinds.is_empty() {
            return Err(SyncError::InvalidOptions {
                message: "no entity kinds selected".into(),
                context: None,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sync_everything_in_batches_of_one_hundred() {
        let options = SyncOptions::default();
        assert_eq!(options.batch_size, 100);
        assert_eq!(options.kinds, EntityKinds::ALL);
        assert!(!options.retire_stale);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn batch_size_bounds_are_enforced() {
        for size in [0, 1001] {
            let options = SyncOptions::builder().batch_size(size).build();
            assert!(matches!(options.validate(), Err(SyncError::InvalidOptions { .. })), "{size}");
        }
        assert!(SyncOptions::builder().batch_size(1000).build().validate().is_ok());
    }

    #[test]
    fn config_section_maps_onto_options() {
        let config = SyncConfig { batch_size: 25, retire_stale: true, ..SyncConfig::default() };
        let options = SyncOptions::from(&config);
        assert_eq!(options.batch_size, 25);
        assert!(options.retire_stale);
        assert_eq!(options.kinds, EntityKinds::ALL);
    }
}
