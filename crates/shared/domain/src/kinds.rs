use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Registry entity kinds, used to scope synchronization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct EntityKinds: u8 {
        const CONCEPTS = 1 << 0;
        const VALUE_SETS = 1 << 1;
        const VALUES = 1 << 2;

        const ALL = Self::CONCEPTS.bits() | Self::VALUE_SETS.bits() | Self::VALUES.bits();
    }
}

impl EntityKinds {
    /// Parses a comma-separated list such as `"concepts,values"`.
    ///
    /// Unknown names yield `None` so callers can report them instead of silently
    /// syncing less than asked for.
    #[must_use]
    pub fn parse_list(raw: &str) -> Option<Self> {
        raw.split(',').map(str::trim).filter(|s| !s.is_empty()).try_fold(Self::empty(), |acc, name| {
            let kind = Self::from(name);
            (!kind.is_empty()).then_some(acc | kind)
        })
    }
}

impl Default for EntityKinds {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<&str> for EntityKinds {
    fn from(s: &str) -> Self {
        match s {
            "concepts" | "concept" => Self::CONCEPTS,
            "value_sets" | "value-sets" | "value_set" => Self::VALUE_SETS,
            "values" | "value" => Self::VALUES,
            "all" | "*" => Self::ALL,
            _ => Self::empty(),
        }
    }
}

impl Serialize for EntityKinds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for EntityKinds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists_and_wildcards() {
        assert_eq!(
            EntityKinds::parse_list("concepts, values"),
            Some(EntityKinds::CONCEPTS | EntityKinds::VALUES)
        );
        assert_eq!(EntityKinds::parse_list("*"), Some(EntityKinds::ALL));
        assert_eq!(EntityKinds::parse_list("concepts,widgets"), None);
    }
}
