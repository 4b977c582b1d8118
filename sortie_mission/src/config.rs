// Per-run assembly configuration.
//
// `MissionConfig` holds the few knobs a generation run may change: the seed
// of the reference-index counter and the minimum number of string-table
// entries. Everything else about the container (section order, field
// layouts, defaults) is fixed by the binary format and lives in code.
//
// Loaded from JSON; every field is optional and falls back to its default.
// See `index.rs` for how the seed is used and `tables.rs` for the string
// table padding.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::DEFAULT_INDEX_SEED;

/// Minimum string-table entry count when the config doesn't say otherwise.
pub const DEFAULT_MIN_STRING_ENTRIES: u16 = 4;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// First reference index handed out. 0 is reserved for "no reference"
    /// and the counter stops before `u32::MAX`.
    pub index_seed: u32,
    /// The string table is padded with empty entries up to this count.
    pub min_string_entries: u16,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            index_seed: DEFAULT_INDEX_SEED,
            min_string_entries: DEFAULT_MIN_STRING_ENTRIES,
        }
    }
}

impl MissionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MissionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_seed == 0 {
            return Err(Error::InvalidConfig(
                "index_seed must be at least 1 (0 means no reference)".into(),
            ));
        }
        if self.index_seed == u32::MAX {
            return Err(Error::InvalidConfig(
                "index_seed leaves no reference indices to issue".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = MissionConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = MissionConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
        assert_eq!(restored.index_seed, 1);
        assert_eq!(restored.min_string_entries, 4);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = MissionConfig::from_json(r#"{ "index_seed": 500 }"#).unwrap();
        assert_eq!(config.index_seed, 500);
        assert_eq!(config.min_string_entries, DEFAULT_MIN_STRING_ENTRIES);
    }

    #[test]
    fn zero_seed_is_rejected() {
        let err = MissionConfig::from_json(r#"{ "index_seed": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn seed_must_leave_room_for_indices() {
        let json = format!(r#"{{ "index_seed": {} }}"#, u32::MAX);
        let err = MissionConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let json = format!(r#"{{ "index_seed": {} }}"#, u32::MAX - 1);
        assert_eq!(MissionConfig::from_json(&json).unwrap().index_seed, u32::MAX - 1);
    }

    #[test]
    fn bad_json_is_reported() {
        let err = MissionConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::ConfigJson(_)));
    }
}
