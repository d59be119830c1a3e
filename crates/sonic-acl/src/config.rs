//! Object store configuration.
//!
//! Loaded from JSON. Every field is optional and falls back to the default
//! identifier ranges.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use sonic_ndi::NpuId;

use crate::error::{AclError, AclResult};

/// Sizing of an [`AclSwitch`](crate::AclSwitch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSwitchConfig {
    /// Table ids are drawn from `[0, table_id_max)`.
    #[serde(default = "default_table_id_max")]
    pub table_id_max: u64,

    /// Entry ids are drawn from `[0, entry_id_max)`, per table.
    #[serde(default = "default_entry_id_max")]
    pub entry_id_max: u64,

    /// Counter ids are drawn from `[0, counter_id_max)`, per table.
    #[serde(default = "default_counter_id_max")]
    pub counter_id_max: u64,

    /// NPUs present on the switch.
    #[serde(default = "default_npus")]
    pub npus: Vec<NpuId>,
}

fn default_table_id_max() -> u64 {
    500
}

fn default_entry_id_max() -> u64 {
    4094
}

fn default_counter_id_max() -> u64 {
    4094
}

fn default_npus() -> Vec<NpuId> {
    vec![0]
}

impl Default for AclSwitchConfig {
    fn default() -> Self {
        Self {
            table_id_max: default_table_id_max(),
            entry_id_max: default_entry_id_max(),
            counter_id_max: default_counter_id_max(),
            npus: default_npus(),
        }
    }
}

impl AclSwitchConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(content: &str) -> AclResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| AclError::invalid(format!("Failed to parse ACL config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> AclResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AclError::invalid(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> AclResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AclError::invalid(format!("Failed to serialize ACL config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> AclResult<()> {
        if self.table_id_max == 0 {
            return Err(AclError::invalid("table_id_max must be > 0"));
        }
        if self.entry_id_max == 0 {
            return Err(AclError::invalid("entry_id_max must be > 0"));
        }
        if self.counter_id_max == 0 {
            return Err(AclError::invalid("counter_id_max must be > 0"));
        }
        if self.npus.is_empty() {
            return Err(AclError::invalid("npus must not be empty"));
        }
        Ok(())
    }
}
