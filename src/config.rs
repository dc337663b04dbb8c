//! Registry configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "gas": { "read_cost_flat": 500 }, "log_filter": "capability_registry=debug" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CapabilityError, StoreError};
use crate::store::GasConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Gas table applied to durable-store access.
    pub gas: GasConfig,
    /// `tracing` filter directive used by `logging::init`.
    pub log_filter: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            gas: GasConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn from_json_str(json: &str) -> Result<Self, CapabilityError> {
        let config: RegistryConfig =
            serde_json::from_str(json).map_err(|e| CapabilityError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CapabilityError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(StoreError::from)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), CapabilityError> {
        if self.log_filter.trim().is_empty() {
            return Err(CapabilityError::Config("log_filter cannot be empty".into()));
        }
        if self.gas.write_cost_flat == 0 || self.gas.read_cost_flat == 0 {
            return Err(CapabilityError::Config(
                "flat read and write gas costs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
