//! Installs a `tracing` subscriber for hosts that do not bring their own.

use tracing_subscriber::EnvFilter;

use crate::config::RegistryConfig;
use crate::error::CapabilityError;

/// Installs a global fmt subscriber filtered by `filter`.
///
/// Fails if the directive does not parse or a global subscriber is already set.
pub fn init(filter: &str) -> Result<(), CapabilityError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| CapabilityError::Config(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| CapabilityError::Config(e.to_string()))
}

pub fn init_from_config(config: &RegistryConfig) -> Result<(), CapabilityError> {
    init(&config.log_filter)
}
