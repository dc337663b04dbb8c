//! Gas accounting for durable-store access.
//!
//! Costs mirror the host chain's KV gas table: a flat cost per access plus a
//! per-byte cost on the bytes read or written.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Per-operation gas costs of the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    pub has_cost: u64,
    pub delete_cost: u64,
    pub read_cost_flat: u64,
    pub read_cost_per_byte: u64,
    pub write_cost_flat: u64,
    pub write_cost_per_byte: u64,
    pub iter_next_cost_flat: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        GasConfig {
            has_cost: 1000,
            delete_cost: 1000,
            read_cost_flat: 1000,
            read_cost_per_byte: 3,
            write_cost_flat: 2000,
            write_cost_per_byte: 30,
            iter_next_cost_flat: 30,
        }
    }
}

/// Tracks gas consumed against an optional limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: u64,
}

impl GasMeter {
    /// A meter that never runs out.
    pub fn infinite() -> Self {
        GasMeter {
            limit: None,
            consumed: 0,
        }
    }

    pub fn with_limit(limit: u64) -> Self {
        GasMeter {
            limit: Some(limit),
            consumed: 0,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn is_infinite(&self) -> bool {
        self.limit.is_none()
    }

    /// Adds `amount` to the consumed total. Over the limit, the total is still
    /// recorded and `OutOfGas` is returned.
    pub fn consume(&mut self, amount: u64, descriptor: &'static str) -> Result<(), StoreError> {
        self.consumed = self.consumed.saturating_add(amount);
        match self.limit {
            Some(limit) if self.consumed > limit => Err(StoreError::OutOfGas {
                descriptor,
                limit,
                consumed: self.consumed,
            }),
            _ => Ok(()),
        }
    }
}
