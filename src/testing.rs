//! Test helpers: an in-memory chain with restart simulation.

use crate::registry::CapabilityRegistry;
use crate::store::{Context, GasConfig, MemoryStore};

/// Durable and memory-only stores of a simulated node.
#[derive(Debug, Default)]
pub struct TestChain {
    pub durable: MemoryStore,
    pub memory: MemoryStore,
    pub gas_config: GasConfig,
}

impl TestChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// An unmetered context over both stores.
    pub fn ctx(&mut self) -> Context<'_> {
        Context::new(&mut self.durable, &mut self.memory).with_gas_config(self.gas_config)
    }

    /// A context whose durable access is limited to `limit` gas.
    pub fn metered_ctx(&mut self, limit: u64) -> Context<'_> {
        self.ctx().with_gas_limit(limit)
    }

    /// Simulates a process restart: the memory-only store is lost and a new,
    /// recovered registry is returned. Durable state is kept.
    pub fn restart(&mut self) -> CapabilityRegistry {
        self.memory = MemoryStore::new();
        let registry = CapabilityRegistry::new();
        registry
            .init_mem_store(&mut self.ctx())
            .expect("recovery from durable state");
        registry
    }
}
