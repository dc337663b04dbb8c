//!
//! The root capability authority.
//!
//! The registry owns the in-process capability map, the set of scoped module
//! names and the sealing lifecycle. It hands each module exactly one
//! [`ScopedRegistry`] sharing the same map. Durable state (owner sets and the
//! global counter) and the ephemeral index live in the stores of the
//! [`Context`] passed to each call, so they commit or revert with the
//! enclosing transaction.

use std::collections::BTreeSet;

use crate::access::{Capability, CapabilityOwners};
use crate::error::CapabilityError;
use crate::registry::scoped::ScopedRegistry;
use crate::registry::{read_index, read_owners, set_mappings, write_index, write_owners, CapabilityMap};
use crate::store::Context;
use crate::types::{
    index_from_owners_key, is_blank, KEY_MEM_INITIALIZED, KEY_PREFIX_INDEX_CAPABILITY, MODULE_NAME,
};

/// Scoping lifecycle. Only ever moves from `Open` to `Sealed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Modules may still request scoped handles.
    Open,
    /// No further scoped handles can be created.
    Sealed,
}

/// Root authority for capabilities.
#[derive(Debug)]
pub struct CapabilityRegistry {
    cap_map: CapabilityMap,
    scoped_modules: BTreeSet<String>,
    lifecycle: Lifecycle,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    /// Creates an open registry with an empty capability map. A new process
    /// creates a new registry and must call [`CapabilityRegistry::init_mem_store`]
    /// before any capability is used.
    pub fn new() -> Self {
        CapabilityRegistry {
            cap_map: CapabilityMap::default(),
            scoped_modules: BTreeSet::new(),
            lifecycle: Lifecycle::Open,
        }
    }

    /// True if `module_name` already received a scoped handle.
    pub fn has_module(&self, module_name: &str) -> bool {
        self.scoped_modules.contains(module_name)
    }

    /// Module names that received a scoped handle, in sorted order.
    pub fn scoped_modules(&self) -> impl Iterator<Item = &str> {
        self.scoped_modules.iter().map(String::as_str)
    }

    /// Creates the one scoped handle for `module_name`.
    pub fn scope_to_module(&mut self, module_name: &str) -> Result<ScopedRegistry, CapabilityError> {
        if self.lifecycle == Lifecycle::Sealed {
            return Err(CapabilityError::Sealed);
        }
        if is_blank(module_name) {
            return Err(CapabilityError::InvalidName(
                "cannot scope to an empty module name".into(),
            ));
        }
        if !self.scoped_modules.insert(module_name.to_string()) {
            return Err(CapabilityError::AlreadyScoped(module_name.to_string()));
        }
        tracing::debug!(module = MODULE_NAME, scope = module_name, "scoped registry to module");
        Ok(ScopedRegistry::new(module_name.to_string(), self.cap_map.clone()))
    }

    /// Seals the registry against further scoping.
    pub fn seal(&mut self) -> Result<(), CapabilityError> {
        match self.lifecycle {
            Lifecycle::Sealed => Err(CapabilityError::AlreadySealed),
            Lifecycle::Open => {
                self.lifecycle = Lifecycle::Sealed;
                tracing::debug!(module = MODULE_NAME, scopes = self.scoped_modules.len(), "sealed capability registry");
                Ok(())
            }
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.lifecycle == Lifecycle::Sealed
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Number of capability objects currently alive in this process.
    pub fn live_capabilities(&self) -> usize {
        self.cap_map.borrow().len()
    }

    /// True once the ephemeral index has been rebuilt for this process.
    pub fn is_initialized(&self, ctx: &Context<'_>) -> bool {
        ctx.memory().has(KEY_MEM_INITIALIZED)
    }

    /// Rebuilds the ephemeral index and the capability map from the durable
    /// owner sets. Must run once per process start before any capability is
    /// used; later calls are no-ops.
    ///
    /// Store access goes through an unmetered reborrow of `ctx`, so the rebuild
    /// is never charged to the caller's gas meter.
    pub fn init_mem_store(&self, ctx: &mut Context<'_>) -> Result<(), CapabilityError> {
        let mut ctx = ctx.unmetered();
        if self.is_initialized(&ctx) {
            return Ok(());
        }
        let restored = ctx.atomic(|tx| -> Result<usize, CapabilityError> {
            let entries = tx.iterate(KEY_PREFIX_INDEX_CAPABILITY)?;
            let mut restored = 0;
            for (key, value) in entries {
                let index = index_from_owners_key(&key)?;
                let owners = CapabilityOwners::decode(&value)?;
                self.initialize_capability(tx, index, &owners);
                restored += 1;
            }
            tx.memory_mut().set(KEY_MEM_INITIALIZED, vec![1]);
            Ok(restored)
        })?;
        tracing::info!(module = MODULE_NAME, restored, "initialized in-memory capability index");
        Ok(())
    }

    /// Sets the global index during bootstrap. Fails if `index` is zero or the
    /// counter has already been set.
    pub fn initialize_index(&self, ctx: &mut Context<'_>, index: u64) -> Result<(), CapabilityError> {
        if index == 0 {
            return Err(CapabilityError::InvalidIndex);
        }
        if read_index(ctx)? > 0 {
            return Err(CapabilityError::AlreadyInitialized);
        }
        write_index(ctx, index)
    }

    /// Stored value of the global counter; 0 when it was never set.
    pub fn latest_index(&self, ctx: &mut Context<'_>) -> Result<u64, CapabilityError> {
        read_index(ctx)
    }

    /// Persists the owner set of `index`. An empty set deletes the record.
    pub fn set_owners(
        &self,
        ctx: &mut Context<'_>,
        index: u64,
        owners: &CapabilityOwners,
    ) -> Result<(), CapabilityError> {
        write_owners(ctx, index, owners)
    }

    /// Reads the owner set of `index`.
    pub fn get_owners(
        &self,
        ctx: &mut Context<'_>,
        index: u64,
    ) -> Result<Option<CapabilityOwners>, CapabilityError> {
        read_owners(ctx, index)
    }

    /// Creates a fresh capability object for `index` and sets the forward and
    /// reverse mappings of every owner, as if each had just claimed it.
    pub fn initialize_capability(
        &self,
        ctx: &mut Context<'_>,
        index: u64,
        owners: &CapabilityOwners,
    ) -> Capability {
        let capability = Capability::new(index);
        let memory = ctx.memory_mut();
        for owner in &owners.owners {
            set_mappings(memory, &owner.module, index, &owner.name);
        }
        self.cap_map.borrow_mut().insert(index, capability.clone());
        capability
    }
}
