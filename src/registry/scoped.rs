//!
//! Per-module capability handles.
//!
//! A `ScopedRegistry` can only read and write ephemeral entries keyed by its
//! own module name. Namespacing of capability names is entirely local to the
//! module, which is safe because no two handles share a module name.

use std::fmt;

use crate::access::{Capability, CapabilityOwners, Owner};
use crate::error::CapabilityError;
use crate::registry::{
    clear_mappings, read_index, read_owners, set_mappings, write_index, write_owners, CapabilityMap,
};
use crate::store::Context;
use crate::types::{
    fwd_capability_key, index_from_key, is_blank, rev_capability_key, DEFAULT_INDEX, MODULE_NAME,
};

/// A capability handle bound to one module.
pub struct ScopedRegistry {
    module: String,
    cap_map: CapabilityMap,
}

impl fmt::Debug for ScopedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedRegistry")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl ScopedRegistry {
    pub(crate) fn new(module: String, cap_map: CapabilityMap) -> Self {
        ScopedRegistry { module, cap_map }
    }

    /// The module this handle is scoped to.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Mints a new capability owned by this module under `name`.
    ///
    /// The capability receives the current global index, which is then
    /// incremented. Indices are never reused, even after a capability is
    /// destroyed.
    pub fn new_capability(
        &self,
        ctx: &mut Context<'_>,
        name: &str,
    ) -> Result<Capability, CapabilityError> {
        if is_blank(name) {
            return Err(CapabilityError::InvalidName(
                "capability name cannot be empty".into(),
            ));
        }
        if ctx.memory().has(&rev_capability_key(&self.module, name)) {
            return Err(CapabilityError::NameTaken {
                module: self.module.clone(),
                name: name.to_string(),
            });
        }

        // The owner set and the counter are written together or not at all.
        let index = ctx.atomic(|tx| -> Result<u64, CapabilityError> {
            let index = match read_index(tx)? {
                0 => DEFAULT_INDEX,
                index => index,
            };
            let next = index.checked_add(1).ok_or(CapabilityError::InvalidIndex)?;

            let mut owners = read_owners(tx, index)?.unwrap_or_default();
            owners.set(Owner::new(self.module.as_str(), name))?;
            write_owners(tx, index, &owners)?;
            write_index(tx, next)?;
            set_mappings(tx.memory_mut(), &self.module, index, name);
            Ok(index)
        })?;

        let capability = Capability::new(index);
        // A capability minted in a reverted transaction may still sit in the
        // map under this index; the new object replaces it.
        self.cap_map.borrow_mut().insert(index, capability.clone());

        tracing::info!(module = MODULE_NAME, scope = %self.module, name, index, "created new capability");
        Ok(capability)
    }

    /// Registers a capability received from elsewhere under this module's `name`.
    pub fn claim_capability<'c>(
        &self,
        ctx: &mut Context<'_>,
        capability: impl Into<Option<&'c Capability>>,
        name: &str,
    ) -> Result<(), CapabilityError> {
        let capability = capability
            .into()
            .ok_or(CapabilityError::NilCapability("claim"))?;
        if is_blank(name) {
            return Err(CapabilityError::InvalidName(
                "capability name cannot be empty".into(),
            ));
        }
        let index = capability.index();
        if !self.is_live(capability) {
            return Err(CapabilityError::UnknownCapability(index));
        }
        if let Some(existing) = ctx.memory().get(&fwd_capability_key(&self.module, index)) {
            return Err(CapabilityError::OwnerAlreadyClaimed {
                module: self.module.clone(),
                name: String::from_utf8_lossy(&existing).into_owned(),
            });
        }
        if ctx.memory().has(&rev_capability_key(&self.module, name)) {
            return Err(CapabilityError::NameTaken {
                module: self.module.clone(),
                name: name.to_string(),
            });
        }

        // A live object without a durable owner set was minted in a reverted
        // transaction and must not be resurrected.
        let mut owners = read_owners(ctx, index)?.ok_or(CapabilityError::UnknownCapability(index))?;
        owners.set(Owner::new(self.module.as_str(), name))?;
        write_owners(ctx, index, &owners)?;
        set_mappings(ctx.memory_mut(), &self.module, index, name);

        tracing::info!(module = MODULE_NAME, scope = %self.module, name, capability = index, "claimed capability");
        Ok(())
    }

    /// True iff this module owns exactly this capability object under `name`.
    /// Never fails: a nil capability, a blank name or a forged object all
    /// authenticate as false.
    pub fn authenticate_capability<'c>(
        &self,
        ctx: &Context<'_>,
        capability: impl Into<Option<&'c Capability>>,
        name: &str,
    ) -> bool {
        let Some(capability) = capability.into() else {
            return false;
        };
        if is_blank(name) {
            return false;
        }
        self.get_capability_name(ctx, capability).as_deref() == Some(name)
    }

    /// Gives up this module's ownership of `capability`. When the last owner
    /// releases it, the durable record and the in-process object are removed.
    pub fn release_capability<'c>(
        &self,
        ctx: &mut Context<'_>,
        capability: impl Into<Option<&'c Capability>>,
    ) -> Result<(), CapabilityError> {
        let capability = capability
            .into()
            .ok_or(CapabilityError::NilCapability("release"))?;
        let name = self
            .get_capability_name(ctx, capability)
            .ok_or_else(|| CapabilityError::NotOwned(self.module.clone()))?;
        let index = capability.index();

        let mut owners =
            read_owners(ctx, index)?.ok_or_else(|| CapabilityError::OwnersNotFound(name.clone()))?;
        owners.remove(&Owner::new(self.module.as_str(), name.as_str()));
        write_owners(ctx, index, &owners)?;

        clear_mappings(ctx.memory_mut(), &self.module, index, &name);
        if owners.is_empty() {
            // The object leaves the map only once the release commits.
            let cap_map = self.cap_map.clone();
            let released = capability.clone();
            ctx.on_commit(move || {
                let mut map = cap_map.borrow_mut();
                if map.get(&index).is_some_and(|live| live.same_as(&released)) {
                    map.remove(&index);
                    tracing::debug!(module = MODULE_NAME, capability = index, "destroyed capability without owners");
                }
            });
        }

        tracing::info!(module = MODULE_NAME, scope = %self.module, name = %name, capability = index, "released capability");
        Ok(())
    }

    /// Looks up the capability this module owns under `name`. Memory-only.
    pub fn get_capability(&self, ctx: &Context<'_>, name: &str) -> Option<Capability> {
        match self.resolve(ctx, name) {
            Ok(capability) => capability,
            Err(err) => {
                tracing::error!(module = MODULE_NAME, scope = %self.module, name, error = %err, "ephemeral index diverged from capability map");
                None
            }
        }
    }

    /// The name under which this module holds `capability`, if it does.
    pub fn get_capability_name<'c>(
        &self,
        ctx: &Context<'_>,
        capability: impl Into<Option<&'c Capability>>,
    ) -> Option<String> {
        let capability = capability.into()?;
        if !self.is_live(capability) {
            return None;
        }
        ctx.memory()
            .get(&fwd_capability_key(&self.module, capability.index()))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Every owner of the capability this module holds under `name`.
    pub fn get_owners(
        &self,
        ctx: &mut Context<'_>,
        name: &str,
    ) -> Result<Option<CapabilityOwners>, CapabilityError> {
        let Some(capability) = self.resolve(ctx, name)? else {
            return Ok(None);
        };
        read_owners(ctx, capability.index())
    }

    /// Module names owning the capability this module holds under `name`,
    /// together with the capability itself.
    pub fn lookup_modules(
        &self,
        ctx: &mut Context<'_>,
        name: &str,
    ) -> Result<(Vec<String>, Capability), CapabilityError> {
        if is_blank(name) {
            return Err(CapabilityError::InvalidName(
                "cannot lookup modules with empty capability name".into(),
            ));
        }
        let capability = self
            .resolve(ctx, name)?
            .ok_or_else(|| CapabilityError::NameNotFound {
                module: self.module.clone(),
                name: name.to_string(),
            })?;
        let owners = read_owners(ctx, capability.index())?
            .ok_or_else(|| CapabilityError::OwnersNotFound(name.to_string()))?;
        Ok((owners.modules(), capability))
    }

    /// True iff `capability` is the object the registry currently holds for its index.
    fn is_live(&self, capability: &Capability) -> bool {
        self.cap_map
            .borrow()
            .get(&capability.index())
            .is_some_and(|live| live.same_as(capability))
    }

    /// Reverse-then-map lookup. A reverse entry whose index is missing from
    /// the capability map is a divergence and surfaces as `CapabilityNotFound`.
    fn resolve(&self, ctx: &Context<'_>, name: &str) -> Result<Option<Capability>, CapabilityError> {
        if is_blank(name) {
            return Ok(None);
        }
        let Some(bytes) = ctx.memory().get(&rev_capability_key(&self.module, name)) else {
            return Ok(None);
        };
        let index = index_from_key(&bytes)?;
        self.cap_map
            .borrow()
            .get(&index)
            .cloned()
            .map(Some)
            .ok_or_else(|| CapabilityError::CapabilityNotFound(name.to_string()))
    }
}
