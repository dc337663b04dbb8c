pub mod core;
pub mod scoped;


// Re-export the primary types so `crate::registry::*` paths stay short.
pub use self::core::{CapabilityRegistry, Lifecycle};
pub use self::scoped::ScopedRegistry;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::access::{Capability, CapabilityOwners};
use crate::error::CapabilityError;
use crate::store::{Context, KvStore};
use crate::types::{
    fwd_capability_key, index_from_key, index_to_key, owners_key, rev_capability_key, KEY_INDEX,
};

/// Index → live capability object, shared by the registry and every scoped handle.
pub(crate) type CapabilityMap = Rc<RefCell<HashMap<u64, Capability>>>;

/// Raw value of the global counter; 0 when unset.
pub(crate) fn read_index(ctx: &mut Context<'_>) -> Result<u64, CapabilityError> {
    match ctx.read(KEY_INDEX)? {
        Some(bytes) => Ok(index_from_key(&bytes)?),
        None => Ok(0),
    }
}

pub(crate) fn write_index(ctx: &mut Context<'_>, index: u64) -> Result<(), CapabilityError> {
    ctx.write(KEY_INDEX, index_to_key(index).to_vec())?;
    Ok(())
}

pub(crate) fn read_owners(
    ctx: &mut Context<'_>,
    index: u64,
) -> Result<Option<CapabilityOwners>, CapabilityError> {
    match ctx.read(&owners_key(index))? {
        Some(bytes) if !bytes.is_empty() => Ok(Some(CapabilityOwners::decode(&bytes)?)),
        _ => Ok(None),
    }
}

/// Persists `owners`, deleting the record when the set is empty.
pub(crate) fn write_owners(
    ctx: &mut Context<'_>,
    index: u64,
    owners: &CapabilityOwners,
) -> Result<(), CapabilityError> {
    let key = owners_key(index);
    if owners.is_empty() {
        ctx.remove(&key)?;
    } else {
        ctx.write(&key, owners.encode()?)?;
    }
    Ok(())
}

/// Sets both ephemeral mappings for one owner.
pub(crate) fn set_mappings(memory: &mut dyn KvStore, module: &str, index: u64, name: &str) {
    memory.set(&fwd_capability_key(module, index), name.as_bytes().to_vec());
    memory.set(&rev_capability_key(module, name), index_to_key(index).to_vec());
}

/// Removes both ephemeral mappings for one owner.
pub(crate) fn clear_mappings(memory: &mut dyn KvStore, module: &str, index: u64, name: &str) {
    memory.delete(&fwd_capability_key(module, index));
    memory.delete(&rev_capability_key(module, name));
}
