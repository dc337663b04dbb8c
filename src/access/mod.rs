//! Capability objects and the owner bookkeeping persisted for them.

pub mod capability;
pub mod owners;

pub use capability::*;
pub use owners::{CapabilityOwners, Owner};
