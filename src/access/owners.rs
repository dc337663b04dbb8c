//!
//! Owner sets: the only consensus-relevant state of the registry.
//!
//! A `CapabilityOwners` value is persisted under its capability's index. It is
//! kept sorted by [`Owner::key`] and never holds the same `(module, name)` pair
//! twice, so the encoded bytes of a set depend only on its members.

use serde::{Deserialize, Serialize};

use crate::error::{CapabilityError, StoreError};

/// A `(module, name)` pair holding a capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub module: String,
    pub name: String,
}

impl Owner {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Owner {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Sort key of the owner within a set: `"{module}/{name}"`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.module, self.name)
    }
}

/// The sorted, deduplicated set of owners of one capability index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityOwners {
    pub owners: Vec<Owner>,
}

impl CapabilityOwners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `owner` at its sorted position.
    ///
    /// Fails with `OwnerAlreadyClaimed` if the exact pair is already present.
    pub fn set(&mut self, owner: Owner) -> Result<(), CapabilityError> {
        match self.search(&owner) {
            Ok(_) => Err(CapabilityError::OwnerAlreadyClaimed {
                module: owner.module,
                name: owner.name,
            }),
            Err(pos) => {
                self.owners.insert(pos, owner);
                Ok(())
            }
        }
    }

    /// Removes `owner` if present. Returns whether anything was removed.
    pub fn remove(&mut self, owner: &Owner) -> bool {
        match self.search(owner) {
            Ok(pos) => {
                self.owners.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, owner: &Owner) -> bool {
        self.search(owner).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Module names of every owner, in set order.
    pub fn modules(&self) -> Vec<String> {
        self.owners.iter().map(|o| o.module.clone()).collect()
    }

    /// True iff the set is strictly sorted by owner key (which also rules out duplicates).
    pub fn is_canonical(&self) -> bool {
        self.owners.windows(2).all(|w| w[0].key() < w[1].key())
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a persisted owner set. Non-canonical input is rejected so a
    /// corrupted record cannot smuggle in duplicate owners.
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let owners: CapabilityOwners = serde_json::from_slice(bytes)?;
        if !owners.is_canonical() {
            return Err(StoreError::Codec(
                "owner set is not sorted or contains duplicates".into(),
            ));
        }
        Ok(owners)
    }

    fn search(&self, owner: &Owner) -> Result<usize, usize> {
        let key = owner.key();
        self.owners.binary_search_by(|probe| probe.key().cmp(&key))
    }
}
