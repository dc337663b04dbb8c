//!
//! Genesis import and export of the registry's durable state.
//!
//! A genesis document carries the next index to allocate and every live owner
//! set. Importing it writes the durable records and builds the matching
//! ephemeral entries in one go, so a chain started from genesis needs no
//! separate recovery pass for those capabilities.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::access::CapabilityOwners;
use crate::error::{CapabilityError, StoreError};
use crate::registry::CapabilityRegistry;
use crate::store::Context;
use crate::types::{index_from_owners_key, is_blank, DEFAULT_INDEX, KEY_PREFIX_INDEX_CAPABILITY, MODULE_NAME};

/// Owner set of one capability index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisOwners {
    pub index: u64,
    pub index_owners: CapabilityOwners,
}

/// Durable registry state at chain start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Next index to allocate.
    pub index: u64,
    #[serde(default)]
    pub owners: Vec<GenesisOwners>,
}

impl Default for GenesisState {
    fn default() -> Self {
        GenesisState {
            index: DEFAULT_INDEX,
            owners: Vec::new(),
        }
    }
}

impl GenesisState {
    pub fn validate(&self) -> Result<(), CapabilityError> {
        if self.index == 0 {
            return Err(invalid("capability index must be non-zero".into()));
        }
        let mut seen = HashSet::new();
        for entry in &self.owners {
            if entry.index == 0 {
                return Err(invalid("owners index must be non-zero".into()));
            }
            if entry.index >= self.index {
                return Err(invalid(format!(
                    "owners index {} must be lower than the global index {}",
                    entry.index, self.index
                )));
            }
            if !seen.insert(entry.index) {
                return Err(invalid(format!("duplicate owners index {}", entry.index)));
            }
            if entry.index_owners.is_empty() {
                return Err(invalid(format!("owners for index {} cannot be empty", entry.index)));
            }
            for owner in &entry.index_owners.owners {
                if is_blank(&owner.module) {
                    return Err(invalid(format!("owner module cannot be blank (index {})", entry.index)));
                }
                if is_blank(&owner.name) {
                    return Err(invalid(format!("owner name cannot be blank (index {})", entry.index)));
                }
            }
            if !entry.index_owners.is_canonical() {
                return Err(invalid(format!(
                    "owners for index {} must be sorted and unique",
                    entry.index
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CapabilityError> {
        let bytes = std::fs::read(path.as_ref()).map_err(StoreError::from)?;
        let genesis = serde_json::from_slice(&bytes).map_err(StoreError::from)?;
        Ok(genesis)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), CapabilityError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(StoreError::from)?;
        std::fs::write(path.as_ref(), bytes).map_err(StoreError::from)?;
        Ok(())
    }
}

fn invalid(reason: String) -> CapabilityError {
    CapabilityError::InvalidGenesis(reason)
}

/// Loads `genesis` into a registry whose durable state is empty.
pub fn init_genesis(
    registry: &CapabilityRegistry,
    ctx: &mut Context<'_>,
    genesis: &GenesisState,
) -> Result<(), CapabilityError> {
    genesis.validate()?;
    registry.initialize_index(ctx, genesis.index)?;
    for entry in &genesis.owners {
        registry.set_owners(ctx, entry.index, &entry.index_owners)?;
        registry.initialize_capability(ctx, entry.index, &entry.index_owners);
    }
    tracing::info!(module = MODULE_NAME, index = genesis.index, capabilities = genesis.owners.len(), "initialized capability genesis");
    Ok(())
}

/// Exports the durable registry state, owner sets in index order.
pub fn export_genesis(
    registry: &CapabilityRegistry,
    ctx: &mut Context<'_>,
) -> Result<GenesisState, CapabilityError> {
    let index = match registry.latest_index(ctx)? {
        0 => DEFAULT_INDEX,
        index => index,
    };
    let owners = ctx
        .iterate(KEY_PREFIX_INDEX_CAPABILITY)?
        .into_iter()
        .map(|(key, value)| -> Result<GenesisOwners, StoreError> {
            Ok(GenesisOwners {
                index: index_from_owners_key(&key)?,
                index_owners: CapabilityOwners::decode(&value)?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(GenesisState { index, owners })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Owner;

    fn owners(pairs: &[(&str, &str)]) -> CapabilityOwners {
        let mut set = CapabilityOwners::new();
        for (module, name) in pairs {
            set.set(Owner::new(*module, *name)).unwrap();
        }
        set
    }

    #[test]
    fn test_default_is_valid() {
        let genesis = GenesisState::default();
        assert_eq!(genesis.index, 1);
        genesis.validate().unwrap();
    }

    #[test]
    fn test_validate() {
        let cases: Vec<(&str, GenesisState, bool)> = vec![
            (
                "valid",
                GenesisState {
                    index: 3,
                    owners: vec![GenesisOwners { index: 1, index_owners: owners(&[("ibc", "port/transfer")]) }],
                },
                true,
            ),
            ("zero index", GenesisState { index: 0, owners: vec![] }, false),
            (
                "owner index not below global",
                GenesisState {
                    index: 1,
                    owners: vec![GenesisOwners { index: 1, index_owners: owners(&[("ibc", "x")]) }],
                },
                false,
            ),
            (
                "zero owner index",
                GenesisState {
                    index: 5,
                    owners: vec![GenesisOwners { index: 0, index_owners: owners(&[("ibc", "x")]) }],
                },
                false,
            ),
            (
                "duplicate index",
                GenesisState {
                    index: 5,
                    owners: vec![
                        GenesisOwners { index: 2, index_owners: owners(&[("ibc", "x")]) },
                        GenesisOwners { index: 2, index_owners: owners(&[("bank", "y")]) },
                    ],
                },
                false,
            ),
            (
                "empty owners",
                GenesisState {
                    index: 5,
                    owners: vec![GenesisOwners { index: 2, index_owners: CapabilityOwners::new() }],
                },
                false,
            ),
            (
                "blank module",
                GenesisState {
                    index: 5,
                    owners: vec![GenesisOwners {
                        index: 2,
                        index_owners: CapabilityOwners { owners: vec![Owner::new("  ", "x")] },
                    }],
                },
                false,
            ),
            (
                "blank name",
                GenesisState {
                    index: 5,
                    owners: vec![GenesisOwners {
                        index: 2,
                        index_owners: CapabilityOwners { owners: vec![Owner::new("ibc", "")] },
                    }],
                },
                false,
            ),
            (
                "unsorted owners",
                GenesisState {
                    index: 5,
                    owners: vec![GenesisOwners {
                        index: 2,
                        index_owners: CapabilityOwners {
                            owners: vec![Owner::new("z", "x"), Owner::new("a", "x")],
                        },
                    }],
                },
                false,
            ),
        ];

        for (label, genesis, ok) in cases {
            let result = genesis.validate();
            assert_eq!(result.is_ok(), ok, "case {label}: {result:?}");
            if let Err(err) = result {
                assert!(matches!(err, CapabilityError::InvalidGenesis(_)), "case {label}");
            }
        }
    }

    #[test]
    fn test_json_shape() {
        let genesis = GenesisState {
            index: 2,
            owners: vec![GenesisOwners { index: 1, index_owners: owners(&[("ibc", "port/transfer")]) }],
        };
        let json = serde_json::to_value(&genesis).unwrap();
        assert_eq!(json["index"], 2);
        assert_eq!(json["owners"][0]["index_owners"]["owners"][0]["module"], "ibc");
        let missing_owners: GenesisState = serde_json::from_str(r#"{"index": 4}"#).unwrap();
        assert!(missing_owners.owners.is_empty());
    }
}
