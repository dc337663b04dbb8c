//! Store keys and scalar encodings shared by the registry and its scoped handles.
//!
//! Durable keys:
//! - `index` holds the global counter as a big-endian `u64`.
//! - `capability_index ++ be_u64(index)` holds the JSON-encoded owner set.
//!
//! Memory-only keys are namespaced by a length-prefixed module name so that
//! one module's entries can never collide with another's.

use crate::error::StoreError;

/// Module name used in log fields.
pub const MODULE_NAME: &str = "capability";

/// Durable key of the global index counter.
pub const KEY_INDEX: &[u8] = b"index";

/// Durable prefix of owner-set records.
pub const KEY_PREFIX_INDEX_CAPABILITY: &[u8] = b"capability_index";

/// Memory-only marker written once the ephemeral index has been rebuilt.
pub const KEY_MEM_INITIALIZED: &[u8] = b"mem_initialized";

const FWD_TAG: u8 = b'f';
const REV_TAG: u8 = b'r';

/// Index the counter starts at when nothing has been initialized.
pub const DEFAULT_INDEX: u64 = 1;

pub fn index_to_key(index: u64) -> [u8; 8] {
    index.to_be_bytes()
}

pub fn index_from_key(bytes: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Codec(format!("expected 8 index bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

/// Durable key of the owner set for `index`.
pub fn owners_key(index: u64) -> Vec<u8> {
    let mut key = KEY_PREFIX_INDEX_CAPABILITY.to_vec();
    key.extend_from_slice(&index_to_key(index));
    key
}

/// Inverse of [`owners_key`].
pub fn index_from_owners_key(key: &[u8]) -> Result<u64, StoreError> {
    let suffix = key
        .strip_prefix(KEY_PREFIX_INDEX_CAPABILITY)
        .ok_or_else(|| StoreError::Codec("key lacks owner-set prefix".into()))?;
    index_from_key(suffix)
}

fn module_prefix(tag: u8, module: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 4 + module.len());
    key.push(tag);
    key.extend_from_slice(&(module.len() as u32).to_be_bytes());
    key.extend_from_slice(module.as_bytes());
    key
}

/// Forward key: `(module, capability index) → name`.
pub fn fwd_capability_key(module: &str, index: u64) -> Vec<u8> {
    let mut key = module_prefix(FWD_TAG, module);
    key.extend_from_slice(&index_to_key(index));
    key
}

/// Reverse key: `(module, name) → index`.
pub fn rev_capability_key(module: &str, name: &str) -> Vec<u8> {
    let mut key = module_prefix(REV_TAG, module);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Names and module names must contain something other than whitespace.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_key_is_big_endian() {
        assert_eq!(index_to_key(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(index_from_key(&index_to_key(0xdead_beef)).unwrap(), 0xdead_beef);
        assert!(index_from_key(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_owner_keys_sort_by_index() {
        assert!(owners_key(2) < owners_key(10));
        assert!(owners_key(255) < owners_key(256));
        assert_eq!(index_from_owners_key(&owners_key(99)).unwrap(), 99);
        assert!(index_from_owners_key(b"index").is_err());
    }

    #[test]
    fn test_module_namespaces_do_not_collide() {
        // Without the length prefix both would be "x/foo".
        assert_ne!(rev_capability_key("x", "/foo"), rev_capability_key("x/", "foo"));
        assert_ne!(fwd_capability_key("bank", 1), rev_capability_key("bank", "\0\0\0\0\0\0\0\x01"));
    }

    #[test]
    fn test_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   \t"));
        assert!(!is_blank(" port "));
    }
}
