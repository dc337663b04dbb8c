#![no_main]

// Any accepted owner-set record must be canonical and re-encode to a record
// that decodes to the same set.

use libfuzzer_sys::fuzz_target;
use capability_registry::CapabilityOwners;

fuzz_target!(|bytes: &[u8]| {
    if let Ok(owners) = CapabilityOwners::decode(bytes) {
        assert!(owners.is_canonical());
        let encoded = owners.encode().expect("encode decoded owners");
        let again = CapabilityOwners::decode(&encoded).expect("decode re-encoded owners");
        assert_eq!(again, owners);
    }
});
