#![no_main]

// Drives a small set of modules through random registry operations and checks
// that authentication always agrees with a shadow ownership model.

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use capability_registry::testing::TestChain;
use capability_registry::{Capability, CapabilityError, CapabilityRegistry};

const MODULES: [&str; 3] = ["ibc", "mock", "transfer"];
const NAMES: [&str; 4] = ["ports/transfer", "channel-0", "channel-1", "x"];

#[derive(Arbitrary, Debug)]
enum Op {
    New { module: u8, name: u8 },
    Claim { module: u8, cap: u8, name: u8 },
    Release { module: u8, cap: u8 },
    Forge { module: u8, cap: u8, name: u8 },
    Revert { module: u8, name: u8 },
    RevertRelease { module: u8, cap: u8 },
    Restart,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut chain = TestChain::new();
    let mut registry = CapabilityRegistry::new();
    registry.init_mem_store(&mut chain.ctx()).unwrap();
    let mut handles: Vec<_> = MODULES.iter().map(|m| registry.scope_to_module(m).unwrap()).collect();

    // index -> (module -> name)
    let mut model: BTreeMap<u64, BTreeMap<usize, &str>> = BTreeMap::new();
    let mut caps: Vec<Capability> = Vec::new();

    for op in ops.into_iter().take(64) {
        match op {
            Op::New { module, name } => {
                let m = module as usize % MODULES.len();
                let n = NAMES[name as usize % NAMES.len()];
                let taken = model.values().any(|o| o.get(&m) == Some(&n));
                match handles[m].new_capability(&mut chain.ctx(), n) {
                    Ok(cap) => {
                        assert!(!taken);
                        model.entry(cap.index()).or_default().insert(m, n);
                        caps.push(cap);
                    }
                    Err(err) => {
                        assert!(taken);
                        assert!(matches!(err, CapabilityError::NameTaken { .. }));
                    }
                }
            }
            Op::Claim { module, cap, name } => {
                let Some(cap) = pick(&caps, cap) else { continue };
                let m = module as usize % MODULES.len();
                let n = NAMES[name as usize % NAMES.len()];
                let result = handles[m].claim_capability(&mut chain.ctx(), &cap, n);
                let owned = model.get(&cap.index()).is_some_and(|o| o.contains_key(&m));
                let taken = model.values().any(|o| o.get(&m) == Some(&n));
                match result {
                    Ok(()) => {
                        assert!(!owned && !taken);
                        model.entry(cap.index()).or_default().insert(m, n);
                    }
                    Err(_) => assert!(owned || taken || !model.contains_key(&cap.index())),
                }
            }
            Op::Release { module, cap } => {
                let Some(cap) = pick(&caps, cap) else { continue };
                let m = module as usize % MODULES.len();
                let result = handles[m].release_capability(&mut chain.ctx(), &cap);
                let owned = model.get(&cap.index()).is_some_and(|o| o.contains_key(&m));
                assert_eq!(result.is_ok(), owned);
                if owned {
                    let owners = model.get_mut(&cap.index()).unwrap();
                    owners.remove(&m);
                    if owners.is_empty() {
                        model.remove(&cap.index());
                    }
                }
            }
            Op::Forge { module, cap, name } => {
                let Some(cap) = pick(&caps, cap) else { continue };
                let m = module as usize % MODULES.len();
                let n = NAMES[name as usize % NAMES.len()];
                let forged = Capability::new(cap.index());
                assert!(!handles[m].authenticate_capability(&chain.ctx(), &forged, n));
            }
            Op::Revert { module, name } => {
                let m = module as usize % MODULES.len();
                let n = NAMES[name as usize % NAMES.len()];
                let out: Result<(), CapabilityError> = chain.ctx().atomic(|tx| {
                    handles[m].new_capability(tx, n)?;
                    Err(CapabilityError::InvalidName("revert".into()))
                });
                assert!(out.is_err());
            }
            Op::RevertRelease { module, cap } => {
                let Some(cap) = pick(&caps, cap) else { continue };
                let m = module as usize % MODULES.len();
                let out: Result<(), CapabilityError> = chain.ctx().atomic(|tx| {
                    handles[m].release_capability(tx, &cap)?;
                    Err(CapabilityError::InvalidName("revert".into()))
                });
                assert!(out.is_err());
            }
            Op::Restart => {
                registry = chain.restart();
                handles = MODULES.iter().map(|m| registry.scope_to_module(m).unwrap()).collect();
                let ctx = chain.ctx();
                caps = model
                    .iter()
                    .filter_map(|(_, owners)| {
                        let (&m, &n) = owners.iter().next()?;
                        handles[m].get_capability(&ctx, n)
                    })
                    .collect();
            }
        }

        let ctx = chain.ctx();
        for cap in &caps {
            for (m, handle) in handles.iter().enumerate() {
                for n in NAMES {
                    let expected = model.get(&cap.index()).and_then(|o| o.get(&m)) == Some(&n);
                    assert_eq!(handle.authenticate_capability(&ctx, cap, n), expected);
                }
            }
        }
    }
});

fn pick(caps: &[Capability], i: u8) -> Option<Capability> {
    if caps.is_empty() {
        None
    } else {
        Some(caps[i as usize % caps.len()].clone())
    }
}
