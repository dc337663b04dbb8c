use proptest::prelude::*;
use capability_registry::{
    testing::TestChain,
    Capability, CapabilityError, CapabilityRegistry,
};

// Helper to create a recovered registry over a fresh chain
fn setup() -> (TestChain, CapabilityRegistry) {
    let mut chain = TestChain::new();
    let registry = CapabilityRegistry::new();
    registry.init_mem_store(&mut chain.ctx()).unwrap();
    (chain, registry)
}

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(/[a-z0-9]{1,6})?"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Indices are handed out in strict sequence starting at the seed, and
    /// every distinct name gets a distinct index.
    #[test]
    fn prop_indices_are_unique_and_monotonic(
        seed in 1u64..1_000_000,
        names in prop::collection::btree_set(arb_name(), 1..20),
    ) {
        let (mut chain, mut registry) = setup();
        let mut ctx = chain.ctx();
        registry.initialize_index(&mut ctx, seed).unwrap();
        let sk = registry.scope_to_module("ibc").unwrap();

        let mut last = None;
        for (i, name) in names.iter().enumerate() {
            let cap = sk.new_capability(&mut ctx, name).unwrap();
            prop_assert_eq!(cap.index(), seed + i as u64);
            if let Some(prev) = last {
                prop_assert!(cap.index() > prev);
            }
            last = Some(cap.index());
        }
        prop_assert_eq!(registry.latest_index(&mut ctx).unwrap(), seed + names.len() as u64);
        prop_assert_eq!(registry.live_capabilities(), names.len());
    }

    /// A capability built from a learned index never authenticates, in any
    /// module, under any name.
    #[test]
    fn prop_forged_capability_never_authenticates(
        names in prop::collection::btree_set(arb_name(), 1..10),
        guess in arb_name(),
    ) {
        let (mut chain, mut registry) = setup();
        let owner = registry.scope_to_module("transfer").unwrap();
        let thief = registry.scope_to_module("thief").unwrap();
        let mut ctx = chain.ctx();

        for name in &names {
            let cap = owner.new_capability(&mut ctx, name).unwrap();
            let forged = Capability::new(cap.index());
            prop_assert!(owner.authenticate_capability(&ctx, &cap, name));
            prop_assert!(!owner.authenticate_capability(&ctx, &forged, name));
            prop_assert!(!owner.authenticate_capability(&ctx, &forged, &guess));
            prop_assert!(!thief.authenticate_capability(&ctx, &forged, name));
            prop_assert_eq!(
                thief.claim_capability(&mut ctx, &forged, &guess),
                Err(CapabilityError::UnknownCapability(cap.index()))
            );
        }
    }

    /// After a restart every name resolves to a capability with the same
    /// index, and the old objects are dead.
    #[test]
    fn prop_restart_restores_same_indices(
        names in prop::collection::btree_set(arb_name(), 1..15),
        claimed in prop::collection::vec(any::<bool>(), 15),
    ) {
        let (mut chain, mut registry) = setup();
        let a = registry.scope_to_module("a").unwrap();
        let b = registry.scope_to_module("b").unwrap();

        let mut before = Vec::new();
        {
            let mut ctx = chain.ctx();
            for (i, name) in names.iter().enumerate() {
                let cap = a.new_capability(&mut ctx, name).unwrap();
                if claimed[i] {
                    b.claim_capability(&mut ctx, &cap, name).unwrap();
                }
                before.push((name.clone(), cap, claimed[i]));
            }
        }

        let mut restarted = chain.restart();
        let ra = restarted.scope_to_module("a").unwrap();
        let rb = restarted.scope_to_module("b").unwrap();
        let ctx = chain.ctx();
        for (name, old, was_claimed) in &before {
            let cap = ra.get_capability(&ctx, name).unwrap();
            prop_assert_eq!(cap.index(), old.index());
            prop_assert!(!cap.same_as(old));
            prop_assert!(!ra.authenticate_capability(&ctx, old, name));
            prop_assert_eq!(rb.authenticate_capability(&ctx, &cap, name), *was_claimed);
        }
    }

    /// The capability survives until its last owner releases it, and the
    /// owner set shrinks in sorted order along the way.
    #[test]
    fn prop_release_destroys_only_after_last_owner(
        modules in prop::collection::btree_set("[a-z]{2,6}", 2..6),
    ) {
        let (mut chain, mut registry) = setup();
        let handles: Vec<_> = modules
            .iter()
            .map(|m| registry.scope_to_module(m).unwrap())
            .collect();
        let mut ctx = chain.ctx();

        let cap = handles[0].new_capability(&mut ctx, "port").unwrap();
        for sk in &handles[1..] {
            sk.claim_capability(&mut ctx, &cap, "port").unwrap();
        }
        let expected: Vec<String> = modules.iter().cloned().collect();
        let (mods, _) = handles[0].lookup_modules(&mut ctx, "port").unwrap();
        prop_assert_eq!(mods, expected.clone());

        for (i, sk) in handles.iter().enumerate() {
            sk.release_capability(&mut ctx, &cap).unwrap();
            prop_assert!(!sk.authenticate_capability(&ctx, &cap, "port"));
            let remaining = &handles[i + 1..];
            if let Some(next) = remaining.first() {
                prop_assert_eq!(registry.live_capabilities(), 1);
                let (mods, _) = next.lookup_modules(&mut ctx, "port").unwrap();
                prop_assert_eq!(mods, expected[i + 1..].to_vec());
            } else {
                prop_assert_eq!(registry.live_capabilities(), 0);
                prop_assert!(registry.get_owners(&mut ctx, cap.index()).unwrap().is_none());
            }
        }
    }
}
