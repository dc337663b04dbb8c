//!
//! The per-transaction view of state handed to every registry operation.

use super::{CacheKvStore, GasConfig, GasMeter, KvStore};
use crate::error::StoreError;

/// In-process side effect that must only happen if the enclosing branch commits.
pub type CommitHook = Box<dyn FnOnce()>;

/// Transaction context: a durable store, a memory-only store and a gas meter.
///
/// Durable access goes through the metered helpers ([`Context::read`],
/// [`Context::write`], ...). The memory-only store is never metered.
pub struct Context<'a> {
    durable: &'a mut dyn KvStore,
    memory: &'a mut dyn KvStore,
    gas: GasMeter,
    gas_config: GasConfig,
    // None outside any branch: hooks run immediately.
    commit_hooks: Option<&'a mut Vec<CommitHook>>,
}

impl<'a> Context<'a> {
    /// A context with an infinite gas meter and the default gas table.
    pub fn new(durable: &'a mut dyn KvStore, memory: &'a mut dyn KvStore) -> Self {
        Context {
            durable,
            memory,
            gas: GasMeter::infinite(),
            gas_config: GasConfig::default(),
            commit_hooks: None,
        }
    }

    pub fn with_gas_limit(mut self, limit: u64) -> Self {
        self.gas = GasMeter::with_limit(limit);
        self
    }

    pub fn with_gas_config(mut self, gas_config: GasConfig) -> Self {
        self.gas_config = gas_config;
        self
    }

    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas
    }

    pub fn gas_consumed(&self) -> u64 {
        self.gas.consumed()
    }

    pub fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let cfg = self.gas_config;
        self.gas.consume(cfg.read_cost_flat, "ReadFlat")?;
        let value = self.durable.get(key);
        let bytes = key.len() + value.as_ref().map_or(0, Vec::len);
        self.gas
            .consume(cfg.read_cost_per_byte.saturating_mul(bytes as u64), "ReadPerByte")?;
        Ok(value)
    }

    pub fn contains(&mut self, key: &[u8]) -> Result<bool, StoreError> {
        self.gas.consume(self.gas_config.has_cost, "Has")?;
        Ok(self.durable.has(key))
    }

    pub fn write(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        let cfg = self.gas_config;
        self.gas.consume(cfg.write_cost_flat, "WriteFlat")?;
        let bytes = (key.len() + value.len()) as u64;
        self.gas
            .consume(cfg.write_cost_per_byte.saturating_mul(bytes), "WritePerByte")?;
        self.durable.set(key, value);
        Ok(())
    }

    pub fn remove(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.gas.consume(self.gas_config.delete_cost, "Delete")?;
        self.durable.delete(key);
        Ok(())
    }

    /// Durable entries under `prefix`, charging per entry visited.
    pub fn iterate(&mut self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let cfg = self.gas_config;
        let entries = self.durable.prefix_entries(prefix);
        for (key, value) in &entries {
            self.gas.consume(cfg.iter_next_cost_flat, "IterNextFlat")?;
            let bytes = (key.len() + value.len()) as u64;
            self.gas
                .consume(cfg.read_cost_per_byte.saturating_mul(bytes), "ValuePerByte")?;
        }
        Ok(entries)
    }

    pub fn memory(&self) -> &dyn KvStore {
        &*self.memory
    }

    pub fn memory_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.memory
    }

    /// Runs `hook` once the current branch (and every branch enclosing it)
    /// commits. Outside any branch it runs immediately; in a branch that is
    /// discarded it never runs.
    pub fn on_commit(&mut self, hook: impl FnOnce() + 'static) {
        match self.commit_hooks.as_deref_mut() {
            Some(hooks) => hooks.push(Box::new(hook)),
            None => hook(),
        }
    }

    /// Reborrows the same stores behind an infinite gas meter. Nothing done
    /// through the returned context is charged to this one.
    pub fn unmetered(&mut self) -> Context<'_> {
        Context {
            durable: &mut *self.durable,
            memory: &mut *self.memory,
            gas: GasMeter::infinite(),
            gas_config: self.gas_config,
            commit_hooks: self.commit_hooks.as_deref_mut(),
        }
    }

    /// Runs `f` against branches of both stores. The branches are written back
    /// only if `f` returns `Ok`; gas used inside is charged either way. Hooks
    /// registered through [`Context::on_commit`] follow the same rule.
    pub fn atomic<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T, E>,
    {
        let mut durable = CacheKvStore::new(&mut *self.durable);
        let mut memory = CacheKvStore::new(&mut *self.memory);
        let mut hooks = Vec::new();
        let mut branch = Context {
            durable: &mut durable,
            memory: &mut memory,
            gas: self.gas,
            gas_config: self.gas_config,
            commit_hooks: Some(&mut hooks),
        };
        let result = f(&mut branch);
        self.gas = branch.gas;
        if result.is_ok() {
            durable.write();
            memory.write();
            match self.commit_hooks.as_deref_mut() {
                Some(parent) => parent.extend(hooks),
                None => hooks.into_iter().for_each(|hook| hook()),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_durable_access_is_metered() {
        let mut durable = MemoryStore::new();
        let mut memory = MemoryStore::new();
        let mut ctx = Context::new(&mut durable, &mut memory);
        ctx.write(b"k", vec![0; 4]).unwrap();
        let cfg = GasConfig::default();
        assert_eq!(ctx.gas_consumed(), cfg.write_cost_flat + 5 * cfg.write_cost_per_byte);
        ctx.memory_mut().set(b"m", vec![1]);
        assert_eq!(ctx.gas_consumed(), cfg.write_cost_flat + 5 * cfg.write_cost_per_byte);
    }

    #[test]
    fn test_out_of_gas() {
        let mut durable = MemoryStore::new();
        let mut memory = MemoryStore::new();
        let mut ctx = Context::new(&mut durable, &mut memory).with_gas_limit(10);
        assert!(matches!(ctx.read(b"k"), Err(StoreError::OutOfGas { .. })));
    }

    #[test]
    fn test_unmetered_leaves_meter_untouched() {
        let mut durable = MemoryStore::new();
        let mut memory = MemoryStore::new();
        let mut ctx = Context::new(&mut durable, &mut memory).with_gas_limit(1);
        {
            let mut free = ctx.unmetered();
            free.write(b"k", vec![1; 64]).unwrap();
            free.iterate(b"").unwrap();
        }
        assert_eq!(ctx.gas_consumed(), 0);
        drop(ctx);
        assert!(durable.has(b"k"));
    }

    #[test]
    fn test_atomic_commits_on_ok() {
        let mut durable = MemoryStore::new();
        let mut memory = MemoryStore::new();
        let mut ctx = Context::new(&mut durable, &mut memory);
        let out: Result<u8, StoreError> = ctx.atomic(|tx| {
            tx.write(b"d", vec![1])?;
            tx.memory_mut().set(b"m", vec![2]);
            Ok(7)
        });
        assert_eq!(out, Ok(7));
        assert!(ctx.gas_consumed() > 0);
        drop(ctx);
        assert!(durable.has(b"d"));
        assert!(memory.has(b"m"));
    }

    #[test]
    fn test_commit_hooks_follow_the_outermost_branch() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut durable = MemoryStore::new();
        let mut memory = MemoryStore::new();
        let mut ctx = Context::new(&mut durable, &mut memory);
        let fired = Rc::new(Cell::new(0));

        let f = fired.clone();
        ctx.on_commit(move || f.set(f.get() + 1));
        assert_eq!(fired.get(), 1);

        let out: Result<(), StoreError> = ctx.atomic(|tx| {
            let f = fired.clone();
            tx.on_commit(move || f.set(f.get() + 10));
            Err(StoreError::Codec("abort".into()))
        });
        assert!(out.is_err());
        assert_eq!(fired.get(), 1);

        let out: Result<(), StoreError> = ctx.atomic(|outer| {
            let inner: Result<(), StoreError> = outer.atomic(|tx| {
                let f = fired.clone();
                tx.unmetered().on_commit(move || f.set(f.get() + 100));
                Ok(())
            });
            inner?;
            // Committed inner branch still waits for the outer one.
            assert_eq!(fired.get(), 1);
            Ok(())
        });
        assert!(out.is_ok());
        assert_eq!(fired.get(), 101);
    }

    #[test]
    fn test_atomic_discards_on_err() {
        let mut durable = MemoryStore::new();
        let mut memory = MemoryStore::new();
        let mut ctx = Context::new(&mut durable, &mut memory);
        let out: Result<(), StoreError> = ctx.atomic(|tx| {
            tx.write(b"d", vec![1])?;
            tx.memory_mut().set(b"m", vec![2]);
            Err(StoreError::Codec("abort".into()))
        });
        assert!(out.is_err());
        let charged = ctx.gas_consumed();
        assert!(charged > 0);
        drop(ctx);
        assert!(!durable.has(b"d"));
        assert!(!memory.has(b"m"));
    }
}
