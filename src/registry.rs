//! Registry of independently configured pools

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::PoolConfig;
use crate::object::Pooled;
use crate::pool::{Pool, PoolDescription};

/// Type-erased view of one pool, the handle the registry owns and ticks.
/// Typed access goes through [`PoolRegistry::pool`] / [`PoolRegistry::pool_mut`].
pub trait PoolBase: Any {
    fn name(&self) -> &str;
    fn type_name(&self) -> &'static str;
    fn priority(&self) -> i32;
    fn count(&self) -> usize;
    fn active_count(&self) -> usize;
    fn description(&self) -> PoolDescription;
    fn update(&mut self, elapsed: Duration, real_elapsed: Duration);
    fn release(&mut self);
    fn release_all_unused(&mut self);
    fn shutdown(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Pooled + 'static> PoolBase for Pool<T> {
    fn name(&self) -> &str {
        Pool::name(self)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn priority(&self) -> i32 {
        Pool::priority(self)
    }

    fn count(&self) -> usize {
        Pool::count(self)
    }

    fn active_count(&self) -> usize {
        Pool::active_count(self)
    }

    fn description(&self) -> PoolDescription {
        Pool::description(self)
    }

    fn update(&mut self, elapsed: Duration, real_elapsed: Duration) {
        Pool::update(self, elapsed, real_elapsed);
    }

    fn release(&mut self) {
        Pool::release(self);
    }

    fn release_all_unused(&mut self) {
        Pool::release_all_unused(self);
    }

    fn shutdown(&mut self) {
        Pool::shutdown(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    type_id: TypeId,
    name: Option<String>,
}

impl PoolKey {
    fn of<T: 'static>(name: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: name.map(str::to_string),
        }
    }
}

struct RegistryEntry {
    /// Creation order, the tie-break when two pools share a priority.
    seq: u64,
    pool: Box<dyn PoolBase>,
}

/// Owns every pool, keyed by value type plus an optional name, and drives
/// their periodic maintenance from the host's per-frame tick.
#[derive(Default)]
pub struct PoolRegistry {
    pools: HashMap<PoolKey, RegistryEntry>,
    next_seq: u64,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn contains<T: Pooled + 'static>(&self, name: Option<&str>) -> bool {
        self.pools.contains_key(&PoolKey::of::<T>(name))
    }

    /// Create a pool for `T` under the given key. Panics if one already
    /// exists there: each `(type, name)` key owns at most one pool.
    pub fn create<T: Pooled + 'static>(
        &mut self,
        name: Option<&str>,
        config: PoolConfig,
    ) -> &mut Pool<T> {
        let key = PoolKey::of::<T>(name);
        if self.pools.contains_key(&key) {
            panic!(
                "an object pool for {} named {:?} already exists",
                type_name::<T>(),
                name
            );
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let pool = Box::new(Pool::<T>::new(name.unwrap_or_default(), config));
        self.pools.insert(key.clone(), RegistryEntry { seq, pool });
        self.pools
            .get_mut(&key)
            .expect("pool was just inserted")
            .pool
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
            .expect("pool key points at a pool of a different type")
    }

    pub fn pool<T: Pooled + 'static>(&self, name: Option<&str>) -> Option<&Pool<T>> {
        self.pools
            .get(&PoolKey::of::<T>(name))
            .and_then(|entry| entry.pool.as_any().downcast_ref())
    }

    pub fn pool_mut<T: Pooled + 'static>(&mut self, name: Option<&str>) -> Option<&mut Pool<T>> {
        self.pools
            .get_mut(&PoolKey::of::<T>(name))
            .and_then(|entry| entry.pool.as_any_mut().downcast_mut())
    }

    /// Hard shutdown of one pool: every slot is torn down regardless of
    /// lock or usage, then the pool is removed. Panics if no pool exists
    /// under the key.
    pub fn destroy<T: Pooled + 'static>(&mut self, name: Option<&str>) {
        let key = PoolKey::of::<T>(name);
        match self.pools.remove(&key) {
            Some(mut entry) => entry.pool.shutdown(),
            None => panic!(
                "no object pool for {} named {:?} to destroy",
                type_name::<T>(),
                name
            ),
        }
    }

    /// Drive maintenance on every pool. The host calls this exactly once
    /// per update cycle.
    pub fn tick(&mut self, elapsed: Duration, real_elapsed: Duration) {
        for entry in self.pools.values_mut() {
            entry.pool.update(elapsed, real_elapsed);
        }
    }

    /// Run a default release pass on every pool, lowest pool priority
    /// first (creation order among ties), so higher-priority pools are
    /// squeezed last during a global sweep.
    pub fn release_all(&mut self) {
        for entry in self.entries_by_priority() {
            entry.pool.release();
        }
    }

    /// Evict every eligible idle object in every pool, lowest pool
    /// priority first.
    pub fn release_all_unused(&mut self) {
        for entry in self.entries_by_priority() {
            entry.pool.release_all_unused();
        }
    }

    fn entries_by_priority(&mut self) -> Vec<&mut RegistryEntry> {
        let mut entries: Vec<&mut RegistryEntry> = self.pools.values_mut().collect();
        entries.sort_by_key(|entry| (entry.pool.priority(), entry.seq));
        entries
    }

    /// Snapshot of every pool. With `sorted`, ordered by descending pool
    /// priority (most important first), creation order among ties.
    pub fn descriptions(&self, sorted: bool) -> Vec<PoolDescription> {
        let mut entries: Vec<&RegistryEntry> = self.pools.values().collect();
        if sorted {
            entries.sort_by_key(|entry| (std::cmp::Reverse(entry.pool.priority()), entry.seq));
        }
        entries
            .into_iter()
            .map(|entry| entry.pool.description())
            .collect()
    }

    /// Type-erased lookup across every pool.
    pub fn pools_by(&self, predicate: impl Fn(&dyn PoolBase) -> bool) -> Vec<&dyn PoolBase> {
        let mut entries: Vec<&RegistryEntry> = self
            .pools
            .values()
            .filter(|entry| predicate(entry.pool.as_ref()))
            .collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.pool.as_ref()).collect()
    }

    /// Tear down every pool, bypassing lock and usage checks.
    pub fn shutdown(&mut self) {
        for (_, mut entry) in self.pools.drain() {
            entry.pool.shutdown();
        }
    }
}
