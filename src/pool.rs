//! Core pool implementation

use std::collections::HashMap;
use std::time::Duration;

use crate::config::PoolConfig;
use crate::eviction::{ReleaseCandidate, default_release_filter};
use crate::health::HealthStatus;
use crate::metrics::{PoolMetrics, PoolMetricsTracker};
use crate::object::Pooled;
use crate::slot::PoolSlot;

/// Stable handle into the slot arena. Ids are never reused within a pool,
/// so insertion order is recoverable from the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SlotId(u64);

/// Snapshot of one pool for inspectors and bulk registry queries.
#[derive(Debug, Clone)]
pub struct PoolDescription {
    pub type_name: &'static str,
    pub name: String,
    pub priority: i32,
    pub capacity: usize,
    pub count: usize,
    pub active: usize,
    pub idle: usize,
    pub health: HealthStatus,
}

/// A pool of objects of one logical kind.
///
/// Slots live in a single arena; a by-name multimap and a by-target unique
/// map hold arena handles, so the two indices can never diverge on
/// ownership. `capacity` is a soft target: registration may transiently
/// exceed it and an immediate release pass brings the count back down.
///
/// Time is virtual. The pool's clock only advances through
/// [`update`](Pool::update), which makes expiry fully deterministic.
pub struct Pool<T: Pooled> {
    name: String,
    allow_multi_spawn: bool,
    capacity: usize,
    expire_after: Option<Duration>,
    priority: i32,
    auto_release_interval: Duration,
    slots: HashMap<SlotId, PoolSlot<T>>,
    by_name: HashMap<String, Vec<SlotId>>,
    by_target: HashMap<T::Target, SlotId>,
    next_id: u64,
    clock: Duration,
    auto_release_accum: Duration,
    metrics: PoolMetricsTracker,
}

impl<T: Pooled> Pool<T> {
    pub fn new(name: impl Into<String>, config: PoolConfig) -> Self {
        Self {
            name: name.into(),
            allow_multi_spawn: config.allow_multi_spawn,
            capacity: config.capacity,
            expire_after: config.expire_after,
            priority: config.priority,
            auto_release_interval: config.auto_release_interval,
            slots: HashMap::new(),
            by_name: HashMap::new(),
            by_target: HashMap::new(),
            next_id: 0,
            clock: Duration::ZERO,
            auto_release_accum: Duration::ZERO,
            metrics: PoolMetricsTracker::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allow_multi_spawn(&self) -> bool {
        self.allow_multi_spawn
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shrinking below the current count triggers an immediate release pass.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.release();
    }

    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after
    }

    pub fn set_expire_after(&mut self, age: Option<Duration>) {
        self.expire_after = age;
        self.release();
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_pool_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn auto_release_interval(&self) -> Duration {
        self.auto_release_interval
    }

    pub fn set_auto_release_interval(&mut self, interval: Duration) {
        self.auto_release_interval = interval;
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.values().filter(|s| s.is_using()).count()
    }

    pub fn idle_count(&self) -> usize {
        self.slots.values().filter(|s| !s.is_using()).count()
    }

    /// Insert a new object. `spawned` records an outstanding hold taken
    /// before registration (a freshly loaded asset already in the caller's
    /// hands); no on-spawn hook fires for it.
    ///
    /// Panics if the object's target is already registered here: an object
    /// belongs to at most one pool, exactly once. If the insert pushes the
    /// pool over capacity, a release pass runs immediately and may evict
    /// other, unrelated objects.
    pub fn register(&mut self, object: T, spawned: bool) {
        let target = object.target();
        if self.by_target.contains_key(&target) {
            panic!(
                "target {:?} is already registered in pool '{}'",
                target, self.name
            );
        }

        let id = SlotId(self.next_id);
        self.next_id += 1;

        self.by_name
            .entry(object.name().to_string())
            .or_default()
            .push(id);
        self.by_target.insert(target, id);
        self.slots.insert(id, PoolSlot::new(object, spawned, self.clock));
        self.metrics.registered += 1;
        if spawned {
            self.metrics.spawned += 1;
        }

        if self.slots.len() > self.capacity {
            self.release();
        }
    }

    /// True iff some slot with this name could satisfy a spawn right now.
    pub fn can_spawn(&self, name: &str) -> bool {
        self.eligible_slot(name).is_some()
    }

    /// Hand out the first eligible slot with this name. Returns `None`
    /// when no slot qualifies; the caller is expected to create the object
    /// externally and [`register`](Pool::register) it.
    pub fn spawn(&mut self, name: &str) -> Option<T::Target> {
        let Some(id) = self.eligible_slot(name) else {
            self.metrics.spawn_misses += 1;
            return None;
        };
        let slot = self
            .slots
            .get_mut(&id)
            .expect("by-name index pointed at a missing slot");
        self.metrics.spawned += 1;
        Some(slot.spawn(self.clock))
    }

    /// True iff any slot at all could satisfy a spawn right now.
    pub fn can_spawn_any(&self) -> bool {
        self.eligible_slot_any().is_some()
    }

    /// Hand out an eligible slot regardless of name, oldest registration
    /// first. The name-omitted counterpart of [`spawn`](Pool::spawn).
    pub fn spawn_any(&mut self) -> Option<T::Target> {
        let Some(id) = self.eligible_slot_any() else {
            self.metrics.spawn_misses += 1;
            return None;
        };
        let slot = self
            .slots
            .get_mut(&id)
            .expect("eligible id came from the arena");
        self.metrics.spawned += 1;
        Some(slot.spawn(self.clock))
    }

    fn eligible_slot(&self, name: &str) -> Option<SlotId> {
        let ids = self.by_name.get(name)?;
        ids.iter()
            .copied()
            .find(|id| self.allow_multi_spawn || !self.slots[id].is_using())
    }

    fn eligible_slot_any(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .filter(|(_, slot)| self.allow_multi_spawn || !slot.is_using())
            .map(|(id, _)| *id)
            .min()
    }

    /// Return a spawned object by its target identity.
    ///
    /// Panics if the target was never registered here or if its spawn
    /// count would go negative; both are caller bugs.
    pub fn recycle(&mut self, target: &T::Target) {
        let id = self.slot_of(target, "recycle");
        let slot = self
            .slots
            .get_mut(&id)
            .expect("by-target index pointed at a missing slot");
        slot.recycle(self.clock);
        self.metrics.recycled += 1;

        let idle = !self.slots[&id].is_using();
        if idle && self.slots.len() > self.capacity {
            self.release();
        }
    }

    /// Exempt an object from eviction (or re-admit it). Panics on an
    /// unknown target.
    pub fn set_locked(&mut self, target: &T::Target, locked: bool) {
        let id = self.slot_of(target, "set_locked");
        self.slots
            .get_mut(&id)
            .expect("by-target index pointed at a missing slot")
            .locked = locked;
    }

    /// Change an object's eviction priority. Panics on an unknown target.
    pub fn set_priority(&mut self, target: &T::Target, priority: i32) {
        let id = self.slot_of(target, "set_priority");
        self.slots
            .get_mut(&id)
            .expect("by-target index pointed at a missing slot")
            .priority = priority;
    }

    fn slot_of(&self, target: &T::Target, operation: &str) -> SlotId {
        match self.by_target.get(target) {
            Some(id) => *id,
            None => panic!(
                "{operation}: target {:?} was never registered in pool '{}'",
                target, self.name
            ),
        }
    }

    /// Borrow the object behind a target, if registered.
    pub fn get(&self, target: &T::Target) -> Option<&T> {
        let id = self.by_target.get(target)?;
        self.slots.get(id).map(|s| &s.object)
    }

    /// Remove and tear down one slot iff it is idle, unlocked, and not
    /// vetoed by the object. A busy or locked object is a normal negative
    /// result, never an error.
    pub fn release_object(&mut self, target: &T::Target) -> bool {
        let Some(&id) = self.by_target.get(target) else {
            return false;
        };
        if !self.slots[&id].is_release_candidate() {
            return false;
        }

        let mut slot = self
            .slots
            .remove(&id)
            .expect("by-target index pointed at a missing slot");
        self.by_target.remove(target);
        let name = slot.object.name().to_string();
        if let Some(ids) = self.by_name.get_mut(&name) {
            ids.retain(|candidate| *candidate != id);
            if ids.is_empty() {
                self.by_name.remove(&name);
            }
        }

        slot.object.on_release();
        self.metrics.released += 1;
        true
    }

    /// Release pass with the default target count: however much the pool
    /// is over capacity right now.
    pub fn release(&mut self) {
        let over = self.slots.len().saturating_sub(self.capacity);
        self.release_count(over);
    }

    /// Release pass targeting `to_release` evictions through the default
    /// filter. Expired candidates are evicted on top regardless of the
    /// count.
    pub fn release_count(&mut self, to_release: usize) {
        self.release_filtered(to_release, default_release_filter::<T::Target>);
    }

    /// Release pass with a caller-supplied selection policy. The filter
    /// sees every idle, unlocked, releasable candidate in registration
    /// order, the requested count, and the expiry threshold on the pool
    /// clock. Whatever it returns is re-checked by
    /// [`release_object`](Pool::release_object), so a filter cannot free a
    /// busy or locked slot.
    pub fn release_filtered<F>(&mut self, to_release: usize, filter: F)
    where
        F: FnOnce(&[ReleaseCandidate<T::Target>], usize, Option<Duration>) -> Vec<T::Target>,
    {
        let candidates = self.release_candidates();
        if candidates.is_empty() {
            return;
        }
        let expire_before = self
            .expire_after
            .and_then(|age| self.clock.checked_sub(age));

        for target in filter(&candidates, to_release, expire_before) {
            self.release_object(&target);
        }
    }

    /// Evict every currently eligible idle slot regardless of capacity.
    /// Locked and vetoing objects are skipped.
    pub fn release_all_unused(&mut self) {
        for candidate in self.release_candidates() {
            self.release_object(&candidate.target);
        }
    }

    fn release_candidates(&self) -> Vec<ReleaseCandidate<T::Target>> {
        let mut ids: Vec<(SlotId, &PoolSlot<T>)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_release_candidate())
            .map(|(id, slot)| (*id, slot))
            .collect();
        ids.sort_by_key(|(id, _)| *id);
        ids.into_iter()
            .map(|(_, slot)| ReleaseCandidate {
                target: slot.object.target(),
                name: slot.object.name().to_string(),
                priority: slot.priority,
                last_use: slot.last_use,
            })
            .collect()
    }

    /// Periodic maintenance, driven once per tick by the owning registry.
    /// Only real elapsed time advances the expiry clock and the
    /// auto-release accumulator.
    pub fn update(&mut self, _elapsed: Duration, real_elapsed: Duration) {
        self.clock += real_elapsed;
        self.auto_release_accum += real_elapsed;
        if self.auto_release_accum >= self.auto_release_interval {
            self.auto_release_accum = Duration::ZERO;
            self.release();
        }
    }

    /// Tear down every slot unconditionally, bypassing lock and usage
    /// checks. This is the hard shutdown path used when the pool itself is
    /// destroyed.
    pub fn shutdown(&mut self) {
        for (_, mut slot) in self.slots.drain() {
            slot.object.on_release();
            self.metrics.released += 1;
        }
        self.by_name.clear();
        self.by_target.clear();
    }

    pub fn metrics(&self) -> PoolMetrics {
        let active = self.active_count();
        self.metrics
            .snapshot(active, self.slots.len() - active, self.capacity)
    }

    pub fn description(&self) -> PoolDescription {
        let active = self.active_count();
        let idle = self.slots.len() - active;
        PoolDescription {
            type_name: std::any::type_name::<T>(),
            name: self.name.clone(),
            priority: self.priority,
            capacity: self.capacity,
            count: self.slots.len(),
            active,
            idle,
            health: HealthStatus::for_pool(active, idle, self.capacity),
        }
    }

    #[cfg(test)]
    pub(crate) fn index_entries(&self, name: &str, target: &T::Target) -> (usize, bool) {
        let by_name = self.by_name.get(name).map_or(0, Vec::len);
        (by_name, self.by_target.contains_key(target))
    }
}

impl<T: Pooled> Drop for Pool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Instance {
        name: &'static str,
        id: u32,
        releasable: bool,
        released: Arc<AtomicU32>,
    }

    impl Instance {
        fn new(name: &'static str, id: u32) -> Self {
            Self {
                name,
                id,
                releasable: true,
                released: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl Pooled for Instance {
        type Target = u32;

        fn name(&self) -> &str {
            self.name
        }

        fn target(&self) -> u32 {
            self.id
        }

        fn on_release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }

        fn is_releasable(&self) -> bool {
            self.releasable
        }
    }

    fn tick(pool: &mut Pool<Instance>, secs: u64) {
        let dt = Duration::from_secs(secs);
        pool.update(dt, dt);
    }

    #[test]
    fn spawn_returns_target_and_marks_in_use() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        pool.register(Instance::new("button", 1), false);

        assert!(pool.can_spawn("button"));
        assert_eq!(pool.spawn("button"), Some(1));
        assert_eq!(pool.active_count(), 1);
        assert!(!pool.can_spawn("button"));
        assert_eq!(pool.spawn("button"), None);

        pool.recycle(&1);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.can_spawn("button"));
    }

    #[test]
    fn multi_spawn_allows_concurrent_holders() {
        let mut pool = Pool::new("shared", PoolConfig::new().with_multi_spawn(true));
        pool.register(Instance::new("atlas", 1), false);

        assert_eq!(pool.spawn("atlas"), Some(1));
        assert_eq!(pool.spawn("atlas"), Some(1));
        assert_eq!(pool.active_count(), 1);

        pool.recycle(&1);
        assert_eq!(pool.active_count(), 1);
        pool.recycle(&1);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn spawn_any_takes_the_oldest_eligible_slot() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        pool.register(Instance::new("button", 1), false);
        pool.register(Instance::new("label", 2), false);

        assert!(pool.can_spawn_any());
        assert_eq!(pool.spawn_any(), Some(1), "registration order wins");
        assert_eq!(pool.spawn_any(), Some(2));
        assert!(!pool.can_spawn_any());
        assert_eq!(pool.spawn_any(), None);
        assert_eq!(pool.metrics().spawn_misses, 1);
    }

    #[test]
    fn spawn_misses_for_unknown_name() {
        let mut pool: Pool<Instance> = Pool::new("empty", PoolConfig::new());
        assert!(!pool.can_spawn("ghost"));
        assert_eq!(pool.spawn("ghost"), None);
        assert_eq!(pool.metrics().spawn_misses, 1);
    }

    #[test]
    #[should_panic(expected = "was never registered")]
    fn recycling_unknown_target_panics() {
        let mut pool: Pool<Instance> = Pool::new("widgets", PoolConfig::new());
        pool.recycle(&99);
    }

    #[test]
    #[should_panic(expected = "spawn count underflow")]
    fn recycling_idle_object_panics() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        pool.register(Instance::new("button", 1), false);
        pool.recycle(&1);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_target_registration_panics() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        pool.register(Instance::new("button", 1), false);
        pool.register(Instance::new("label", 1), false);
    }

    #[test]
    #[should_panic(expected = "set_locked")]
    fn locking_unknown_target_panics() {
        let mut pool: Pool<Instance> = Pool::new("widgets", PoolConfig::new());
        pool.set_locked(&4, true);
    }

    #[test]
    fn over_capacity_registration_evicts_older_idle_entry() {
        let mut pool = Pool::new("effects", PoolConfig::new().with_capacity(1));
        let a = Instance::new("spark", 1);
        let released_a = Arc::clone(&a.released);
        pool.register(a, false);
        pool.register(Instance::new("smoke", 2), false);

        assert_eq!(pool.count(), 1);
        assert_eq!(released_a.load(Ordering::SeqCst), 1);
        assert!(pool.can_spawn("smoke"));
        assert!(!pool.can_spawn("spark"));
    }

    #[test]
    fn busy_entries_keep_pool_over_capacity_until_recycled() {
        let mut pool = Pool::new("effects", PoolConfig::new().with_capacity(1));
        pool.register(Instance::new("spark", 1), true);
        pool.register(Instance::new("smoke", 2), true);
        // both spawned, nothing evictable
        assert_eq!(pool.count(), 2);

        pool.recycle(&1);
        // the recycled slot went idle while over capacity
        assert_eq!(pool.count(), 1);
        assert!(pool.get(&1).is_none());
        assert!(pool.get(&2).is_some());
    }

    #[test]
    fn eviction_prefers_oldest_among_equal_priority() {
        let mut pool = Pool::new("meshes", PoolConfig::new());
        pool.register(Instance::new("a", 1), true);
        pool.register(Instance::new("b", 2), true);
        pool.recycle(&1); // last_use = 0s
        tick(&mut pool, 9);
        pool.recycle(&2); // last_use = 9s

        pool.release_count(1);
        assert!(pool.get(&1).is_none());
        assert!(pool.get(&2).is_some());
    }

    #[test]
    fn eviction_never_takes_high_priority_over_low() {
        let mut pool = Pool::new("meshes", PoolConfig::new());
        pool.register(Instance::new("c", 1), false);
        pool.register(Instance::new("d", 2), false);
        pool.set_priority(&2, 10);
        tick(&mut pool, 1000);
        // refresh the low-priority entry so it is the recent one
        let spawned = pool.spawn("c").unwrap();
        pool.recycle(&spawned);

        pool.release_count(1);
        assert!(pool.get(&1).is_none(), "low priority must go first");
        assert!(pool.get(&2).is_some());
    }

    #[test]
    fn expiry_overrides_release_count() {
        let mut pool = Pool::new(
            "textures",
            PoolConfig::new()
                .with_capacity(100)
                .with_expire_after(Duration::from_secs(5)),
        );
        pool.register(Instance::new("x", 1), false);
        tick(&mut pool, 6);

        pool.release_count(0);
        assert_eq!(pool.count(), 0, "expired entry evicted under capacity");
    }

    #[test]
    fn fresh_entries_survive_a_zero_count_release() {
        let mut pool = Pool::new(
            "textures",
            PoolConfig::new().with_expire_after(Duration::from_secs(5)),
        );
        pool.register(Instance::new("x", 1), false);
        tick(&mut pool, 3);

        pool.release_count(0);
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn locked_entries_are_immune_to_every_release_path() {
        let mut pool = Pool::new(
            "fonts",
            PoolConfig::new()
                .with_capacity(1)
                .with_expire_after(Duration::from_secs(1)),
        );
        pool.register(Instance::new("fallback", 1), false);
        pool.set_locked(&1, true);
        pool.set_priority(&1, i32::MIN);
        pool.set_capacity(0);
        tick(&mut pool, 100);

        pool.release();
        pool.release_count(10);
        pool.release_all_unused();
        assert!(!pool.release_object(&1));
        assert_eq!(pool.count(), 1);

        pool.set_locked(&1, false);
        pool.release_all_unused();
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn releasable_veto_is_honored() {
        let mut pool = Pool::new("streams", PoolConfig::new().with_capacity(0));
        let mut obj = Instance::new("radio", 1);
        obj.releasable = false;
        pool.register(obj, false);

        pool.release_all_unused();
        assert!(!pool.release_object(&1));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn round_trip_clears_both_indices_and_fires_release_once() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        let obj = Instance::new("button", 1);
        let released = Arc::clone(&obj.released);
        pool.register(obj, true);
        pool.recycle(&1);

        assert!(pool.release_object(&1));
        assert_eq!(pool.index_entries("button", &1), (0, false));
        assert_eq!(released.load(Ordering::SeqCst), 1);

        // a second attempt is a normal negative result
        assert!(!pool.release_object(&1));
        drop(pool);
        assert_eq!(released.load(Ordering::SeqCst), 1, "hook fired exactly once");
    }

    #[test]
    fn release_object_refuses_busy_objects() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        pool.register(Instance::new("button", 1), true);
        assert!(!pool.release_object(&1));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn update_runs_release_on_the_configured_interval() {
        let mut pool = Pool::new(
            "particles",
            PoolConfig::new()
                .with_expire_after(Duration::from_secs(5))
                .with_auto_release_interval(Duration::from_secs(10)),
        );
        pool.register(Instance::new("burst", 1), false);

        tick(&mut pool, 6);
        assert_eq!(pool.count(), 1, "already expired, but no pass ran yet");

        tick(&mut pool, 4);
        assert_eq!(pool.count(), 0, "interval reached, release pass ran");
    }

    #[test]
    fn capacity_converges_after_enough_recycles() {
        let mut pool = Pool::new("sounds", PoolConfig::new().with_capacity(2));
        for id in 1..=5 {
            pool.register(Instance::new("clip", id), true);
        }
        assert_eq!(pool.count(), 5);

        for id in 1..=5 {
            pool.recycle(&id);
        }
        tick(&mut pool, 100);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn custom_filter_cannot_release_busy_or_locked_slots() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        pool.register(Instance::new("busy", 1), true);
        pool.register(Instance::new("locked", 2), false);
        pool.register(Instance::new("idle", 3), false);
        pool.set_locked(&2, true);

        pool.release_filtered(3, |_, _, _| vec![1, 2, 3]);
        assert!(pool.get(&1).is_some());
        assert!(pool.get(&2).is_some());
        assert!(pool.get(&3).is_none());
    }

    #[test]
    fn shutdown_ignores_locks_and_usage() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        let locked = Instance::new("locked", 1);
        let busy = Instance::new("busy", 2);
        let released = [Arc::clone(&locked.released), Arc::clone(&busy.released)];
        pool.register(locked, false);
        pool.register(busy, true);
        pool.set_locked(&1, true);

        pool.shutdown();
        assert_eq!(pool.count(), 0);
        for counter in &released {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn metrics_track_lifecycle_transitions() {
        let mut pool = Pool::new("widgets", PoolConfig::new());
        pool.register(Instance::new("button", 1), false);
        let target = pool.spawn("button").unwrap();
        pool.recycle(&target);
        let _ = pool.spawn("missing");
        pool.release_object(&target);

        let metrics = pool.metrics();
        assert_eq!(metrics.total_registered, 1);
        assert_eq!(metrics.total_spawned, 1);
        assert_eq!(metrics.total_recycled, 1);
        assert_eq!(metrics.total_released, 1);
        assert_eq!(metrics.spawn_misses, 1);
        assert_eq!(metrics.active_objects, 0);
    }
}
