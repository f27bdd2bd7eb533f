//! Slot wrapper tracking one pooled object's usage

use std::time::Duration;

use crate::object::Pooled;

/// Wraps one pooled object with the metadata the pool mutates on its
/// behalf: outstanding spawn count, lock flag, priority, and the last-use
/// stamp on the pool's virtual clock.
pub(crate) struct PoolSlot<T: Pooled> {
    pub(crate) object: T,
    spawn_count: u32,
    pub(crate) locked: bool,
    pub(crate) priority: i32,
    pub(crate) last_use: Duration,
}

impl<T: Pooled> PoolSlot<T> {
    pub(crate) fn new(object: T, spawned: bool, now: Duration) -> Self {
        Self {
            object,
            spawn_count: u32::from(spawned),
            locked: false,
            priority: 0,
            last_use: now,
        }
    }

    pub(crate) fn is_using(&self) -> bool {
        self.spawn_count > 0
    }

    #[cfg(test)]
    pub(crate) fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    /// Hand the object out: bump the spawn count, stamp the clock, run the
    /// on-spawn hook.
    pub(crate) fn spawn(&mut self, now: Duration) -> T::Target {
        self.spawn_count += 1;
        self.last_use = now;
        self.object.on_spawn();
        self.object.target()
    }

    /// Take the object back. Panics if the spawn count would go negative:
    /// recycling something that was never spawned is a caller bug.
    pub(crate) fn recycle(&mut self, now: Duration) {
        self.object.on_recycle();
        if self.spawn_count == 0 {
            panic!(
                "spawn count underflow: '{}' ({:?}) recycled more times than it was spawned",
                self.object.name(),
                self.object.target(),
            );
        }
        self.spawn_count -= 1;
        self.last_use = now;
    }

    /// Idle, unlocked, and not vetoed by the object itself.
    pub(crate) fn is_release_candidate(&self) -> bool {
        !self.is_using() && !self.locked && self.object.is_releasable()
    }
}
