//! The payload contract for pooled objects

use std::fmt::Debug;
use std::hash::Hash;

/// Contract implemented by anything a [`crate::Pool`] can hold.
///
/// The pool owns the object; callers interact with it through its
/// [`Target`](Pooled::Target) — a cheap-to-clone identity for the backing
/// resource (an `Arc` handle, an id, a GPU index). Spawning hands out the
/// target; recycling takes it back by the same identity.
///
/// # Examples
///
/// ```
/// use respool::Pooled;
///
/// struct Projectile {
///     id: u32,
/// }
///
/// impl Pooled for Projectile {
///     type Target = u32;
///
///     fn name(&self) -> &str {
///         "projectile"
///     }
///
///     fn target(&self) -> u32 {
///         self.id
///     }
///
///     fn on_release(&mut self) {
///         // hand the instance back to whatever allocated it
///     }
/// }
/// ```
pub trait Pooled {
    /// Identity of the backing resource. Must be unique within a pool.
    type Target: Clone + Eq + Hash + Debug;

    /// Logical name within the pool. Several objects may share a name.
    fn name(&self) -> &str;

    /// The backing resource identity handed out by `spawn`.
    fn target(&self) -> Self::Target;

    /// Invoked each time the object is handed out.
    fn on_spawn(&mut self) {}

    /// Invoked each time the object is returned.
    fn on_recycle(&mut self) {}

    /// Invoked exactly once when the object leaves the pool for good.
    /// This is where the target goes back to the backing allocator.
    fn on_release(&mut self);

    /// Per-type veto: returning `false` keeps the object alive even when
    /// it is idle, unlocked, and otherwise selected for release.
    fn is_releasable(&self) -> bool {
        true
    }
}
