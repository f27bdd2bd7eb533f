//! Deduplicating resource cache over one dedicated pool

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::errors::{CacheError, CacheResult};
use crate::metrics::{CacheMetrics, CacheMetricsTracker, PoolMetrics};
use crate::object::Pooled;
use crate::pool::Pool;

/// Hard ceiling on how long one caller waits for a load before giving up.
/// The underlying load is unaffected.
pub const DEFAULT_WAIT_CEILING: Duration = Duration::from_secs(60);

/// A waiter that loses the claim race spawns its own hold afterwards; if
/// the first holder unloads and a sweep runs in that window, the slot can
/// vanish and the waiter starts over.
const MAX_LOAD_ATTEMPTS: usize = 3;

/// The pluggable backend that actually produces asset handles.
///
/// `exists` is the metadata-resolution step: a `false` answer means the
/// key names nothing and the cache reports [`CacheError::NotExist`]. A
/// `load` error means the asset exists but could not be materialized,
/// reported as [`CacheError::NotReady`].
///
/// Handles must be unique across keys; the cache indexes its pool by
/// handle identity.
#[async_trait]
pub trait AssetLoader: Send + Sync + 'static {
    type Handle: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolve metadata for `key`; `false` means the asset does not exist.
    async fn exists(&self, key: &str) -> bool;

    /// Materialize a handle for `key`.
    async fn load(&self, key: &str) -> Result<Self::Handle, Self::Error>;

    /// Dispose a handle previously produced by `load`. Disposing the
    /// handle is distinct from disposing the asset itself, which stays
    /// owned by the host.
    fn dispose(&self, handle: Self::Handle);
}

/// One cached entry: the loaded handle plus the disposer that returns it
/// to the loader when the pool releases the slot.
struct CachedAsset<H> {
    key: String,
    handle: Option<H>,
    dispose: Arc<dyn Fn(H) + Send + Sync>,
}

impl<H: Clone + Eq + Hash + fmt::Debug> Pooled for CachedAsset<H> {
    type Target = H;

    fn name(&self) -> &str {
        &self.key
    }

    fn target(&self) -> H {
        self.handle.clone().expect("handle already disposed")
    }

    fn on_release(&mut self) {
        if let Some(handle) = self.handle.take() {
            (self.dispose)(handle);
        }
    }
}

/// The load task registers a fresh asset as already spawned, so nothing
/// can evict it in the window between registration and the waiters'
/// spawns. This guard carries that first hold across the channel: the
/// first waiter to claim it owns it, and an unclaimed hold is recycled
/// when the last receiver goes away.
struct BootstrapHold<H: Clone + Eq + Hash + fmt::Debug> {
    handle: H,
    claimed: AtomicBool,
    pool: Arc<Mutex<Pool<CachedAsset<H>>>>,
}

impl<H: Clone + Eq + Hash + fmt::Debug> BootstrapHold<H> {
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }
}

impl<H: Clone + Eq + Hash + fmt::Debug> Drop for BootstrapHold<H> {
    fn drop(&mut self) {
        if !self.claimed.load(Ordering::Acquire) {
            self.pool.lock().recycle(&self.handle);
        }
    }
}

#[derive(Clone)]
enum LoadPhase<H: Clone + Eq + Hash + fmt::Debug> {
    Pending,
    Done(CacheResult<Arc<BootstrapHold<H>>>),
}

/// Key→asset cache guaranteeing at most one in-flight load per key.
///
/// The first caller of a missing key becomes the leader: it detaches the
/// resolve/load/register sequence into its own task and publishes the
/// outcome through a per-key channel. The task registers the result as
/// already held, the earliest waiter claims that first hold, and every
/// other caller takes its own spawn from the backing pool. Dropping a
/// caller's future only cancels that caller's wait; the detached load
/// keeps going for everyone else.
///
/// Cached handles are multi-spawn: any number of callers may hold the
/// same asset, and each must [`unload`](ResourceCache::unload) it once.
pub struct ResourceCache<L: AssetLoader> {
    loader: Arc<L>,
    pool: Arc<Mutex<Pool<CachedAsset<L::Handle>>>>,
    inflight: Arc<DashMap<String, watch::Receiver<LoadPhase<L::Handle>>>>,
    wait_ceiling: Duration,
    metrics: Arc<CacheMetricsTracker>,
}

impl<L: AssetLoader> ResourceCache<L> {
    pub fn new(loader: L, config: PoolConfig) -> Self {
        // concurrent holders of one asset are the whole point
        let config = config.with_multi_spawn(true);
        Self {
            loader: Arc::new(loader),
            pool: Arc::new(Mutex::new(Pool::new("resource-cache", config))),
            inflight: Arc::new(DashMap::new()),
            wait_ceiling: DEFAULT_WAIT_CEILING,
            metrics: Arc::new(CacheMetricsTracker::default()),
        }
    }

    pub fn with_wait_ceiling(mut self, ceiling: Duration) -> Self {
        self.wait_ceiling = ceiling;
        self
    }

    /// Get the asset behind `key`, loading it if necessary. The returned
    /// handle counts as one outstanding hold and must be passed to
    /// [`unload`](ResourceCache::unload) exactly once.
    pub async fn load(&self, key: &str) -> CacheResult<L::Handle> {
        match tokio::time::timeout(self.wait_ceiling, self.load_inner(key)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.metrics.wait_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(key, ceiling = ?self.wait_ceiling, "gave up waiting for load");
                Err(CacheError::Timeout(key.to_string(), self.wait_ceiling))
            }
        }
    }

    async fn load_inner(&self, key: &str) -> CacheResult<L::Handle> {
        for _ in 0..MAX_LOAD_ATTEMPTS {
            if let Some(target) = self.pool.lock().spawn(key) {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache hit");
                return Ok(target);
            }

            let rx = match self.inflight.entry(key.to_string()) {
                Entry::Occupied(entry) => {
                    self.metrics.dedup_joins.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "joining in-flight load");
                    entry.get().clone()
                }
                Entry::Vacant(entry) => {
                    // A load that finished between the spawn miss above and
                    // this lookup has already cleared its in-flight mark;
                    // re-check under the entry guard before starting another.
                    if let Some(target) = self.pool.lock().spawn(key) {
                        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                        debug!(key, "cache hit");
                        return Ok(target);
                    }
                    let (tx, rx) = watch::channel(LoadPhase::Pending);
                    entry.insert(rx.clone());
                    self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "starting load");
                    self.start_load(key.to_string(), tx);
                    rx
                }
            };

            // Failures propagate to every waiter. The earliest waiter
            // claims the hold the load task registered; the rest loop
            // back and take their own spawn.
            let hold = self.await_outcome(key, rx).await?;
            if hold.claim() {
                return Ok(hold.handle.clone());
            }
        }

        warn!(key, "cached handle kept vanishing before it could be spawned");
        Err(CacheError::NotReady(key.to_string()))
    }

    async fn await_outcome(
        &self,
        key: &str,
        mut rx: watch::Receiver<LoadPhase<L::Handle>>,
    ) -> CacheResult<Arc<BootstrapHold<L::Handle>>> {
        loop {
            let phase = rx.borrow_and_update().clone();
            if let LoadPhase::Done(outcome) = phase {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(CacheError::Cancelled(key.to_string()));
            }
        }
    }

    fn start_load(&self, key: String, tx: watch::Sender<LoadPhase<L::Handle>>) {
        let loader = Arc::clone(&self.loader);
        let pool = Arc::clone(&self.pool);
        let inflight = Arc::clone(&self.inflight);
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            let outcome = if !loader.exists(&key).await {
                debug!(%key, "asset does not exist");
                Err(CacheError::NotExist(key.clone()))
            } else {
                match loader.load(&key).await {
                    Ok(handle) => {
                        let dispose = {
                            let loader = Arc::clone(&loader);
                            Arc::new(move |h| loader.dispose(h))
                                as Arc<dyn Fn(L::Handle) + Send + Sync>
                        };
                        let asset = CachedAsset {
                            key: key.clone(),
                            handle: Some(handle.clone()),
                            dispose,
                        };
                        pool.lock().register(asset, true);
                        Ok(Arc::new(BootstrapHold {
                            handle,
                            claimed: AtomicBool::new(false),
                            pool: Arc::clone(&pool),
                        }))
                    }
                    Err(error) => {
                        metrics.load_failures.fetch_add(1, Ordering::Relaxed);
                        warn!(%key, %error, "loader failed to materialize handle");
                        Err(CacheError::NotReady(key.clone()))
                    }
                }
            };

            inflight.remove(&key);
            let _ = tx.send(LoadPhase::Done(outcome));
        });
    }

    /// Return one hold on a loaded asset. Panics if the handle was never
    /// produced by this cache or is returned more times than it was
    /// loaded.
    pub fn unload(&self, handle: &L::Handle) {
        self.pool.lock().recycle(handle);
    }

    /// Exempt a cached asset from eviction. Locking only affects
    /// eviction; a locked asset still satisfies cache hits.
    pub fn set_locked(&self, handle: &L::Handle, locked: bool) {
        self.pool.lock().set_locked(handle, locked);
    }

    pub fn set_priority(&self, handle: &L::Handle, priority: i32) {
        self.pool.lock().set_priority(handle, priority);
    }

    /// Periodic maintenance, driven by the host's tick.
    pub fn update(&self, elapsed: Duration, real_elapsed: Duration) {
        self.pool.lock().update(elapsed, real_elapsed);
    }

    /// Low-memory signal from the host: sweep every unused cached asset
    /// immediately. The cache never polls for memory pressure itself.
    pub fn on_low_memory(&self) {
        info!("low memory signal, sweeping unused cached assets");
        self.pool.lock().release_all_unused();
    }

    pub fn count(&self) -> usize {
        self.pool.lock().count()
    }

    pub fn active_count(&self) -> usize {
        self.pool.lock().active_count()
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.snapshot()
    }

    pub fn pool_metrics(&self) -> PoolMetrics {
        self.pool.lock().metrics()
    }
}
