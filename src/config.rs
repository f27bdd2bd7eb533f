//! Pool configuration options

use std::time::Duration;

/// Configuration for a single pool.
///
/// One struct replaces a constructor-per-permutation API: every knob has a
/// default and a `with_*` builder method. All knobs stay mutable on the
/// live pool except `allow_multi_spawn`, which is fixed at creation.
///
/// # Examples
///
/// ```
/// use respool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_capacity(16)
///     .with_expire_after(Duration::from_secs(300))
///     .with_priority(5);
///
/// assert_eq!(config.capacity, 16);
/// assert_eq!(config.priority, 5);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Whether one name may have several outstanding spawns at a time.
    /// Immutable after the pool is created.
    pub allow_multi_spawn: bool,

    /// Soft capacity target. Registration may transiently exceed it;
    /// eviction brings the count back down.
    pub capacity: usize,

    /// Idle age after which an object becomes expired and is evicted on
    /// the next release pass regardless of capacity. `None` disables
    /// expiry.
    pub expire_after: Option<Duration>,

    /// Pool-level priority. When the registry squeezes every pool,
    /// lower-priority pools are visited first.
    pub priority: i32,

    /// How much accumulated real time between automatic release passes
    /// driven by `update`.
    pub auto_release_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            allow_multi_spawn: false,
            capacity: usize::MAX,
            expire_after: None,
            priority: 0,
            auto_release_interval: Duration::from_secs(60),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow several outstanding spawns per name.
    pub fn with_multi_spawn(mut self, allow: bool) -> Self {
        self.allow_multi_spawn = allow;
        self
    }

    /// Set the soft capacity target.
    ///
    /// # Examples
    ///
    /// ```
    /// use respool::PoolConfig;
    ///
    /// let config = PoolConfig::new().with_capacity(50);
    /// assert_eq!(config.capacity, 50);
    /// ```
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Expire idle objects after the given age.
    pub fn with_expire_after(mut self, age: Duration) -> Self {
        self.expire_after = Some(age);
        self
    }

    /// Set the pool-level priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the automatic release interval.
    pub fn with_auto_release_interval(mut self, interval: Duration) -> Self {
        self.auto_release_interval = interval;
        self
    }
}
