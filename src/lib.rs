//! # respool
//!
//! Runtime resource-lifecycle manager for interactive applications: keeps
//! a bounded set of expensive, reusable objects alive just long enough to
//! be reused, and reclaims them under memory pressure with a priority/age
//! policy.
//!
//! ## Features
//!
//! - Generic pools of named objects with spawn/recycle usage tracking
//! - Soft capacity with deterministic priority/age eviction
//! - Per-object lock flags and priorities, per-type release vetoes
//! - Idle expiry on a virtual clock driven by the host's tick
//! - A type-keyed registry owning independently configured pools
//! - An async resource cache with strict per-key load deduplication
//! - Metrics with Prometheus export and per-pool health snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use respool::{Pool, PoolConfig, Pooled};
//!
//! struct Projectile {
//!     id: u32,
//! }
//!
//! impl Pooled for Projectile {
//!     type Target = u32;
//!     fn name(&self) -> &str {
//!         "projectile"
//!     }
//!     fn target(&self) -> u32 {
//!         self.id
//!     }
//!     fn on_release(&mut self) {}
//! }
//!
//! let mut pool = Pool::new("projectiles", PoolConfig::new().with_capacity(8));
//! pool.register(Projectile { id: 1 }, false);
//!
//! let target = pool.spawn("projectile").unwrap();
//! // use the projectile, then hand it back
//! pool.recycle(&target);
//! ```

mod cache;
mod config;
mod errors;
mod eviction;
mod health;
mod metrics;
mod object;
mod pool;
mod registry;
mod slot;

pub use cache::{AssetLoader, DEFAULT_WAIT_CEILING, ResourceCache};
pub use config::PoolConfig;
pub use errors::{CacheError, CacheResult};
pub use eviction::{ReleaseCandidate, default_release_filter};
pub use health::HealthStatus;
pub use metrics::{CacheMetrics, MetricsExporter, PoolMetrics};
pub use object::Pooled;
pub use pool::{Pool, PoolDescription};
pub use registry::{PoolBase, PoolRegistry};
