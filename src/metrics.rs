//! Metrics collection and export for pools and the resource cache

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lifecycle counters for one pool.
///
/// # Examples
///
/// ```
/// use respool::{Pool, PoolConfig, Pooled};
///
/// struct Obj;
/// impl Pooled for Obj {
///     type Target = u8;
///     fn name(&self) -> &str { "obj" }
///     fn target(&self) -> u8 { 1 }
///     fn on_release(&mut self) {}
/// }
///
/// let mut pool = Pool::new("demo", PoolConfig::new());
/// pool.register(Obj, false);
/// let target = pool.spawn("obj").unwrap();
/// pool.recycle(&target);
///
/// let metrics = pool.metrics();
/// assert_eq!(metrics.total_spawned, 1);
/// assert_eq!(metrics.total_recycled, 1);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total objects ever registered.
    pub total_registered: usize,

    /// Total spawns handed out (including already-spawned registrations).
    pub total_spawned: usize,

    /// Total recycles taken back.
    pub total_recycled: usize,

    /// Total objects released back to the allocator.
    pub total_released: usize,

    /// Spawn requests that found no eligible slot.
    pub spawn_misses: usize,

    /// Objects with at least one outstanding spawn.
    pub active_objects: usize,

    /// Objects currently idle in the pool.
    pub idle_objects: usize,

    /// Soft capacity target.
    pub capacity: usize,

    /// Active objects over capacity (0.0 to 1.0; 0.0 when unbounded).
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a string map.
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_registered".to_string(), self.total_registered.to_string());
        metrics.insert("total_spawned".to_string(), self.total_spawned.to_string());
        metrics.insert("total_recycled".to_string(), self.total_recycled.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("spawn_misses".to_string(), self.spawn_misses.to_string());
        metrics.insert("active_objects".to_string(), self.active_objects.to_string());
        metrics.insert("idle_objects".to_string(), self.idle_objects.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Counters kept by a pool. Pools are single-owner structures, so plain
/// integers suffice; the shared cache tracker below uses atomics.
#[derive(Debug, Default)]
pub(crate) struct PoolMetricsTracker {
    pub(crate) registered: usize,
    pub(crate) spawned: usize,
    pub(crate) recycled: usize,
    pub(crate) released: usize,
    pub(crate) spawn_misses: usize,
}

impl PoolMetricsTracker {
    pub(crate) fn snapshot(&self, active: usize, idle: usize, capacity: usize) -> PoolMetrics {
        let utilization = if capacity > 0 && capacity != usize::MAX {
            active as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_registered: self.registered,
            total_spawned: self.spawned,
            total_recycled: self.recycled,
            total_released: self.released,
            spawn_misses: self.spawn_misses,
            active_objects: active,
            idle_objects: idle,
            capacity,
            utilization,
        }
    }
}

/// Counters for the resource cache's load path.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct CacheMetrics {
    /// Loads satisfied by an already-cached handle.
    pub hits: usize,

    /// Loads that had to start the underlying loader.
    pub misses: usize,

    /// Loads that joined an in-flight load of the same key.
    pub dedup_joins: usize,

    /// Loader invocations that failed to materialize a handle.
    pub load_failures: usize,

    /// Waiters that gave up after the wait ceiling.
    pub wait_timeouts: usize,
}

impl CacheMetrics {
    /// Export metrics as a string map.
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("hits".to_string(), self.hits.to_string());
        metrics.insert("misses".to_string(), self.misses.to_string());
        metrics.insert("dedup_joins".to_string(), self.dedup_joins.to_string());
        metrics.insert("load_failures".to_string(), self.load_failures.to_string());
        metrics.insert("wait_timeouts".to_string(), self.wait_timeouts.to_string());
        metrics
    }
}

/// Shared tracker behind the cache: bumped from concurrent load tasks.
#[derive(Debug, Default)]
pub(crate) struct CacheMetricsTracker {
    pub(crate) hits: AtomicUsize,
    pub(crate) misses: AtomicUsize,
    pub(crate) dedup_joins: AtomicUsize,
    pub(crate) load_failures: AtomicUsize,
    pub(crate) wait_timeouts: AtomicUsize,
}

impl CacheMetricsTracker {
    pub(crate) fn snapshot(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            dedup_joins: self.dedup_joins.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            wait_timeouts: self.wait_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Exporter for Prometheus exposition format.
pub struct MetricsExporter;

impl MetricsExporter {
    /// Render pool metrics as Prometheus exposition text.
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        output.push_str("# HELP respool_objects_active Objects with outstanding spawns\n");
        output.push_str("# TYPE respool_objects_active gauge\n");
        output.push_str(&format!(
            "respool_objects_active{{{}}} {}\n",
            labels, metrics.active_objects
        ));

        output.push_str("# HELP respool_objects_idle Objects idle in the pool\n");
        output.push_str("# TYPE respool_objects_idle gauge\n");
        output.push_str(&format!(
            "respool_objects_idle{{{}}} {}\n",
            labels, metrics.idle_objects
        ));

        output.push_str("# HELP respool_utilization Active objects over capacity\n");
        output.push_str("# TYPE respool_utilization gauge\n");
        output.push_str(&format!(
            "respool_utilization{{{}}} {:.2}\n",
            labels, metrics.utilization
        ));

        output.push_str("# HELP respool_spawned_total Total spawns handed out\n");
        output.push_str("# TYPE respool_spawned_total counter\n");
        output.push_str(&format!(
            "respool_spawned_total{{{}}} {}\n",
            labels, metrics.total_spawned
        ));

        output.push_str("# HELP respool_recycled_total Total recycles taken back\n");
        output.push_str("# TYPE respool_recycled_total counter\n");
        output.push_str(&format!(
            "respool_recycled_total{{{}}} {}\n",
            labels, metrics.total_recycled
        ));

        output.push_str("# HELP respool_released_total Total objects released\n");
        output.push_str("# TYPE respool_released_total counter\n");
        output.push_str(&format!(
            "respool_released_total{{{}}} {}\n",
            labels, metrics.total_released
        ));

        output.push_str("# HELP respool_spawn_misses_total Spawn requests with no eligible slot\n");
        output.push_str("# TYPE respool_spawn_misses_total counter\n");
        output.push_str(&format!(
            "respool_spawn_misses_total{{{}}} {}\n",
            labels, metrics.spawn_misses
        ));

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PoolMetrics {
        PoolMetricsTracker {
            registered: 4,
            spawned: 10,
            recycled: 9,
            released: 2,
            spawn_misses: 3,
        }
        .snapshot(1, 1, 4)
    }

    #[test]
    fn snapshot_computes_utilization() {
        let metrics = sample();
        assert_eq!(metrics.active_objects, 1);
        assert!((metrics.utilization - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn unbounded_capacity_reports_zero_utilization() {
        let metrics = PoolMetricsTracker::default().snapshot(5, 0, usize::MAX);
        assert_eq!(metrics.utilization, 0.0);
    }

    #[test]
    fn export_includes_every_counter() {
        let exported = sample().export();
        assert_eq!(exported["total_spawned"], "10");
        assert_eq!(exported["spawn_misses"], "3");
        assert_eq!(exported["utilization"], "0.25");
    }

    #[test]
    fn prometheus_export_carries_labels() {
        let mut tags = HashMap::new();
        tags.insert("service".to_string(), "renderer".to_string());

        let output = MetricsExporter::export_prometheus(&sample(), "meshes", Some(&tags));
        assert!(output.contains("respool_objects_active"));
        assert!(output.contains("pool=\"meshes\""));
        assert!(output.contains("service=\"renderer\""));
    }
}
