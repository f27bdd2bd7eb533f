//! Health snapshots for pools

/// Health snapshot of one pool, derived from its current counts.
///
/// # Examples
///
/// ```
/// use respool::HealthStatus;
///
/// let health = HealthStatus::for_pool(1, 2, 4);
/// assert!(health.is_healthy());
/// assert_eq!(health.active_objects, 1);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool looks healthy.
    pub is_healthy: bool,

    /// Active objects over capacity (0.0 to 1.0; 0.0 when unbounded).
    pub utilization: f64,

    /// Objects with outstanding spawns.
    pub active_objects: usize,

    /// Objects idle in the pool.
    pub idle_objects: usize,

    /// Soft capacity target.
    pub capacity: usize,

    /// Warning messages.
    pub warnings: Vec<String>,
}

impl HealthStatus {
    pub fn for_pool(active: usize, idle: usize, capacity: usize) -> Self {
        let bounded = capacity > 0 && capacity != usize::MAX;
        let utilization = if bounded {
            active as f64 / capacity as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if bounded && active + idle > capacity {
            warnings.push(format!(
                "over capacity: {} objects against a target of {}",
                active + idle,
                capacity
            ));
            is_healthy = false;
        }

        if utilization > 0.9 {
            warnings.push(format!("high utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        Self {
            is_healthy,
            utilization,
            active_objects: active,
            idle_objects: idle,
            capacity,
            warnings,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_capacity_is_healthy() {
        let health = HealthStatus::for_pool(2, 1, 8);
        assert!(health.is_healthy());
        assert!(health.warnings.is_empty());
    }

    #[test]
    fn over_capacity_warns() {
        let health = HealthStatus::for_pool(3, 3, 4);
        assert!(!health.is_healthy());
        assert!(health.warnings.iter().any(|w| w.contains("over capacity")));
    }

    #[test]
    fn saturated_pool_warns_on_utilization() {
        let health = HealthStatus::for_pool(4, 0, 4);
        assert!(!health.is_healthy());
        assert!(health.warnings.iter().any(|w| w.contains("high utilization")));
    }

    #[test]
    fn unbounded_pool_never_warns_on_capacity() {
        let health = HealthStatus::for_pool(1000, 1000, usize::MAX);
        assert!(health.is_healthy());
    }
}
