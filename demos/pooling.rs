//! Pool and registry walk-through

use respool::{MetricsExporter, PoolConfig, PoolRegistry, Pooled};
use std::time::Duration;

#[derive(Debug)]
struct Enemy {
    kind: &'static str,
    id: u32,
}

impl Pooled for Enemy {
    type Target = u32;

    fn name(&self) -> &str {
        self.kind
    }

    fn target(&self) -> u32 {
        self.id
    }

    fn on_release(&mut self) {
        println!("   releasing enemy #{}", self.id);
    }
}

fn main() {
    println!("=== respool - Pooling Examples ===\n");

    let mut registry = PoolRegistry::new();

    // Example 1: spawn and recycle
    println!("1. Spawn and Recycle:");
    let pool = registry.create::<Enemy>(
        None,
        PoolConfig::new()
            .with_capacity(4)
            .with_expire_after(Duration::from_secs(30))
            .with_auto_release_interval(Duration::from_secs(10)),
    );

    for id in 0..3 {
        pool.register(Enemy { kind: "grunt", id }, false);
    }

    let target = pool.spawn("grunt").expect("an idle grunt exists");
    println!("   spawned grunt #{target}");
    println!("   active: {}, idle: {}", pool.active_count(), pool.idle_count());
    pool.recycle(&target);
    println!("   recycled, idle again: {}\n", pool.idle_count());

    // Example 2: priorities and locks
    println!("2. Priorities and Locks:");
    pool.set_priority(&0, 10);
    pool.set_locked(&1, true);
    pool.release_count(1);
    println!("   after releasing 1: {} remain (locked and high-priority kept)\n", pool.count());

    // Example 3: the per-frame tick
    println!("3. Maintenance Tick:");
    let dt = Duration::from_secs(31);
    registry.tick(dt, dt);
    let remaining = registry.pool::<Enemy>(None).unwrap().count();
    println!("   after 31 simulated seconds: {remaining} remain (locked one kept)\n");

    // Example 4: metrics
    println!("4. Metrics:");
    let metrics = registry.pool::<Enemy>(None).unwrap().metrics();
    println!("{}", MetricsExporter::export_prometheus(&metrics, "enemies", None));

    registry.shutdown();
}
