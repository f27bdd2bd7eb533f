//! Async resource cache walk-through

use async_trait::async_trait;
use respool::{AssetLoader, PoolConfig, ResourceCache};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("bundle read failed")]
struct BundleError;

/// Stand-in for an asset-bundle backend.
struct BundleLoader {
    loads: AtomicU32,
}

#[async_trait]
impl AssetLoader for BundleLoader {
    type Handle = u32;
    type Error = BundleError;

    async fn exists(&self, key: &str) -> bool {
        key.starts_with("bundles/")
    }

    async fn load(&self, key: &str) -> Result<u32, BundleError> {
        println!("   [loader] reading {key} from disk");
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(self.loads.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn dispose(&self, handle: u32) {
        println!("   [loader] disposing handle #{handle}");
    }
}

#[tokio::main]
async fn main() {
    println!("=== respool - Resource Cache Examples ===\n");

    let cache = Arc::new(ResourceCache::new(
        BundleLoader {
            loads: AtomicU32::new(0),
        },
        PoolConfig::new().with_expire_after(Duration::from_secs(60)),
    ));

    // Example 1: concurrent loads of one key are deduplicated
    println!("1. Load Deduplication:");
    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let handle = cache.load("bundles/hero.png").await.unwrap();
                println!("   caller {i} got handle #{handle}");
                cache.unload(&handle);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    println!();

    // Example 2: a missing key is a typed error, not a panic
    println!("2. Missing Assets:");
    match cache.load("textures/hero.png").await {
        Ok(_) => unreachable!(),
        Err(error) => println!("   {error}\n"),
    }

    // Example 3: low-memory pressure sweeps idle assets
    println!("3. Low Memory:");
    println!("   cached before: {}", cache.count());
    cache.on_low_memory();
    println!("   cached after:  {}\n", cache.count());

    // Example 4: cache metrics
    println!("4. Metrics:");
    for (key, value) in cache.metrics().export() {
        println!("   {key}: {value}");
    }
}
