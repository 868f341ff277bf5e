//! Basic usage example of the cache facade.
//!
//! Runs against the in-memory store so no Redis server is needed. Swap
//! `Cache::from_store(InMemoryStore::new())` for `Cache::connect(6379).await?`
//! to talk to a real server.

use cache_facade::{error::Result, Cache, InMemoryStore, Source, StoreEvent};
use serde::{Deserialize, Serialize};

/// Example entity: User
#[derive(Clone, Serialize, Deserialize, Debug)]
struct User {
    id: u64,
    name: String,
}

/// Simulates a slow database lookup.
async fn load_user(id: u64) -> User {
    println!("  [DB] Fetching user: {}", id);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    User {
        id,
        name: "Jane Doe".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Cache Facade - Basic Example ===\n");

    // 1. Initialize cache
    println!("1. Initializing in-memory store...");
    let cache = Cache::from_store(InMemoryStore::new());
    cache.on(StoreEvent::Warning, |event| {
        println!("   [event] {}: {:?}", event.event, event.message);
    });
    println!("   ✓ Cache ready\n");

    // 2. Typed set/get
    println!("2. Storing user:1 ...");
    let john = User {
        id: 1,
        name: "John Doe".to_string(),
    };
    cache.set("user:1", &john, None).await?;
    if let Some(user) = cache.get::<User>("user:1").await {
        println!("   ✓ Loaded {} (id {})\n", user.name, user.id);
    }

    // 3. remember - first call hits the "database"
    println!("3. remember(user:2) twice:");
    for _ in 0..2 {
        let user: User = cache
            .remember("user:2", 3600, Source::future(|| load_user(2)))
            .await?;
        println!("   ✓ Got {}", user.name);
    }
    println!();

    // 4. forever - no expiry
    println!("4. forever(app:theme):");
    let theme: String = cache
        .forever("app:theme", Source::value("dark".to_string()))
        .await?;
    println!("   ✓ Theme: {}\n", theme);

    // 5. exists / delete
    println!("5. delete(user:1):");
    println!("   exists before: {}", cache.exists("user:1").await?);
    println!("   removed: {}", cache.delete("user:1").await?);
    println!("   exists after: {}\n", cache.exists("user:1").await?);

    // 6. flush
    println!("6. flush():");
    println!("   ✓ {}", cache.flush().await);

    println!("\n=== Example completed ===\n");
    Ok(())
}
