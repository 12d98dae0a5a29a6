//! Black-box survival checks driven through the public API: the chaos
//! driver is the only thing that can kill an actor from outside the crate,
//! so these tests give it a short tick and a generous dead budget, then poll
//! for convergence. Precise, single-actor-death scenarios live in the
//! crate's own `#[cfg(test)]` unit tests, which can reach a specific actor
//! directly.

use std::time::Duration;

use blobstore::Config;

fn chaotic_config() -> Config {
    Config {
        actor_count: 6,
        max_chunk_len: 3,
        replica_factor: 3,
        chaos_tick: Duration::from_millis(20),
        max_dead: 2,
    }
}

#[tokio::test]
async fn reads_keep_succeeding_under_ongoing_chaos() {
    let system = blobstore::start(chaotic_config());
    let coordinator = system.coordinator().clone();

    coordinator.upload("a", b"xyz".to_vec()).await.unwrap();

    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        // With max_dead (2) held below replica_factor (3), every read must
        // keep succeeding regardless of which actors chaos has killed.
        assert_eq!(coordinator.get("a").await.unwrap(), b"xyz");
    }

    system.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_clean_even_mid_chaos() {
    let system = blobstore::start(chaotic_config());
    let coordinator = system.coordinator().clone();
    coordinator.upload("a", b"hello".to_vec()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    system.shutdown().await;
}
