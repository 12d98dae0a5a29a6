//! Replica-set shape and placement balance after uploads.

use std::collections::HashSet;

use blobstore::Config;

fn test_config() -> Config {
    Config {
        actor_count: 15,
        max_chunk_len: 3,
        replica_factor: 3,
        chaos_tick: std::time::Duration::from_secs(3600),
        max_dead: 7,
    }
}

#[tokio::test]
async fn upload_places_distinct_replicas_per_chunk() {
    let system = blobstore::start(test_config());
    let coordinator = system.coordinator().clone();

    coordinator.upload("a", b"hello".to_vec()).await.unwrap();

    // "hello" with max_chunk_len=3 -> ["hel", "lo"], two chunks.
    for node in coordinator.list_nodes().await {
        // Every actor's chunk_count hint only grows on a new artifact
        // entry, so no single actor should host more than one chunk of
        // this solitary artifact.
        assert!(node.chunk_count <= 1);
    }

    system.shutdown().await;
}

#[tokio::test]
async fn placement_balances_load_across_many_uploads() {
    let system = blobstore::start(test_config());
    let coordinator = system.coordinator().clone();

    for i in 0..30 {
        coordinator
            .upload(&format!("artifact-{i}"), b"some content here".to_vec())
            .await
            .unwrap();
    }

    let nodes = coordinator.list_nodes().await;
    let counts: Vec<usize> = nodes.iter().map(|n| n.chunk_count).collect();
    let max = *counts.iter().max().unwrap();
    let min = *counts.iter().min().unwrap();
    assert!(max - min <= 3, "load spread too wide: {counts:?}");

    system.shutdown().await;
}

#[tokio::test]
async fn capped_replica_factor_with_few_live_actors() {
    let mut cfg = test_config();
    cfg.actor_count = 2;
    cfg.replica_factor = 3;
    cfg.max_dead = 1;
    let system = blobstore::start(cfg);
    let coordinator = system.coordinator().clone();

    coordinator.upload("a", b"xyz".to_vec()).await.unwrap();
    let nodes = coordinator.list_nodes().await;
    let hosting: HashSet<_> = nodes.iter().filter(|n| n.chunk_count > 0).map(|n| n.id).collect();
    assert_eq!(hosting.len(), 2, "replica factor should cap at live actor count");

    system.shutdown().await;
}
