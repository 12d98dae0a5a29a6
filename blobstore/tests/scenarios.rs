//! The six concrete walkthroughs, run against the stated defaults
//! (N=15, max_chunk_len=3, replica_factor=3).

use blobstore::Config;

fn default_config() -> Config {
    Config {
        chaos_tick: std::time::Duration::from_secs(3600),
        ..Config::default()
    }
}

#[tokio::test]
async fn scenario_1_basic_upload_and_chunking() {
    let system = blobstore::start(default_config());
    let coordinator = system.coordinator().clone();

    coordinator.upload("a", b"hello".to_vec()).await.unwrap();
    assert_eq!(coordinator.get("a").await.unwrap(), b"hello");

    // "hel" + "lo" -> two chunks, each with three distinct replicas.
    let total_hosted: usize = coordinator
        .list_nodes()
        .await
        .into_iter()
        .map(|n| n.chunk_count)
        .sum();
    assert_eq!(total_hosted, 2 * 3);

    system.shutdown().await;
}

#[tokio::test]
async fn scenario_2_update_shrinks_placement() {
    let system = blobstore::start(default_config());
    let coordinator = system.coordinator().clone();

    coordinator.upload("a", b"hello".to_vec()).await.unwrap();
    coordinator.update("a", b"hi".to_vec()).await.unwrap();
    assert_eq!(coordinator.get("a").await.unwrap(), b"hi");

    let total_hosted: usize = coordinator
        .list_nodes()
        .await
        .into_iter()
        .map(|n| n.chunk_count)
        .sum();
    assert_eq!(total_hosted, 1 * 3);

    system.shutdown().await;
}

#[tokio::test]
async fn scenario_3_update_grows_placement_and_overwrites() {
    let system = blobstore::start(default_config());
    let coordinator = system.coordinator().clone();

    coordinator.upload("a", b"abcdefghij".to_vec()).await.unwrap();
    coordinator.update("a", b"abcdefghijkl".to_vec()).await.unwrap();
    assert_eq!(coordinator.get("a").await.unwrap(), b"abcdefghijkl");

    let total_hosted: usize = coordinator
        .list_nodes()
        .await
        .into_iter()
        .map(|n| n.chunk_count)
        .sum();
    assert_eq!(total_hosted, 4 * 3);

    system.shutdown().await;
}

#[tokio::test]
async fn scenario_8_chunking_of_non_empty_and_empty_content() {
    let system = blobstore::start(default_config());
    let coordinator = system.coordinator().clone();

    coordinator.upload("nonempty", b"abcdefg".to_vec()).await.unwrap();
    // ceil(7 / min(3, 7)) == ceil(7/3) == 3 chunks.
    let total_hosted: usize = coordinator
        .list_nodes()
        .await
        .into_iter()
        .map(|n| n.chunk_count)
        .sum();
    assert_eq!(total_hosted, 3 * 3);

    coordinator.upload("empty", Vec::new()).await.unwrap();
    assert_eq!(coordinator.get("empty").await.unwrap(), Vec::<u8>::new());

    system.shutdown().await;
}
