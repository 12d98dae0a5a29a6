//! Crate-internal integration tests that need direct access to a specific
//! actor's handle — something the public API deliberately does not expose
//! (only the chaos driver picks which actor dies).

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::actor::{self, ActorId};
use crate::actor_handle::StorageActorHandle;
use crate::coordinator::{self, CoordinatorHandle};

struct Harness {
    actors: Vec<StorageActorHandle>,
    coordinator: CoordinatorHandle,
    token: CancellationToken,
}

impl Harness {
    async fn shutdown(self) {
        self.token.cancel();
        // Give both loops a moment to observe cancellation before the test
        // process moves on; no handle is awaited here since this harness
        // does not keep the join handles (unlike `system::start`).
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn spawn_cluster(actor_count: usize, max_chunk_len: usize, replica_factor: usize) -> Harness {
    let token = CancellationToken::new();
    let (coordinator_tx, coordinator_rx) = mpsc::channel(256);
    let coordinator = CoordinatorHandle::new(coordinator_tx);

    let mut actors = Vec::with_capacity(actor_count);
    for i in 0..actor_count {
        let id = ActorId(i as u32);
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(actor::run(id, coordinator.clone(), rx, token.clone()));
        actors.push(StorageActorHandle::new(id, tx));
    }

    tokio::spawn(coordinator::run(
        actors.clone(),
        max_chunk_len,
        replica_factor,
        coordinator_rx,
        token.clone(),
    ));

    Harness { actors, coordinator, token }
}

async fn quiesce() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn single_replica_death_does_not_break_reads() {
    let h = spawn_cluster(15, 3, 3);
    h.coordinator.upload("a", b"xyz".to_vec()).await.unwrap();
    quiesce().await;

    let nodes = h.coordinator.list_nodes().await;
    let host = nodes.iter().find(|n| n.chunk_count > 0).unwrap().id;
    h.actors[host.0 as usize].toggle().await.unwrap();
    quiesce().await;

    assert_eq!(h.coordinator.get("a").await.unwrap(), b"xyz");

    h.shutdown().await;
}

#[tokio::test]
async fn repair_restores_full_replica_set_after_one_death() {
    let h = spawn_cluster(15, 3, 3);
    h.coordinator.upload("a", b"xyz".to_vec()).await.unwrap();
    quiesce().await;

    let nodes = h.coordinator.list_nodes().await;
    let host = nodes.iter().find(|n| n.chunk_count > 0).unwrap().id;
    h.actors[host.0 as usize].toggle().await.unwrap();
    quiesce().await;

    // Every remaining live actor should now see the chunk's replica set
    // back at full strength (3), since at least 14 live actors remain.
    let replicas: HashSet<ActorId> = h
        .coordinator
        .list_nodes()
        .await
        .into_iter()
        .filter(|n| n.chunk_count > 0)
        .map(|n| n.id)
        .collect();
    assert_eq!(replicas.len(), 3);
    assert!(!replicas.contains(&host));

    h.shutdown().await;
}

#[tokio::test]
async fn two_sequential_deaths_within_budget_still_allow_reads() {
    let h = spawn_cluster(15, 3, 3);
    h.coordinator.upload("a", b"xx".to_vec()).await.unwrap();
    quiesce().await;

    for _ in 0..2 {
        let nodes = h.coordinator.list_nodes().await;
        let host = nodes.iter().find(|n| n.chunk_count > 0).unwrap().id;
        h.actors[host.0 as usize].toggle().await.unwrap();
        quiesce().await;
        assert_eq!(h.coordinator.get("a").await.unwrap(), b"xx");
    }

    h.shutdown().await;
}

#[tokio::test]
async fn node_info_for_unknown_actor_id_is_recoverable() {
    let h = spawn_cluster(3, 3, 3);

    let err = h.coordinator.node_info(ActorId(99)).await.unwrap_err();
    assert!(matches!(err, crate::Error::CalleeUnavailable(ActorId(99))));

    // The coordinator must still be alive to answer further requests.
    assert!(h.coordinator.node_info(ActorId(0)).await.is_ok());

    h.shutdown().await;
}

#[tokio::test]
async fn heavy_actor_loss_still_allows_reduced_replication() {
    let h = spawn_cluster(15, 3, 3);
    h.coordinator.upload("a", b"q".to_vec()).await.unwrap();
    quiesce().await;

    for i in 0..13 {
        h.actors[i].toggle().await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.coordinator.get("a").await.unwrap(), b"q");

    h.shutdown().await;
}
