//! Reconciling replica sets after a storage actor dies.

use futures::stream::FuturesUnordered;
use futures::StreamExt;

use crate::actor::ActorId;
use crate::actor_handle::StorageActorHandle;
use crate::error::{Error, Result};

use super::{placement, CoordinatorState};

/// Invoked when a storage actor reports its own alive→dead transition.
///
/// For every chunk that listed `dead_id` among its replicas: drop it from
/// the replica set, then top the set back up to `replica_factor` by pulling
/// a payload from a surviving replica and storing it on a freshly-chosen
/// live host, one host at a time, until the set is full or no eligible host
/// remains. Finally `clear()`s the dead actor so a later revival starts
/// empty rather than resurrecting stale chunks and a stale load hint.
pub(crate) async fn handle_node_down(state: &mut CoordinatorState, dead_id: ActorId) {
    let names: Vec<String> = state.artifacts.keys().cloned().collect();

    for name in names {
        let chunk_total = match state.artifacts.get(&name) {
            Some(record) => record.placement.len(),
            None => continue,
        };

        for i in 0..chunk_total {
            let held_dead = state
                .artifacts
                .get(&name)
                .map(|record| record.placement[i].contains(&dead_id))
                .unwrap_or(false);
            if !held_dead {
                continue;
            }

            if let Some(record) = state.artifacts.get_mut(&name) {
                record.placement[i].retain(|&id| id != dead_id);
            }

            repair_one_chunk(state, &name, i as u32).await;
        }
    }

    if let Some(actor) = state.actors.iter().find(|actor| actor.id() == dead_id) {
        let _ = actor.clear().await;
    }
}

async fn repair_one_chunk(state: &mut CoordinatorState, name: &str, index: u32) {
    loop {
        let current = match state.artifacts.get(name) {
            Some(record) => record.placement[index as usize].clone(),
            None => return,
        };
        if current.len() >= state.replica_factor {
            return;
        }

        let live = placement::sort_live_actors(&state.actors).await;
        let Some(host) = live.into_iter().find(|actor| !current.contains(&actor.id())) else {
            // No chunk will be restored to full replication this round; it
            // is retried on the next node_down.
            return;
        };

        let payload = match fetch_chunk_payload(name, index, &current, &state.actors).await {
            Ok(payload) => payload,
            Err(_) => return,
        };

        if host.store(name, index, payload).await.is_err() {
            return;
        }

        if let Some(record) = state.artifacts.get_mut(name) {
            record.placement[index as usize].push(host.id());
        }
    }
}

/// Fetches a chunk's payload directly from whichever surviving replica
/// answers first, rather than refetching and re-slicing the whole artifact.
pub(crate) async fn fetch_chunk_payload(
    name: &str,
    index: u32,
    replicas: &[ActorId],
    actors: &[StorageActorHandle],
) -> Result<Vec<u8>> {
    let mut pending = FuturesUnordered::new();
    for &id in replicas {
        let actor = &actors[id.0 as usize];
        let name = name.to_string();
        pending.push(async move { actor.get(&name, index).await });
    }

    while let Some(reply) = pending.next().await {
        if let Ok(Some(payload)) = reply {
            return Ok(payload);
        }
    }

    Err(Error::CalleeUnavailable(
        replicas.first().copied().unwrap_or(ActorId(0)),
    ))
}
