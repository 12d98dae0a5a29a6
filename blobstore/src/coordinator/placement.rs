//! Choosing which live actors should host a chunk's replicas.

use futures::future::join_all;

use crate::actor_handle::StorageActorHandle;

/// Returns the currently-alive actors, sorted by ascending chunk-count hint
/// and, for ties, ascending id. This is the one placement primitive used by
/// upload, update's grow step, and repair.
pub(crate) async fn sort_live_actors(actors: &[StorageActorHandle]) -> Vec<StorageActorHandle> {
    let probes = join_all(actors.iter().map(|actor| async move {
        let alive = actor.status().await.unwrap_or(false);
        if !alive {
            return None;
        }
        let chunk_count = actor.chunk_count().await.unwrap_or(usize::MAX);
        Some(chunk_count)
    }))
    .await;

    let mut live: Vec<(StorageActorHandle, usize)> = actors
        .iter()
        .cloned()
        .zip(probes)
        .filter_map(|(actor, chunk_count)| chunk_count.map(|c| (actor, c)))
        .collect();

    live.sort_by_key(|(actor, chunk_count)| (*chunk_count, actor.id()));
    live.into_iter().map(|(actor, _)| actor).collect()
}
