//! The coordinator: placement, reads, listings, and repair for the whole
//! cluster, run as a single-consumer mailbox so its own state never needs
//! external locking.

mod placement;
mod repair;

use futures::future::join_all;
use indexmap::IndexMap;
use observability_deps::tracing::{debug, error, warn};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::actor::{ActorId, ActorInfo};
use crate::actor_handle::StorageActorHandle;
use crate::chunk;
use crate::error::{Error, Result};

/// A single artifact's placement bookkeeping. `placement[i]` is the set of
/// actor ids currently holding chunk `i`; `chunk_count` is `placement.len()`.
struct ArtifactRecord {
    chunk_count: usize,
    placement: Vec<Vec<ActorId>>,
}

/// One entry of [`CoordinatorHandle::list_nodes`].
#[derive(Debug, Clone, Copy)]
pub struct NodeSummary {
    pub id: ActorId,
    pub chunk_count: usize,
}

struct CoordinatorState {
    actors: Vec<StorageActorHandle>,
    artifacts: IndexMap<String, ArtifactRecord>,
    max_chunk_len: usize,
    replica_factor: usize,
}

pub(crate) enum CoordinatorMsg {
    Upload { name: String, content: Vec<u8>, reply: oneshot::Sender<Result<()>> },
    Update { name: String, content: Vec<u8>, reply: oneshot::Sender<Result<()>> },
    Delete { name: String, reply: oneshot::Sender<Result<()>> },
    Get { name: String, reply: oneshot::Sender<Result<Vec<u8>>> },
    ListArtifacts { reply: oneshot::Sender<Vec<(String, Vec<u8>)>> },
    ListStatuses { reply: oneshot::Sender<Vec<(ActorId, bool)>> },
    ListNodes { reply: oneshot::Sender<Vec<NodeSummary>> },
    NodeInfo { id: ActorId, reply: oneshot::Sender<Result<ActorInfo>> },
    NodeDown { id: ActorId, reply: oneshot::Sender<()> },
}

/// Cheap, `Clone`-able handle to the running coordinator mailbox.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorMsg>,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordinatorMsg>) -> Self {
        Self { tx }
    }

    async fn dispatch<R>(&self, make_msg: impl FnOnce(oneshot::Sender<R>) -> CoordinatorMsg) -> R {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make_msg(reply_tx))
            .await
            .expect("coordinator task is not running");
        reply_rx.await.expect("coordinator dropped reply sender")
    }

    pub async fn upload(&self, name: &str, content: Vec<u8>) -> Result<()> {
        let name = name.to_string();
        self.dispatch(|reply| CoordinatorMsg::Upload { name, content, reply }).await
    }

    pub async fn update(&self, name: &str, content: Vec<u8>) -> Result<()> {
        let name = name.to_string();
        self.dispatch(|reply| CoordinatorMsg::Update { name, content, reply }).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.dispatch(|reply| CoordinatorMsg::Delete { name, reply }).await
    }

    pub async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let name = name.to_string();
        self.dispatch(|reply| CoordinatorMsg::Get { name, reply }).await
    }

    pub async fn list_artifacts(&self) -> Vec<(String, Vec<u8>)> {
        self.dispatch(|reply| CoordinatorMsg::ListArtifacts { reply }).await
    }

    pub async fn list_statuses(&self) -> Vec<(ActorId, bool)> {
        self.dispatch(|reply| CoordinatorMsg::ListStatuses { reply }).await
    }

    pub async fn list_nodes(&self) -> Vec<NodeSummary> {
        self.dispatch(|reply| CoordinatorMsg::ListNodes { reply }).await
    }

    pub async fn node_info(&self, id: ActorId) -> Result<ActorInfo> {
        self.dispatch(|reply| CoordinatorMsg::NodeInfo { id, reply }).await
    }

    /// Called by a storage actor on its own alive→dead transition. Waits for
    /// repair bookkeeping to be queued and processed like any other
    /// coordinator message, but the actor calls this from a detached task so
    /// its own mailbox loop is never blocked on it.
    pub(crate) async fn node_down(&self, id: ActorId) {
        self.dispatch(|reply| CoordinatorMsg::NodeDown { id, reply }).await
    }
}

/// Runs the coordinator's mailbox loop until `token` is cancelled and the
/// mailbox drains (or closes).
pub(crate) async fn run(
    actors: Vec<StorageActorHandle>,
    max_chunk_len: usize,
    replica_factor: usize,
    mut rx: mpsc::Receiver<CoordinatorMsg>,
    token: CancellationToken,
) {
    let mut state = CoordinatorState {
        actors,
        artifacts: IndexMap::new(),
        max_chunk_len,
        replica_factor,
    };

    loop {
        let msg = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            msg = rx.recv() => msg,
        };
        let Some(msg) = msg else {
            debug!("coordinator shutting down");
            break;
        };
        if handle(&mut state, msg).await.is_err() {
            error!("coordinator hit an invariant violation, terminating");
            break;
        }
    }
}

/// `Err` means an [`Error::InvariantViolation`] was observed while handling
/// `msg`; the reply has already been sent, but the caller must stop the
/// coordinator's mailbox loop rather than keep serving requests against
/// state it can no longer trust.
async fn handle(state: &mut CoordinatorState, msg: CoordinatorMsg) -> std::result::Result<(), ()> {
    match msg {
        CoordinatorMsg::Upload { name, content, reply } => {
            reply_checked(reply, upload(state, name, content).await)
        }
        CoordinatorMsg::Update { name, content, reply } => {
            reply_checked(reply, update(state, &name, content).await)
        }
        CoordinatorMsg::Delete { name, reply } => reply_checked(reply, delete(state, &name).await),
        CoordinatorMsg::Get { name, reply } => reply_checked(reply, get(state, &name).await),
        CoordinatorMsg::ListArtifacts { reply } => {
            let _ = reply.send(list_artifacts(state).await);
            Ok(())
        }
        CoordinatorMsg::ListStatuses { reply } => {
            let _ = reply.send(list_statuses(state).await);
            Ok(())
        }
        CoordinatorMsg::ListNodes { reply } => {
            let _ = reply.send(list_nodes(state).await);
            Ok(())
        }
        CoordinatorMsg::NodeInfo { id, reply } => reply_checked(reply, node_info(state, id).await),
        CoordinatorMsg::NodeDown { id, reply } => {
            repair::handle_node_down(state, id).await;
            let _ = reply.send(());
            Ok(())
        }
    }
}

/// Sends `result` to `reply` and signals loop termination iff it was an
/// [`Error::InvariantViolation`].
fn reply_checked<T>(
    reply: oneshot::Sender<Result<T>>,
    result: Result<T>,
) -> std::result::Result<(), ()> {
    let fatal = matches!(result, Err(Error::InvariantViolation(_)));
    let _ = reply.send(result);
    if fatal {
        Err(())
    } else {
        Ok(())
    }
}

async fn place_chunk(state: &CoordinatorState, name: &str, index: u32, payload: &[u8]) -> Result<Vec<ActorId>> {
    let live = placement::sort_live_actors(&state.actors).await;
    if live.is_empty() {
        return Err(Error::CapacityExhausted);
    }
    let take = state.replica_factor.min(live.len());
    let hosts = &live[..take];

    join_all(hosts.iter().map(|actor| actor.store(name, index, payload.to_vec())))
        .await
        .into_iter()
        .for_each(|res| {
            if let Err(err) = res {
                warn!(%err, name, index, "store failed during placement");
            }
        });

    Ok(hosts.iter().map(|actor| actor.id()).collect())
}

async fn upload(state: &mut CoordinatorState, name: String, content: Vec<u8>) -> Result<()> {
    if state.artifacts.contains_key(&name) {
        delete(state, &name).await?;
    }

    let chunks = chunk::layout(&content, state.max_chunk_len);
    let mut placement = Vec::with_capacity(chunks.len());
    for (i, payload) in chunks.iter().enumerate() {
        placement.push(place_chunk(state, &name, i as u32, payload).await?);
    }

    state.artifacts.insert(
        name,
        ArtifactRecord { chunk_count: placement.len(), placement },
    );
    Ok(())
}

async fn update(state: &mut CoordinatorState, name: &str, content: Vec<u8>) -> Result<()> {
    if !state.artifacts.contains_key(name) {
        return Err(Error::NotFound(name.to_string()));
    }
    let new_chunks = chunk::layout(&content, state.max_chunk_len);
    let new_count = new_chunks.len();
    let old_count = state.artifacts[name].chunk_count;

    // Shrink.
    for i in new_count..old_count {
        let hosts = state.artifacts[name].placement[i].clone();
        join_all(hosts.iter().map(|id| {
            let actor = &state.actors[id.0 as usize];
            actor.delete(name, i as u32)
        }))
        .await;
    }
    if new_count < old_count {
        state.artifacts.get_mut(name).unwrap().placement.truncate(new_count);
    }

    // Overlap.
    for i in 0..old_count.min(new_count) {
        let hosts = state.artifacts[name].placement[i].clone();
        let payload = &new_chunks[i];
        join_all(hosts.iter().map(|id| {
            let actor = &state.actors[id.0 as usize];
            actor.update(name, i as u32, payload.clone())
        }))
        .await;
    }

    // Grow.
    for i in old_count..new_count {
        let hosts = place_chunk(state, name, i as u32, &new_chunks[i]).await?;
        state.artifacts.get_mut(name).unwrap().placement.push(hosts);
    }

    let record = state.artifacts.get_mut(name).unwrap();
    record.chunk_count = new_count;
    Ok(())
}

async fn delete(state: &mut CoordinatorState, name: &str) -> Result<()> {
    let Some(record) = state.artifacts.get(name) else {
        return Err(Error::NotFound(name.to_string()));
    };
    for (i, hosts) in record.placement.iter().enumerate() {
        join_all(hosts.iter().map(|id| {
            let actor = &state.actors[id.0 as usize];
            actor.delete(name, i as u32)
        }))
        .await;
    }
    state.artifacts.shift_remove(name);
    Ok(())
}

async fn get(state: &CoordinatorState, name: &str) -> Result<Vec<u8>> {
    let record = state
        .artifacts
        .get(name)
        .ok_or_else(|| Error::NotFound(name.to_string()))?;

    let mut content = Vec::new();
    for (i, replicas) in record.placement.iter().enumerate() {
        let payload = repair::fetch_chunk_payload(name, i as u32, replicas, &state.actors).await?;
        content.extend(payload);
    }
    Ok(content)
}

async fn list_artifacts(state: &CoordinatorState) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::with_capacity(state.artifacts.len());
    for name in state.artifacts.keys() {
        match get(state, name).await {
            Ok(content) => out.push((name.clone(), content)),
            Err(err) => warn!(%err, name, "skipping unreadable artifact in listing"),
        }
    }
    out
}

async fn list_statuses(state: &CoordinatorState) -> Vec<(ActorId, bool)> {
    join_all(state.actors.iter().map(|actor| async move {
        (actor.id(), actor.status().await.unwrap_or(false))
    }))
    .await
}

async fn list_nodes(state: &CoordinatorState) -> Vec<NodeSummary> {
    join_all(state.actors.iter().map(|actor| async move {
        NodeSummary {
            id: actor.id(),
            chunk_count: actor.chunk_count().await.unwrap_or(0),
        }
    }))
    .await
}

async fn node_info(state: &CoordinatorState, id: ActorId) -> Result<ActorInfo> {
    // An out-of-range id is a bad argument from the host, not an internal
    // bug, so it gets a recoverable error rather than `InvariantViolation`
    // (reserved for state the coordinator itself can no longer trust).
    let actor = state
        .actors
        .iter()
        .find(|actor| actor.id() == id)
        .ok_or(Error::CalleeUnavailable(id))?;
    actor.info().await
}
