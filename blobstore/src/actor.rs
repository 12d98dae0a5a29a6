//! The storage actor: an isolated, in-memory chunk store addressed only by
//! message passing.
//!
//! Each actor owns a single-consumer mailbox and processes messages one at a
//! time, in arrival order. There is no shared mutable state between actors,
//! and the coordinator never reaches into an actor's map directly.

use std::collections::BTreeMap;
use std::collections::HashMap;

use observability_deps::tracing::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::coordinator::CoordinatorHandle;

/// Stable identifier for a storage actor, assigned at creation (`0..N-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(pub u32);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-artifact chunk summary returned by [`info`](ActorMsg::Info).
#[derive(Debug, Clone)]
pub struct ArtifactSummary {
    pub name: String,
    /// `(chunk_index, payload)` pairs, in ascending chunk-index order.
    pub chunks: Vec<(u32, Vec<u8>)>,
}

/// Serialized summary of an actor's full state.
#[derive(Debug, Clone)]
pub struct ActorInfo {
    pub id: ActorId,
    pub alive: bool,
    pub artifacts: Vec<ArtifactSummary>,
}

/// An RPC reached a dead actor. The data plane (store/update/delete/get) is
/// gated on liveness; the control plane (status/toggle/clear/info/chunk_count)
/// is not, so a chaos-toggled actor can still be inspected and eventually
/// revived. See `DESIGN.md` for the rationale behind this split.
#[derive(Debug)]
pub(crate) struct ActorDown;

type DataResult<T> = std::result::Result<T, ActorDown>;

pub(crate) enum ActorMsg {
    Store {
        name: String,
        index: u32,
        payload: Vec<u8>,
        reply: oneshot::Sender<DataResult<()>>,
    },
    Update {
        name: String,
        index: u32,
        payload: Vec<u8>,
        reply: oneshot::Sender<DataResult<()>>,
    },
    Delete {
        name: String,
        index: u32,
        reply: oneshot::Sender<DataResult<()>>,
    },
    Get {
        name: String,
        index: u32,
        reply: oneshot::Sender<DataResult<Option<Vec<u8>>>>,
    },
    Status {
        reply: oneshot::Sender<bool>,
    },
    /// Flips `alive`; on the true->false edge, fires `node_down` at the
    /// coordinator fire-and-forget (see [`run`]).
    Toggle {
        reply: oneshot::Sender<bool>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Info {
        reply: oneshot::Sender<ActorInfo>,
    },
    ChunkCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Owned actor state. Lives entirely inside the task spawned by [`run`];
/// nothing outside the task ever touches it directly.
struct StorageActorState {
    id: ActorId,
    alive: bool,
    /// `chunks[artifact_name][chunk_index] = payload`.
    chunks: HashMap<String, BTreeMap<u32, Vec<u8>>>,
    /// Coarse load hint: incremented only when a new artifact entry is
    /// created, decremented only when an artifact's last chunk is removed.
    /// It is not an exact chunk tally and placement must not treat it as one.
    chunk_count: usize,
    /// Lookup-only back reference, installed at bootstrap. Never owns the
    /// coordinator and is never used to mutate it directly — only to send
    /// it messages.
    coordinator: CoordinatorHandle,
}

impl StorageActorState {
    fn new(id: ActorId, coordinator: CoordinatorHandle) -> Self {
        Self {
            id,
            alive: true,
            chunks: HashMap::new(),
            chunk_count: 0,
            coordinator,
        }
    }

    fn store(&mut self, name: String, index: u32, payload: Vec<u8>) -> DataResult<()> {
        if !self.alive {
            return Err(ActorDown);
        }
        let is_new = !self.chunks.contains_key(&name);
        let entry = self.chunks.entry(name).or_default();
        entry.insert(index, payload);
        if is_new {
            self.chunk_count += 1;
        }
        Ok(())
    }

    fn update(&mut self, name: &str, index: u32, payload: Vec<u8>) -> DataResult<()> {
        if !self.alive {
            return Err(ActorDown);
        }
        if let Some(entry) = self.chunks.get_mut(name) {
            if let Some(slot) = entry.get_mut(&index) {
                *slot = payload;
            }
        }
        Ok(())
    }

    fn delete(&mut self, name: &str, index: u32) -> DataResult<()> {
        if !self.alive {
            return Err(ActorDown);
        }
        if let Some(entry) = self.chunks.get_mut(name) {
            entry.remove(&index);
            if entry.is_empty() {
                self.chunks.remove(name);
                self.chunk_count -= 1;
            }
        }
        Ok(())
    }

    fn get(&self, name: &str, index: u32) -> DataResult<Option<Vec<u8>>> {
        if !self.alive {
            return Err(ActorDown);
        }
        Ok(self.chunks.get(name).and_then(|c| c.get(&index)).cloned())
    }

    fn info(&self) -> ActorInfo {
        let artifacts = self
            .chunks
            .iter()
            .map(|(name, chunks)| ArtifactSummary {
                name: name.clone(),
                chunks: chunks.iter().map(|(i, payload)| (*i, payload.clone())).collect(),
            })
            .collect();
        ActorInfo {
            id: self.id,
            alive: self.alive,
            artifacts,
        }
    }

    fn clear(&mut self) {
        self.chunks.clear();
        self.chunk_count = 0;
    }
}

/// Runs a single storage actor's mailbox loop until `token` is cancelled and
/// the mailbox drains (or closes).
pub(crate) async fn run(
    id: ActorId,
    coordinator: CoordinatorHandle,
    mut rx: mpsc::Receiver<ActorMsg>,
    token: CancellationToken,
) {
    let mut state = StorageActorState::new(id, coordinator);
    loop {
        let msg = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            msg = rx.recv() => msg,
        };
        let Some(msg) = msg else {
            debug!(actor = %id, "storage actor shutting down");
            break;
        };
        handle(&mut state, msg);
    }
}

fn handle(state: &mut StorageActorState, msg: ActorMsg) {
    match msg {
        ActorMsg::Store { name, index, payload, reply } => {
            let _ = reply.send(state.store(name, index, payload));
        }
        ActorMsg::Update { name, index, payload, reply } => {
            let _ = reply.send(state.update(&name, index, payload));
        }
        ActorMsg::Delete { name, index, reply } => {
            let _ = reply.send(state.delete(&name, index));
        }
        ActorMsg::Get { name, index, reply } => {
            let _ = reply.send(state.get(&name, index));
        }
        ActorMsg::Status { reply } => {
            let _ = reply.send(state.alive);
        }
        ActorMsg::Toggle { reply } => {
            state.alive = !state.alive;
            let now_alive = state.alive;
            let _ = reply.send(now_alive);
            if !now_alive {
                // Fire-and-forget: the actor does not wait for the
                // coordinator to finish repairing before continuing to
                // process its own mailbox.
                let coordinator = state.coordinator.clone();
                let id = state.id;
                tokio::spawn(async move {
                    info!(actor = %id, "actor went down, notifying coordinator");
                    coordinator.node_down(id).await;
                });
            }
        }
        ActorMsg::Clear { reply } => {
            state.clear();
            let _ = reply.send(());
        }
        ActorMsg::Info { reply } => {
            let _ = reply.send(state.info());
        }
        ActorMsg::ChunkCount { reply } => {
            let _ = reply.send(state.chunk_count);
        }
    }
}
