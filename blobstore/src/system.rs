//! Bootstrapping and tearing down a running cluster.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use observability_deps::tracing::info;

use crate::actor::{self, ActorId};
use crate::actor_handle::StorageActorHandle;
use crate::chaos;
use crate::config::Config;
use crate::coordinator::{self, CoordinatorHandle};

const ACTOR_MAILBOX_CAPACITY: usize = 64;
const COORDINATOR_MAILBOX_CAPACITY: usize = 256;

/// A running cluster: the coordinator handle plus everything needed to
/// bring it down cleanly.
#[derive(Debug)]
pub struct System {
    coordinator: CoordinatorHandle,
    token: CancellationToken,
    actor_tasks: Vec<JoinHandle<()>>,
    coordinator_task: JoinHandle<()>,
    chaos_task: JoinHandle<()>,
}

impl System {
    /// The handle to issue `upload`/`get`/... calls against.
    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }

    /// Stops the chaos driver, then the coordinator, then every storage
    /// actor, and awaits all of their tasks.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.chaos_task.await;
        let _ = self.coordinator_task.await;
        for task in self.actor_tasks {
            let _ = task.await;
        }
        info!("system shut down");
    }
}

/// Spawns `config.actor_count` storage actors, the coordinator, and the
/// chaos driver, wired together per the bootstrap order: the coordinator's
/// channel and handle are created first so each actor can be given a handle
/// to notify on death, then the coordinator task itself is spawned with the
/// collected actor handles.
pub fn start(config: Config) -> System {
    config.validate();
    let token = CancellationToken::new();

    let (coordinator_tx, coordinator_rx) = mpsc::channel(COORDINATOR_MAILBOX_CAPACITY);
    let coordinator = CoordinatorHandle::new(coordinator_tx);

    let mut actor_handles = Vec::with_capacity(config.actor_count);
    let mut actor_tasks = Vec::with_capacity(config.actor_count);
    for i in 0..config.actor_count {
        let id = ActorId(i as u32);
        let (tx, rx) = mpsc::channel(ACTOR_MAILBOX_CAPACITY);
        let task = tokio::spawn(actor::run(id, coordinator.clone(), rx, token.clone()));
        actor_handles.push(StorageActorHandle::new(id, tx));
        actor_tasks.push(task);
    }

    let coordinator_task = tokio::spawn(coordinator::run(
        actor_handles.clone(),
        config.max_chunk_len,
        config.replica_factor,
        coordinator_rx,
        token.clone(),
    ));

    let chaos_task = tokio::spawn(chaos::run(actor_handles, config, token.clone()));

    System {
        coordinator,
        token,
        actor_tasks,
        coordinator_task,
        chaos_task,
    }
}
