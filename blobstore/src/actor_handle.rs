//! A cheap, `Clone`-able handle to a running [`StorageActor`](crate::actor),
//! exposing its mailbox as a set of async methods.
//!
//! Every method here is a thin "send a message, await the reply" wrapper
//! over the actor's mailbox. A bounded number of mailbox-full retries, with
//! jittered backoff borrowed from the `backoff` crate, covers a momentarily
//! busy actor; anything that still doesn't get a reply inside [`RPC_TIMEOUT`]
//! is reported as [`Error::CalleeUnavailable`], so a dead or unreachable
//! callee fails the call instead of hanging it.

use std::time::Duration;

use backoff::{Backoff, BackoffConfig};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::actor::{ActorId, ActorInfo, ActorMsg};
use crate::error::{Error, Result};

const RPC_TIMEOUT: Duration = Duration::from_secs(3);
const MAILBOX_SEND_ATTEMPTS: usize = 5;

fn mailbox_backoff() -> Backoff {
    Backoff::new(&BackoffConfig {
        init_backoff: Duration::from_millis(2),
        max_backoff: Duration::from_millis(100),
        base: 2.0,
    })
}

/// Handle to a running storage actor.
#[derive(Debug, Clone)]
pub struct StorageActorHandle {
    id: ActorId,
    tx: mpsc::Sender<ActorMsg>,
}

impl StorageActorHandle {
    pub(crate) fn new(id: ActorId, tx: mpsc::Sender<ActorMsg>) -> Self {
        Self { id, tx }
    }

    /// This actor's stable id.
    pub fn id(&self) -> ActorId {
        self.id
    }

    async fn dispatch<R>(&self, make_msg: impl FnOnce(oneshot::Sender<R>) -> ActorMsg) -> Result<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let mut msg = Some(make_msg(reply_tx));
        let mut backoff = mailbox_backoff();

        for attempt in 0..MAILBOX_SEND_ATTEMPTS {
            match self.tx.try_send(msg.take().expect("message only taken once per loop")) {
                Ok(()) => break,
                Err(mpsc::error::TrySendError::Full(m)) => {
                    if attempt + 1 == MAILBOX_SEND_ATTEMPTS {
                        return Err(Error::CalleeUnavailable(self.id));
                    }
                    msg = Some(m);
                    tokio::time::sleep(backoff.next()).await;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    return Err(Error::CalleeUnavailable(self.id));
                }
            }
        }

        match timeout(RPC_TIMEOUT, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped without replying, or the call timed out.
            Ok(Err(_)) | Err(_) => Err(Error::CalleeUnavailable(self.id)),
        }
    }

    /// Data-plane dispatch: an [`crate::actor::ActorDown`] from a dead actor
    /// also maps to `CalleeUnavailable`.
    async fn dispatch_data<R>(
        &self,
        make_msg: impl FnOnce(oneshot::Sender<std::result::Result<R, crate::actor::ActorDown>>) -> ActorMsg,
    ) -> Result<R> {
        self.dispatch(make_msg).await?.map_err(|_| Error::CalleeUnavailable(self.id))
    }

    pub async fn store(&self, name: &str, index: u32, payload: Vec<u8>) -> Result<()> {
        let name = name.to_string();
        self.dispatch_data(|reply| ActorMsg::Store { name, index, payload, reply }).await
    }

    pub async fn update(&self, name: &str, index: u32, payload: Vec<u8>) -> Result<()> {
        let name = name.to_string();
        self.dispatch_data(|reply| ActorMsg::Update { name, index, payload, reply }).await
    }

    pub async fn delete(&self, name: &str, index: u32) -> Result<()> {
        let name = name.to_string();
        self.dispatch_data(|reply| ActorMsg::Delete { name, index, reply }).await
    }

    pub async fn get(&self, name: &str, index: u32) -> Result<Option<Vec<u8>>> {
        let name = name.to_string();
        self.dispatch_data(|reply| ActorMsg::Get { name, index, reply }).await
    }

    pub async fn status(&self) -> Result<bool> {
        self.dispatch(|reply| ActorMsg::Status { reply }).await
    }

    /// Flips `alive` and returns the new value.
    pub async fn toggle(&self) -> Result<bool> {
        self.dispatch(|reply| ActorMsg::Toggle { reply }).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.dispatch(|reply| ActorMsg::Clear { reply }).await
    }

    pub async fn info(&self) -> Result<ActorInfo> {
        self.dispatch(|reply| ActorMsg::Info { reply }).await
    }

    pub async fn chunk_count(&self) -> Result<usize> {
        self.dispatch(|reply| ActorMsg::ChunkCount { reply }).await
    }
}
