use crate::actor::ActorId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the coordinator's public API.
///
/// `InvariantViolation` is fatal (it terminates the coordinator's run loop,
/// see [`crate::system::start`]); the others are ordinary, recoverable
/// results.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The named artifact has no record at the coordinator.
    #[error("Artifact '{0}' does not exist")]
    NotFound(String),

    /// An RPC to a storage actor failed because the actor is dead, its
    /// mailbox never drained in time, or no live replica could be reached.
    #[error("storage actor {0:?} is unavailable")]
    CalleeUnavailable(ActorId),

    /// Placement needed at least one live actor and found none.
    #[error("no live storage actor available")]
    CapacityExhausted,

    /// An internal invariant was violated. This should never happen in
    /// correct code; if it does, the coordinator stops rather than continue
    /// operating on state it can no longer trust.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
