use std::time::Duration;

/// Tunables for a [`crate::start`]ed system.
///
/// There are no environment variables or config files involved here — the
/// core library takes a plain record, the same way `blobstore`'s `cli`
/// wraps it with `clap` at the edge rather than reading the environment
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of storage actors in the cluster.
    pub actor_count: usize,
    /// Maximum length, in bytes, of a single chunk.
    pub max_chunk_len: usize,
    /// Number of replicas to maintain per chunk. Must not exceed `actor_count`.
    pub replica_factor: usize,
    /// How often the chaos driver considers toggling an actor.
    pub chaos_tick: Duration,
    /// Maximum number of actors the chaos driver will allow to be
    /// concurrently dead before it stops killing new ones.
    pub max_dead: usize,
}

impl Default for Config {
    fn default() -> Self {
        let actor_count = 15;
        Self {
            actor_count,
            max_chunk_len: 3,
            replica_factor: 3,
            chaos_tick: Duration::from_secs(15),
            max_dead: actor_count / 2,
        }
    }
}

impl Config {
    /// Panics if the configuration is internally inconsistent.
    ///
    /// There is no sane runtime recovery from asking for more replicas than
    /// there are actors to host them, so this is a fail-fast assertion
    /// rather than a `Result`.
    pub(crate) fn validate(&self) {
        assert!(
            self.replica_factor <= self.actor_count,
            "replica_factor ({}) must not exceed actor_count ({})",
            self.replica_factor,
            self.actor_count
        );
        assert!(self.actor_count > 0, "actor_count must be positive");
    }
}
