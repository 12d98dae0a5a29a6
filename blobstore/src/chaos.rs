//! Background fault injection: periodically toggles a random actor's
//! liveness, triggering repair on the alive→dead edge.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use observability_deps::tracing::{debug, info};

use crate::actor_handle::StorageActorHandle;
use crate::config::Config;

/// Runs the chaos loop until `token` is cancelled.
///
/// Every tick: pick a uniformly random actor, query its status. If it's
/// alive and fewer than `max_dead` actors are currently down, toggle it
/// dead. If it's already dead, toggle it back alive unconditionally — no
/// repair action is needed on revival, the artifact map never lists a dead
/// actor as a current replica host. A local counter tracks how many actors
/// this loop believes are dead; it is a belief, not a query, since nothing
/// else in the system toggles actors.
pub(crate) async fn run(actors: Vec<StorageActorHandle>, cfg: Config, token: CancellationToken) {
    if actors.is_empty() {
        return;
    }

    let mut rng = StdRng::from_entropy();
    let mut dead_count = 0usize;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("chaos driver shutting down");
                return;
            }
            _ = tokio::time::sleep(cfg.chaos_tick) => {}
        }

        let index = rng.gen_range(0..actors.len());
        let actor = &actors[index];

        let Ok(alive) = actor.status().await else {
            continue;
        };

        if alive {
            if dead_count >= cfg.max_dead {
                continue;
            }
            if let Ok(false) = actor.toggle().await {
                dead_count += 1;
                info!(actor = %actor.id(), "chaos driver killed actor");
            }
        } else if let Ok(true) = actor.toggle().await {
            dead_count = dead_count.saturating_sub(1);
            info!(actor = %actor.id(), "chaos driver revived actor");
        }
    }
}
