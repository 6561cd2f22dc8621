//! TTL Reaper Task
//!
//! Background task that periodically removes expired cache entries, so keys
//! nobody reads again do not pile up in memory.

use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::ttl_cache::Shared;

// == Reaper ==
/// Handle to a running reaper task.
///
/// The task holds only a weak reference to the cache state and exits on its
/// own once the cache is gone.
pub(crate) struct Reaper {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawns a reaper that sweeps `shared` every `interval`.
    ///
    /// The first sweep runs one full interval after spawning.
    ///
    /// # Arguments
    /// * `runtime` - Runtime to spawn the task on
    /// * `shared` - Weak reference to the cache state
    /// * `interval` - Time between sweeps
    pub(crate) fn spawn<K, V>(
        runtime: &Handle,
        shared: Weak<Shared<K, V>>,
        interval: Duration,
    ) -> Self
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let (shutdown, mut stop) = oneshot::channel::<()>();

        let handle = runtime.spawn(async move {
            info!("Starting TTL reaper with interval of {:?}", interval);

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop => break,
                    _ = ticker.tick() => {}
                }

                let Some(state) = shared.upgrade() else {
                    break;
                };
                let removed = state.purge_expired().await;
                drop(state);

                if removed > 0 {
                    debug!("TTL reaper: removed {} expired entries", removed);
                } else {
                    trace!("TTL reaper: no expired entries found");
                }
            }

            debug!("TTL reaper stopped");
        });

        Self { shutdown, handle }
    }

    // == Stop ==
    /// Signals the task to stop and waits until it has exited.
    pub(crate) async fn stop(self) {
        // The task may already be gone, in which case nobody is listening
        let _ = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            if err.is_panic() {
                warn!("TTL reaper panicked: {}", err);
            }
        }
    }

    // == Abort ==
    /// Cancels the task without waiting for it.
    pub(crate) fn abort(self) {
        self.handle.abort();
    }

    /// Returns true once the task has exited.
    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
