// runner.rs - The physics thread and its mailbox pair
//
// One long-lived thread ticks the simulator at a fixed rate. Snapshots flow
// in through one single-slot mailbox, results flow out through the other;
// only the latest payload on either side matters. Shutdown is a flag
// observed at the next iteration.

use crate::mailbox::Mailbox;
use crate::sim::{SimConfig, Simulation};
use crate::snapshot::{PhysicsResults, PhysicsSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use strata_core::time::Ticker;

/// The two mailboxes and the shutdown flag shared between the main loop and
/// the physics thread.
pub struct PhysicsProxy {
    pending_state: Mailbox<PhysicsSnapshot>,
    latest_results: Mailbox<PhysicsResults>,
    shutdown: AtomicBool,
}

impl PhysicsProxy {
    pub fn new() -> Self {
        Self {
            pending_state: Mailbox::new(),
            latest_results: Mailbox::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Main thread: publish the latest snapshot, replacing any unconsumed
    /// one.
    pub fn publish_snapshot(&self, snapshot: PhysicsSnapshot) {
        self.pending_state.store(snapshot);
    }

    /// Main thread: take the latest results, if any arrived since the last
    /// call.
    pub fn take_results(&self) -> Option<PhysicsResults> {
        self.latest_results.take()
    }

    pub(crate) fn take_snapshot(&self) -> Option<PhysicsSnapshot> {
        self.pending_state.take()
    }

    pub(crate) fn publish_results(&self, results: PhysicsResults) {
        self.latest_results.store(results);
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Default for PhysicsProxy {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the running physics thread.
pub struct PhysicsHandle {
    proxy: Arc<PhysicsProxy>,
    join: JoinHandle<()>,
}

impl PhysicsHandle {
    pub fn proxy(&self) -> &Arc<PhysicsProxy> {
        &self.proxy
    }

    /// Signal the ticker to stop and wait for the thread to exit.
    pub fn shutdown(self) {
        self.proxy.request_shutdown();
        if self.join.join().is_err() {
            tracing::error!("physics thread panicked before shutdown");
        }
    }
}

/// Spawn the fixed-rate physics thread.
pub fn spawn_physics_thread(
    proxy: Arc<PhysicsProxy>,
    config: SimConfig,
    rate_hz: u32,
) -> std::io::Result<PhysicsHandle> {
    let thread_proxy = Arc::clone(&proxy);
    let join = std::thread::Builder::new()
        .name("strata-physics".to_string())
        .spawn(move || {
            let dt = 1.0 / rate_hz.max(1) as f32;
            let mut ticker = Ticker::from_hz(rate_hz);
            let mut sim = Simulation::new(config);
            tracing::info!(rate_hz, "physics thread started");
            while !thread_proxy.shutdown_requested() {
                ticker.wait();
                if let Some(snapshot) = thread_proxy.take_snapshot() {
                    sim.apply_snapshot(snapshot);
                }
                sim.step(dt);
                thread_proxy.publish_results(sim.results());
            }
            tracing::info!("physics thread stopped");
        })?;
    Ok(PhysicsHandle { proxy, join })
}
