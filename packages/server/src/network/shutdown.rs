//! Graceful shutdown coordination.
//!
//! A watch channel signals the worker and dispatcher loops; an `ArcSwap`
//! holds the lock-free health state for probes; an atomic counter with RAII
//! guards tracks in-flight gateway calls so drain can wait for them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Server health state: Starting -> Ready -> Draining -> Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Initializing; not yet accepting requests.
    Starting,
    /// Fully operational.
    Ready,
    /// Draining in-flight calls; no new requests accepted.
    Draining,
    /// All in-flight calls completed.
    Stopped,
}

impl HealthState {
    /// Lowercase name reported by the health endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Coordinates shutdown across the HTTP surface and the consumption loops.
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    /// Transitions to `Ready`; readiness probes pass from here on.
    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    /// Returns a receiver notified when shutdown is triggered. The worker
    /// and dispatcher loops select on this alongside their subscriptions.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Transitions to `Draining` and notifies every shutdown receiver.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
        // Receivers may already be gone; that is fine.
        let _ = self.shutdown_signal.send(true);
    }

    /// Current health state.
    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// RAII guard counting one in-flight gateway call. The counter is
    /// decremented on drop, panics included.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Number of gateway calls currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits for in-flight calls to finish, up to `timeout`.
    ///
    /// Returns `true` (and transitions to `Stopped`) once the counter hits
    /// zero; `false` when the timeout expires with calls still pending.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_progresses_in_order() {
        let controller = ShutdownController::new();
        assert_eq!(controller.health_state(), HealthState::Starting);

        controller.set_ready();
        assert_eq!(controller.health_state(), HealthState::Ready);

        controller.trigger_shutdown();
        assert_eq!(controller.health_state(), HealthState::Draining);
    }

    #[test]
    fn guards_track_in_flight_calls() {
        let controller = ShutdownController::new();
        let g1 = controller.in_flight_guard();
        let g2 = controller.in_flight_guard();
        assert_eq!(controller.in_flight_count(), 2);

        drop(g1);
        assert_eq!(controller.in_flight_count(), 1);
        drop(g2);
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn receivers_observe_the_shutdown_signal() {
        let controller = ShutdownController::new();
        let mut rx = controller.shutdown_receiver();
        assert!(!*rx.borrow());

        controller.trigger_shutdown();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn drain_succeeds_once_guards_release() {
        let controller = ShutdownController::new();
        let guard = controller.in_flight_guard();
        controller.trigger_shutdown();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            drop(guard);
        });

        assert!(controller.wait_for_drain(Duration::from_secs(2)).await);
        assert_eq!(controller.health_state(), HealthState::Stopped);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn drain_times_out_while_calls_remain() {
        let controller = ShutdownController::new();
        let _guard = controller.in_flight_guard();
        controller.trigger_shutdown();

        assert!(!controller.wait_for_drain(Duration::from_millis(40)).await);
        assert_eq!(controller.health_state(), HealthState::Draining);
    }

    #[test]
    fn state_names_for_probes() {
        assert_eq!(HealthState::Ready.as_str(), "ready");
        assert_eq!(HealthState::Draining.as_str(), "draining");
    }
}
