//! Process lifecycle phases.
//!
//! # States
//! ```text
//! Bootstrap → Daemon → Shutdown
//! ```
//!
//! # Design Decisions
//! - `set_state` never blocks on observers (watch channel, latest value wins)
//! - Waiters re-check the current value before parking, so no wakeup is missed
//! - Transitions are expected to move forward; a backward move is applied
//!   but logged, and waiters already released stay released

use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

use crate::observability::metrics;

/// Process phase, totally ordered `Bootstrap < Daemon < Shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Bootstrap,
    Daemon,
    Shutdown,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Bootstrap => "Bootstrap",
            LifecycleState::Daemon => "Daemon",
            LifecycleState::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current phase and lets tasks wait for a later one.
#[derive(Debug)]
pub struct StateCoordinator {
    tx: watch::Sender<LifecycleState>,
}

impl StateCoordinator {
    /// Create a coordinator in the `Bootstrap` phase.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Bootstrap);
        Self { tx }
    }

    /// Current phase.
    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Move to `state` and notify waiters without blocking.
    pub fn set_state(&self, state: LifecycleState) {
        let previous = self.tx.send_replace(state);
        if state < previous {
            tracing::warn!(from = %previous, to = %state, "Lifecycle state moved backward");
        } else {
            tracing::debug!(from = %previous, to = %state, "Lifecycle state changed");
        }
        metrics::record_lifecycle_state(state);
    }

    /// Wait until the phase is at least `target`.
    ///
    /// Returns `true` once the target is reached, `false` if `timeout`
    /// elapsed first. `None` waits without bound.
    pub async fn wait_state(&self, target: LifecycleState, timeout: Option<Duration>) -> bool {
        let mut rx = self.tx.subscribe();
        if *rx.borrow_and_update() >= target {
            return true;
        }

        let reached = rx.wait_for(|state| *state >= target);
        match timeout {
            Some(limit) => matches!(tokio::time::timeout(limit, reached).await, Ok(Ok(_))),
            None => reached.await.is_ok(),
        }
    }

    /// Subscribe to raw state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }
}

impl Default for StateCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn states_are_ordered() {
        assert!(LifecycleState::Bootstrap < LifecycleState::Daemon);
        assert!(LifecycleState::Daemon < LifecycleState::Shutdown);
        assert!(LifecycleState::Bootstrap < LifecycleState::Shutdown);
    }

    #[test]
    fn set_state_updates_current_immediately() {
        let coordinator = StateCoordinator::new();
        assert_eq!(coordinator.current(), LifecycleState::Bootstrap);
        coordinator.set_state(LifecycleState::Daemon);
        assert_eq!(coordinator.current(), LifecycleState::Daemon);
    }

    #[tokio::test]
    async fn earlier_target_returns_immediately() {
        let coordinator = StateCoordinator::new();
        coordinator.set_state(LifecycleState::Daemon);

        let start = Instant::now();
        assert!(coordinator.wait_state(LifecycleState::Bootstrap, None).await);
        assert!(coordinator.wait_state(LifecycleState::Daemon, None).await);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn wait_times_out_without_transition() {
        let coordinator = StateCoordinator::new();

        let start = Instant::now();
        let reached = coordinator
            .wait_state(LifecycleState::Daemon, Some(Duration::from_secs(1)))
            .await;
        let elapsed = start.elapsed();

        assert!(!reached);
        assert!(elapsed >= Duration::from_millis(950), "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
    }

    #[tokio::test]
    async fn waiter_wakes_on_transition() {
        let coordinator = Arc::new(StateCoordinator::new());

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.wait_state(LifecycleState::Daemon, None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        coordinator.set_state(LifecycleState::Daemon);

        let reached = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter did not wake")
            .unwrap();
        assert!(reached);
    }

    #[tokio::test]
    async fn skipping_past_target_releases_waiter() {
        let coordinator = Arc::new(StateCoordinator::new());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    coordinator
                        .wait_state(LifecycleState::Daemon, Some(Duration::from_secs(5)))
                        .await
                })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(50)).await;
        coordinator.set_state(LifecycleState::Shutdown);

        for waiter in waiters {
            assert!(waiter.await.unwrap());
        }
    }

    #[tokio::test]
    async fn backward_transition_is_applied() {
        let coordinator = StateCoordinator::new();
        coordinator.set_state(LifecycleState::Shutdown);
        coordinator.set_state(LifecycleState::Daemon);
        assert_eq!(coordinator.current(), LifecycleState::Daemon);
    }
}
