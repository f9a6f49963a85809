//! Bootstrap phase tracking.
//!
//! # Responsibilities
//! - Name the phases a bootstrap moves through
//! - Publish transitions on a watch channel for observers
//!
//! # Design Decisions
//! - Phases only move forward; a new bootstrap means a new cell
//! - Stopped and Failed are terminal
//! - Observers watch the cell instead of polling the server

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Phase of a service bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has happened yet.
    Idle,
    /// Argv parsed, resolving configuration.
    Configuring,
    /// Configuration accepted, binding the listener.
    Starting,
    /// Accepting requests.
    Running,
    /// Listener closed, draining in-flight requests.
    ShuttingDown,
    /// Drained and exited cleanly.
    Stopped,
    /// Aborted by a validation, bind or serve error.
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Configuring => "configuring",
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::ShuttingDown => "shutting-down",
            Phase::Stopped => "stopped",
            Phase::Failed => "failed",
        }
    }

    /// Terminal phases never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Stopped | Phase::Failed)
    }

    /// Admissible forward edges of the bootstrap machine.
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::Configuring)
                | (Phase::Configuring, Phase::Starting)
                | (Phase::Configuring, Phase::Failed)
                | (Phase::Starting, Phase::Running)
                | (Phase::Starting, Phase::Failed)
                | (Phase::Running, Phase::ShuttingDown)
                | (Phase::Running, Phase::Failed)
                | (Phase::ShuttingDown, Phase::Stopped)
                | (Phase::ShuttingDown, Phase::Failed)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, watchable phase of one bootstrap.
///
/// Cloning shares the cell. Watchers see every transition in order.
#[derive(Debug, Clone)]
pub struct PhaseCell {
    tx: Arc<watch::Sender<Phase>>,
}

impl PhaseCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Phase::Idle);
        Self { tx: Arc::new(tx) }
    }

    /// The phase right now.
    pub fn current(&self) -> Phase {
        *self.tx.borrow()
    }

    /// A receiver that observes every subsequent transition.
    pub fn watch(&self) -> watch::Receiver<Phase> {
        self.tx.subscribe()
    }

    /// Move to `next`. Re-announcing the current phase is a no-op.
    pub fn advance(&self, next: Phase) {
        let current = *self.tx.borrow();
        if current == next {
            return;
        }
        debug_assert!(
            current.can_transition_to(next),
            "inadmissible phase transition {current:?} -> {next:?}"
        );
        tracing::debug!(from = %current, to = %next, "Phase transition");
        self.tx.send_replace(next);
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_edges_are_admissible() {
        let path = [
            Phase::Idle,
            Phase::Configuring,
            Phase::Starting,
            Phase::Running,
            Phase::ShuttingDown,
            Phase::Stopped,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be admissible",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn terminal_phases_have_no_exits() {
        let all = [
            Phase::Idle,
            Phase::Configuring,
            Phase::Starting,
            Phase::Running,
            Phase::ShuttingDown,
            Phase::Stopped,
            Phase::Failed,
        ];
        for terminal in [Phase::Stopped, Phase::Failed] {
            assert!(terminal.is_terminal());
            for next in all {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn no_backward_or_skipping_edges() {
        assert!(!Phase::Running.can_transition_to(Phase::Starting));
        assert!(!Phase::Idle.can_transition_to(Phase::Running));
        assert!(!Phase::ShuttingDown.can_transition_to(Phase::Running));
        assert!(!Phase::Idle.can_transition_to(Phase::Failed));
    }

    #[test]
    fn cell_publishes_transitions_to_watchers() {
        let cell = PhaseCell::new();
        let watcher = cell.watch();
        assert_eq!(cell.current(), Phase::Idle);

        cell.advance(Phase::Configuring);
        cell.advance(Phase::Configuring);
        assert_eq!(cell.current(), Phase::Configuring);
        assert_eq!(*watcher.borrow(), Phase::Configuring);
    }
}
