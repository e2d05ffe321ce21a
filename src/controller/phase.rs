//! Controller lifecycle phases.

/// Where the controller is in its lifecycle.
///
/// Transitions only move forward:
/// `Starting → AwaitingWorkerReady → SurfaceActive → ShuttingDown →
/// Terminated`. A re-entry (activation with no surface) begins a new run at
/// `Starting` rather than transitioning backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Starting,
    AwaitingWorkerReady,
    SurfaceActive,
    ShuttingDown,
    Terminated,
}

impl Phase {
    /// Whether `next` is the legal successor of `self`.
    pub fn can_transition(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Starting, Phase::AwaitingWorkerReady)
                | (Phase::AwaitingWorkerReady, Phase::SurfaceActive)
                | (Phase::SurfaceActive, Phase::ShuttingDown)
                | (Phase::ShuttingDown, Phase::Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Terminated
    }
}
