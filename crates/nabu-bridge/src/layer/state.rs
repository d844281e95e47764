use std::fmt;

/// Per-frame state machine of a [`GuestLayer`](super::GuestLayer).
///
/// `Uninitialized -> HandlesBound -> TargetReady -> Live`, with `Failed`
/// reachable from any state and terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LayerState {
    Uninitialized,
    HandlesBound,
    TargetReady,
    Live,
    Failed,
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::HandlesBound => "handles bound",
            Self::TargetReady => "target ready",
            Self::Live => "live",
            Self::Failed => "failed",
        })
    }
}

/// Snapshot of what a layer has set up so far.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LayerSession {
    pub handles_set: bool,
    pub target_ready: bool,
    pub guest_ready: bool,
    pub failed: bool,
}

/// Why a tick did not composite.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    /// The layer is hidden.
    Hidden,
    /// The host surface has a zero dimension (minimized window).
    Minimized,
    /// A setup transition happened this tick.
    Setup,
    /// The offscreen target could not be allocated.
    TargetUnavailable,
    /// The host surface changed size; the target was recreated.
    Resized,
    /// The guest has not exposed its entry point.
    GuestNotReady,
    /// The guest's render call failed.
    GuestFailed,
    /// The blit pipeline could not be built or the blit was rejected.
    BlitFailed,
}

/// Result of [`GuestLayer::tick`](super::GuestLayer::tick).
///
/// A tick never fails the host's frame; at worst the layer contributes nothing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// The guest rendered and the target was blitted onto the surface.
    Composited,
    /// This frame was skipped; retried next tick.
    Skipped(SkipReason),
    /// The layer is in [`LayerState::Failed`]; ticks do nothing.
    Inert,
    /// The layer has been disposed.
    Disposed,
}

impl FrameOutcome {
    pub fn is_composited(self) -> bool {
        matches!(self, Self::Composited)
    }
}
