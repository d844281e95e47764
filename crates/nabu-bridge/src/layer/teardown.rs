/// One step of [`GuestLayer::dispose`](super::GuestLayer::dispose).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TeardownStep {
    /// No further guest render calls are issued.
    StopGuestCalls,
    ReleaseBindGroup,
    ReleasePipeline,
    ReleaseSampler,
    /// Drops the bound guest callable and runs the guest's cleanup hook.
    ReleaseGuestReferences,
    /// Destroys the offscreen texture and view.
    ReleaseTarget,
    /// Revokes every published handle. The device/queue stay with the host.
    RevokeHandles,
}

/// Order in which a layer releases what it owns or borrows.
pub const TEARDOWN_ORDER: [TeardownStep; 7] = [
    TeardownStep::StopGuestCalls,
    TeardownStep::ReleaseBindGroup,
    TeardownStep::ReleasePipeline,
    TeardownStep::ReleaseSampler,
    TeardownStep::ReleaseGuestReferences,
    TeardownStep::ReleaseTarget,
    TeardownStep::RevokeHandles,
];
