use thiserror::Error;

use crate::handles::{HandleKind, RawHandle};

/// Errors produced by the bridge.
///
/// Everything except [`BridgeError::DeviceLost`] and [`BridgeError::Disposed`]
/// is recoverable: the layer skips its contribution to the current frame and
/// retries on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Handles or the offscreen target are missing where they are required.
    #[error("{what} is not initialized")]
    NotInitialized { what: &'static str },

    /// A GPU texture/pipeline/sampler could not be created.
    #[error("failed to allocate {what}: {reason}")]
    Allocation { what: &'static str, reason: String },

    /// The guest has not exposed its render entry point yet.
    #[error("guest render entry point is not available yet")]
    GuestNotReady,

    /// The guest's render call raised an error.
    #[error("guest render failed: {message}")]
    GuestExecution { message: String },

    /// The shared device was lost.
    #[error("GPU device lost: {reason}")]
    DeviceLost { reason: String },

    /// The bridge was used after disposal.
    #[error("bridge used after disposal")]
    Disposed,

    /// A guest passed an integer handle that does not name a live object.
    #[error("handle {handle} does not name a live {expected}")]
    InvalidHandle {
        handle: RawHandle,
        expected: HandleKind,
    },
}

impl BridgeError {
    /// Returns `true` when retrying on a later tick can succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DeviceLost { .. } | Self::Disposed)
    }
}

/// Errors reported by guest-side code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestError {
    /// The entry point is gone (never defined, or the guest module was unloaded).
    #[error("guest entry point `{entry_point}` is not available")]
    Unavailable { entry_point: String },

    /// The entry point ran and raised an error.
    #[error("{message}")]
    Raised { message: String },
}

impl From<BridgeError> for GuestError {
    fn from(err: BridgeError) -> Self {
        Self::Raised {
            message: err.to_string(),
        }
    }
}
