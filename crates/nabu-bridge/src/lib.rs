//! Nabu bridge crate.
//!
//! Shares the host's GPU device/queue with an embedded guest runtime, lets the
//! guest draw into a host-owned offscreen target, and composites the result onto
//! the host surface every frame.
//!
//! Per-frame flow (driven by [`GuestLayer::tick`]):
//! 1. the host's device/queue are published into the [`HandleRegistry`]
//! 2. an [`OffscreenTarget`] matching the surface size is ensured
//! 3. the guest's render entry point is invoked ([`GuestRenderInvoker`])
//! 4. the target is blitted onto the surface ([`BlitCompositor`])
//!
//! Everything runs on the host's render thread. Guest submissions are queued
//! before the blit's, and queue ordering is the only synchronization.

mod error;

pub mod compositor;
pub mod handles;
pub mod host;
pub mod invoker;
pub mod layer;
pub mod target;

pub use compositor::BlitCompositor;
pub use error::{BridgeError, GuestError};
pub use handles::{GuestGpu, HandleKind, HandleRegistry, RawHandle};
pub use host::HostCtx;
pub use invoker::{FrameRenderer, GuestRenderInvoker, GuestRuntime, NullRenderer, RenderOutcome};
pub use layer::{
    FrameOutcome, GuestLayer, LayerConfig, LayerSession, LayerState, SkipReason, TEARDOWN_ORDER,
    TeardownStep,
};
pub use target::{OffscreenTarget, OffscreenTargetManager, TargetStatus};
