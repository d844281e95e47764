//! Nabu engine crate.
//!
//! This crate owns the host side of the GPU bridge: the wgpu device/queue, the
//! color surface that layers are composited onto, and process-level logging.

pub mod device;
pub mod logging;
