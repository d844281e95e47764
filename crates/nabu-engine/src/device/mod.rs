//! Host GPU context.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - owning the color surface texture frames are presented from
//! - acquiring frames and providing encoders/views for rendering
//! - reading surface pixels back to the CPU

mod frame;
mod gpu;
mod init;
mod readback;

pub use frame::GpuFrame;
pub use gpu::HostGpu;
pub use init::HostInit;
pub use readback::read_texture_rgba8;
