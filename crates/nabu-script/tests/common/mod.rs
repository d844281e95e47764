#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard};

use nabu_bridge::{FrameOutcome, GuestLayer, HostCtx};
use nabu_engine::device::{HostGpu, HostInit};
use nabu_engine::logging::{LoggingConfig, init_logging};

static GPU_LOCK: Mutex<()> = Mutex::new(());

pub fn lock_gpu() -> MutexGuard<'static, ()> {
    GPU_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Headless host, or `None` (with a skip message) when there is no adapter.
pub fn gpu(test: &str, width: u32, height: u32) -> Option<HostGpu> {
    init_logging(LoggingConfig::for_tests());
    let init = HostInit {
        width,
        height,
        ..HostInit::default()
    };
    match HostGpu::headless(init) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping {test}: {err:#}");
            None
        }
    }
}

pub fn host_ctx(gpu: &HostGpu) -> HostCtx<'_> {
    HostCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), gpu.size())
}

pub fn tick(layer: &mut GuestLayer, gpu: &HostGpu) -> FrameOutcome {
    let frame = gpu.begin_frame();
    let outcome = layer.tick(&host_ctx(gpu), &frame.view);
    gpu.submit(frame);
    outcome
}

pub fn assert_all_near(pixels: &[[u8; 4]], expected: [u8; 4]) {
    for (i, px) in pixels.iter().enumerate() {
        let close = px
            .iter()
            .zip(expected.iter())
            .all(|(a, b)| a.abs_diff(*b) <= 1);
        assert!(close, "pixel {i} is {px:?}, expected {expected:?}");
    }
}
