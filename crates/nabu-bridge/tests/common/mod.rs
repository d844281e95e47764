#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};

use nabu_bridge::{BridgeError, FrameRenderer, GuestError, GuestGpu, GuestRuntime, HostCtx};
use nabu_engine::device::{HostGpu, HostInit};
use nabu_engine::logging::{LoggingConfig, init_logging};

static GPU_LOCK: Mutex<()> = Mutex::new(());

/// 0.2 / 0.4 / 0.8 map exactly onto 51 / 102 / 204 in a unorm target.
pub const FILL: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.4,
    b: 0.8,
    a: 1.0,
};
pub const FILL_RGBA8: [u8; 4] = [51, 102, 204, 255];

/// Serializes GPU tests within one test binary.
pub fn lock_gpu() -> MutexGuard<'static, ()> {
    GPU_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Creates a headless host, or returns `None` (and logs a skip) without an adapter.
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
        .with_instance(gpu.instance())
        .with_adapter(gpu.adapter())
}

/// Clears the published target view to `color` through the guest-side view.
pub fn clear_target(gpu: &GuestGpu, color: wgpu::Color) -> Result<(), BridgeError> {
    let device = gpu.device(gpu.device_handle()?)?;
    let queue = gpu.queue(gpu.queue_handle()?)?;
    let view = gpu.view(gpu.view_handle()?)?;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("test guest encoder"),
    });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test guest clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
    queue.submit(std::iter::once(encoder.finish()));
    Ok(())
}

/// Counters shared between a test and its [`SolidFill`] guest.
#[derive(Clone, Default)]
pub struct Calls {
    pub renders: Rc<Cell<u32>>,
    pub cleanups: Rc<Cell<u32>>,
    pub attached: Rc<Cell<bool>>,
}

/// Guest that fills the target with one color every frame.
pub struct SolidFill {
    pub color: wgpu::Color,
    /// Number of lookups that report the entry point as missing.
    pub ready_after: u32,
    /// Render call (1-based) that raises instead of drawing.
    pub fail_on: Option<u32>,
    /// Render call (1-based) that reports the entry point as gone.
    pub unavailable_on: Option<u32>,
    pub calls: Calls,
    lookups: u32,
}

impl SolidFill {
    pub fn new(color: wgpu::Color) -> (Self, Calls) {
        let calls = Calls::default();
        let guest = Self {
            color,
            ready_after: 0,
            fail_on: None,
            unavailable_on: None,
            calls: calls.clone(),
            lookups: 0,
        };
        (guest, calls)
    }
}

impl GuestRuntime for SolidFill {
    fn attach(&mut self, _gpu: GuestGpu) {
        self.calls.attached.set(true);
    }

    fn resolve(
        &mut self,
        _entry_point: &str,
    ) -> Result<Option<Box<dyn FrameRenderer>>, GuestError> {
        self.lookups += 1;
        if self.lookups <= self.ready_after {
            return Ok(None);
        }

        let color = self.color;
        let fail_on = self.fail_on;
        let unavailable_on = self.unavailable_on;
        let renders = self.calls.renders.clone();
        Ok(Some(Box::new(move |gpu: &GuestGpu| -> Result<bool, GuestError> {
            renders.set(renders.get() + 1);
            if unavailable_on == Some(renders.get()) {
                return Err(GuestError::Unavailable {
                    entry_point: "render_frame".into(),
                });
            }
            if fail_on == Some(renders.get()) {
                return Err(GuestError::Raised {
                    message: "synthetic guest failure".into(),
                });
            }
            clear_target(gpu, color)?;
            Ok(true)
        })))
    }

    fn cleanup(&mut self) {
        self.calls.cleanups.set(self.calls.cleanups.get() + 1);
    }
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
