//! The global `gpu` object scripts draw through.
//!
//! Handles cross into JavaScript as plain numbers; `0` means "not available".
//! Every accessor resolves through the layer's [`GuestGpu`], so numbers kept
//! from an earlier frame stop working once the target is recreated or the
//! layer is disposed.

use nabu_bridge::{BridgeError, GuestGpu, RawHandle};
use nabu_engine::logging::GUEST_LOG_TARGET;
use rquickjs::{Ctx, Function, Object};

/// Installs `gpu` and `print` into the globals of `ctx`.
pub(crate) fn install(ctx: &Ctx<'_>, gpu: GuestGpu) -> rquickjs::Result<()> {
    let object = Object::new(ctx.clone())?;

    let g = gpu.clone();
    object.set(
        "device",
        Function::new(ctx.clone(), move || handle_number(g.device_handle()))?,
    )?;
    let g = gpu.clone();
    object.set(
        "queue",
        Function::new(ctx.clone(), move || handle_number(g.queue_handle()))?,
    )?;
    let g = gpu.clone();
    object.set(
        "instance",
        Function::new(ctx.clone(), move || optional_handle_number(g.instance_handle()))?,
    )?;
    let g = gpu.clone();
    object.set(
        "adapter",
        Function::new(ctx.clone(), move || optional_handle_number(g.adapter_handle()))?,
    )?;
    let g = gpu.clone();
    object.set(
        "texture",
        Function::new(ctx.clone(), move || handle_number(g.texture_handle()))?,
    )?;
    let g = gpu.clone();
    object.set(
        "view",
        Function::new(ctx.clone(), move || handle_number(g.view_handle()))?,
    )?;
    let g = gpu.clone();
    object.set(
        "ready",
        Function::new(ctx.clone(), move || g.is_initialized())?,
    )?;
    let g = gpu.clone();
    object.set(
        "size",
        Function::new(ctx.clone(), move || -> Vec<u32> {
            match g.target_size() {
                Ok((w, h)) => vec![w, h],
                Err(_) => vec![0, 0],
            }
        })?,
    )?;
    let g = gpu;
    object.set(
        "clear",
        Function::new(
            ctx.clone(),
            move |view: f64, r: f64, green: f64, b: f64, a: f64| -> bool {
                let color = wgpu::Color { r, g: green, b, a };
                match clear_view(&g, handle_from_number(view), color) {
                    Ok(()) => true,
                    Err(err) => {
                        log::warn!("gpu.clear failed: {err}");
                        false
                    }
                }
            },
        )?,
    )?;

    let globals = ctx.globals();
    globals.set("gpu", object)?;
    globals.set(
        "print",
        Function::new(ctx.clone(), |msg: String| {
            log::info!(target: GUEST_LOG_TARGET, "{msg}");
        })?,
    )?;
    Ok(())
}

/// Clears the texture view named by `view` and submits the pass on the shared queue.
pub fn clear_view(gpu: &GuestGpu, view: RawHandle, color: wgpu::Color) -> Result<(), BridgeError> {
    let device = gpu.device(gpu.device_handle()?)?;
    let queue = gpu.queue(gpu.queue_handle()?)?;
    let view = gpu.view(view)?;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("nabu script clear encoder"),
    });
    {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("nabu script clear pass"),
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

// Serials stay far below 2^53, so f64 carries handles exactly.
fn handle_number(handle: Result<RawHandle, BridgeError>) -> f64 {
    handle.map_or(0.0, |h| h.to_bits() as f64)
}

fn optional_handle_number(handle: Result<Option<RawHandle>, BridgeError>) -> f64 {
    match handle {
        Ok(Some(h)) => h.to_bits() as f64,
        _ => 0.0,
    }
}

fn handle_from_number(value: f64) -> RawHandle {
    if value.is_finite() && value >= 1.0 {
        RawHandle::from_bits(value as usize)
    } else {
        RawHandle::from_bits(0)
    }
}
