use anyhow::{Context, Result};

use super::readback::read_texture_rgba8;
use super::{GpuFrame, HostInit};

/// Owns wgpu core objects and the host surface.
///
/// This type is the host rendering context:
/// - creates and stores Instance/Adapter/Device/Queue
/// - owns the color surface texture that frames are drawn into
/// - acquires frames and provides an encoder + view for rendering
///
/// The surface is an ordinary texture, so the context runs without a window
/// (tests, CI, offline compositing).
pub struct HostGpu {
    /// wgpu instance used to create the adapter.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Current surface texture.
    surface: wgpu::Texture,

    /// Surface color format.
    format: wgpu::TextureFormat,

    /// Current drawable size in physical pixels.
    size: (u32, u32),
}

impl HostGpu {
    /// Creates a host GPU context.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: HostInit) -> Result<Self> {
        let HostInit {
            surface_format,
            width,
            height,
            power_preference,
            force_fallback_adapter,
            required_features,
            required_limits,
        } = init;

        anyhow::ensure!(width > 0 && height > 0, "surface has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("nabu host device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface = create_surface_texture(&device, surface_format, width, height);

        log::info!(
            "host GPU ready: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            width,
            height,
            surface_format
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            format: surface_format,
            size: (width, height),
        })
    }

    /// Blocking convenience wrapper around [`HostGpu::new`].
    pub fn headless(init: HostInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    /// Returns the wgpu instance.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Returns the selected adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Recreates the surface after a resize.
    ///
    /// A 0x0 texture cannot be created; in that case only the recorded size is
    /// updated and the previous surface is kept until a usable size arrives.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if width == 0 || height == 0 {
            return;
        }

        let previous = std::mem::replace(
            &mut self.surface,
            create_surface_texture(&self.device, self.format, width, height),
        );
        previous.destroy();
        log::debug!("host surface resized to {width}x{height}");
    }

    /// Acquires the surface texture and creates an encoder.
    pub fn begin_frame(&self) -> GpuFrame {
        let texture = self.surface.clone();
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nabu frame encoder"),
            });

        GpuFrame {
            texture,
            view,
            encoder,
        }
    }

    /// Submits the recorded commands for the given frame.
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        drop(frame.view);
    }

    /// Reads the surface back as tightly packed RGBA8 texels (row-major).
    ///
    /// Blocks until the GPU has finished all previously submitted work.
    pub fn read_pixels(&self) -> Result<Vec<[u8; 4]>> {
        let width = self.surface.width();
        let height = self.surface.height();
        read_texture_rgba8(&self.device, &self.queue, &self.surface, width, height)
    }
}

fn create_surface_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("nabu host surface"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
