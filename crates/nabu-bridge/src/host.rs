/// Host-facing frame context (device/queue + surface description).
///
/// Built by the host once per frame and handed to [`GuestLayer::tick`](crate::GuestLayer::tick).
/// This is intentionally small and stable.
#[derive(Clone, Copy)]
pub struct HostCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub instance: Option<&'a wgpu::Instance>,
    pub adapter: Option<&'a wgpu::Adapter>,
    pub surface_format: wgpu::TextureFormat,
    /// Current surface size in physical pixels.
    pub surface_size: (u32, u32),
}

impl<'a> HostCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
    ) -> Self {
        Self {
            device,
            queue,
            instance: None,
            adapter: None,
            surface_format,
            surface_size,
        }
    }

    /// Shares the instance with the guest as well.
    #[inline]
    pub fn with_instance(mut self, instance: &'a wgpu::Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Shares the adapter with the guest as well.
    #[inline]
    pub fn with_adapter(mut self, adapter: &'a wgpu::Adapter) -> Self {
        self.adapter = Some(adapter);
        self
    }
}
