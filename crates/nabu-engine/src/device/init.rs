/// Initialization parameters for the host GPU context.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct HostInit {
    /// Color format of the host surface.
    ///
    /// Layers composite into this format; it must have a 4-byte texel for
    /// pixel readback.
    pub surface_format: wgpu::TextureFormat,

    /// Initial surface width in physical pixels.
    pub width: u32,

    /// Initial surface height in physical pixels.
    pub height: u32,

    /// Adapter power preference.
    pub power_preference: wgpu::PowerPreference,

    /// Request a software/fallback adapter.
    ///
    /// Useful for CI machines without a hardware GPU.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for HostInit {
    fn default() -> Self {
        Self {
            surface_format: wgpu::TextureFormat::Rgba8Unorm,
            width: 800,
            height: 600,
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
        }
    }
}
