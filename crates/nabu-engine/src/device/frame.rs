/// Represents a single acquired frame.
///
/// This object is short-lived. Everything recorded into `encoder` is submitted
/// by [`HostGpu::submit`](super::HostGpu::submit).
pub struct GpuFrame {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
