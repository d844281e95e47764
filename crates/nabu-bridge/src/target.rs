//! Offscreen target management.
//!
//! The bridge owns one color texture + view that the guest renders into and the
//! compositor samples from. The pair is created lazily, recreated whenever the
//! requested size changes, and always installed or released together.

use crate::error::BridgeError;
use crate::handles::HandleRegistry;

/// Color format used for offscreen targets unless configured otherwise.
pub const DEFAULT_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A host-owned color texture and its full view.
pub struct OffscreenTarget {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    generation: u64,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl OffscreenTarget {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Allocation counter; changes every time the texture/view pair is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Result of [`OffscreenTargetManager::ensure_target`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TargetStatus {
    /// A target of the requested size already existed.
    Reused,
    /// First allocation.
    Created,
    /// A target of a different size was released and replaced.
    Recreated,
}

/// Creates, recreates and releases the offscreen target.
pub struct OffscreenTargetManager {
    format: wgpu::TextureFormat,
    current: Option<OffscreenTarget>,
    generation: u64,
}

impl OffscreenTargetManager {
    pub fn new(format: wgpu::TextureFormat) -> Self {
        Self {
            format,
            current: None,
            generation: 0,
        }
    }

    /// Makes sure a target of `width` x `height` exists.
    ///
    /// The request is validated against the device before anything is
    /// released, so a failed call leaves the previous target untouched.
    /// On success the new texture/view are published into `registry`.
    pub fn ensure_target(
        &mut self,
        registry: &HandleRegistry,
        width: u32,
        height: u32,
    ) -> Result<TargetStatus, BridgeError> {
        if self.size() == Some((width, height)) {
            return Ok(TargetStatus::Reused);
        }

        let device = registry.device()?;
        validate_size(&device, width, height)?;

        let replaced = self.release(registry);

        self.generation += 1;
        let target = self.allocate(&device, width, height);
        registry.publish_target(&target)?;
        self.current = Some(target);

        log::info!(
            "offscreen target {}x{} {:?} ready (generation {})",
            width,
            height,
            self.format,
            self.generation
        );

        Ok(if replaced {
            TargetStatus::Recreated
        } else {
            TargetStatus::Created
        })
    }

    pub fn current(&self) -> Option<&OffscreenTarget> {
        self.current.as_ref()
    }

    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.current.as_ref().map(OffscreenTarget::texture)
    }

    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.current.as_ref().map(OffscreenTarget::view)
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(OffscreenTarget::size)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Withdraws the current pair from `registry` and destroys the texture.
    ///
    /// Returns `true` if a target existed.
    pub fn release(&mut self, registry: &HandleRegistry) -> bool {
        let Some(target) = self.current.take() else {
            return false;
        };

        registry.withdraw_target();
        let OffscreenTarget { texture, view, .. } = target;
        drop(view);
        texture.destroy();
        true
    }

    fn allocate(&self, device: &wgpu::Device, width: u32, height: u32) -> OffscreenTarget {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("nabu offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        OffscreenTarget {
            width,
            height,
            format: self.format,
            generation: self.generation,
            texture,
            view,
        }
    }
}

impl Default for OffscreenTargetManager {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_FORMAT)
    }
}

fn validate_size(device: &wgpu::Device, width: u32, height: u32) -> Result<(), BridgeError> {
    check_dimensions(width, height, device.limits().max_texture_dimension_2d)
}

fn check_dimensions(width: u32, height: u32, max_dimension: u32) -> Result<(), BridgeError> {
    if width == 0 || height == 0 {
        return Err(BridgeError::Allocation {
            what: "offscreen target",
            reason: format!("requested size {width}x{height} has a zero dimension"),
        });
    }
    if width > max_dimension || height > max_dimension {
        return Err(BridgeError::Allocation {
            what: "offscreen target",
            reason: format!(
                "requested size {width}x{height} exceeds the device limit of {max_dimension}"
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            check_dimensions(0, 600, 8192),
            Err(BridgeError::Allocation { .. })
        ));
        assert!(matches!(
            check_dimensions(800, 0, 8192),
            Err(BridgeError::Allocation { .. })
        ));
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let err = check_dimensions(4096, 16, 2048).unwrap_err();
        assert!(err.to_string().contains("exceeds the device limit of 2048"));
    }

    #[test]
    fn dimensions_at_the_limit_are_accepted() {
        assert!(check_dimensions(2048, 2048, 2048).is_ok());
        assert!(check_dimensions(1, 1, 2048).is_ok());
    }

    #[test]
    fn manager_starts_empty() {
        let manager = OffscreenTargetManager::default();
        assert!(manager.current().is_none());
        assert!(manager.view().is_none());
        assert_eq!(manager.size(), None);
        assert_eq!(manager.format(), DEFAULT_TARGET_FORMAT);
    }

    #[test]
    fn ensure_without_handles_reports_not_initialized() {
        let registry = HandleRegistry::new();
        let mut manager = OffscreenTargetManager::default();
        assert!(matches!(
            manager.ensure_target(&registry, 64, 64),
            Err(BridgeError::NotInitialized { .. })
        ));
        assert!(manager.current().is_none());
    }

    #[test]
    fn release_without_target_is_a_no_op() {
        let registry = HandleRegistry::new();
        let mut manager = OffscreenTargetManager::default();
        assert!(!manager.release(&registry));
    }
}
