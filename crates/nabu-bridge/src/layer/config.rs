use crate::target::DEFAULT_TARGET_FORMAT;

/// Per-layer settings.
///
/// Only the target size comes from the host (its surface size); everything
/// here has a fixed default.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    /// Name used in log messages.
    pub label: String,
    /// Name of the guest's per-frame entry point.
    pub entry_point: String,
    /// Color format of the offscreen target.
    pub target_format: wgpu::TextureFormat,
    /// Color the surface is cleared to before the target is composited.
    pub clear_color: wgpu::Color,
    /// Recreate the target whenever the host surface changes size.
    ///
    /// When `false` the target keeps the size it was created with and is
    /// stretched onto the surface.
    pub track_surface_size: bool,
}

impl LayerConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn with_clear_color(mut self, clear_color: wgpu::Color) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_track_surface_size(mut self, track: bool) -> Self {
        self.track_surface_size = track;
        self
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            label: "guest".to_string(),
            entry_point: "render_frame".to_string(),
            target_format: DEFAULT_TARGET_FORMAT,
            clear_color: wgpu::Color::BLACK,
            track_surface_size: true,
        }
    }
}
