//! Compositing the offscreen target onto the host surface.
//!
//! A textured quad, drawn with straight-alpha source-over blending, samples the
//! guest's target across the whole destination view.

use crate::error::BridgeError;
use crate::handles::HandleRegistry;
use crate::target::OffscreenTarget;

/// Draws the guest's offscreen target onto a host surface view.
///
/// The sampler and pipeline are created once per destination format. The bind
/// group is rebuilt on every [`blit`](Self::blit) because the offscreen view
/// changes identity whenever the target is recreated.
pub struct BlitCompositor {
    clear_color: wgpu::Color,

    pipeline_format: Option<wgpu::TextureFormat>,
    sampler: Option<wgpu::Sampler>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
}

impl BlitCompositor {
    pub fn new(clear_color: wgpu::Color) -> Self {
        Self {
            clear_color,
            pipeline_format: None,
            sampler: None,
            bind_group_layout: None,
            pipeline: None,
            bind_group: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.sampler.is_some() && self.pipeline.is_some()
    }

    pub fn pipeline_format(&self) -> Option<wgpu::TextureFormat> {
        self.pipeline_format
    }

    /// Creates the sampler and the blit pipeline for `format` if needed.
    pub fn ensure_pipeline(
        &mut self,
        registry: &HandleRegistry,
        format: wgpu::TextureFormat,
    ) -> Result<(), BridgeError> {
        if self.pipeline_format == Some(format) && self.is_ready() {
            return Ok(());
        }

        let device = registry.device()?;

        if self.sampler.is_none() {
            self.sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("nabu blit sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            }));
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nabu blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nabu blit bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nabu blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("nabu blit pipeline"),
            layout: Some(&pipeline_layout),

            // Six vertices generated in the shader, no buffers.
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(source_over_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(previous) = self.pipeline_format {
            log::info!("blit pipeline rebuilt for {format:?} (was {previous:?})");
        } else {
            log::info!("blit pipeline created for {format:?}");
        }

        self.pipeline_format = Some(format);
        self.bind_group = None;
        self.bind_group_layout = Some(bind_group_layout);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Composites `source` over `destination` and submits the pass.
    ///
    /// The destination is cleared to the configured clear color first. Fails
    /// without recording any GPU work if there is no source target or the
    /// pipeline has not been built.
    pub fn blit(
        &mut self,
        registry: &HandleRegistry,
        source: Option<&OffscreenTarget>,
        destination: &wgpu::TextureView,
    ) -> Result<(), BridgeError> {
        let Some(source) = source else {
            return Err(BridgeError::NotInitialized {
                what: "offscreen target",
            });
        };
        let (Some(sampler), Some(layout)) = (self.sampler.as_ref(), self.bind_group_layout.as_ref())
        else {
            return Err(BridgeError::NotInitialized {
                what: "blit pipeline",
            });
        };

        let device = registry.device()?;
        let queue = registry.queue()?;

        // Drop last frame's bind group before building one against the current view.
        self.bind_group = None;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nabu blit bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(BridgeError::NotInitialized {
                what: "blit pipeline",
            });
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("nabu blit encoder"),
        });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("nabu blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: destination,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.draw(0..6, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
        self.bind_group = Some(bind_group);
        Ok(())
    }

    pub fn release_bind_group(&mut self) -> bool {
        self.bind_group.take().is_some()
    }

    pub fn release_pipeline(&mut self) -> bool {
        self.pipeline_format = None;
        self.bind_group_layout = None;
        self.pipeline.take().is_some()
    }

    pub fn release_sampler(&mut self) -> bool {
        self.sampler.take().is_some()
    }

    /// Drops every GPU object: bind group, then pipeline, then sampler.
    pub fn release(&mut self) {
        self.release_bind_group();
        self.release_pipeline();
        self.release_sampler();
    }
}

impl Default for BlitCompositor {
    fn default() -> Self {
        Self::new(wgpu::Color::BLACK)
    }
}

/// Straight-alpha source-over.
fn source_over_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}
