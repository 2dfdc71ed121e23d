//! Full-screen triangle passes.
//!
//! Every image-space stage of the chain is a [`FullscreenPass`]: one
//! fragment shader that reads N input textures plus a uniform block and
//! writes one target. The vertex stage is shared (see `shaders/fullscreen.wgsl`)
//! and hands the fragment stage a `uv` in texture space.
//!
//! Bindings in group 0:
//!
//! | Binding   | Resource                  |
//! |-----------|---------------------------|
//! | 0         | uniform block             |
//! | 1..=N     | input textures            |
//! | N + 1     | linear clamp sampler      |

use super::render_target::DEPTH_FORMAT;
use crate::gpu::GpuContext;
use std::marker::PhantomData;

/// Shared vertex stage for every full-screen pass.
pub const FULLSCREEN_VERTEX: &str = include_str!("../shaders/fullscreen.wgsl");

/// Complete module source for a pass: the shared vertex stage followed by
/// `fragment`.
pub fn fullscreen_source(fragment: &str) -> String {
    format!("{FULLSCREEN_VERTEX}\n{fragment}")
}

/// A uniform buffer holding exactly one `T`.
pub struct UniformBuffer<T> {
    buffer: wgpu::Buffer,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> UniformBuffer<T> {
    pub fn new(gpu: &GpuContext, label: &str, value: &T) -> Self {
        use wgpu::util::DeviceExt;

        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        Self {
            buffer,
            _marker: PhantomData,
        }
    }

    pub fn write(&self, gpu: &GpuContext, value: &T) {
        gpu.queue
            .write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Static description of a full-screen pass.
pub struct PassDescriptor<'a> {
    pub label: &'a str,
    /// Fragment stage source; must define `fs(in: VertexOutput)`.
    pub fragment: &'a str,
    /// Number of sampled input textures.
    pub inputs: u32,
    /// Format of the color target this pass writes.
    pub format: wgpu::TextureFormat,
    /// Whether the pass runs with a depth attachment bound.
    pub depth: bool,
}

/// Where a pass writes.
pub struct PassOutput<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: Option<&'a wgpu::TextureView>,
}

impl<'a> PassOutput<'a> {
    pub fn color(color: &'a wgpu::TextureView) -> Self {
        Self { color, depth: None }
    }
}

/// A fragment shader drawn over a full-screen triangle.
pub struct FullscreenPass {
    label: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    inputs: u32,
}

impl FullscreenPass {
    pub fn new(gpu: &GpuContext, desc: &PassDescriptor) -> Self {
        let device = &gpu.device;

        let source = fullscreen_source(desc.fragment);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Shader", desc.label)),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", desc.label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for i in 0..desc.inputs {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1 + i,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + desc.inputs,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Bind Group Layout", desc.label)),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", desc.label)),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Depth is attached but never tested or written.
        let depth_stencil = desc.depth.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline", desc.label)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            label: desc.label.to_string(),
            pipeline,
            bind_group_layout,
            sampler,
            inputs: desc.inputs,
        }
    }

    /// Bind `uniforms` and `inputs` in the layout the pass was created with.
    ///
    /// `inputs` must hold exactly as many views as the pass was created with.
    pub fn bind_group(
        &self,
        gpu: &GpuContext,
        uniforms: &wgpu::Buffer,
        inputs: &[&wgpu::TextureView],
    ) -> wgpu::BindGroup {
        debug_assert_eq!(inputs.len() as u32, self.inputs, "{}", self.label);

        let mut entries = Vec::with_capacity(inputs.len() + 2);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        });
        for (i, view) in inputs.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: 1 + inputs.len() as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", self.label)),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }

    /// Bind and draw in one go, for passes whose inputs change every frame.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        uniforms: &wgpu::Buffer,
        inputs: &[&wgpu::TextureView],
        output: PassOutput,
    ) {
        let bind_group = self.bind_group(gpu, uniforms, inputs);
        self.draw(encoder, &bind_group, output);
    }

    /// Record the pass into `encoder` with a bind group from
    /// [`FullscreenPass::bind_group`].
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        output: PassOutput,
    ) {
        let depth_stencil_attachment =
            output
                .depth
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Parse and validate a WGSL module the way shader module creation would,
/// panicking with the diagnostic on failure.
#[cfg(test)]
pub(crate) fn validate_wgsl(label: &str, source: &str) -> naga::Module {
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    let module = naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|e| panic!("{label}: {}", e.emit_to_string(source)));
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .unwrap_or_else(|e| panic!("{label}: {e:?}"));
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_points(module: &naga::Module) -> Vec<&str> {
        module.entry_points.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn vertex_stage_validates_alone() {
        let module = validate_wgsl("fullscreen", FULLSCREEN_VERTEX);
        assert_eq!(entry_points(&module), ["vs"]);
    }

    #[test]
    fn pass_source_has_both_stages() {
        let fragment = "@fragment\nfn fs(in: VertexOutput) -> @location(0) vec4f {\n    return vec4f(in.uv, 0.0, 1.0);\n}\n";
        let module = validate_wgsl("minimal pass", &fullscreen_source(fragment));
        assert_eq!(entry_points(&module), ["vs", "fs"]);
    }
}
