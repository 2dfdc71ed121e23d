//! Forward renderer shared by every scene slot.
//!
//! Three bind groups:
//! - **Group 0**: camera uniforms, written once per frame
//! - **Group 1**: model uniforms, one dynamic-offset block per slot
//! - **Group 2**: material uniforms, base color map and sampler
//!
//! Each slot owns its own [`ModelBlock`] so two slots rendered into the same
//! command encoder never overwrite each other's transforms.

use super::content::DrawItem;
use crate::camera::Camera;
use crate::gpu::{GpuContext, INTERMEDIATE_FORMAT};
use crate::mesh::Vertex3d;
use crate::pipeline::render_target::{DEPTH_FORMAT, RenderTarget};
use crate::texture::Texture;
use glam::Mat4;

const SHADER: &str = include_str!("../shaders/scene.wgsl");

/// Upper bound on draws per slot per frame.
pub const MAX_DRAWS: usize = 16;

/// Scene background `#0e0e0e`, in linear space.
pub const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.0044,
    g: 0.0044,
    b: 0.0044,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub time: f32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of `model`, for normals under non-uniform scale.
    pub normal_matrix: [[f32; 4]; 4],
}

impl ModelUniforms {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniforms {
    color: [f32; 4],
    roughness: f32,
    metalness: f32,
    _pad: [f32; 2],
}

/// Surface parameters of a material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialParams {
    /// Linear RGBA multiplier applied to the color map.
    pub color: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: [0.35, 0.35, 0.35, 1.0],
            roughness: 0.7,
            metalness: 0.6,
        }
    }
}

/// A textured material ready to bind at group 2.
pub struct Material {
    #[allow(dead_code)]
    texture: Texture,
    #[allow(dead_code)]
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Per-slot model uniforms addressed by dynamic offset.
pub struct ModelBlock {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
}

/// Renders draw lists into scene slot targets.
pub struct SceneRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    model_bind_group_layout: wgpu::BindGroupLayout,
    material_bind_group_layout: wgpu::BindGroupLayout,
    model_stride: u64,
}

impl SceneRenderer {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Camera Bind Group Layout"),
                entries: &[uniform_entry(0, false)],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Model Bind Group Layout"),
                entries: &[uniform_entry(0, true)],
            });

        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Material Bind Group Layout"),
                entries: &[
                    uniform_entry(0, false),
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &model_bind_group_layout,
                &material_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: INTERMEDIATE_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let model_stride = align_to(std::mem::size_of::<ModelUniforms>() as u64, alignment);

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            model_bind_group_layout,
            material_bind_group_layout,
            model_stride,
        }
    }

    /// Allocate the model uniform block for one slot.
    pub fn create_model_block(&self, gpu: &GpuContext, label: &str) -> ModelBlock {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: self.model_stride * MAX_DRAWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.model_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });
        ModelBlock {
            buffer,
            bind_group,
            stride: self.model_stride,
        }
    }

    /// Wrap a texture into a material.
    pub fn create_material(&self, gpu: &GpuContext, texture: Texture, params: MaterialParams) -> Material {
        use wgpu::util::DeviceExt;

        let uniforms = MaterialUniforms {
            color: params.color,
            roughness: params.roughness,
            metalness: params.metalness,
            _pad: [0.0; 2],
        };
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Material Uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Material Bind Group"),
            layout: &self.material_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });
        Material {
            texture,
            buffer,
            bind_group,
        }
    }

    /// Upload the shared camera. Call once per frame before any slot renders.
    pub fn write_camera(&self, gpu: &GpuContext, camera: &Camera, time: f32) {
        let uniforms = CameraUniforms {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            time,
        };
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Clear `target` to the background and draw `items` into it.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTarget,
        block: &ModelBlock,
        items: &[DrawItem],
    ) {
        if items.len() > MAX_DRAWS {
            log::warn!("dropping {} draws over the per-slot limit", items.len() - MAX_DRAWS);
        }
        let items = &items[..items.len().min(MAX_DRAWS)];

        for (i, item) in items.iter().enumerate() {
            let uniforms = ModelUniforms::new(item.model);
            gpu.queue
                .write_buffer(&block.buffer, i as u64 * block.stride, bytemuck::bytes_of(&uniforms));
        }

        let depth_stencil_attachment =
            target
                .depth_view()
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(BACKGROUND),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for (i, item) in items.iter().enumerate() {
            let offset = (i as u64 * block.stride) as u32;
            pass.set_bind_group(1, &block.bind_group, &[offset]);
            pass.set_bind_group(2, &item.material.bind_group, &[]);
            pass.set_vertex_buffer(0, item.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(item.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..item.mesh.index_count, 0, 0..1);
        }
    }
}

fn uniform_entry(binding: u32, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: None,
        },
        count: None,
    }
}

fn align_to(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_shader_validates() {
        let module = crate::pipeline::fullscreen::validate_wgsl("scene", SHADER);
        let names: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["vs", "fs"]);
    }

    #[test]
    fn uniform_sizes_match_shader() {
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 80);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 128);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 32);
    }

    #[test]
    fn model_stride_respects_alignment() {
        assert_eq!(align_to(128, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(300, 256), 512);
        assert_eq!(align_to(128, 0), 128);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(glam::Vec3::new(0.5, 1.0, 0.5));
        let uniforms = ModelUniforms::new(model);
        let normal = Mat4::from_cols_array_2d(&uniforms.normal_matrix);
        let n = normal.transform_vector3(glam::Vec3::X);
        assert!((n - glam::Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
    }
}
