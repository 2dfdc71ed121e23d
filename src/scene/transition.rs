//! The transition stage: blends the two active scene slots into one image.
//!
//! The blend is a "fly-eye" distortion. Both maps are displaced by a
//! cosine/sine field, the outgoing map is split into offset color channels,
//! and the two are mixed by progress. At exactly 0 or 1 the matching map is
//! passed through untouched.

use crate::gpu::{GpuContext, INTERMEDIATE_FORMAT};
use crate::pipeline::fullscreen::{FullscreenPass, PassDescriptor, PassOutput, UniformBuffer};
use crate::pipeline::render_target::RenderTarget;
use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

const SHADER: &str = include_str!("../shaders/transition.wgsl");

/// Tunable shape of the transition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionParams {
    /// Displacement amplitude in uv units.
    pub size: f32,
    /// Frequency of the displacement field.
    pub zoom: f32,
    /// Relative offset between the red and blue channels of the outgoing map.
    pub color_separation: f32,
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            size: 0.04,
            zoom: 50.0,
            color_separation: 0.3,
        }
    }
}

/// Uniform block read by `transition.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransitionUniforms {
    pub progress: f32,
    pub size: f32,
    pub zoom: f32,
    pub color_separation: f32,
}

impl TransitionUniforms {
    pub fn new(progress: f32, params: &TransitionParams) -> Self {
        Self {
            progress,
            size: params.size,
            zoom: params.zoom,
            color_separation: params.color_separation,
        }
    }
}

/// Evaluate the transition for one pixel on the CPU.
///
/// Mirrors `transition.wgsl` exactly; `map1` and `map2` stand in for the
/// texture lookups.
pub fn sample_transition<F1, F2>(
    map1: F1,
    map2: F2,
    uv: Vec2,
    progress: f32,
    params: &TransitionParams,
) -> Vec4
where
    F1: Fn(Vec2) -> Vec4,
    F2: Fn(Vec2) -> Vec4,
{
    if progress == 0.0 {
        return map1(uv);
    }
    if progress == 1.0 {
        return map2(uv);
    }

    let inv = 1.0 - progress;
    let disp = params.size * Vec2::new((params.zoom * uv.x).cos(), (params.zoom * uv.y).sin());

    let to = map2(uv + inv * disp);
    let from = Vec4::new(
        map1(uv + progress * disp * (1.0 - params.color_separation)).x,
        map1(uv + progress * disp).y,
        map1(uv + progress * disp * (1.0 + params.color_separation)).z,
        1.0,
    );

    to * progress + from * inv
}

/// GPU side of the transition.
pub struct TransitionStage {
    pass: FullscreenPass,
    uniforms: UniformBuffer<TransitionUniforms>,
    params: TransitionParams,
}

impl TransitionStage {
    pub fn new(gpu: &GpuContext, params: TransitionParams) -> Self {
        let pass = FullscreenPass::new(
            gpu,
            &PassDescriptor {
                label: "Transition Pass",
                fragment: SHADER,
                inputs: 2,
                format: INTERMEDIATE_FORMAT,
                depth: true,
            },
        );
        let uniforms = UniformBuffer::new(
            gpu,
            "Transition Uniforms",
            &TransitionUniforms::new(0.0, &params),
        );
        Self {
            pass,
            uniforms,
            params,
        }
    }

    pub fn params(&self) -> &TransitionParams {
        &self.params
    }

    pub fn set_params(&mut self, params: TransitionParams) {
        self.params = params;
    }

    /// Blend `map1` and `map2` into `target`.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        map1: &wgpu::TextureView,
        map2: &wgpu::TextureView,
        progress: f32,
        target: &RenderTarget,
    ) {
        self.uniforms
            .write(gpu, &TransitionUniforms::new(progress, &self.params));
        self.pass.render(
            gpu,
            encoder,
            self.uniforms.buffer(),
            &[map1, map2],
            PassOutput {
                color: &target.view,
                depth: target.depth_view(),
            },
        );
    }
}
