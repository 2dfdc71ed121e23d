//! Off-screen render targets.

use super::layout::Extent;
use crate::gpu::{GpuContext, INTERMEDIATE_FORMAT};

/// Depth format used by scene slots and the transition target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// An off-screen color target, optionally paired with a depth buffer.
///
/// Targets can be rendered to as a color attachment and sampled by the next
/// pass. The size is explicit; owners call [`RenderTarget::resize`] with the
/// size computed for the current viewport.
pub struct RenderTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used for attachments and shader sampling.
    pub view: wgpu::TextureView,
    depth: Option<DepthBuffer>,
    extent: Extent,
    label: String,
}

struct DepthBuffer {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTarget {
    /// Creates a target of the given size in the intermediate HDR format.
    pub fn new(gpu: &GpuContext, label: &str, extent: Extent, with_depth: bool) -> Self {
        let (texture, view) = create_texture(
            gpu,
            label,
            extent,
            INTERMEDIATE_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let depth = with_depth.then(|| {
            let (texture, view) = create_texture(
                gpu,
                &format!("{label} Depth"),
                extent,
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            );
            DepthBuffer { texture, view }
        });

        Self {
            texture,
            view,
            depth,
            extent,
            label: label.to_string(),
        }
    }

    /// Reallocates the target if `extent` differs from the current size.
    ///
    /// Returns true when a new texture was allocated.
    pub fn resize(&mut self, gpu: &GpuContext, extent: Extent) -> bool {
        if self.extent == extent {
            return false;
        }
        let with_depth = self.depth.is_some();
        let label = std::mem::take(&mut self.label);
        *self = Self::new(gpu, &label, extent, with_depth);
        true
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref().map(|d| &d.view)
    }
}

fn create_texture(
    gpu: &GpuContext,
    label: &str,
    extent: Extent,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
