use crate::gpu::GpuContext;
use image::RgbaImage;

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Upload an already decoded image.
    pub fn from_image(gpu: &GpuContext, image: &RgbaImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(gpu, image.as_raw(), width, height, label)
    }
}

/// Generate a dark, pitted metal surface.
///
/// Used when a section names no texture. Large cells give the surface a
/// hammered look and sparse dark pits break up the highlights.
pub fn pitted_metal(size: u32, seed: u32) -> RgbaImage {
    let size = size.max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        let cell = hash(x / 8, y / 8, seed) % 24;
        let grain = hash(x, y, seed.wrapping_add(7919)) % 12;
        let pit = hash(x / 2, y / 2, seed.wrapping_add(104_729)) % 29 == 0;

        let base = 120 + cell as i32 + grain as i32 - 6;
        let value = if pit { base - 70 } else { base }.clamp(0, 255) as u8;
        // Slightly cool tint.
        image::Rgba([value, value, value.saturating_add(6), 255])
    })
}

/// Integer hash for procedural generation.
fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitted_metal_is_deterministic() {
        assert_eq!(pitted_metal(32, 5), pitted_metal(32, 5));
        assert_ne!(pitted_metal(32, 5), pitted_metal(32, 6));
    }

    #[test]
    fn pitted_metal_is_opaque_and_has_pits() {
        let img = pitted_metal(64, 1);
        assert!(img.pixels().all(|p| p[3] == 255));
        let darkest = img.pixels().map(|p| p[0]).min().unwrap_or(255);
        let brightest = img.pixels().map(|p| p[0]).max().unwrap_or(0);
        assert!(darkest < 80, "expected pits, darkest was {darkest}");
        assert!(brightest > 110);
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(pitted_metal(0, 0).dimensions(), (1, 1));
    }
}
