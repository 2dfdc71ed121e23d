//! Bloom parameters and the pure maths behind the blur and composite passes.

use super::layout::{Extent, MIP_COUNT};
use serde::{Deserialize, Serialize};

/// Base weight of each mip before strength and radius are applied.
const BASE_FACTORS: [f32; MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Largest kernel radius the blur shader can hold.
pub const MAX_KERNEL_RADIUS: usize = 12;

/// Bright-pass parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LuminositySettings {
    /// Luma below which pixels contribute nothing.
    pub threshold: f32,
    /// Width of the smooth ramp above the threshold.
    pub smoothing: f32,
}

impl Default for LuminositySettings {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            smoothing: 1.0,
        }
    }
}

/// Bloom composite parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub strength: f32,
    /// 0 favours the fine mips, 1 the coarse ones.
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 0.3,
            radius: 0.75,
        }
    }
}

/// Per-mip weights used by the bloom composite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomFactors(pub [f32; MIP_COUNT]);

impl BloomFactors {
    /// `strength * lerp(base, 1.2 - base, radius)` for each mip.
    pub fn compute(settings: &BloomSettings) -> Self {
        let mut factors = BASE_FACTORS;
        for factor in &mut factors {
            let base = *factor;
            *factor = settings.strength * lerp(base, 1.2 - base, settings.radius);
        }
        Self(factors)
    }

    /// Pack into the `array<vec4f, 2>` layout the composite shader reads.
    pub fn packed(&self) -> [[f32; 4]; 2] {
        let f = self.0;
        [[f[0], f[1], f[2], f[3]], [f[4], 0.0, 0.0, 0.0]]
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn gaussian_pdf(x: f32, sigma: f32) -> f32 {
    0.39894 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma
}

/// Normalised one-sided gaussian weights with `sigma = radius`.
///
/// Entry 0 is the centre tap, entries `1..radius` are applied to both sides,
/// so `w[0] + 2 * sum(w[1..])` is 1.
pub fn kernel_weights(radius: u32) -> Vec<f32> {
    let radius = (radius as usize).clamp(1, MAX_KERNEL_RADIUS);
    let sigma = radius as f32;

    let mut weights: Vec<f32> = (0..radius).map(|i| gaussian_pdf(i as f32, sigma)).collect();
    let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Blur direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    pub fn vector(self) -> [f32; 2] {
        match self {
            BlurDirection::Horizontal => [1.0, 0.0],
            BlurDirection::Vertical => [0.0, 1.0],
        }
    }
}

/// Uniforms for one separable blur pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    pub direction: [f32; 2],
    /// One over the resolution of the mip being written.
    pub inv_size: [f32; 2],
    pub weights: [[f32; 4]; 3],
    pub taps: u32,
    pub _pad: [u32; 3],
}

impl BlurUniforms {
    pub fn new(direction: BlurDirection, resolution: Extent, radius: u32) -> Self {
        let weights = kernel_weights(radius);
        let mut packed = [[0.0f32; 4]; 3];
        for (i, w) in weights.iter().enumerate() {
            packed[i / 4][i % 4] = *w;
        }
        Self {
            direction: direction.vector(),
            inv_size: [1.0 / resolution.width as f32, 1.0 / resolution.height as f32],
            weights: packed,
            taps: weights.len() as u32,
            _pad: [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::KERNEL_RADII;

    #[test]
    fn default_factors_match_formula() {
        let factors = BloomFactors::compute(&BloomSettings::default());
        let expected = [0.12, 0.15, 0.18, 0.21, 0.24];
        for (got, want) in factors.0.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{got} != {want}");
        }
    }

    #[test]
    fn radius_endpoints() {
        let fine = BloomFactors::compute(&BloomSettings {
            strength: 1.0,
            radius: 0.0,
        });
        assert_eq!(fine.0, BASE_FACTORS);

        let coarse = BloomFactors::compute(&BloomSettings {
            strength: 2.0,
            radius: 1.0,
        });
        for (got, base) in coarse.0.iter().zip(BASE_FACTORS) {
            assert!((got - 2.0 * (1.2 - base)).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_strength_disables_bloom() {
        let factors = BloomFactors::compute(&BloomSettings {
            strength: 0.0,
            radius: 0.4,
        });
        assert!(factors.0.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn packing_keeps_order() {
        let factors = BloomFactors([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(factors.packed(), [[1.0, 2.0, 3.0, 4.0], [5.0, 0.0, 0.0, 0.0]]);
    }

    #[test]
    fn kernels_are_normalised() {
        for radius in KERNEL_RADII {
            let w = kernel_weights(radius);
            assert_eq!(w.len(), radius as usize);
            let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
            assert!((total - 1.0).abs() < 1e-5);
            assert!(w.windows(2).all(|pair| pair[0] >= pair[1]));
        }
    }

    #[test]
    fn blur_uniforms_use_mip_resolution() {
        let u = BlurUniforms::new(BlurDirection::Vertical, Extent::new(64, 32), 7);
        assert_eq!(u.direction, [0.0, 1.0]);
        assert_eq!(u.inv_size, [1.0 / 64.0, 1.0 / 32.0]);
        assert_eq!(u.taps, 7);
        assert_eq!(u.weights[2], [0.0; 4]);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 80);
    }
}
