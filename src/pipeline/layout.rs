//! Render target sizing.
//!
//! Every target size the chain uses is derived here from one [`Viewport`],
//! so a resize can compute the whole layout before touching the GPU.

/// Number of bloom blur mips.
pub const MIP_COUNT: usize = 5;

/// Gaussian kernel radius of each blur mip, finest first.
pub const KERNEL_RADII: [u32; MIP_COUNT] = [3, 5, 7, 9, 11];

/// Viewport in logical pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub dpr: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, dpr: f32) -> Self {
        Self { width, height, dpr }
    }

    /// Build a viewport from a physical size and the window scale factor.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let dpr = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor as f32
        } else {
            1.0
        };
        Self {
            width: width as f32 / dpr,
            height: height as f32 / dpr,
            dpr,
        }
    }

    /// Physical pixel size, `round(size * dpr)`, never smaller than 1×1.
    pub fn physical(&self) -> Extent {
        Extent::new(scale_dim(self.width, self.dpr), scale_dim(self.height, self.dpr))
    }
}

fn scale_dim(size: f32, dpr: f32) -> u32 {
    let scaled = (size * dpr).round();
    if scaled.is_finite() && scaled >= 1.0 {
        scaled as u32
    } else {
        1
    }
}

/// A 2D size in physical pixels. Both dimensions are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Half the size in each dimension, rounding down and clamping to 1.
    pub fn half(self) -> Self {
        Self::new(self.width / 2, self.height / 2)
    }

    pub fn as_vec2(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// Largest power of two less than or equal to `value`, or 1 for 0.
pub fn floor_power_of_two(value: u32) -> u32 {
    if value == 0 {
        1
    } else {
        1 << (31 - value.leading_zeros())
    }
}

/// Sizes of every post-processing target for one viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetLayout {
    /// Transition and anti-alias targets, and every scene slot.
    pub full: Extent,
    /// Bright-pass target; also the size of mip 0.
    pub bright: Extent,
    /// Horizontal and vertical blur targets per mip.
    pub mips: [Extent; MIP_COUNT],
}

impl TargetLayout {
    /// Compute the layout for a viewport.
    ///
    /// The bloom chain starts at half the power-of-two floor of the full size
    /// and halves per mip, which keeps every mip an exact half of the one
    /// before it until the 1 pixel clamp kicks in.
    pub fn compute(viewport: &Viewport) -> Self {
        let full = viewport.physical();
        let bright = Extent::new(
            floor_power_of_two(full.width) / 2,
            floor_power_of_two(full.height) / 2,
        );

        let mut mips = [bright; MIP_COUNT];
        for i in 1..MIP_COUNT {
            mips[i] = mips[i - 1].half();
        }

        Self { full, bright, mips }
    }

    /// Every extent in the layout, full size first.
    pub fn extents(&self) -> impl Iterator<Item = Extent> + '_ {
        [self.full, self.bright].into_iter().chain(self.mips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_power_of_two_values() {
        assert_eq!(floor_power_of_two(0), 1);
        assert_eq!(floor_power_of_two(1), 1);
        assert_eq!(floor_power_of_two(800), 512);
        assert_eq!(floor_power_of_two(1024), 1024);
        assert_eq!(floor_power_of_two(u32::MAX), 1 << 31);
    }

    #[test]
    fn layout_for_800x600() {
        let layout = TargetLayout::compute(&Viewport::new(800.0, 600.0, 1.0));
        assert_eq!(layout.full, Extent::new(800, 600));
        assert_eq!(layout.bright, Extent::new(256, 256));
        assert_eq!(
            layout.mips,
            [
                Extent::new(256, 256),
                Extent::new(128, 128),
                Extent::new(64, 64),
                Extent::new(32, 32),
                Extent::new(16, 16),
            ]
        );
    }

    #[test]
    fn dpr_scales_and_rounds() {
        let layout = TargetLayout::compute(&Viewport::new(1280.0, 720.0, 1.5));
        assert_eq!(layout.full, Extent::new(1920, 1080));
        assert_eq!(layout.bright, Extent::new(512, 512));

        let odd = Viewport::new(333.0, 101.0, 1.25).physical();
        assert_eq!(odd, Extent::new(416, 126));
    }

    #[test]
    fn tiny_viewport_clamps_every_target() {
        let layout = TargetLayout::compute(&Viewport::new(1.0, 1.0, 1.0));
        assert!(layout.extents().all(|e| e == Extent::new(1, 1)));

        let zero = TargetLayout::compute(&Viewport::new(0.0, -5.0, 0.0));
        assert!(zero.extents().all(|e| e.width >= 1 && e.height >= 1));
    }

    #[test]
    fn from_physical_round_trips() {
        let viewport = Viewport::from_physical(2560, 1440, 2.0);
        assert_eq!(viewport.width, 1280.0);
        assert_eq!(viewport.physical(), Extent::new(2560, 1440));

        let bogus = Viewport::from_physical(640, 480, 0.0);
        assert_eq!(bogus.dpr, 1.0);
    }
}
