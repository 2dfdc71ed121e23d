//! Percentage-closer soft shadows.
//!
//! [`ShadowSampler`] estimates how lit a receiver is from a shadow depth map
//! in three steps: a blocker search averages the depth of occluders near
//! the receiver, the parallel-plane approximation turns that into a
//! penumbra width, and a percentage-closer filter of that width gives the
//! final factor. All three use a Poisson-like spiral of sample offsets
//! rotated per shading point.
//!
//! The same policy is available as a WGSL chunk through
//! [`ShadowSampler::wgsl`], with the configuration baked in as constants,
//! for shaders that sample a real shadow map.
//!
//! Depths are eye-space distances from the light, so they live on the same
//! scale as [`ShadowConfig::near_plane`].

use glam::Vec2;
use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::fmt::Write as _;
use std::ops::Deref;

/// Returned by [`ShadowSampler::find_blocker`] when nothing occludes the receiver.
pub const NO_BLOCKER: f32 = -1.0;

/// Fixed PCSS configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Size of the area light in world units.
    pub light_world_size: f32,
    /// Width of the light's orthographic frustum in world units.
    pub light_frustum_width: f32,
    pub near_plane: f32,
    pub samples: u32,
    /// Turns the spiral makes over all samples.
    pub rings: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            light_world_size: 0.005,
            light_frustum_width: 3.75,
            near_plane: 9.5,
            samples: 17,
            rings: 11,
        }
    }
}

impl ShadowConfig {
    /// Light size in shadow map uv units.
    pub fn light_size_uv(&self) -> f32 {
        self.light_world_size / self.light_frustum_width
    }
}

/// A shadow depth map that can be sampled at a uv coordinate.
pub trait DepthMap {
    fn depth(&self, uv: Vec2) -> f32;
}

/// Nearest-texel lookup with clamp-to-edge addressing.
impl<C> DepthMap for ImageBuffer<Luma<f32>, C>
where
    C: Deref<Target = [f32]>,
{
    fn depth(&self, uv: Vec2) -> f32 {
        let (width, height) = self.dimensions();
        let x = texel(uv.x, width);
        let y = texel(uv.y, height);
        self.get_pixel(x, y).0[0]
    }
}

fn texel(coord: f32, size: u32) -> u32 {
    let max = size.saturating_sub(1) as f32;
    let t = (coord * size as f32).floor();
    if t.is_nan() { 0 } else { t.clamp(0.0, max) as u32 }
}

/// Hash a uv coordinate to `[0, 1)`.
///
/// The dot product is wrapped to `[0, π)` before the sine so the hash stays
/// stable for large coordinates.
pub fn rand(uv: Vec2) -> f32 {
    let dt = uv.dot(Vec2::new(12.9898, 78.233));
    let sn = dt - PI * (dt / PI).floor();
    (sn.sin() * 43758.5453).fract().abs()
}

/// The PCSS sampling policy.
#[derive(Clone, Copy, Debug)]
pub struct ShadowSampler {
    config: ShadowConfig,
}

impl ShadowSampler {
    pub fn new(mut config: ShadowConfig) -> Self {
        config.samples = config.samples.max(1);
        Self { config }
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// Spiral of sample offsets in the unit disk, rotated by `rand(seed)`.
    ///
    /// Sample `i` sits at radius `((i + 1) / samples)^0.75`, and consecutive
    /// samples are `2π · rings / samples` apart in angle.
    pub fn poisson_disk(&self, seed: Vec2) -> Vec<Vec2> {
        let samples = self.config.samples;
        let angle_step = TAU * self.config.rings as f32 / samples as f32;
        let radius_step = 1.0 / samples as f32;

        let mut angle = rand(seed) * TAU;
        let mut radius = radius_step;
        let mut disk = Vec::with_capacity(samples as usize);
        for _ in 0..samples {
            disk.push(Vec2::new(angle.cos(), angle.sin()) * radius.powf(0.75));
            radius += radius_step;
            angle += angle_step;
        }
        disk
    }

    /// Average depth of occluders around `uv`, or [`NO_BLOCKER`].
    pub fn find_blocker<M: DepthMap + ?Sized>(
        &self,
        map: &M,
        uv: Vec2,
        z_receiver: f32,
        disk: &[Vec2],
    ) -> f32 {
        let search_radius =
            self.config.light_size_uv() * (z_receiver - self.config.near_plane) / z_receiver;

        let (sum, count) = disk
            .iter()
            .map(|offset| map.depth(uv + *offset * search_radius))
            .filter(|&depth| depth < z_receiver)
            .fold((0.0, 0u32), |(sum, count), depth| (sum + depth, count + 1));

        if count == 0 {
            NO_BLOCKER
        } else {
            sum / count as f32
        }
    }

    /// Parallel-plane penumbra estimate.
    pub fn penumbra(z_receiver: f32, z_blocker: f32) -> f32 {
        (z_receiver - z_blocker) / z_blocker
    }

    /// Fraction of lit samples within `filter_radius`, using the spiral and
    /// the spiral rotated by 90°.
    pub fn pcf<M: DepthMap + ?Sized>(
        &self,
        map: &M,
        uv: Vec2,
        z_receiver: f32,
        filter_radius: f32,
        disk: &[Vec2],
    ) -> f32 {
        if disk.is_empty() {
            return 1.0;
        }
        let lit = |offset: Vec2| -> f32 {
            if z_receiver <= map.depth(uv + offset * filter_radius) {
                1.0
            } else {
                0.0
            }
        };

        let forward: f32 = disk.iter().map(|p| lit(*p)).sum();
        let rotated: f32 = disk.iter().map(|p| lit(-Vec2::new(p.y, p.x))).sum();
        (forward + rotated) / (2.0 * disk.len() as f32)
    }

    /// Illumination at `uv` for a receiver at `z_receiver`: 1 is fully lit.
    pub fn shadow_factor<M: DepthMap + ?Sized>(&self, map: &M, uv: Vec2, z_receiver: f32) -> f32 {
        let disk = self.poisson_disk(uv);

        let blocker = self.find_blocker(map, uv, z_receiver, &disk);
        if blocker == NO_BLOCKER {
            return 1.0;
        }

        let penumbra = Self::penumbra(z_receiver, blocker);
        let filter_radius =
            penumbra * self.config.light_size_uv() * self.config.near_plane / z_receiver;

        self.pcf(map, uv, z_receiver, filter_radius, &disk)
    }

    /// WGSL functions implementing the same policy.
    ///
    /// The chunk defines `pcss(shadow_map, shadow_sampler, coords) -> f32`
    /// where `coords.xy` is the shadow map uv and `coords.z` the receiver
    /// depth, read from the red channel of `shadow_map`.
    pub fn wgsl(&self) -> String {
        let c = &self.config;
        let mut out = String::new();
        let _ = writeln!(out, "const LIGHT_WORLD_SIZE: f32 = {:?};", c.light_world_size);
        let _ = writeln!(out, "const LIGHT_FRUSTUM_WIDTH: f32 = {:?};", c.light_frustum_width);
        let _ = writeln!(out, "const LIGHT_SIZE_UV: f32 = LIGHT_WORLD_SIZE / LIGHT_FRUSTUM_WIDTH;");
        let _ = writeln!(out, "const NEAR_PLANE: f32 = {:?};", c.near_plane);
        let _ = writeln!(out, "const NUM_SAMPLES: u32 = {}u;", c.samples);
        let _ = writeln!(out, "const NUM_RINGS: u32 = {}u;", c.rings);
        out.push_str(PCSS_WGSL);
        out
    }
}

impl Default for ShadowSampler {
    fn default() -> Self {
        Self::new(ShadowConfig::default())
    }
}

const PCSS_WGSL: &str = r#"
const PCSS_PI: f32 = 3.141592653589793;
const PCSS_PI2: f32 = 6.283185307179586;

var<private> poisson_disk: array<vec2f, NUM_SAMPLES>;

fn pcss_rand(uv: vec2f) -> f32 {
    let dt = dot(uv, vec2f(12.9898, 78.233));
    let sn = dt - PCSS_PI * floor(dt / PCSS_PI);
    return fract(sin(sn) * 43758.5453);
}

fn init_poisson_samples(seed: vec2f) {
    let angle_step = PCSS_PI2 * f32(NUM_RINGS) / f32(NUM_SAMPLES);
    let radius_step = 1.0 / f32(NUM_SAMPLES);
    var angle = pcss_rand(seed) * PCSS_PI2;
    var radius = radius_step;
    for (var i = 0u; i < NUM_SAMPLES; i++) {
        poisson_disk[i] = vec2f(cos(angle), sin(angle)) * pow(radius, 0.75);
        radius += radius_step;
        angle += angle_step;
    }
}

fn penumbra_size(z_receiver: f32, z_blocker: f32) -> f32 {
    return (z_receiver - z_blocker) / z_blocker;
}

fn find_blocker(shadow_map: texture_2d<f32>, shadow_sampler: sampler, uv: vec2f, z_receiver: f32) -> f32 {
    let search_radius = LIGHT_SIZE_UV * (z_receiver - NEAR_PLANE) / z_receiver;
    var sum = 0.0;
    var count = 0u;
    for (var i = 0u; i < NUM_SAMPLES; i++) {
        let depth = textureSampleLevel(shadow_map, shadow_sampler, uv + poisson_disk[i] * search_radius, 0.0).r;
        if (depth < z_receiver) {
            sum += depth;
            count += 1u;
        }
    }
    if (count == 0u) {
        return -1.0;
    }
    return sum / f32(count);
}

fn pcf_filter(shadow_map: texture_2d<f32>, shadow_sampler: sampler, uv: vec2f, z_receiver: f32, filter_radius: f32) -> f32 {
    var sum = 0.0;
    for (var i = 0u; i < NUM_SAMPLES; i++) {
        let depth = textureSampleLevel(shadow_map, shadow_sampler, uv + poisson_disk[i] * filter_radius, 0.0).r;
        if (z_receiver <= depth) {
            sum += 1.0;
        }
    }
    for (var i = 0u; i < NUM_SAMPLES; i++) {
        let depth = textureSampleLevel(shadow_map, shadow_sampler, uv - poisson_disk[i].yx * filter_radius, 0.0).r;
        if (z_receiver <= depth) {
            sum += 1.0;
        }
    }
    return sum / (2.0 * f32(NUM_SAMPLES));
}

fn pcss(shadow_map: texture_2d<f32>, shadow_sampler: sampler, coords: vec4f) -> f32 {
    let uv = coords.xy;
    let z_receiver = coords.z;

    init_poisson_samples(uv);

    let blocker = find_blocker(shadow_map, shadow_sampler, uv, z_receiver);
    if (blocker == -1.0) {
        return 1.0;
    }

    let penumbra = penumbra_size(z_receiver, blocker);
    let filter_radius = penumbra * LIGHT_SIZE_UV * NEAR_PLANE / z_receiver;
    return pcf_filter(shadow_map, shadow_sampler, uv, z_receiver, filter_radius);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgsl_chunk_validates() {
        use crate::pipeline::fullscreen::validate_wgsl;

        let default = ShadowSampler::default().wgsl();
        let module = validate_wgsl("pcss", &default);
        assert!(module.functions.iter().any(|(_, f)| f.name.as_deref() == Some("pcss")));

        let sparse = ShadowSampler::new(ShadowConfig {
            samples: 8,
            rings: 3,
            ..ShadowConfig::default()
        });
        validate_wgsl("pcss sparse", &sparse.wgsl());
    }

    fn uniform_map(depth: f32) -> ImageBuffer<Luma<f32>, Vec<f32>> {
        ImageBuffer::from_pixel(64, 64, Luma([depth]))
    }

    fn split_map(left: f32, right: f32) -> ImageBuffer<Luma<f32>, Vec<f32>> {
        ImageBuffer::from_fn(64, 64, |x, _| Luma([if x < 32 { left } else { right }]))
    }

    #[test]
    fn rand_is_deterministic_and_in_range() {
        for uv in [Vec2::ZERO, Vec2::new(0.25, 0.75), Vec2::new(123.0, -9.5)] {
            let r = rand(uv);
            assert_eq!(r, rand(uv));
            assert!((0.0..1.0).contains(&r), "{r}");
        }
    }

    #[test]
    fn poisson_disk_spirals_outward() {
        let sampler = ShadowSampler::default();
        let disk = sampler.poisson_disk(Vec2::new(0.3, 0.6));
        assert_eq!(disk.len(), 17);

        for (i, p) in disk.iter().enumerate() {
            let expected = ((i + 1) as f32 / 17.0).powf(0.75);
            assert!((p.length() - expected).abs() < 1e-4);
        }
        assert!((disk[16].length() - 1.0).abs() < 1e-4);

        let step = TAU * 11.0 / 17.0;
        let a0 = disk[0].y.atan2(disk[0].x);
        let a1 = disk[1].y.atan2(disk[1].x);
        let delta = (a1 - a0).rem_euclid(TAU);
        assert!((delta - step.rem_euclid(TAU)).abs() < 1e-3);
    }

    #[test]
    fn no_blockers_means_fully_lit() {
        let sampler = ShadowSampler::default();
        let map = uniform_map(20.0);
        let disk = sampler.poisson_disk(Vec2::splat(0.5));
        assert_eq!(sampler.find_blocker(&map, Vec2::splat(0.5), 12.0, &disk), NO_BLOCKER);
        assert_eq!(sampler.shadow_factor(&map, Vec2::splat(0.5), 12.0), 1.0);
    }

    #[test]
    fn fully_occluded_receiver_is_dark() {
        let sampler = ShadowSampler::default();
        let map = uniform_map(10.0);
        let disk = sampler.poisson_disk(Vec2::splat(0.5));
        assert_eq!(sampler.find_blocker(&map, Vec2::splat(0.5), 12.0, &disk), 10.0);
        assert_eq!(sampler.shadow_factor(&map, Vec2::splat(0.5), 12.0), 0.0);
    }

    #[test]
    fn shadow_edge_is_soft() {
        let sampler = ShadowSampler::default();
        let map = split_map(10.0, 20.0);
        let edge = sampler.shadow_factor(&map, Vec2::new(0.5, 0.5), 12.0);
        assert!(edge > 0.0 && edge < 1.0, "edge factor {edge}");

        assert_eq!(sampler.shadow_factor(&map, Vec2::new(0.9, 0.5), 12.0), 1.0);
        assert_eq!(sampler.shadow_factor(&map, Vec2::new(0.1, 0.5), 12.0), 0.0);
    }

    #[test]
    fn penumbra_grows_with_separation() {
        assert_eq!(ShadowSampler::penumbra(12.0, 12.0), 0.0);
        assert!(ShadowSampler::penumbra(14.0, 10.0) > ShadowSampler::penumbra(11.0, 10.0));
    }

    #[test]
    fn wgsl_bakes_configuration() {
        let sampler = ShadowSampler::new(ShadowConfig {
            samples: 9,
            rings: 4,
            ..ShadowConfig::default()
        });
        let chunk = sampler.wgsl();
        assert!(chunk.contains("const LIGHT_WORLD_SIZE: f32 = 0.005;"));
        assert!(chunk.contains("const LIGHT_FRUSTUM_WIDTH: f32 = 3.75;"));
        assert!(chunk.contains("const NEAR_PLANE: f32 = 9.5;"));
        assert!(chunk.contains("const NUM_SAMPLES: u32 = 9u;"));
        assert!(chunk.contains("const NUM_RINGS: u32 = 4u;"));
        assert!(chunk.contains("fn pcss("));
    }

    #[test]
    fn zero_samples_is_clamped() {
        let sampler = ShadowSampler::new(ShadowConfig {
            samples: 0,
            ..ShadowConfig::default()
        });
        assert_eq!(sampler.config().samples, 1);
        assert_eq!(sampler.poisson_disk(Vec2::ZERO).len(), 1);
    }
}
