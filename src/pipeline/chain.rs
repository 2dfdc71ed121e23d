//! The image-space pass sequence run every frame.
//!
//! ```text
//! slot A ─┐
//!         ├─ transition ─► target_a ─ fxaa ─► target_b ─ luminosity ─► bright
//! slot B ─┘                                      │
//!                                                │   bright ─ blur h/v ─► vertical[0]
//!                                                │   vertical[i-1] ─ blur h/v ─► vertical[i]
//!                                                │   Σ vertical[i] ─► horizontal[0]
//!                                                └─ + horizontal[0] ─ ACES ─► surface
//! ```
//!
//! All target sizes come from one [`TargetLayout`] and change together in
//! [`PostProcessChain::resize`].

use super::bloom::{BloomFactors, BloomSettings, BlurDirection, BlurUniforms, LuminositySettings};
use super::fullscreen::{FullscreenPass, PassDescriptor, PassOutput, UniformBuffer};
use super::layout::{Extent, KERNEL_RADII, MIP_COUNT, TargetLayout, Viewport};
use super::render_target::RenderTarget;
use crate::gpu::{GpuContext, INTERMEDIATE_FORMAT};
use crate::scene::transition::TransitionStage;
use crate::tunables::Tunables;

const FXAA_SHADER: &str = include_str!("../shaders/fxaa.wgsl");
const LUMINOSITY_SHADER: &str = include_str!("../shaders/luminosity.wgsl");
const BLUR_SHADER: &str = include_str!("../shaders/blur.wgsl");
const BLOOM_COMPOSITE_SHADER: &str = include_str!("../shaders/bloom_composite.wgsl");
const COMPOSITE_SHADER: &str = include_str!("../shaders/composite.wgsl");

/// Lifecycle of the chain. Rendering does nothing until it is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChainState {
    #[default]
    Idle,
    Running,
}

impl ChainState {
    /// The only transition: `Idle` moves to `Running` once every scene is
    /// ready, and `Running` stays there.
    pub fn animate_in(self, scenes_ready: bool) -> Self {
        match self {
            ChainState::Idle if scenes_ready => ChainState::Running,
            state => state,
        }
    }
}

/// A target of the chain, by role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetId {
    A,
    B,
    Bright,
    Horizontal(usize),
    Vertical(usize),
}

/// One cached pass of the chain after the transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Fxaa,
    Luminosity,
    BlurHorizontal(usize),
    BlurVertical(usize),
    BloomComposite,
    Composite,
}

impl Stage {
    /// Every stage in recording order.
    fn sequence() -> Vec<Stage> {
        let mut stages = vec![Stage::Fxaa, Stage::Luminosity];
        for i in 0..MIP_COUNT {
            stages.push(Stage::BlurHorizontal(i));
            stages.push(Stage::BlurVertical(i));
        }
        stages.push(Stage::BloomComposite);
        stages.push(Stage::Composite);
        stages
    }

    fn inputs(self) -> Vec<TargetId> {
        match self {
            Stage::Fxaa => vec![TargetId::A],
            Stage::Luminosity => vec![TargetId::B],
            Stage::BlurHorizontal(0) => vec![TargetId::Bright],
            Stage::BlurHorizontal(i) => vec![TargetId::Vertical(i - 1)],
            Stage::BlurVertical(i) => vec![TargetId::Horizontal(i)],
            Stage::BloomComposite => (0..MIP_COUNT).map(TargetId::Vertical).collect(),
            Stage::Composite => vec![TargetId::B, TargetId::Horizontal(0)],
        }
    }

    /// `None` is the surface.
    fn output(self) -> Option<TargetId> {
        match self {
            Stage::Fxaa => Some(TargetId::B),
            Stage::Luminosity => Some(TargetId::Bright),
            Stage::BlurHorizontal(i) => Some(TargetId::Horizontal(i)),
            Stage::BlurVertical(i) => Some(TargetId::Vertical(i)),
            Stage::BloomComposite => Some(TargetId::Horizontal(0)),
            Stage::Composite => None,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct FxaaUniforms {
    resolution: [f32; 2],
    inv_resolution: [f32; 2],
}

impl FxaaUniforms {
    fn new(extent: Extent) -> Self {
        let [w, h] = extent.as_vec2();
        Self {
            resolution: [w, h],
            inv_resolution: [1.0 / w, 1.0 / h],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct LuminosityUniforms {
    threshold: f32,
    smoothing: f32,
    _pad: [f32; 2],
}

impl LuminosityUniforms {
    fn new(settings: &LuminositySettings) -> Self {
        Self {
            threshold: settings.threshold,
            smoothing: settings.smoothing,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BloomUniforms {
    factors: [[f32; 4]; 2],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeUniforms {
    exposure: f32,
    _pad: [f32; 3],
}

/// Blur uniforms of every mip, horizontal then vertical, for `layout`.
///
/// Each mip blurs at its own resolution with its own kernel radius.
pub fn blur_uniforms(layout: &TargetLayout) -> [(BlurUniforms, BlurUniforms); MIP_COUNT] {
    std::array::from_fn(|i| {
        let extent = layout.mips[i];
        let radius = KERNEL_RADII[i];
        (
            BlurUniforms::new(BlurDirection::Horizontal, extent, radius),
            BlurUniforms::new(BlurDirection::Vertical, extent, radius),
        )
    })
}

/// Every intermediate target, named after the pass that writes it.
struct ChainTargets {
    /// Transition output, with depth.
    a: RenderTarget,
    /// Anti-aliased scene.
    b: RenderTarget,
    bright: RenderTarget,
    /// Horizontal blur per mip; `horizontal[0]` also holds the bloom sum.
    horizontal: [RenderTarget; MIP_COUNT],
    vertical: [RenderTarget; MIP_COUNT],
}

impl ChainTargets {
    fn new(gpu: &GpuContext, layout: &TargetLayout) -> Self {
        Self {
            a: RenderTarget::new(gpu, "Chain Target A", layout.full, true),
            b: RenderTarget::new(gpu, "Chain Target B", layout.full, false),
            bright: RenderTarget::new(gpu, "Chain Bright", layout.bright, false),
            horizontal: std::array::from_fn(|i| {
                RenderTarget::new(gpu, &format!("Chain Blur H{i}"), layout.mips[i], false)
            }),
            vertical: std::array::from_fn(|i| {
                RenderTarget::new(gpu, &format!("Chain Blur V{i}"), layout.mips[i], false)
            }),
        }
    }

    fn view(&self, id: TargetId) -> &wgpu::TextureView {
        match id {
            TargetId::A => &self.a.view,
            TargetId::B => &self.b.view,
            TargetId::Bright => &self.bright.view,
            TargetId::Horizontal(i) => &self.horizontal[i].view,
            TargetId::Vertical(i) => &self.vertical[i].view,
        }
    }

    /// Returns how many targets were reallocated.
    fn resize(&mut self, gpu: &GpuContext, layout: &TargetLayout) -> usize {
        let mut changed = 0;
        changed += usize::from(self.a.resize(gpu, layout.full));
        changed += usize::from(self.b.resize(gpu, layout.full));
        changed += usize::from(self.bright.resize(gpu, layout.bright));
        for i in 0..MIP_COUNT {
            changed += usize::from(self.horizontal[i].resize(gpu, layout.mips[i]));
            changed += usize::from(self.vertical[i].resize(gpu, layout.mips[i]));
        }
        changed
    }
}

struct BlurBuffers {
    horizontal: UniformBuffer<BlurUniforms>,
    vertical: UniformBuffer<BlurUniforms>,
}

/// Transition, anti-aliasing, bloom and tone mapping.
pub struct PostProcessChain {
    state: ChainState,
    layout: TargetLayout,
    targets: ChainTargets,

    transition: TransitionStage,
    fxaa: FullscreenPass,
    luminosity: FullscreenPass,
    blur: FullscreenPass,
    bloom_composite: FullscreenPass,
    composite: FullscreenPass,

    fxaa_uniforms: UniformBuffer<FxaaUniforms>,
    luminosity_uniforms: UniformBuffer<LuminosityUniforms>,
    blur_uniforms: [BlurBuffers; MIP_COUNT],
    bloom_uniforms: UniformBuffer<BloomUniforms>,
    composite_uniforms: UniformBuffer<CompositeUniforms>,

    /// Bind groups of every [`Stage`], rebuilt when targets are reallocated.
    bindings: Vec<(Stage, wgpu::BindGroup)>,

    luminosity_settings: LuminositySettings,
    bloom_settings: BloomSettings,
}

impl PostProcessChain {
    pub fn new(gpu: &GpuContext, viewport: &Viewport, tunables: &Tunables) -> Self {
        let layout = TargetLayout::compute(viewport);
        let targets = ChainTargets::new(gpu, &layout);

        let pass = |label: &str, fragment: &str, inputs: u32, format: wgpu::TextureFormat| {
            FullscreenPass::new(
                gpu,
                &PassDescriptor {
                    label,
                    fragment,
                    inputs,
                    format,
                    depth: false,
                },
            )
        };
        let fxaa = pass("FXAA Pass", FXAA_SHADER, 1, INTERMEDIATE_FORMAT);
        let luminosity = pass("Luminosity Pass", LUMINOSITY_SHADER, 1, INTERMEDIATE_FORMAT);
        let blur = pass("Blur Pass", BLUR_SHADER, 1, INTERMEDIATE_FORMAT);
        let bloom_composite = pass(
            "Bloom Composite Pass",
            BLOOM_COMPOSITE_SHADER,
            MIP_COUNT as u32,
            INTERMEDIATE_FORMAT,
        );
        let composite = pass("Composite Pass", COMPOSITE_SHADER, 2, gpu.config.format);

        let blur_values = blur_uniforms(&layout);
        let blur_uniforms = std::array::from_fn(|i| {
            let (horizontal, vertical) = &blur_values[i];
            BlurBuffers {
                horizontal: UniformBuffer::new(gpu, &format!("Blur H{i} Uniforms"), horizontal),
                vertical: UniformBuffer::new(gpu, &format!("Blur V{i} Uniforms"), vertical),
            }
        });

        let mut chain = Self {
            state: ChainState::Idle,
            layout,
            targets,
            transition: TransitionStage::new(gpu, tunables.transition),
            fxaa,
            luminosity,
            blur,
            bloom_composite,
            composite,
            fxaa_uniforms: UniformBuffer::new(gpu, "FXAA Uniforms", &FxaaUniforms::new(layout.full)),
            luminosity_uniforms: UniformBuffer::new(
                gpu,
                "Luminosity Uniforms",
                &LuminosityUniforms::new(&tunables.luminosity),
            ),
            blur_uniforms,
            bloom_uniforms: UniformBuffer::new(
                gpu,
                "Bloom Composite Uniforms",
                &BloomUniforms {
                    factors: BloomFactors::compute(&tunables.bloom).packed(),
                },
            ),
            composite_uniforms: UniformBuffer::new(
                gpu,
                "Composite Uniforms",
                &CompositeUniforms {
                    exposure: 1.0,
                    _pad: [0.0; 3],
                },
            ),
            bindings: Vec::new(),
            luminosity_settings: tunables.luminosity,
            bloom_settings: tunables.bloom,
        };
        chain.bindings = chain.bind_stages(gpu);
        log_layout("created", &chain.layout);
        chain
    }

    fn pass(&self, stage: Stage) -> &FullscreenPass {
        match stage {
            Stage::Fxaa => &self.fxaa,
            Stage::Luminosity => &self.luminosity,
            Stage::BlurHorizontal(_) | Stage::BlurVertical(_) => &self.blur,
            Stage::BloomComposite => &self.bloom_composite,
            Stage::Composite => &self.composite,
        }
    }

    fn uniforms(&self, stage: Stage) -> &wgpu::Buffer {
        match stage {
            Stage::Fxaa => self.fxaa_uniforms.buffer(),
            Stage::Luminosity => self.luminosity_uniforms.buffer(),
            Stage::BlurHorizontal(i) => self.blur_uniforms[i].horizontal.buffer(),
            Stage::BlurVertical(i) => self.blur_uniforms[i].vertical.buffer(),
            Stage::BloomComposite => self.bloom_uniforms.buffer(),
            Stage::Composite => self.composite_uniforms.buffer(),
        }
    }

    fn bind_stages(&self, gpu: &GpuContext) -> Vec<(Stage, wgpu::BindGroup)> {
        Stage::sequence()
            .into_iter()
            .map(|stage| {
                let inputs: Vec<&wgpu::TextureView> = stage
                    .inputs()
                    .into_iter()
                    .map(|id| self.targets.view(id))
                    .collect();
                let bind_group = self.pass(stage).bind_group(gpu, self.uniforms(stage), &inputs);
                (stage, bind_group)
            })
            .collect()
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ChainState::Running
    }

    /// Start rendering once `scenes_ready`. Calling it again has no effect.
    ///
    /// Returns whether the chain is running afterwards.
    pub fn animate_in(&mut self, scenes_ready: bool) -> bool {
        let next = self.state.animate_in(scenes_ready);
        if next != self.state {
            log::info!("post-process chain running");
        } else if !self.is_running() {
            log::warn!("post-process chain stays idle until every scene is ready");
        }
        self.state = next;
        self.is_running()
    }

    pub fn layout(&self) -> &TargetLayout {
        &self.layout
    }

    /// Resize every target and the uniforms that depend on target sizes.
    pub fn resize(&mut self, gpu: &GpuContext, viewport: &Viewport) {
        let layout = TargetLayout::compute(viewport);
        if layout == self.layout {
            return;
        }

        let reallocated = self.targets.resize(gpu, &layout);
        self.fxaa_uniforms.write(gpu, &FxaaUniforms::new(layout.full));
        for (buffers, (horizontal, vertical)) in self.blur_uniforms.iter().zip(blur_uniforms(&layout)) {
            buffers.horizontal.write(gpu, &horizontal);
            buffers.vertical.write(gpu, &vertical);
        }
        self.layout = layout;
        if reallocated > 0 {
            self.bindings = self.bind_stages(gpu);
        }

        log_layout("resized", &self.layout);
        log::debug!("reallocated {reallocated} chain targets");
    }

    /// Pick up parameter changes. Only uniforms whose inputs changed are
    /// rewritten.
    pub fn apply_tunables(&mut self, gpu: &GpuContext, tunables: &Tunables) {
        self.transition.set_params(tunables.transition);

        if tunables.luminosity != self.luminosity_settings {
            self.luminosity_settings = tunables.luminosity;
            self.luminosity_uniforms
                .write(gpu, &LuminosityUniforms::new(&self.luminosity_settings));
        }

        if tunables.bloom != self.bloom_settings {
            self.bloom_settings = tunables.bloom;
            let factors = BloomFactors::compute(&self.bloom_settings);
            self.bloom_uniforms.write(
                gpu,
                &BloomUniforms {
                    factors: factors.packed(),
                },
            );
        }
    }

    /// Record the whole pass sequence, ending on `screen`.
    ///
    /// Returns false without recording anything while idle.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        map1: &wgpu::TextureView,
        map2: &wgpu::TextureView,
        progress: f32,
        screen: &wgpu::TextureView,
    ) -> bool {
        if !self.is_running() {
            return false;
        }
        self.transition
            .render(gpu, encoder, map1, map2, progress, &self.targets.a);

        for (stage, bind_group) in &self.bindings {
            let color = match stage.output() {
                Some(id) => self.targets.view(id),
                None => screen,
            };
            self.pass(*stage)
                .draw(encoder, bind_group, PassOutput::color(color));
        }
        true
    }
}

fn log_layout(what: &str, layout: &TargetLayout) {
    let last = layout.mips[MIP_COUNT - 1];
    log::info!(
        "post-process targets {what}: full {}x{}, bloom {}x{} down to {}x{}",
        layout.full.width,
        layout.full.height,
        layout.bright.width,
        layout.bright.height,
        last.width,
        last.height,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_shaders_validate() {
        use crate::pipeline::fullscreen::{fullscreen_source, validate_wgsl};

        for (label, fragment) in [
            ("fxaa", FXAA_SHADER),
            ("luminosity", LUMINOSITY_SHADER),
            ("blur", BLUR_SHADER),
            ("bloom composite", BLOOM_COMPOSITE_SHADER),
            ("composite", COMPOSITE_SHADER),
        ] {
            validate_wgsl(label, &fullscreen_source(fragment));
        }
    }

    #[test]
    fn animate_in_is_one_way() {
        assert_eq!(ChainState::default(), ChainState::Idle);
        assert_eq!(ChainState::Idle.animate_in(true), ChainState::Running);
        assert_eq!(ChainState::Running.animate_in(true), ChainState::Running);
        assert_eq!(ChainState::Running.animate_in(false), ChainState::Running);
    }

    #[test]
    fn animate_in_waits_for_scenes() {
        assert_eq!(ChainState::Idle.animate_in(false), ChainState::Idle);
        let state = ChainState::Idle.animate_in(false).animate_in(true);
        assert_eq!(state, ChainState::Running);
    }

    #[test]
    fn stages_run_in_chain_order() {
        let stages = Stage::sequence();
        assert_eq!(stages.len(), 2 + 2 * MIP_COUNT + 2);
        assert_eq!(stages[0], Stage::Fxaa);
        assert_eq!(stages[1], Stage::Luminosity);
        assert_eq!(stages[2], Stage::BlurHorizontal(0));
        assert_eq!(stages[3], Stage::BlurVertical(0));
        assert_eq!(stages[stages.len() - 2], Stage::BloomComposite);
        assert_eq!(stages[stages.len() - 1], Stage::Composite);
    }

    #[test]
    fn only_the_composite_writes_the_surface() {
        for stage in Stage::sequence() {
            assert_eq!(stage.output().is_none(), stage == Stage::Composite, "{stage:?}");
        }
    }

    #[test]
    fn every_input_is_written_earlier() {
        // The transition writes A before any cached stage runs.
        let mut written = vec![TargetId::A];
        for stage in Stage::sequence() {
            for input in stage.inputs() {
                assert!(written.contains(&input), "{stage:?} reads unwritten {input:?}");
                assert_ne!(Some(input), stage.output(), "{stage:?} reads its own output");
            }
            written.extend(stage.output());
        }
    }

    #[test]
    fn blur_mips_chain_from_bright() {
        assert_eq!(Stage::BlurHorizontal(0).inputs(), [TargetId::Bright]);
        for i in 1..MIP_COUNT {
            assert_eq!(Stage::BlurHorizontal(i).inputs(), [TargetId::Vertical(i - 1)]);
        }
        assert_eq!(Stage::BloomComposite.inputs().len(), MIP_COUNT);
        assert_eq!(Stage::Composite.inputs(), [TargetId::B, TargetId::Horizontal(0)]);
    }

    #[test]
    fn blur_uniforms_track_mip_resolution() {
        let layout = TargetLayout::compute(&Viewport::new(800.0, 600.0, 1.0));
        let uniforms = blur_uniforms(&layout);
        for (i, (h, v)) in uniforms.iter().enumerate() {
            let mip = layout.mips[i];
            assert_eq!(h.inv_size, [1.0 / mip.width as f32, 1.0 / mip.height as f32]);
            assert_eq!(h.inv_size, v.inv_size);
            assert_eq!(h.direction, [1.0, 0.0]);
            assert_eq!(v.direction, [0.0, 1.0]);
            assert_eq!(h.taps, KERNEL_RADII[i]);
        }
        assert_eq!(uniforms[0].0.inv_size, [1.0 / 256.0, 1.0 / 256.0]);
        assert_eq!(uniforms[4].0.inv_size, [1.0 / 16.0, 1.0 / 16.0]);
    }

    #[test]
    fn blur_uniforms_survive_degenerate_viewport() {
        let layout = TargetLayout::compute(&Viewport::new(1.0, 1.0, 1.0));
        for (h, v) in blur_uniforms(&layout) {
            assert_eq!(h.inv_size, [1.0, 1.0]);
            assert_eq!(v.inv_size, [1.0, 1.0]);
        }
    }

    #[test]
    fn fxaa_uniforms_invert_resolution() {
        let u = FxaaUniforms::new(Extent::new(1920, 1080));
        assert_eq!(u.resolution, [1920.0, 1080.0]);
        assert_eq!(u.inv_resolution, [1.0 / 1920.0, 1.0 / 1080.0]);
    }

    #[test]
    fn uniform_layouts_match_shaders() {
        assert_eq!(std::mem::size_of::<FxaaUniforms>(), 16);
        assert_eq!(std::mem::size_of::<LuminosityUniforms>(), 16);
        assert_eq!(std::mem::size_of::<BloomUniforms>(), 32);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 16);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 80);
    }
}
