//! Top-level owner of a running presentation.
//!
//! Per frame: smooth the scroll, activate the pair it points at, render that
//! pair into its slots, then run the post-process chain onto the surface.

use crate::assets::AssetLoader;
use crate::camera::Camera;
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::pipeline::chain::PostProcessChain;
use crate::pipeline::layout::{TargetLayout, Viewport};
use crate::scene::host::SceneHost;
use crate::scene::scroll::{BlendState, ScrollCoupler};
use crate::scene::sections::SectionDescriptor;
use crate::shadow::{ShadowConfig, ShadowSampler};
use crate::tunables::Tunables;

/// Scenes, scroll state and post-processing for one window.
pub struct Presentation {
    sections: Vec<SectionDescriptor>,
    host: SceneHost,
    scroll: ScrollCoupler,
    chain: PostProcessChain,
    tunables: Tunables,
    camera: Camera,
    viewport: Viewport,
    shadows: ShadowSampler,
    last_time: Option<f32>,
}

impl Presentation {
    /// # Errors
    ///
    /// [`crate::Error::TooFewSections`] for fewer than two sections.
    pub fn new(
        gpu: &GpuContext,
        sections: Vec<SectionDescriptor>,
        viewport: Viewport,
        tunables: Tunables,
    ) -> Result<Self> {
        let tunables = tunables.clamped();
        let scroll = ScrollCoupler::new(sections.len())?;
        let host = SceneHost::new(gpu, &sections, &viewport)?;
        let chain = PostProcessChain::new(gpu, &viewport, &tunables);

        let mut camera = Camera::new();
        camera.resize(viewport.width, viewport.height);

        Ok(Self {
            sections,
            host,
            scroll,
            chain,
            tunables,
            camera,
            viewport,
            shadows: ShadowSampler::default(),
            last_time: None,
        })
    }

    /// Replace the soft shadow sampling policy.
    pub fn with_shadows(mut self, config: ShadowConfig) -> Self {
        self.shadows = ShadowSampler::new(config);
        log::debug!(
            "shadow sampler: {} samples over {} rings",
            self.shadows.config().samples,
            self.shadows.config().rings
        );
        self
    }

    /// The soft shadow policy scenes sample their shadow maps with.
    pub fn shadow_sampler(&self) -> &ShadowSampler {
        &self.shadows
    }

    /// Decode textures, build every scene and warm them up.
    ///
    /// The presentation stays idle if this fails.
    pub fn load(&mut self, gpu: &GpuContext, loader: &AssetLoader) -> Result<()> {
        self.host.ready(gpu, loader)?;
        self.host.warm_up(gpu, &self.camera);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.host.is_ready()
    }

    /// Show the first pair and start rendering. Has no effect once running.
    ///
    /// Refuses, and stays idle, until [`Presentation::load`] has succeeded.
    /// Returns whether the presentation is running.
    pub fn animate_in(&mut self) -> bool {
        if self.chain.is_running() {
            return true;
        }
        let ready = self.host.is_ready();
        if ready {
            self.host.activate(&self.scroll.blend());
        }
        self.chain.animate_in(ready)
    }

    pub fn is_running(&self) -> bool {
        self.chain.is_running()
    }

    /// Scroll to `scroll` sections, clamped to the valid range.
    pub fn set_scroll(&mut self, scroll: f32) {
        self.scroll.set_target(scroll);
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll.set_target(self.scroll.target() + delta);
    }

    /// Move the target to the section `steps` away from the nearest one.
    pub fn step_section(&mut self, steps: i32) {
        let current = self.scroll.target().round();
        self.scroll.set_target(current + steps as f32);
    }

    pub fn scroll_target(&self) -> f32 {
        self.scroll.target()
    }

    pub fn blend(&self) -> BlendState {
        self.scroll.blend()
    }

    pub fn sections(&self) -> &[SectionDescriptor] {
        &self.sections
    }

    /// The section nearest the current scroll position.
    pub fn current_section(&self) -> &SectionDescriptor {
        let index = (self.scroll.position().round().max(0.0) as usize).min(self.sections.len() - 1);
        &self.sections[index]
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Parameters are read at the start of every frame; writes go through
    /// [`Tunables::set`] to stay in range.
    pub fn tunables_mut(&mut self) -> &mut Tunables {
        &mut self.tunables
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn layout(&self) -> &TargetLayout {
        self.chain.layout()
    }

    /// Resize the chain, then every slot, then the camera.
    pub fn resize(&mut self, gpu: &GpuContext, viewport: Viewport) {
        self.viewport = viewport;
        self.chain.resize(gpu, &viewport);
        self.host.resize(gpu, &viewport);
        self.camera.resize(viewport.width, viewport.height);
    }

    /// Render one frame at `time` seconds.
    ///
    /// Returns false when nothing was presented: the chain is idle or the
    /// surface had to be reconfigured.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Surface`] for surface errors other than a lost or
    /// outdated swapchain.
    pub fn frame(&mut self, gpu: &GpuContext, time: f32) -> Result<bool> {
        let dt = self.last_time.map_or(0.0, |last| (time - last).max(0.0));
        self.last_time = Some(time);

        self.scroll.tick(dt, self.tunables.scroll.lerp);
        self.chain.apply_tunables(gpu, &self.tunables);

        if !self.chain.is_running() {
            return Ok(false);
        }

        let blend = self.scroll.blend();
        self.host.activate(&blend);

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                gpu.reconfigure();
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("surface acquire timed out, skipping frame");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let screen = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.host.update(gpu, &mut encoder, &self.camera, time);
        if let Some((map1, map2)) = self.host.pair_views(&blend) {
            self.chain
                .render(gpu, &mut encoder, map1, map2, blend.progress, &screen);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(true)
    }
}
