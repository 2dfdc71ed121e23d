//! One section's off-screen scene.

use super::content::{DrawList, Resizable, SceneContent};
use super::renderer::{ModelBlock, SceneRenderer};
use crate::assets::{AssetLoader, DecodedImage, Pending, join_all};
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::pipeline::layout::Viewport;
use crate::pipeline::render_target::RenderTarget;
use glam::{Mat4, Vec3};

/// A scene rendered into its own full-resolution target.
///
/// Slots start hidden. The host shows at most two at a time and only
/// visible slots animate or render.
pub struct SceneSlot {
    index: usize,
    title: String,
    target: RenderTarget,
    block: ModelBlock,
    content: Box<dyn SceneContent>,
    visible: bool,
    offset_y: f32,
}

impl SceneSlot {
    pub fn new(
        gpu: &GpuContext,
        renderer: &SceneRenderer,
        index: usize,
        title: impl Into<String>,
        content: Box<dyn SceneContent>,
        viewport: &Viewport,
    ) -> Self {
        let label = format!("Scene Slot {index}");
        let target = RenderTarget::new(gpu, &label, viewport.physical(), true);
        let block = renderer.create_model_block(gpu, &format!("{label} Models"));
        Self {
            index,
            title: title.into(),
            target,
            block,
            content,
            visible: false,
            offset_y: 0.0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content_name(&self) -> &str {
        self.content.name()
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Vertical offset applied to the whole scene.
    pub fn set_offset(&mut self, offset_y: f32) {
        self.offset_y = offset_y;
    }

    pub fn offset(&self) -> f32 {
        self.offset_y
    }

    /// Start decoding every texture the content needs.
    pub fn load(&self, loader: &AssetLoader) -> Vec<Pending<DecodedImage>> {
        self.content
            .textures()
            .into_iter()
            .map(|source| loader.request(source))
            .collect()
    }

    /// Create the content's GPU resources from decoded textures.
    pub fn build(
        &mut self,
        gpu: &GpuContext,
        renderer: &SceneRenderer,
        images: Vec<DecodedImage>,
    ) -> Result<()> {
        self.content.build(gpu, renderer, images)
    }

    /// Decode this slot's textures and build its content.
    pub fn ready(&mut self, gpu: &GpuContext, renderer: &SceneRenderer, loader: &AssetLoader) -> Result<()> {
        let images = join_all(self.load(loader))?;
        self.build(gpu, renderer, images)
    }

    pub fn is_ready(&self) -> bool {
        self.content.is_built()
    }

    /// Advance the content's animation. Hidden slots stay frozen.
    pub fn update(&mut self, time: f32) {
        if self.visible {
            self.content.update(time);
        }
    }

    /// Draw the content into this slot's target with the camera already
    /// uploaded to `renderer`. Returns false when the slot is hidden.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        renderer: &SceneRenderer,
    ) -> bool {
        if !self.visible {
            return false;
        }
        let mut list = DrawList::with_root(Mat4::from_translation(Vec3::Y * self.offset_y));
        self.content.draw(&mut list);
        renderer.render(gpu, encoder, &self.target, &self.block, list.items());
        true
    }
}

impl Resizable for SceneSlot {
    fn resize(&mut self, gpu: &GpuContext, width: f32, height: f32, dpr: f32) {
        let extent = Viewport::new(width, height, dpr).physical();
        self.target.resize(gpu, extent);
    }
}
