//! Owns every scene slot and keeps only the active pair alive each frame.

use super::content::Resizable;
use super::renderer::SceneRenderer;
use super::scroll::BlendState;
use super::sections::SectionDescriptor;
use super::slot::SceneSlot;
use crate::assets::{AssetLoader, join_all};
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::pipeline::layout::Viewport;

/// Vertical distance a scene travels while it blends in or out.
pub const PARALLAX: f32 = 1.5;

/// Vertical offsets of the outgoing and incoming scene at `progress`.
pub fn parallax_offsets(progress: f32) -> (f32, f32) {
    (PARALLAX * progress, -PARALLAX * (1.0 - progress))
}

/// Visibility bookkeeping for a row of slots.
///
/// Exactly the active pair is visible once a pair has been activated, and
/// nothing is visible before that.
#[derive(Clone, Debug)]
pub struct SlotVisibility {
    visible: Vec<bool>,
    active: Option<(usize, usize)>,
}

impl SlotVisibility {
    pub fn new(slots: usize) -> Self {
        Self {
            visible: vec![false; slots],
            active: None,
        }
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn active(&self) -> Option<(usize, usize)> {
        self.active
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }

    /// Hide the previous pair and show `pair`.
    ///
    /// Returns false, changing nothing, when `pair` is already active or
    /// either index is out of range.
    pub fn activate(&mut self, pair: (usize, usize)) -> bool {
        if self.active == Some(pair) {
            return false;
        }
        let (a, b) = pair;
        if a >= self.visible.len() || b >= self.visible.len() {
            return false;
        }
        if let Some((old_a, old_b)) = self.active {
            self.visible[old_a] = false;
            self.visible[old_b] = false;
        }
        self.visible[a] = true;
        self.visible[b] = true;
        self.active = Some(pair);
        true
    }
}

/// The ordered set of scene slots, one per section.
pub struct SceneHost {
    slots: Vec<SceneSlot>,
    visibility: SlotVisibility,
    renderer: SceneRenderer,
}

impl SceneHost {
    /// Create one hidden slot per section.
    ///
    /// # Errors
    ///
    /// [`Error::TooFewSections`] for fewer than two sections.
    pub fn new(gpu: &GpuContext, sections: &[SectionDescriptor], viewport: &Viewport) -> Result<Self> {
        if sections.len() < 2 {
            return Err(Error::TooFewSections(sections.len()));
        }
        let renderer = SceneRenderer::new(gpu);
        let slots = sections
            .iter()
            .map(|section| {
                SceneSlot::new(
                    gpu,
                    &renderer,
                    section.index,
                    section.title.clone(),
                    Box::new(section.content()),
                    viewport,
                )
            })
            .collect::<Vec<_>>();
        log::debug!("created {} scene slots", slots.len());

        Ok(Self {
            visibility: SlotVisibility::new(slots.len()),
            slots,
            renderer,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&SceneSlot> {
        self.slots.get(index)
    }

    pub fn visibility(&self) -> &SlotVisibility {
        &self.visibility
    }

    /// Decode every slot's textures and build all content.
    ///
    /// Every request is issued before any is awaited so decoding overlaps.
    /// The first failure aborts the whole load.
    pub fn ready(&mut self, gpu: &GpuContext, loader: &AssetLoader) -> Result<()> {
        let mut counts = Vec::with_capacity(self.slots.len());
        let mut pending = Vec::new();
        for slot in &self.slots {
            let requests = slot.load(loader);
            counts.push(requests.len());
            pending.extend(requests);
        }

        let images = join_all(pending).inspect_err(|e| {
            log::warn!("scene loading failed, cancelling queued decodes: {e}");
            loader.cancel();
        })?;
        let mut images = images.into_iter();
        for (slot, count) in self.slots.iter_mut().zip(counts) {
            let slot_images = images.by_ref().take(count).collect();
            slot.build(gpu, &self.renderer, slot_images)?;
        }
        log::info!("{} scenes ready", self.slots.len());
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.slots.iter().all(SceneSlot::is_ready)
    }

    /// Render each slot once while it is hidden from the user, so the first
    /// visible frame does not pay for pipeline and upload warm-up.
    pub fn warm_up(&mut self, gpu: &GpuContext, camera: &Camera) {
        self.renderer.write_camera(gpu, camera, 0.0);
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Warm-up Encoder"),
            });
        for slot in &mut self.slots {
            let was_visible = slot.is_visible();
            slot.set_visible(true);
            slot.render(gpu, &mut encoder, &self.renderer);
            slot.set_visible(was_visible);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        log::debug!("warmed up {} scenes", self.slots.len());
    }

    /// Make `blend`'s pair the visible one and apply scroll parallax.
    ///
    /// Must run before the frame's [`update`](Self::update).
    pub fn activate(&mut self, blend: &BlendState) {
        let previous = self.visibility.active();
        if self.visibility.activate(blend.pair()) {
            log::debug!("active scenes {:?} -> {:?}", previous, blend.pair());
            for (i, slot) in self.slots.iter_mut().enumerate() {
                slot.set_visible(self.visibility.is_visible(i));
            }
        }

        let (outgoing, incoming) = parallax_offsets(blend.progress);
        if let Some(slot) = self.slots.get_mut(blend.index1) {
            slot.set_offset(outgoing);
        }
        if let Some(slot) = self.slots.get_mut(blend.index2) {
            slot.set_offset(incoming);
        }
    }

    /// Animate and render the visible slots. Returns how many rendered.
    pub fn update(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
        time: f32,
    ) -> usize {
        let Some((a, b)) = self.visibility.active() else {
            return 0;
        };
        self.renderer.write_camera(gpu, camera, time);

        let mut rendered = 0;
        for index in [a, b] {
            if let Some(slot) = self.slots.get_mut(index) {
                slot.update(time);
                if slot.render(gpu, encoder, &self.renderer) {
                    rendered += 1;
                }
            }
        }
        rendered
    }

    /// Color views of the pair to blend.
    pub fn pair_views(&self, blend: &BlendState) -> Option<(&wgpu::TextureView, &wgpu::TextureView)> {
        let from = self.slots.get(blend.index1)?;
        let to = self.slots.get(blend.index2)?;
        Some((&from.target().view, &to.target().view))
    }

    pub fn resize(&mut self, gpu: &GpuContext, viewport: &Viewport) {
        for slot in &mut self.slots {
            slot.resize(gpu, viewport.width, viewport.height, viewport.dpr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_visible_before_activation() {
        let v = SlotVisibility::new(4);
        assert_eq!(v.visible_count(), 0);
        assert_eq!(v.active(), None);
    }

    #[test]
    fn activation_swaps_pairs() {
        let mut v = SlotVisibility::new(4);
        assert!(v.activate((0, 1)));
        assert!(v.is_visible(0) && v.is_visible(1));

        assert!(v.activate((2, 3)));
        assert!(!v.is_visible(0) && !v.is_visible(1));
        assert!(v.is_visible(2) && v.is_visible(3));
        assert_eq!(v.visible_count(), 2);
    }

    #[test]
    fn overlapping_pairs_keep_the_shared_slot() {
        let mut v = SlotVisibility::new(3);
        v.activate((0, 1));
        v.activate((1, 2));
        assert!(!v.is_visible(0));
        assert!(v.is_visible(1));
        assert!(v.is_visible(2));
        assert_eq!(v.visible_count(), 2);
    }

    #[test]
    fn repeated_or_invalid_pair_is_a_no_op() {
        let mut v = SlotVisibility::new(3);
        v.activate((0, 1));
        assert!(!v.activate((0, 1)));
        assert!(!v.activate((2, 3)));
        assert_eq!(v.active(), Some((0, 1)));
        assert!(!v.is_visible(7));
    }

    #[test]
    fn parallax_moves_scenes_apart() {
        assert_eq!(parallax_offsets(0.0), (0.0, -1.5));
        assert_eq!(parallax_offsets(1.0), (1.5, 0.0));
        let (out, inc) = parallax_offsets(0.5);
        assert_eq!(out, 0.75);
        assert_eq!(inc, -0.75);
    }
}
