//! Capabilities shared by everything a scene slot can show.
//!
//! Content is composed rather than inherited: anything that animates and
//! draws implements [`Renderable`], anything with a size implements
//! [`Resizable`], and [`Group`] nests renderables under a shared transform.

use super::renderer::{Material, SceneRenderer};
use crate::assets::{DecodedImage, TextureSource};
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform};
use glam::{Mat4, Quat, Vec3};

/// One mesh to draw with its final world transform.
pub struct DrawItem<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub model: Mat4,
}

/// Collects draws while walking a hierarchy of renderables.
pub struct DrawList<'a> {
    items: Vec<DrawItem<'a>>,
    stack: Vec<Mat4>,
}

impl<'a> DrawList<'a> {
    pub fn new() -> Self {
        Self::with_root(Mat4::IDENTITY)
    }

    /// Start with `root` applied to every draw.
    pub fn with_root(root: Mat4) -> Self {
        Self {
            items: Vec::new(),
            stack: vec![root],
        }
    }

    /// The transform applied to draws at the current depth.
    pub fn current(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn push_transform(&mut self, local: Mat4) {
        let combined = self.current() * local;
        self.stack.push(combined);
    }

    /// Undo the last [`push_transform`](Self::push_transform). The root
    /// transform is never popped.
    pub fn pop_transform(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn draw(&mut self, mesh: &'a Mesh, material: &'a Material, local: Mat4) {
        let model = self.current() * local;
        self.items.push(DrawItem {
            mesh,
            material,
            model,
        });
    }

    pub fn items(&self) -> &[DrawItem<'a>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for DrawList<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that animates over time and draws meshes.
pub trait Renderable {
    /// Advance to `time` seconds since the presentation started.
    fn update(&mut self, time: f32);

    fn draw<'a>(&'a self, list: &mut DrawList<'a>);
}

/// Something that owns viewport-sized resources.
pub trait Resizable {
    /// `width` and `height` are logical pixels; `dpr` the device pixel ratio.
    fn resize(&mut self, gpu: &GpuContext, width: f32, height: f32, dpr: f32);
}

/// Content hosted by a scene slot.
pub trait SceneContent: Renderable {
    fn name(&self) -> &str;

    /// Textures to decode before [`build`](Self::build) can run.
    fn textures(&self) -> Vec<TextureSource>;

    /// Create GPU resources from the decoded textures, in the order
    /// [`textures`](Self::textures) listed them.
    fn build(
        &mut self,
        gpu: &GpuContext,
        renderer: &SceneRenderer,
        images: Vec<DecodedImage>,
    ) -> Result<()>;

    fn is_built(&self) -> bool;
}

/// A mesh with its material and local transform.
pub struct Model {
    pub mesh: Mesh,
    pub material: Material,
    pub transform: Transform,
}

impl Model {
    pub fn new(mesh: Mesh, material: Material) -> Self {
        Self {
            mesh,
            material,
            transform: Transform::default(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

impl Renderable for Model {
    fn update(&mut self, _time: f32) {}

    fn draw<'a>(&'a self, list: &mut DrawList<'a>) {
        list.draw(&self.mesh, &self.material, self.transform.matrix());
    }
}

/// Time-driven rotation about an axis plus a vertical bob.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    pub axis: Vec3,
    /// Radians per second.
    pub spin: f32,
    /// Peak vertical offset of a `sin(time)` bob.
    pub bob: f32,
}

impl Motion {
    pub fn spin(axis: Vec3, radians_per_second: f32) -> Self {
        Self {
            axis: axis.normalize_or(Vec3::Y),
            spin: radians_per_second,
            bob: 0.0,
        }
    }

    pub fn with_bob(mut self, amplitude: f32) -> Self {
        self.bob = amplitude;
        self
    }

    /// `base` moved to where this motion puts it at `time`.
    pub fn apply(&self, base: Transform, time: f32) -> Transform {
        let rotation = base.rotation * Quat::from_axis_angle(self.axis, self.spin * time);
        let position = base.position + Vec3::Y * (self.bob * time.sin());
        base.rotation(rotation).position(position)
    }
}

/// Renderables sharing one transform.
pub struct Group {
    base: Transform,
    transform: Transform,
    motion: Option<Motion>,
    children: Vec<Box<dyn Renderable>>,
}

impl Group {
    pub fn new(transform: Transform) -> Self {
        Self {
            base: transform,
            transform,
            motion: None,
            children: Vec::new(),
        }
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = Some(motion);
        self
    }

    pub fn with_child(mut self, child: impl Renderable + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Renderable>) {
        self.children.push(child);
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Renderable for Group {
    fn update(&mut self, time: f32) {
        if let Some(motion) = &self.motion {
            self.transform = motion.apply(self.base, time);
        }
        for child in &mut self.children {
            child.update(time);
        }
    }

    fn draw<'a>(&'a self, list: &mut DrawList<'a>) {
        list.push_transform(self.transform.matrix());
        for child in &self.children {
            child.draw(list);
        }
        list.pop_transform();
    }
}
