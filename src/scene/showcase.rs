//! The three built-in scene contents.

use super::content::{DrawList, Group, Model, Motion, Renderable, SceneContent};
use super::renderer::{MaterialParams, SceneRenderer};
use crate::assets::{DecodedImage, TextureSource};
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, MeshData, Transform};
use crate::texture::Texture;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Size of the generated texture used when a section names no map.
const PROCEDURAL_SIZE: u32 = 256;

/// Which built-in content a section shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowcaseKind {
    /// Tilted icosphere spinning slowly.
    Planet,
    /// Octahedron that spins and bobs.
    Crystal,
    /// Cube tumbling about a tilted axis.
    Cube,
}

impl ShowcaseKind {
    pub const ALL: [ShowcaseKind; 3] = [ShowcaseKind::Planet, ShowcaseKind::Crystal, ShowcaseKind::Cube];

    /// The kind used for a section that does not name one.
    pub fn cycled(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            ShowcaseKind::Planet => "planet",
            ShowcaseKind::Crystal => "crystal",
            ShowcaseKind::Cube => "cube",
        }
    }

    fn material(self) -> MaterialParams {
        match self {
            ShowcaseKind::Planet => MaterialParams {
                roughness: 1.0,
                ..MaterialParams::default()
            },
            _ => MaterialParams::default(),
        }
    }

    fn mesh(self) -> MeshData {
        match self {
            ShowcaseKind::Planet => MeshData::icosphere(0.6, 12),
            ShowcaseKind::Crystal => MeshData::octahedron(1.0),
            ShowcaseKind::Cube => MeshData::cube(),
        }
    }

    /// Build the node hierarchy around `model`.
    fn assemble(self, model: Model) -> Group {
        match self {
            ShowcaseKind::Planet => {
                let spinning = Group::new(Transform::new())
                    .with_motion(Motion::spin(Vec3::Y, 0.3))
                    .with_child(model);
                Group::new(Transform::new().rotation(Quat::from_rotation_z(25f32.to_radians())))
                    .with_child(spinning)
            }
            ShowcaseKind::Crystal => {
                let model = model.with_transform(Transform::new().scale(Vec3::new(0.5, 1.0, 0.5)));
                Group::new(Transform::new())
                    .with_motion(Motion::spin(Vec3::Y, 0.6).with_bob(0.1))
                    .with_child(model)
            }
            ShowcaseKind::Cube => {
                let model = model
                    .with_transform(Transform::new().rotation(Quat::from_rotation_z(-45f32.to_radians())));
                let spinning = Group::new(Transform::new())
                    .with_motion(Motion::spin(Vec3::Y, -0.3))
                    .with_child(model);
                Group::new(Transform::new().rotation(Quat::from_rotation_x(-45f32.to_radians())))
                    .with_child(spinning)
            }
        }
    }
}

/// A built-in content, textured from a file or a generated surface.
pub struct Showcase {
    kind: ShowcaseKind,
    map: Option<PathBuf>,
    seed: u32,
    root: Option<Group>,
}

impl Showcase {
    pub fn new(kind: ShowcaseKind, map: Option<PathBuf>, seed: u32) -> Self {
        Self {
            kind,
            map,
            seed,
            root: None,
        }
    }

    pub fn kind(&self) -> ShowcaseKind {
        self.kind
    }
}

impl Renderable for Showcase {
    fn update(&mut self, time: f32) {
        if let Some(root) = &mut self.root {
            root.update(time);
        }
    }

    fn draw<'a>(&'a self, list: &mut DrawList<'a>) {
        if let Some(root) = &self.root {
            root.draw(list);
        }
    }
}

impl SceneContent for Showcase {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn textures(&self) -> Vec<TextureSource> {
        let source = match &self.map {
            Some(path) => TextureSource::File(path.clone()),
            None => TextureSource::Procedural {
                label: format!("{} pitted metal", self.kind.name()),
                size: PROCEDURAL_SIZE,
                seed: self.seed,
            },
        };
        vec![source]
    }

    fn build(
        &mut self,
        gpu: &GpuContext,
        renderer: &SceneRenderer,
        images: Vec<DecodedImage>,
    ) -> Result<()> {
        let Some(map) = images.into_iter().next() else {
            return Err(Error::LoadInterrupted(format!("{} texture", self.kind.name())));
        };

        let texture = Texture::from_image(gpu, &map.image, &map.label);
        let material = renderer.create_material(gpu, texture, self.kind.material());
        let mesh = Mesh::new(gpu, &self.kind.mesh());
        self.root = Some(self.kind.assemble(Model::new(mesh, material)));

        log::debug!("built {} content", self.kind.name());
        Ok(())
    }

    fn is_built(&self) -> bool {
        self.root.is_some()
    }
}
