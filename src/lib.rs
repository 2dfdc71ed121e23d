//! # Strata
//!
//! **Scroll through a stack of 3D scenes, blended and bloomed on the GPU.**
//!
//! Every section of a presentation renders its own scene off-screen. As the
//! scroll position moves between two sections, their images are blended by a
//! displacement transition and run through anti-aliasing, a five-mip bloom
//! and ACES tone mapping before reaching the window.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> strata::Result<()> {
//!     env_logger::init();
//!     let config = strata::StrataConfig::load_or_default();
//!     strata::run(config)
//! }
//! ```
//!
//! ## Embedding
//!
//! [`Presentation`] can be driven without the bundled window loop: create a
//! [`GpuContext`], call [`Presentation::load`] and [`Presentation::animate_in`],
//! then feed it [`Presentation::set_scroll`], [`Presentation::resize`] and
//! [`Presentation::frame`] from your own event handling.
//!
//! ## Layout
//!
//! - [`scene`]: scene slots, the host that shows the active pair, scroll smoothing and the transition
//! - [`pipeline`]: target sizing, bloom maths and the post-processing chain
//! - [`shadow`]: a percentage-closer soft shadow sampler usable on the CPU or as WGSL
//! - [`tunables`]: the parameters a control panel may change at runtime

mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod error;
pub mod gpu;
pub mod input;
pub mod mesh;
pub mod pipeline;
mod presentation;
pub mod scene;
pub mod shadow;
pub mod texture;
pub mod tunables;

pub use app::run;
pub use assets::{AssetLoader, DecodeWorker, DecodedImage, Pending, TextureSource, join_all};
pub use camera::Camera;
pub use config::StrataConfig;
pub use error::{Error, Result};
pub use gpu::GpuContext;
pub use mesh::{Mesh, MeshData, Transform, Vertex3d};
pub use pipeline::{PostProcessChain, TargetLayout, Viewport};
pub use presentation::Presentation;
pub use scene::{BlendState, SceneHost, SceneSlot, ScrollCoupler, SlotVisibility, TransitionStage};
pub use shadow::{DepthMap, ShadowConfig, ShadowSampler};
pub use texture::Texture;
pub use tunables::{Tunable, Tunables};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
