//! Scene slots and the logic that decides which two are on screen.
//!
//! Each section of the presentation owns a [`SceneSlot`] that renders its
//! content into a private target. The [`SceneHost`] keeps only the pair the
//! [`ScrollCoupler`] points at visible, and the [`TransitionStage`] blends
//! that pair into one image.
//!
//! ```text
//! scroll ─► ScrollCoupler ─► (index1, index2, progress)
//!                                   │
//!                      SceneHost::activate ─► slots[index1], slots[index2]
//!                                   │
//!                          TransitionStage ─► PostProcessChain
//! ```

pub mod content;
pub mod host;
pub mod renderer;
pub mod scroll;
pub mod sections;
pub mod showcase;
pub mod slot;
pub mod transition;

pub use content::{DrawList, Group, Model, Motion, Renderable, Resizable, SceneContent};
pub use host::{SceneHost, SlotVisibility};
pub use scroll::{BlendState, ScrollCoupler, ScrollSettings};
pub use sections::{SectionDescriptor, load_sections, parse_sections};
pub use showcase::{Showcase, ShowcaseKind};
pub use slot::SceneSlot;
pub use transition::{TransitionParams, TransitionStage, sample_transition};
