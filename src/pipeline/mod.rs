//! Image-space post-processing.
//!
//! [`PostProcessChain`](chain::PostProcessChain) owns every intermediate
//! target and runs the passes in a fixed order each frame:
//!
//! ```text
//! ┌────────────┐   ┌──────┐   ┌────────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐
//! │ Transition │──▶│ FXAA │──▶│ Luminosity │──▶│ Blur × 5 │──▶│ Bloom sum │──▶│ Composite │──▶ surface
//! └────────────┘   └──────┘   └────────────┘   └──────────┘   └───────────┘   └───────────┘
//! ```
//!
//! Sizing lives in [`layout`], the bloom maths in [`bloom`]. Both are pure so
//! they can be tested without a GPU.

pub mod bloom;
pub mod chain;
pub mod fullscreen;
pub mod layout;
pub mod render_target;

pub use bloom::{BloomFactors, BloomSettings, LuminositySettings};
pub use chain::{ChainState, PostProcessChain};
pub use layout::{Extent, TargetLayout, Viewport};
pub use render_target::RenderTarget;
