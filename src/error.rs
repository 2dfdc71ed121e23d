//! Error type shared by every fallible operation in the crate.

use std::path::PathBuf;

/// Errors produced while configuring, loading or rendering a presentation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A texture could not be read or decoded.
    #[error("failed to load asset '{path}': {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid section data: {0}")]
    SectionData(#[from] serde_json::Error),

    /// Blending needs two adjacent scenes, so fewer than two sections is unusable.
    #[error("at least 2 sections are required, found {0}")]
    TooFewSections(usize),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// A readiness handle was dropped before its work completed.
    #[error("asset loading was interrupted before '{0}' completed")]
    LoadInterrupted(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
