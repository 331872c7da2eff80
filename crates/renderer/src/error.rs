use std::fmt;

use thiserror::Error;

/// Failures surfaced by the renderer.
///
/// Only `TransientFrame` is recoverable per frame; `ResourceDecode` is absorbed
/// during configuration, kept for [`crate::EffectRenderer::mask_error`], and
/// rendering continues unmasked.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    ResourceDecode(#[from] DecodeError),

    #[error("frame dropped: {0}")]
    TransientFrame(FrameDrop),

    #[error("rendering device lost: {0}")]
    DeviceLost(String),

    #[error("GPU ran out of memory acquiring the surface")]
    OutOfMemory,
}

impl RenderError {
    /// True for errors that cost exactly one frame and nothing more.
    pub fn is_transient(&self) -> bool {
        matches!(self, RenderError::TransientFrame(_))
    }
}

/// Unrecoverable set-up failures reported from `configure`.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no rendering device available: {0}")]
    DeviceUnavailable(String),

    #[error("surface cannot be rendered to: {0}")]
    SurfaceUnsupported(String),

    #[error("failed to build the effect shading program: {0}")]
    PipelineCompile(String),
}

/// The mask bitmap could not be turned into a texture.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("mask bitmap is empty")]
    Empty,

    #[error("mask bitmap has zero extent ({width}x{height})")]
    ZeroExtent { width: u32, height: u32 },

    #[error("failed to decode mask bitmap: {0}")]
    Image(#[from] image::ImageError),

    #[error("mask bitmap is {width}x{height}, GPU textures are limited to {max_dimension}")]
    TooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },
}

/// Why a frame was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDrop {
    /// The presentable surface was not ready in time.
    SurfaceTimeout,
    /// The swapchain no longer matches the surface and was reconfigured.
    SurfaceOutdated,
    /// The surface was lost and has been reconfigured.
    SurfaceLost,
    /// Any other acquisition failure the backend could not classify.
    SurfaceUnavailable,
}

impl fmt::Display for FrameDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameDrop::SurfaceTimeout => f.write_str("surface timeout"),
            FrameDrop::SurfaceOutdated => f.write_str("surface outdated"),
            FrameDrop::SurfaceLost => f.write_str("surface lost"),
            FrameDrop::SurfaceUnavailable => f.write_str("surface unavailable"),
        }
    }
}

impl From<FrameDrop> for RenderError {
    fn from(value: FrameDrop) -> Self {
        RenderError::TransientFrame(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_frame_drops_are_transient() {
        assert!(RenderError::from(FrameDrop::SurfaceTimeout).is_transient());
        assert!(!RenderError::OutOfMemory.is_transient());
        assert!(!RenderError::DeviceLost("gone".into()).is_transient());
        assert!(!RenderError::from(ConfigurationError::PipelineCompile("x".into())).is_transient());
    }

    #[test]
    fn messages_name_the_failure() {
        let err = RenderError::from(FrameDrop::SurfaceOutdated);
        assert_eq!(err.to_string(), "frame dropped: surface outdated");
        let err = RenderError::from(ConfigurationError::DeviceUnavailable("no adapter".into()));
        assert_eq!(err.to_string(), "no rendering device available: no adapter");
    }
}
