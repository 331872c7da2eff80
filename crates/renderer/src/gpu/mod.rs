//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device and surface, and knows how to
//!   rebuild swapchain state when the window resizes or goes stale.
//! - `textures` uploads the photo and the mask, falling back to transparent
//!   placeholders.
//! - `pipeline` links the GLSL program against the two bind group layouts.
//! - `state` glues everything together as the `FrameBackend` used by
//!   `EffectRenderer`.

mod context;
mod pipeline;
mod state;
mod textures;

pub use state::GpuState;
