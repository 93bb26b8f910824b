//! wgpu render backend for the viewer.
//!
//! The scene is drawn into an HDR offscreen target (background, meshes,
//! shadow catcher, gizmo), then bloom and the tone-mapping composite write
//! the surface. Orbit and first-person cameras live here as well.
//!
//! # Invariants
//! - The renderer never mutates the scene description or the settings.
//! - GPU resources are re-uploaded only when the model id or the
//!   environment `Arc`s change.
//! - Tone mapping always runs; vignette, chromatic aberration and bloom
//!   follow the scene's effect nodes.

mod camera;
mod gpu;
mod shaders;

pub use camera::{CameraRig, FirstPersonCamera, GRAVITY, JUMP_SPEED, Lens, OrbitCamera};
pub use gpu::{FrameInput, HDR_FORMAT, WgpuRenderer};
