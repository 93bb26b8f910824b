//! Environment lighting and backgrounds.
//!
//! Images are looked up along a list of candidate paths; the first one that
//! decodes is prefiltered and installed into the scene's environment slot.
//! When nothing decodes the scene falls back to a solid color.
//!
//! # Invariants
//! - A failed candidate never aborts the search; only exhausting the list does.
//! - The decoded source image is released once its prefiltered form exists.
//! - Uninstalling restores the previous environment only if the slot still
//!   holds the one being removed.

pub mod ground;
pub mod jobs;
pub mod loader;
pub mod paths;
pub mod prefilter;
pub mod slot;
pub mod studio;

pub use ground::GroundProjection;
pub use jobs::{EnvironmentJobs, EnvironmentRequest, JobResult, resolve};
pub use loader::{EnvironmentAsset, EnvironmentLoader, FALLBACK_COLOR, LoadAttempt, LoadOutcome};
pub use paths::candidate_paths;
pub use prefilter::{PrefilterConfig, PrefilteredEnvironment};
pub use slot::{Background, EnvironmentParams, EnvironmentSlot, InstallToken, SceneEnvironment};
pub use studio::{
    Lightformer, LightformerShape, STUDIO_RESOLUTION, StudioBackground, StudioRig,
    bake_lightformers, studio_lightformers,
};

/// Errors from environment loading.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("{file} not found in any of {tried} candidate paths")]
    NotFound { file: String, tried: usize },
    #[error("asset error: {0}")]
    Asset(#[from] glint_assets::AssetError),
    #[error("environment worker stopped")]
    WorkerGone,
}
