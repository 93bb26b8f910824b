//! Scene composition.
//!
//! The viewer does not keep a mutable scene graph. Every frame the settings
//! record is turned into an ordered [`SceneDescription`], and the renderer
//! draws whatever nodes it contains.
//!
//! # Invariants
//! - Node order matches draw order: background, model, shadows, lights,
//!   environment, panorama, effects, floors, controls, post-processing.
//! - At most one environment node and one controls node are present.
//! - The panorama replaces the environment; it never coexists with it.

pub mod compose;
pub mod geometry;
pub mod rings;
pub mod shadow;
pub mod summary;

pub use compose::{
    AccumulativeShadows, Bloom, CameraDefaults, GIZMO_SCALE, LightingNode, ModelNode, ModelState,
    NodeKind, PostProcessing, RandomizedLight, ReflectiveFloor, SceneDescription, SceneNode,
    SoftShadows, StandardFloor, compose,
};
pub use rings::{RingInstance, RingSet};
pub use shadow::{ShadowBaker, ShadowMap};
pub use summary::SceneSummary;
