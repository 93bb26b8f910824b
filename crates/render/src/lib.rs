//! Rendering adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers never mutate settings or the scene description.
//! - Everything drawn derives from the composed scene and the view.

mod renderer;

pub use renderer::{DebugTextRenderer, RenderView, Renderer};
