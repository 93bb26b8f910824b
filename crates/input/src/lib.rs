//! Keyboard input mapped to high-level viewer actions.
//!
//! # Invariants
//! - The viewer consumes actions, never raw key events.
//! - Settings-side effects of an action go through the settings handlers,
//!   so the same consistency rules apply as for the panel.

pub mod action;

pub use action::{Action, CAMERA_HELP, KeyBinding, apply, default_bindings, lookup};
