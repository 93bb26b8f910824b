//! Shared value types used across the viewer crates.

mod color;
mod types;

pub use color::{Color, ColorParseError, srgb_to_linear};
pub use types::{Aabb, Transform};
