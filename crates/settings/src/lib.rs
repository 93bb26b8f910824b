//! Viewer settings: the single flat record that drives the scene.
//!
//! # Invariants
//! - All mutations flow through explicit handlers and are logged as events.
//! - Ground projection is off whenever a panorama or the studio environment
//!   is active.

pub mod config;
pub mod options;
pub mod settings;

pub use config::SettingsError;
pub use options::{
    HDR_OPTIONS, PANORAMA_OPTIONS, SHADOW_COLOR_PRESETS, ShadowColorPreset, hdr_label,
};
pub use settings::{
    EnvironmentType, PanoramaType, Setting, SettingsEvent, StudioPreset, ViewerSettings,
};
