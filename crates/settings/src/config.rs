//! YAML persistence of the settings record.
//!
//! A settings file holds any subset of the record's fields; missing fields
//! take their defaults and unknown fields are rejected.

use std::path::Path;

use glint_common::ColorParseError;

use crate::settings::ViewerSettings;

/// Errors from settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid color: {0}")]
    Color(#[from] ColorParseError),
    #[error("unknown option: {0}")]
    UnknownOption(String),
}

impl ViewerSettings {
    /// Parse a settings document.
    pub fn from_yaml(text: &str) -> Result<Self, SettingsError> {
        let mut settings: ViewerSettings = serde_yaml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_yaml(&self) -> Result<String, SettingsError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load settings from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml(&text)?;
        tracing::info!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_yaml()?)?;
        tracing::info!("settings saved to {}", path.display());
        Ok(())
    }

    /// Bring a freshly deserialized record in line with the handler rules.
    fn validate(&mut self) -> Result<(), SettingsError> {
        if !crate::HDR_OPTIONS.contains(&self.selected_hdr.as_str()) {
            return Err(SettingsError::UnknownOption(self.selected_hdr.clone()));
        }
        if !crate::PANORAMA_OPTIONS.contains(&self.selected_panorama.as_str()) {
            return Err(SettingsError::UnknownOption(self.selected_panorama.clone()));
        }
        let scale = self.model_scale;
        self.model_scale = scale.clamp(
            crate::settings::MODEL_SCALE_MIN,
            crate::settings::MODEL_SCALE_MAX,
        );
        if !self.ground_projection_available() {
            self.enable_ground_projection = false;
        }
        self.drain_events();
        Ok(())
    }
}
