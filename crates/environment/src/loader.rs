//! Fallback loading of environment images across candidate paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glint_assets::EquirectImage;
use glint_common::Color;

use crate::EnvironmentError;
use crate::paths::candidate_paths;
use crate::prefilter::{PrefilterConfig, PrefilteredEnvironment};

/// Background shown when no candidate decodes.
pub const FALLBACK_COLOR: Color = Color::rgb(18.0 / 255.0, 18.0 / 255.0, 18.0 / 255.0);

/// One failed candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadAttempt {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded {
        path: PathBuf,
        environment: Arc<PrefilteredEnvironment>,
    },
    Fallback {
        color: Color,
        attempts: Vec<LoadAttempt>,
    },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// Something an environment request produced, ready to be installed.
#[derive(Debug, Clone)]
pub enum EnvironmentAsset {
    Prefiltered(Arc<PrefilteredEnvironment>),
    /// An unfiltered panorama, shown on a sphere and never used for lighting.
    Panorama(Arc<EquirectImage>),
    Missing { color: Color },
}

impl From<LoadOutcome> for EnvironmentAsset {
    fn from(outcome: LoadOutcome) -> Self {
        match outcome {
            LoadOutcome::Loaded { environment, .. } => EnvironmentAsset::Prefiltered(environment),
            LoadOutcome::Fallback { color, .. } => EnvironmentAsset::Missing { color },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvironmentLoader {
    roots: Vec<PathBuf>,
    config: PrefilterConfig,
}

impl EnvironmentLoader {
    pub fn new(roots: Vec<PathBuf>, config: PrefilterConfig) -> Self {
        Self { roots, config }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn config(&self) -> PrefilterConfig {
        self.config
    }

    /// Try every candidate for `file_name` in order and prefilter the first
    /// image that decodes.
    pub fn load(&self, file_name: &str) -> LoadOutcome {
        match self.first_image(file_name) {
            Ok((path, image)) => {
                tracing::info!(
                    "environment {} loaded from {} ({}x{})",
                    file_name,
                    path.display(),
                    image.width,
                    image.height
                );
                let environment = Arc::new(PrefilteredEnvironment::from_equirect(image, self.config));
                LoadOutcome::Loaded { path, environment }
            }
            Err(attempts) => {
                tracing::warn!(
                    "all {} candidates for {} failed, using solid background {}",
                    attempts.len(),
                    file_name,
                    FALLBACK_COLOR
                );
                LoadOutcome::Fallback {
                    color: FALLBACK_COLOR,
                    attempts,
                }
            }
        }
    }

    /// Same search as [`load`](Self::load) but returns the raw image.
    pub fn load_image(&self, file_name: &str) -> Result<(PathBuf, EquirectImage), EnvironmentError> {
        self.first_image(file_name)
            .map_err(|attempts| EnvironmentError::NotFound {
                file: file_name.to_string(),
                tried: attempts.len(),
            })
    }

    fn first_image(&self, file_name: &str) -> Result<(PathBuf, EquirectImage), Vec<LoadAttempt>> {
        let mut attempts = Vec::new();
        for path in candidate_paths(file_name, &self.roots) {
            tracing::debug!("trying {}", path.display());
            match try_open(&path) {
                Ok(image) => return Ok((path, image)),
                Err(err) => {
                    tracing::debug!("{} failed: {}", path.display(), err);
                    attempts.push(LoadAttempt {
                        path,
                        error: err.to_string(),
                    });
                }
            }
        }
        Err(attempts)
    }
}

fn try_open(path: &Path) -> Result<EquirectImage, EnvironmentError> {
    Ok(EquirectImage::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> PrefilterConfig {
        PrefilterConfig {
            base_width: 16,
            levels: 3,
            samples: 8,
            irradiance_width: 4,
            irradiance_samples: 16,
        }
    }

    #[test]
    fn first_decodable_candidate_wins() {
        let bad = tempfile::tempdir().unwrap();
        let good = tempfile::tempdir().unwrap();
        std::fs::write(bad.path().join("sky.hdr"), b"not an image").unwrap();
        EquirectImage::solid(16, 8, [1.0, 0.5, 0.25])
            .write_hdr(good.path().join("sky.hdr"))
            .unwrap();

        let loader = EnvironmentLoader::new(
            vec![bad.path().to_path_buf(), good.path().to_path_buf()],
            tiny(),
        );
        match loader.load("/sky.hdr") {
            LoadOutcome::Loaded { path, environment } => {
                assert_eq!(path, good.path().join("sky.hdr"));
                let c = environment.sample(glam::Vec3::X, 0.0);
                assert!((c.x - 1.0).abs() < 0.05, "{c:?}");
            }
            other => panic!("expected load, got {other:?}"),
        }
    }

    #[test]
    fn exhausted_candidates_fall_back() {
        let empty = tempfile::tempdir().unwrap();
        let loader = EnvironmentLoader::new(vec![empty.path().to_path_buf()], tiny());
        match loader.load("no-such-file-7f3a.hdr") {
            LoadOutcome::Fallback { color, attempts } => {
                assert_eq!(color.to_hex(), "#121212");
                assert_eq!(attempts.len(), 6);
                assert_eq!(attempts[1].path, empty.path().join("no-such-file-7f3a.hdr"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn load_image_reports_not_found() {
        let loader = EnvironmentLoader::new(Vec::new(), tiny());
        assert!(matches!(
            loader.load_image("missing-0b1c.jpg"),
            Err(EnvironmentError::NotFound { tried: 5, .. })
        ));
    }

    #[test]
    fn fallback_outcome_becomes_missing_asset() {
        let outcome = LoadOutcome::Fallback {
            color: FALLBACK_COLOR,
            attempts: Vec::new(),
        };
        assert!(!outcome.is_loaded());
        assert!(matches!(
            EnvironmentAsset::from(outcome),
            EnvironmentAsset::Missing { .. }
        ));
    }
}
