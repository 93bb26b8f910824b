//! Asset pipeline: binary glTF models, equirectangular images, animation.
//!
//! Models are identified by content-addressed hashes so dropping the same
//! file twice reuses the imported asset.

pub mod animation;
pub mod equirect;
pub mod model;

pub use animation::{AnimationClip, AnimationPlayer, FADE_SECONDS};
pub use equirect::{EquirectImage, direction_to_uv, uv_to_direction};
pub use model::{
    Material, MeshData, ModelAsset, ModelSummary, Node, import_glb, import_path, is_model_file,
};

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Content-addressed asset ID computed from the file bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        AssetId(u64::from_le_bytes(head))
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("glTF parse error: {0}")]
    GltfParse(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("not a .glb file: {0}")]
    NotAModel(String),
}

/// Content-addressed cache of imported models.
#[derive(Debug, Default)]
pub struct AssetStore {
    models: BTreeMap<AssetId, Arc<ModelAsset>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import `.glb` bytes, or return the cached model with the same content.
    pub fn insert_glb(
        &mut self,
        name: &str,
        bytes: &[u8],
    ) -> Result<(AssetId, Arc<ModelAsset>), AssetError> {
        let id = AssetId::of_bytes(bytes);
        if let Some(model) = self.models.get(&id) {
            tracing::debug!("model {id} already imported");
            return Ok((id, model.clone()));
        }
        let model = Arc::new(import_glb(name, bytes)?);
        self.models.insert(id, model.clone());
        Ok((id, model))
    }

    /// Read a `.glb` file from disk and import it.
    pub fn load_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<(AssetId, Arc<ModelAsset>), AssetError> {
        let path = path.as_ref();
        if !is_model_file(path) {
            return Err(AssetError::NotAModel(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("model.glb");
        self.insert_glb(name, &bytes)
    }

    pub fn get(&self, id: AssetId) -> Option<&Arc<ModelAsset>> {
        self.models.get(&id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[test]
    fn content_addressed_dedup() {
        let mut store = AssetStore::new();
        let bytes = fixtures::triangle_glb();
        let (id1, a) = store.insert_glb("a.glb", &bytes).unwrap();
        let (id2, b) = store.insert_glb("b.glb", &bytes).unwrap();
        assert_eq!(id1, id2);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
        assert!(store.get(id1).is_some());
    }

    #[test]
    fn load_path_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.obj");
        std::fs::write(&path, b"o cube").unwrap();
        let mut store = AssetStore::new();
        assert!(matches!(
            store.load_path(&path),
            Err(AssetError::NotAModel(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn load_path_reads_glb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.glb");
        std::fs::write(&path, fixtures::triangle_glb()).unwrap();
        let mut store = AssetStore::new();
        let (_, model) = store.load_path(&path).unwrap();
        assert_eq!(model.name, "tri.glb");
    }

    #[test]
    fn asset_id_display_is_hex() {
        let id = AssetId(0xab);
        assert_eq!(id.to_string(), "00000000000000ab");
    }
}
