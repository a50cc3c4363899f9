use std::path::{Path, PathBuf};

use geodir_shared::models::GeoEntity;

use crate::storage::{Storage, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load a JSON array of entities from disk.
pub fn load(path: &Path) -> Result<Vec<GeoEntity>, SeedError> {
    let data = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace the catalogue with the contents of a seed file.
pub fn import(path: &Path, storage: &Storage) -> Result<usize, SeedError> {
    let entities = load(path)?;
    storage.replace_all(&entities)?;

    let public = entities.iter().filter(|e| e.status.is_public()).count();
    tracing::info!(
        path = %path.display(),
        entities = entities.len(),
        public,
        "Imported entity seed"
    );
    Ok(entities.len())
}
