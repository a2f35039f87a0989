//! # Path Resolution Module
//!
//! Centralizza la risoluzione dei riferimenti di input in path assoluti.
//! Un riferimento può essere una chiave di storage relativa o un path reale:
//! prima si prova la radice di storage, poi il path letterale.

use crate::error::{OptimizeError, Result};
use crate::file_manager::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Resolves storage keys and raw paths to existing absolute paths
#[derive(Clone)]
pub struct PathResolver {
    storage_root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl PathResolver {
    pub fn new(storage_root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            storage_root: storage_root.into(),
            fs,
        }
    }

    /// Absolute path of a storage key, without checking existence
    pub fn storage_path(&self, key: &str) -> PathBuf {
        self.storage_root.join(key)
    }

    /// Resolve `reference` to an existing file
    pub async fn resolve(&self, reference: &str) -> Result<PathBuf> {
        if reference.trim().is_empty() {
            return Err(OptimizeError::NotFound(reference.to_string()));
        }

        let literal = Path::new(reference);

        // Joining an absolute path replaces the root, so this also covers absolute refs
        let in_storage = self.storage_root.join(literal);
        if self.fs.exists(&in_storage).await {
            debug!("Resolved {} inside storage: {}", reference, in_storage.display());
            return Ok(absolutize(in_storage));
        }

        if !literal.is_absolute() && self.fs.exists(literal).await {
            debug!("Resolved {} as literal path", reference);
            return Ok(absolutize(literal.to_path_buf()));
        }

        debug!("Could not resolve {} (storage root {})", reference, self.storage_root.display());
        Err(OptimizeError::NotFound(reference.to_string()))
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::file_manager::LocalFileSystem;
    use tempfile::TempDir;

    fn resolver(root: &Path) -> PathResolver {
        PathResolver::new(root, Arc::new(LocalFileSystem))
    }

    #[tokio::test]
    async fn test_storage_relative_first() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("models")).unwrap();
        std::fs::write(temp.path().join("models/cube.glb"), b"glTF").unwrap();

        let resolved = resolver(temp.path()).resolve("models/cube.glb").await.unwrap();
        assert_eq!(resolved, temp.path().join("models/cube.glb"));
        assert!(resolved.is_absolute());
    }

    #[tokio::test]
    async fn test_absolute_reference() {
        let storage = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let file = elsewhere.path().join("raw.glb");
        std::fs::write(&file, b"glTF").unwrap();

        let resolved = resolver(storage.path())
            .resolve(&file.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(resolved, file);
    }

    #[tokio::test]
    async fn test_missing_reference_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = resolver(temp.path()).resolve("models/missing.glb").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = resolver(temp.path()).resolve("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = resolver(temp.path())
            .resolve("/definitely/not/here.glb")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_literal_relative_fallback() {
        let fs = crate::testing::FakeFileSystem::new();
        fs.add_file("public/models/upload.glb", b"glTF");
        let resolver = PathResolver::new("/srv/storage", Arc::new(fs));

        let resolved = resolver.resolve("public/models/upload.glb").await.unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("public/models/upload.glb"));
    }
}
