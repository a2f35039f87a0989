//! # Output Naming Module
//!
//! Genera destinazioni uniche per i modelli ottimizzati:
//! `<optimized-dir>/<uuid>-optimized.glb`, più un path di staging nella
//! stessa directory usato fino al rename atomico.

use crate::error::{OptimizeError, Result};
use crate::file_manager::FileSystem;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Destination for one optimization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Storage-relative final path, returned to callers
    pub relative: String,
    /// Absolute final path
    pub absolute: PathBuf,
    /// Absolute path the tool writes to before the rename
    pub staging: PathBuf,
}

pub struct OutputNamer {
    storage_root: PathBuf,
    optimized_dir: String,
    fs: Arc<dyn FileSystem>,
}

impl OutputNamer {
    pub fn new(storage_root: impl Into<PathBuf>, optimized_dir: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            storage_root: storage_root.into(),
            optimized_dir: optimized_dir.into(),
            fs,
        }
    }

    /// Allocate a fresh output path, creating the directory if needed
    pub async fn new_output_path(&self) -> Result<OutputTarget> {
        let dir = self.storage_root.join(&self.optimized_dir);

        self.fs.create_dir_all(&dir).await.map_err(|e| {
            debug!("Failed to create {}: {}", dir.display(), e);
            OptimizeError::DirectoryUnwritable(dir.clone())
        })?;

        if !self.fs.is_writable_dir(&dir).await {
            return Err(OptimizeError::DirectoryUnwritable(dir));
        }

        let id = Uuid::new_v4();
        let file_name = format!("{}-optimized.glb", id);
        // gltf-transform picks the writer from the extension, keep .glb last
        let staging_name = format!("{}-optimized.partial.glb", id);

        Ok(OutputTarget {
            relative: format!("{}/{}", self.optimized_dir.trim_end_matches('/'), file_name),
            absolute: dir.join(&file_name),
            staging: dir.join(staging_name),
        })
    }
}
