//! # Upload Handling Module
//!
//! Questo modulo collega storage, optimizer e model store.
//!
//! ## Responsabilità:
//! - Validazione dell'upload (non vuoto, entro `max_upload_bytes`)
//! - Salvataggio dell'originale in `<models_dir>/<uuid>.<ext>`
//! - Invocazione dell'optimizer con fallback all'originale su qualsiasi errore
//! - Creazione del `ModelRecord` con il path effettivo
//! - Risoluzione dei download per id
//!
//! ## Politica errori:
//! - Errori di ottimizzazione: warning + fallback, l'upload riesce comunque
//! - Errori di storage o persistence: propagati come fallimento dell'upload

use crate::config::Config;
use crate::error::{OptimizeError, Result};
use crate::file_manager::{FileManager, FileSystem, LocalFileSystem};
use crate::optimizer::{GlbOptimizer, PathResolver};
use crate::process_runner::SubprocessRunner;
use crate::store::{ModelRecord, ModelStore, NewModel};
use crate::tool_resolver::ToolPathResolver;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Model store document, relative to the storage root
pub const STORE_FILE: &str = "models.json";

/// A file as received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
    pub client_mime: Option<String>,
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub model: ModelRecord,
    /// Path now served for the model; the original when optimization failed
    pub optimized_path: String,
    #[serde(skip)]
    pub optimization_error: Option<String>,
}

pub struct UploadHandler {
    config: Config,
    optimizer: GlbOptimizer,
    store: ModelStore,
    fs: Arc<dyn FileSystem>,
    resolver: PathResolver,
}

impl UploadHandler {
    pub fn new(config: Config, optimizer: GlbOptimizer, store: ModelStore, fs: Arc<dyn FileSystem>) -> Self {
        let resolver = PathResolver::new(&config.storage_root, fs.clone());
        Self {
            config,
            optimizer,
            store,
            fs,
            resolver,
        }
    }

    /// Wire the real filesystem, subprocess runner and JSON store for `config`
    pub async fn from_config(config: Config) -> Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem);
        let program = ToolPathResolver::new().program_for(&config.tool);
        info!("Using optimizer {} (storage root {})", program, config.storage_root.display());

        fs.create_dir_all(&config.storage_root).await?;
        let optimizer = GlbOptimizer::new(&config, program, fs.clone(), Arc::new(SubprocessRunner::new()));
        let store = ModelStore::open(config.storage_root.join(STORE_FILE), fs.clone()).await?;

        Ok(Self::new(config, optimizer, store, fs))
    }

    pub fn optimizer(&self) -> &GlbOptimizer {
        &self.optimizer
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.config.max_upload_bytes
    }

    /// Store, optimize and record an upload
    pub async fn upload(&self, file: UploadedFile) -> Result<UploadOutcome> {
        self.validate(&file)?;

        let stored_path = self.store_original(&file).await?;
        info!("Stored upload {} as {}", file.original_name, stored_path);

        let (effective_path, optimization_error) = match self.optimizer.optimize(&stored_path).await {
            Ok(optimized) => (optimized, None),
            Err(e) => {
                if e.is_optimization_failure() {
                    warn!("GLB Optimization Error: {}", e);
                } else {
                    error!("GLB Optimization Error ({:?}): {}", e.kind(), e);
                }
                (stored_path.clone(), Some(e.to_string()))
            }
        };

        let mime_type =
            FileManager::detect_mime(&file.bytes, &file.original_name, file.client_mime.as_deref());

        let model = self
            .store
            .create(NewModel {
                name: file.original_name,
                path: effective_path.clone(),
                size: file.bytes.len() as u64,
                mime_type,
            })
            .await?;

        Ok(UploadOutcome {
            model,
            optimized_path: effective_path,
            optimization_error,
        })
    }

    /// Record and absolute path of a stored model
    pub async fn download(&self, id: u64) -> Result<(ModelRecord, PathBuf)> {
        let record = self
            .store
            .get(id)
            .await
            .ok_or_else(|| OptimizeError::NotFound(format!("model {}", id)))?;
        let path = self.resolver.resolve(&record.path).await?;
        Ok((record, path))
    }

    fn validate(&self, file: &UploadedFile) -> Result<()> {
        if file.bytes.is_empty() {
            return Err(OptimizeError::Validation("The model file is empty.".to_string()));
        }

        let max = self.config.max_upload_bytes;
        if file.bytes.len() as u64 > max {
            return Err(OptimizeError::Validation(format!(
                "The model file may not be greater than {} kilobytes.",
                max / 1024
            )));
        }

        Ok(())
    }

    async fn store_original(&self, file: &UploadedFile) -> Result<String> {
        let extension = FileManager::extension(&file.original_name).unwrap_or_else(|| "glb".to_string());
        let dir = self.config.models_dir.trim_end_matches('/');
        let relative = format!("{}/{}.{}", dir, Uuid::new_v4(), extension);

        let absolute = self.resolver.storage_path(&relative);
        if let Some(parent) = absolute.parent() {
            self.fs.create_dir_all(parent).await?;
        }
        self.fs.write(&absolute, &file.bytes).await?;

        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{FakeBehavior, FakeFileSystem, FakeLauncher};
    use std::path::Path;

    const ROOT: &str = "/srv/storage";

    async fn handler(fs: Arc<FakeFileSystem>, launcher: FakeLauncher) -> UploadHandler {
        let config = Config::with_storage_root(ROOT);
        let optimizer = GlbOptimizer::new(&config, "gltf-transform", fs.clone(), Arc::new(launcher));
        let store = ModelStore::open(Path::new(ROOT).join("models.json"), fs.clone())
            .await
            .unwrap();
        UploadHandler::new(config, optimizer, store, fs)
    }

    fn cube() -> UploadedFile {
        UploadedFile {
            original_name: "cube.glb".to_string(),
            bytes: b"glTF\x02\x00\x00\x00original".to_vec(),
            client_mime: Some("application/octet-stream".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upload_records_optimized_path() {
        let fs = Arc::new(FakeFileSystem::new());
        let launcher = FakeLauncher::new(fs.clone(), FakeBehavior::Succeed(b"glTF-small".to_vec()));
        let handler = handler(fs.clone(), launcher).await;

        let outcome = handler.upload(cube()).await.unwrap();
        assert!(outcome.optimized_path.starts_with("optimized-models/"));
        assert_eq!(outcome.model.path, outcome.optimized_path);
        assert_eq!(outcome.model.name, "cube.glb");
        assert_eq!(outcome.model.size, 16);
        assert_eq!(outcome.model.mime_type, "model/gltf-binary");
        assert!(outcome.optimization_error.is_none());

        let (record, path) = handler.download(outcome.model.id).await.unwrap();
        assert_eq!(record, outcome.model);
        assert_eq!(fs.contents(&path).unwrap(), b"glTF-small");
    }

    #[tokio::test]
    async fn test_failed_optimization_falls_back_to_original() {
        let fs = Arc::new(FakeFileSystem::new());
        let launcher = FakeLauncher::new(
            fs.clone(),
            FakeBehavior::Exit {
                code: 1,
                stderr: "bad file".to_string(),
            },
        );
        let handler = handler(fs.clone(), launcher).await;

        let outcome = handler.upload(cube()).await.unwrap();
        assert!(outcome.optimized_path.starts_with("models/"));
        assert!(outcome.optimized_path.ends_with(".glb"));
        assert_eq!(outcome.model.path, outcome.optimized_path);
        assert!(outcome.optimization_error.unwrap().contains("bad file"));

        let (_, path) = handler.download(outcome.model.id).await.unwrap();
        assert_eq!(fs.contents(&path).unwrap(), cube().bytes);
    }

    #[tokio::test]
    async fn test_missing_tool_still_uploads() {
        let fs = Arc::new(FakeFileSystem::new());
        let handler = handler(fs.clone(), FakeLauncher::missing_tool(fs.clone())).await;

        let outcome = handler.upload(cube()).await.unwrap();
        assert!(outcome.model.path.starts_with("models/"));
    }

    #[tokio::test]
    async fn test_vanished_upload_falls_back_with_not_found() {
        let fs = Arc::new(FakeFileSystem::new());
        let launcher = FakeLauncher::new(fs.clone(), FakeBehavior::Succeed(b"glTF".to_vec()));
        let handler = handler(fs.clone(), launcher).await;
        fs.discard_writes_under(Path::new(ROOT).join("models"));

        let outcome = handler.upload(cube()).await.unwrap();
        assert!(outcome.model.path.starts_with("models/"));
        assert!(outcome.optimization_error.unwrap().contains("not found"));

        // the record points at the original, which is gone
        let err = handler.download(outcome.model.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_validation() {
        let fs = Arc::new(FakeFileSystem::new());
        let launcher = FakeLauncher::new(fs.clone(), FakeBehavior::SucceedWithoutOutput);
        let handler = handler(fs, launcher).await;

        let empty = UploadedFile {
            bytes: Vec::new(),
            ..cube()
        };
        assert_eq!(handler.upload(empty).await.unwrap_err().kind(), ErrorKind::Validation);

        let huge = UploadedFile {
            bytes: vec![0u8; (handler.max_upload_bytes() + 1) as usize],
            ..cube()
        };
        assert_eq!(handler.upload(huge).await.unwrap_err().kind(), ErrorKind::Validation);
        assert!(handler.store().list().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let fs = Arc::new(FakeFileSystem::new());
        let launcher = FakeLauncher::new(fs.clone(), FakeBehavior::SucceedWithoutOutput);
        let handler = handler(fs.clone(), launcher).await;
        fs.set_writable(false);

        let err = handler.upload(cube()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_unknown_download_is_not_found() {
        let fs = Arc::new(FakeFileSystem::new());
        let launcher = FakeLauncher::new(fs.clone(), FakeBehavior::SucceedWithoutOutput);
        let handler = handler(fs, launcher).await;

        assert_eq!(handler.download(7).await.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
