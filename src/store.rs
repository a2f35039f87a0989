//! # Model Store Module
//!
//! Questo modulo gestisce la persistenza dei metadati dei modelli caricati.
//!
//! ## Responsabilità:
//! - Assegna id incrementali ai nuovi `ModelRecord`
//! - Persiste i record in un file JSON sotto la radice di storage
//! - Fornisce lookup per id (download) e lista ordinata
//!
//! ## Strategia di persistence:
//! - Un unico documento `models.json` nella radice di storage
//! - Scrittura su file temporaneo e rename atomico
//! - Documento mancante o corrotto: si riparte vuoti con un warning
//! - Accesso serializzato da un `tokio::sync::Mutex`
//!
//! ## Esempio struttura file:
//! ```json
//! {
//!   "next_id": 3,
//!   "models": {
//!     "1": {
//!       "id": 1,
//!       "name": "cube.glb",
//!       "path": "optimized-models/8f1c...-optimized.glb",
//!       "size": 1048576,
//!       "type": "model/gltf-binary",
//!       "created_at": 1760745600
//!     }
//!   }
//! }
//! ```

use crate::error::{OptimizeError, Result};
use crate::file_manager::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Metadata of one uploaded model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: u64,
    /// Client-side file name
    pub name: String,
    /// Storage-relative path of the file that is served
    pub path: String,
    /// Upload size in bytes
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub created_at: u64,
}

/// Fields supplied by the upload handler
#[derive(Debug, Clone)]
pub struct NewModel {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    models: BTreeMap<u64, ModelRecord>,
}

/// JSON-file backed model metadata
pub struct ModelStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    state: Mutex<StoreFile>,
}

impl ModelStore {
    /// Open the store at `path`, starting empty if the file is absent
    pub async fn open(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let path = path.into();

        let state = if fs.exists(&path).await {
            let content = fs.read(&path).await?;
            match serde_json::from_slice::<StoreFile>(&content) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Ignoring unreadable model store {}: {}", path.display(), e);
                    StoreFile::default()
                }
            }
        } else {
            StoreFile::default()
        };

        debug!("Opened model store {} with {} records", path.display(), state.models.len());

        Ok(Self {
            path,
            fs,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a record, assigning the next id
    pub async fn create(&self, model: NewModel) -> Result<ModelRecord> {
        let mut state = self.state.lock().await;

        let last_id = state.models.keys().next_back().copied().unwrap_or(0);
        let id = state.next_id.max(last_id + 1).max(1);

        let record = ModelRecord {
            id,
            name: model.name,
            path: model.path,
            size: model.size,
            mime_type: model.mime_type,
            created_at: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };

        state.models.insert(id, record.clone());
        state.next_id = id + 1;

        if let Err(e) = self.save(&state).await {
            state.models.remove(&id);
            state.next_id = id;
            return Err(e);
        }

        Ok(record)
    }

    pub async fn get(&self, id: u64) -> Option<ModelRecord> {
        self.state.lock().await.models.get(&id).cloned()
    }

    /// All records ordered by id
    pub async fn list(&self) -> Vec<ModelRecord> {
        self.state.lock().await.models.values().cloned().collect()
    }

    async fn save(&self, state: &StoreFile) -> Result<()> {
        let content = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            self.fs.create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        self.fs.write(&tmp, &content).await?;
        self.fs
            .rename(&tmp, &self.path)
            .await
            .map_err(|e| OptimizeError::Store(format!("failed to replace {}: {}", self.path.display(), e)))
    }
}
