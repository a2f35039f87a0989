//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con storage, tool e limiti di upload
//! - Definisce `OptimizePolicy`, i flag passati a `gltf-transform optimize`
//! - Fornisce validazione dei parametri
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `storage_root`: Radice dei path relativi di storage
//! - `models_dir`: Directory degli upload originali (default: "models")
//! - `optimized_dir`: Directory degli output (default: "optimized-models")
//! - `tool`: Nome o path del tool (default: "gltf-transform")
//! - `tool_timeout_secs`: Timeout dell'ottimizzazione (default: 300)
//! - `check_timeout_secs`: Timeout del controllo `--version` (default: 10)
//! - `policy`: Draco + WebP + texture 1024px
//! - `max_upload_bytes`: Limite upload (default: 50MB)
//! - `listen`: Indirizzo del server HTTP (default: 127.0.0.1:8080)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     tool_timeout_secs: 120,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Compression flags handed to `gltf-transform optimize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizePolicy {
    /// Mesh compression codec (`--compress`)
    pub compress: String,
    /// Texture re-encoding format (`--texture-compress`)
    pub texture_compress: String,
    /// Maximum texture edge in pixels (`--texture-size`)
    pub texture_size: u32,
}

impl Default for OptimizePolicy {
    fn default() -> Self {
        Self {
            compress: "draco".to_string(),
            texture_compress: "webp".to_string(),
            texture_size: 1024,
        }
    }
}

impl OptimizePolicy {
    /// Flags appended after `optimize <input> <output>`
    pub fn to_args(&self) -> Vec<String> {
        crate::args![
            "--compress",
            &self.compress,
            "--texture-compress",
            &self.texture_compress,
            "--texture-size",
            self.texture_size,
        ]
    }
}

/// Configuration for the optimizer and the upload service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root that storage-relative paths are joined against
    pub storage_root: PathBuf,
    /// Directory (relative to the root) receiving original uploads
    pub models_dir: String,
    /// Directory (relative to the root) receiving optimized models
    pub optimized_dir: String,
    /// Optimizer binary, bare name or path
    pub tool: String,
    /// Hard wall-clock limit for one optimization
    pub tool_timeout_secs: u64,
    /// Limit for the `--version` probe
    pub check_timeout_secs: u64,
    pub policy: OptimizePolicy,
    /// Largest accepted upload
    pub max_upload_bytes: u64,
    /// Address of the HTTP server
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            models_dir: "models".to_string(),
            optimized_dir: "optimized-models".to_string(),
            tool: "gltf-transform".to_string(),
            tool_timeout_secs: 300,
            check_timeout_secs: 10,
            policy: OptimizePolicy::default(),
            max_upload_bytes: 51_200 * 1024,
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("glb-optimizer").join("storage"))
        .unwrap_or_else(|| PathBuf::from("storage"))
}

impl Config {
    /// Config rooted at `storage_root`, everything else default
    pub fn with_storage_root(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Default::default()
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.tool.trim().is_empty() {
            return Err(anyhow::anyhow!("Optimizer tool must not be empty"));
        }

        if self.tool_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Tool timeout must be greater than 0"));
        }

        if self.check_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Availability check timeout must be greater than 0"));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum upload size must be greater than 0"));
        }

        if self.policy.texture_size == 0 {
            return Err(anyhow::anyhow!("Texture size must be greater than 0"));
        }

        for (label, dir) in [("models_dir", &self.models_dir), ("optimized_dir", &self.optimized_dir)] {
            let path = Path::new(dir);
            if dir.is_empty() || path.is_absolute() || dir.split('/').any(|c| c == "..") {
                return Err(anyhow::anyhow!("{} must be a relative path inside the storage root: {:?}", label, dir));
            }
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
