//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file.
//!
//! ## Responsabilità:
//! - Definisce il trait `FileSystem`, la capability iniettata nell'optimizer
//! - Implementazione `LocalFileSystem` basata su `tokio::fs`
//! - Determinazione del MIME type dei modelli (magic `glTF` + estensione)
//! - Utilità per dimensioni e percentuali di riduzione
//!
//! ## Operazioni sui file:
//! - `exists()` / `file_size()`: Validazione esistenza e dimensione
//! - `create_dir_all()` / `is_writable_dir()`: Preparazione directory di output
//! - `rename()`: Spostamento atomico dell'output finale
//! - `write()` / `read()`: Salvataggio upload e lettura per download
//!
//! ## Esempio:
//! ```rust,ignore
//! let fs = LocalFileSystem;
//! if fs.exists(&path).await {
//!     let size = fs.file_size(&path).await?;
//! }
//! ```

use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs;

/// Filesystem capability used by the optimizer, the store and the upload handler
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Whether a new file can be created inside `dir`
    async fn is_writable_dir(&self, dir: &Path) -> bool;
    async fn file_size(&self, path: &Path) -> io::Result<u64>;
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    async fn remove_file(&self, path: &Path) -> io::Result<()>;
    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn is_writable_dir(&self, dir: &Path) -> bool {
        // Permission bits lie for root and ACLs, so probe with a real file
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || {
            dir.is_dir() && tempfile::NamedTempFile::new_in(&dir).is_ok()
        })
        .await
        .unwrap_or(false)
    }

    async fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }
}

pub const GLB_MIME: &str = "model/gltf-binary";
pub const GLTF_MIME: &str = "model/gltf+json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Stateless file helpers
pub struct FileManager;

impl FileManager {
    /// MIME type for an uploaded model.
    ///
    /// The `glTF` magic wins over anything the client claims; after that the
    /// client content type, then the extension.
    pub fn detect_mime(contents: &[u8], file_name: &str, client_mime: Option<&str>) -> String {
        if contents.starts_with(b"glTF") {
            return GLB_MIME.to_string();
        }

        if let Some(mime) = client_mime.map(str::trim).filter(|m| !m.is_empty()) {
            return mime.to_string();
        }

        match Self::extension(file_name).as_deref() {
            Some("glb") => GLB_MIME.to_string(),
            Some("gltf") => GLTF_MIME.to_string(),
            _ => OCTET_STREAM.to_string(),
        }
    }

    /// Lowercased extension of a client file name, if it has a sane one
    pub fn extension(file_name: &str) -> Option<String> {
        Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
