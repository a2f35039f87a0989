//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare tutti gli errori possibili
//! - Conserva la diagnostica del tool esterno (exit code, stdout, stderr)
//! - Espone `ErrorKind` per decisioni del chiamante senza matching sui campi
//!
//! ## Categorie di errori:
//! - `ToolNotFound`: `gltf-transform` assente o non eseguibile
//! - `NotFound`: riferimento di input inesistente
//! - `DirectoryUnwritable`: directory di output non scrivibile
//! - `OptimizationFailed`: timeout, exit code non zero, output vuoto
//! - `Validation`: upload non valido (vuoto, troppo grande)
//! - `Store`: errori del file JSON dei modelli
//! - `Io`: errori di I/O generici
//!
//! ## Esempio:
//! ```rust,ignore
//! match optimizer.optimize("models/cube.glb").await {
//!     Ok(path) => info!("optimized: {}", path),
//!     Err(e) if e.kind() == ErrorKind::ToolNotFound => warn!("install gltf-transform"),
//!     Err(e) => warn!("fallback to original: {}", e),
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Why a run of the optimizer did not produce a usable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// Wall-clock budget exceeded, the child was killed
    Timeout(Duration),
    /// The tool ran and reported failure
    NonZeroExit(i32),
    /// Killed by a signal we did not send
    Terminated,
    /// Exit code 0 but the output file is missing or empty
    EmptyOutput,
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            Self::NonZeroExit(code) => write!(f, "process failed with exit code {}", code),
            Self::Terminated => write!(f, "process terminated by signal"),
            Self::EmptyOutput => write!(f, "tool reported success but wrote no output"),
        }
    }
}

/// Custom error types for GLB optimization and uploads
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("{tool} not found or not executable: {reason}")]
    ToolNotFound { tool: String, reason: String },

    #[error("Input file not found: {0}")]
    NotFound(String),

    #[error("Output directory not writable: {}", .0.display())]
    DirectoryUnwritable(PathBuf),

    #[error("GLB optimization failed: {cause}{}", stderr_suffix(.stderr))]
    OptimizationFailed {
        cause: FailureCause,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// Flat classification of [`OptimizeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ToolNotFound,
    NotFound,
    DirectoryUnwritable,
    Timeout,
    NonZeroExit,
    Terminated,
    EmptyOutput,
    InvalidArgument,
    Validation,
    Store,
    Io,
}

impl OptimizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DirectoryUnwritable(_) => ErrorKind::DirectoryUnwritable,
            Self::OptimizationFailed { cause, .. } => match cause {
                FailureCause::Timeout(_) => ErrorKind::Timeout,
                FailureCause::NonZeroExit(_) => ErrorKind::NonZeroExit,
                FailureCause::Terminated => ErrorKind::Terminated,
                FailureCause::EmptyOutput => ErrorKind::EmptyOutput,
            },
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Store(_) | Self::Json(_) => ErrorKind::Store,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// True for every failure the upload path downgrades to a fallback
    pub fn is_optimization_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ToolNotFound
                | ErrorKind::NotFound
                | ErrorKind::DirectoryUnwritable
                | ErrorKind::Timeout
                | ErrorKind::NonZeroExit
                | ErrorKind::Terminated
                | ErrorKind::EmptyOutput
        )
    }
}

pub type Result<T> = std::result::Result<T, OptimizeError>;
