//! # GLB Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per il server HTTP
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore dell'ottimizzazione e classificazione
//! - `file_manager`: Capability filesystem, MIME e utility sulle dimensioni
//! - `process_runner`: Esecuzione di processi esterni con timeout
//! - `tool_resolver`: Ricerca dell'eseguibile `gltf-transform`
//! - `optimizer`: Controllo tool, risoluzione path, naming output e orchestrazione
//! - `store`: Persistenza dei record dei modelli
//! - `upload`: Upload con fallback all'originale
//! - `server`: Endpoint HTTP `axum`
//! - `progress` / `json_output`: Feedback del comando `optimize`
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use glb_optimizer::{Config, UploadHandler};
//!
//! let handler = UploadHandler::from_config(Config::default()).await?;
//! let optimized = handler.optimizer().optimize("models/cube.glb").await?;
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod optimizer;
pub mod process_runner;
pub mod progress;
pub mod server;
pub mod store;
pub mod tool_resolver;
pub mod upload;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::{Config, OptimizePolicy};
pub use error::{ErrorKind, OptimizeError};
pub use optimizer::GlbOptimizer;
pub use store::{ModelRecord, ModelStore};
pub use upload::{UploadHandler, UploadOutcome, UploadedFile};
