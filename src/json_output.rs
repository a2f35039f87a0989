//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON del comando `optimize`,
//! per chi invoca la CLI da script.
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio elaborazione di un file
//! - `file_complete`: File ottimizzato con dimensioni e path di output
//! - `error`: Ottimizzazione fallita, con il tipo di errore
//! - `complete`: Fine processo con statistiche finali

use crate::error::OptimizeError;
use serde::{Deserialize, Serialize};

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        input: String,
        tool: String,
        index: usize,
        total: usize,
    },

    #[serde(rename = "file_complete")]
    FileComplete {
        input: String,
        output: String,
        original_size: u64,
        optimized_size: u64,
        reduction_percent: f64,
        duration_seconds: f64,
    },

    #[serde(rename = "error")]
    Error {
        input: Option<String>,
        kind: String,
        message: String,
    },

    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        files_optimized: usize,
        errors: usize,
        total_bytes_saved: u64,
        duration_seconds: f64,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di errore da un `OptimizeError`
    pub fn from_error(input: Option<&str>, error: &OptimizeError) -> Self {
        Self::Error {
            input: input.map(str::to_string),
            kind: format!("{:?}", error.kind()),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let msg = JsonMessage::Start {
            input: "models/cube.glb".to_string(),
            tool: "gltf-transform".to_string(),
            index: 0,
            total: 1,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "start");
        assert_eq!(value["input"], "models/cube.glb");
    }

    #[test]
    fn test_error_message_carries_kind() {
        let err = OptimizeError::NotFound("models/missing.glb".to_string());
        let value = serde_json::to_value(JsonMessage::from_error(Some("models/missing.glb"), &err)).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "NotFound");
        assert_eq!(value["message"], "Input file not found: models/missing.glb");
    }
}
