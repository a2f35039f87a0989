//! # Tool Availability Module
//!
//! Verifica che il tool esterno sia presente ed eseguibile lanciando
//! `<tool> --version`. Eseguito ad ogni ottimizzazione, mai in cache.

use crate::error::{OptimizeError, Result};
use crate::process_runner::ProcessLauncher;
use crate::tool_resolver::ToolPathResolver;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ToolCheck {
    program: String,
    timeout: Duration,
    launcher: Arc<dyn ProcessLauncher>,
}

impl ToolCheck {
    pub fn new(program: impl Into<String>, timeout: Duration, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            program: program.into(),
            timeout,
            launcher,
        }
    }

    /// Run the version probe, returning the reported version
    pub async fn check_available(&self) -> Result<String> {
        let argv = crate::args![&self.program, "--version"];
        let result = self.launcher.run(&argv, self.timeout).await.map_err(|e| {
            let reason = match e {
                OptimizeError::ToolNotFound { reason, .. } => reason,
                other => other.to_string(),
            };
            OptimizeError::ToolNotFound {
                tool: self.program.clone(),
                reason: format!("{} (install with: {})", reason, ToolPathResolver::install_instructions(&self.program)),
            }
        })?;

        if let Some(cause) = result.failure_cause() {
            let detail = if result.stderr.trim().is_empty() {
                cause.to_string()
            } else {
                format!("{}: {}", cause, result.stderr.trim())
            };
            return Err(OptimizeError::ToolNotFound {
                tool: self.program.clone(),
                reason: detail,
            });
        }

        let version = result.stdout.trim().to_string();
        debug!("{} available, version {}", self.program, version);
        Ok(version)
    }
}
