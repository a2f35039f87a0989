//! # GLB Optimizer Orchestrator
//!
//! Orchestratore che compone controllo del tool, risoluzione del path,
//! naming dell'output ed esecuzione di `gltf-transform optimize`.
//!
//! ## Flusso:
//! 1. `<tool> --version` (fallisce con `ToolNotFound`)
//! 2. Risoluzione dell'input (fallisce con `NotFound`)
//! 3. Allocazione output unico (fallisce con `DirectoryUnwritable`)
//! 4. `<tool> optimize <in> <staging> --compress draco --texture-compress webp --texture-size 1024`
//! 5. Verifica output non vuoto e rename atomico sul path finale

use crate::config::{Config, OptimizePolicy};
use crate::error::{FailureCause, OptimizeError, Result};
use crate::file_manager::{FileManager, FileSystem};
use crate::optimizer::output_namer::{OutputNamer, OutputTarget};
use crate::optimizer::path_resolver::PathResolver;
use crate::optimizer::tool_check::ToolCheck;
use crate::process_runner::ProcessLauncher;
use crate::utils::path_arg;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Inputs of one optimization after resolution
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub input_path: PathBuf,
    pub output: OutputTarget,
}

/// Single-shot GLB optimizer
pub struct GlbOptimizer {
    program: String,
    timeout: Duration,
    policy: OptimizePolicy,
    tool_check: ToolCheck,
    resolver: PathResolver,
    namer: OutputNamer,
    fs: Arc<dyn FileSystem>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl GlbOptimizer {
    /// Build an optimizer from injected capabilities.
    ///
    /// `program` is what goes in argv[0], normally the output of
    /// [`crate::tool_resolver::ToolPathResolver::program_for`].
    pub fn new(
        config: &Config,
        program: impl Into<String>,
        fs: Arc<dyn FileSystem>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        let program = program.into();
        Self {
            tool_check: ToolCheck::new(program.clone(), config.check_timeout(), launcher.clone()),
            resolver: PathResolver::new(&config.storage_root, fs.clone()),
            namer: OutputNamer::new(&config.storage_root, config.optimized_dir.clone(), fs.clone()),
            program,
            timeout: config.tool_timeout(),
            policy: config.policy.clone(),
            fs,
            launcher,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Run only the availability probe
    pub async fn check_available(&self) -> Result<String> {
        self.tool_check.check_available().await
    }

    /// Optimize `input_ref`, returning the storage-relative output path
    pub async fn optimize(&self, input_ref: &str) -> Result<String> {
        self.tool_check.check_available().await?;

        let input_path = self.resolver.resolve(input_ref).await?;
        let output = self.namer.new_output_path().await?;
        let request = OptimizationRequest { input_path, output };

        match self.run_request(&request).await {
            Ok(()) => {
                info!("GLB optimization successful: {} -> {}", input_ref, request.output.relative);
                Ok(request.output.relative)
            }
            Err(e) => {
                if let Err(cleanup) = self.fs.remove_file(&request.output.staging).await {
                    debug!("No staging file to remove at {}: {}", request.output.staging.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    /// Argument vector for one request
    pub fn build_argv(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut argv = crate::args![&self.program, "optimize", path_arg(input), path_arg(output)];
        argv.extend(self.policy.to_args());
        argv
    }

    async fn run_request(&self, request: &OptimizationRequest) -> Result<()> {
        let argv = self.build_argv(&request.input_path, &request.output.staging);
        info!("Executing optimizer: {}", argv.join(" "));

        let result = self.launcher.run(&argv, self.timeout).await?;

        if let Some(cause) = result.failure_cause() {
            error!("GLB optimization failed: {}", cause);
            error!("Exit code: {:?}", result.exit_code());
            error!("Error output: {}", result.stderr.trim_end());
            error!("Standard output: {}", result.stdout.trim_end());
            return Err(result.into_failure(cause));
        }

        debug!("Output from {}: {}", self.program, result.stdout.trim_end());

        let size = self.fs.file_size(&request.output.staging).await.unwrap_or(0);
        if size == 0 {
            warn!("{} exited 0 but {} is missing or empty", self.program, request.output.staging.display());
            return Err(result.into_failure(FailureCause::EmptyOutput));
        }

        self.fs
            .rename(&request.output.staging, &request.output.absolute)
            .await
            .map_err(OptimizeError::Io)?;

        if let Ok(original) = self.fs.file_size(&request.input_path).await {
            info!(
                "Optimized {} -> {} ({:.1}% smaller) in {:.1}s",
                FileManager::format_size(original),
                FileManager::format_size(size),
                FileManager::calculate_reduction(original, size),
                result.elapsed.as_secs_f64()
            );
        }

        Ok(())
    }
}
