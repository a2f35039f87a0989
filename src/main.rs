//! # GLB Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione e override da CLI
//! - Dispatch dei sottocomandi
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` ha la precedenza)
//! 3. Carica il file di configurazione e applica gli override
//! 4. Esegue il sottocomando (`serve`, `optimize`, `check`, `list`, `init-config`)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! glb-optimizer serve --listen 0.0.0.0:8080 --storage-root ./storage
//! glb-optimizer optimize models/cube.glb --json
//! glb-optimizer check --verbose
//! glb-optimizer init-config glb-optimizer.json --storage-root /srv/models
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use glb_optimizer::file_manager::FileManager;
use glb_optimizer::json_output::JsonMessage;
use glb_optimizer::progress::{OptimizationStats, ProgressManager};
use glb_optimizer::tool_resolver::ToolPathResolver;
use glb_optimizer::{server, Config, UploadHandler};

#[derive(Parser)]
#[command(name = "glb-optimizer")]
#[command(about = "Compress GLB models with gltf-transform and serve uploads")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for stored models
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Optimizer executable name or path
    #[arg(long, global = true)]
    tool: Option<String>,

    /// Seconds before an optimization run is killed
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP upload service
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8080
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Optimize files already on disk
    Optimize {
        /// Storage-relative or filesystem paths of GLB files
        #[arg(required = true)]
        files: Vec<String>,

        /// Emit one JSON message per event on stdout
        #[arg(long)]
        json: bool,
    },

    /// Report whether the optimizer tool can be run
    Check,

    /// Print stored model records as JSON
    List,

    /// Write the effective configuration to a JSON file
    InitConfig {
        /// Destination file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args).await?;

    match args.command {
        Command::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            let handler = UploadHandler::from_config(config).await?;
            server::serve(Arc::new(handler), &listen).await
        }
        Command::Optimize { files, json } => optimize_files(config, &files, json).await,
        Command::Check => check_tool(config).await,
        Command::List => {
            let handler = UploadHandler::from_config(config).await?;
            println!("{}", serde_json::to_string_pretty(&handler.store().list().await)?);
            Ok(())
        }
        Command::InitConfig { path } => {
            config.save_to_file(&path).await?;
            info!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

async fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            Config::from_file(path).await?
        }
        None => Config::default(),
    };

    if let Some(root) = &args.storage_root {
        config.storage_root = root.clone();
    }
    if let Some(tool) = &args.tool {
        config.tool = tool.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.tool_timeout_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

async fn optimize_files(config: Config, files: &[String], json: bool) -> Result<()> {
    let tool = config.tool.clone();
    let handler = UploadHandler::from_config(config).await?;
    let optimizer = handler.optimizer();

    let progress = if json {
        ProgressManager::hidden()
    } else {
        ProgressManager::new(files.len() as u64)
    };
    let mut stats = OptimizationStats::new();
    let started = Instant::now();

    for (index, file) in files.iter().enumerate() {
        if json {
            JsonMessage::Start {
                input: file.clone(),
                tool: tool.clone(),
                index,
                total: files.len(),
            }
            .emit();
        }
        progress.set_message(&format!("Optimizing {}", file));

        let file_started = Instant::now();
        let original_size = match optimizer.resolver().resolve(file).await {
            Ok(path) => tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0),
            Err(_) => 0,
        };

        match optimizer.optimize(file).await {
            Ok(relative) => {
                let output = optimizer.resolver().storage_path(&relative);
                let optimized_size = tokio::fs::metadata(&output).await.map(|m| m.len()).unwrap_or(0);
                stats.add_optimized(original_size, optimized_size);

                if json {
                    JsonMessage::FileComplete {
                        input: file.clone(),
                        output: output.display().to_string(),
                        original_size,
                        optimized_size,
                        reduction_percent: FileManager::calculate_reduction(original_size, optimized_size),
                        duration_seconds: file_started.elapsed().as_secs_f64(),
                    }
                    .emit();
                } else {
                    progress.println(&format!("{} -> {}", file, output.display()));
                }
            }
            Err(e) => {
                stats.add_error();
                if json {
                    JsonMessage::from_error(Some(file), &e).emit();
                } else {
                    error!("Failed to optimize {}: {}", file, e);
                }
            }
        }

        progress.update(file);
    }

    progress.finish(&stats.format_summary());

    if json {
        JsonMessage::Complete {
            files_processed: stats.files_processed,
            files_optimized: stats.files_optimized,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            duration_seconds: started.elapsed().as_secs_f64(),
        }
        .emit();
    } else {
        info!("{}", stats.format_summary());
    }

    if stats.errors > 0 {
        return Err(anyhow::anyhow!("{} of {} files failed to optimize", stats.errors, files.len()));
    }

    Ok(())
}

async fn check_tool(config: Config) -> Result<()> {
    println!("{}", ToolPathResolver::new().get_tools_report(&config.tool));

    let handler = UploadHandler::from_config(config).await?;
    let version = handler.optimizer().check_available().await?;
    println!("Optimizer available: {}", version);

    Ok(())
}
