//! # Optimizer Module
//!
//! Modulo che separa le responsabilità della pipeline in sottomoduli:
//! - `glb_optimizer`: Orchestratore principale
//! - `tool_check`: Controllo disponibilità del tool esterno
//! - `path_resolver`: Risoluzione dei riferimenti di input
//! - `output_namer`: Generazione dei path di output unici

pub mod glb_optimizer;
pub mod output_namer;
pub mod path_resolver;
pub mod tool_check;

pub use glb_optimizer::{GlbOptimizer, OptimizationRequest};
pub use output_namer::{OutputNamer, OutputTarget};
pub use path_resolver::PathResolver;
pub use tool_check::ToolCheck;
