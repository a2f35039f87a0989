//! # Subprocess Runner Module
//!
//! Questo modulo esegue il tool esterno e ne raccoglie l'output.
//!
//! ## Responsabilità:
//! - Definisce il trait `ProcessLauncher`, la capability iniettata nell'optimizer
//! - Lancia il processo con un argv esatto (mai tramite shell)
//! - Legge stdout e stderr in parallelo, riga per riga, loggando lo stream di origine
//! - Applica un timeout wall-clock e termina il processo allo scadere
//! - Ritorna sempre stream catturati ed exit status, anche in caso di fallimento
//!
//! ## Esiti possibili (`ExitOutcome`):
//! - `Exited(code)`: il processo è terminato da solo
//! - `Terminated`: ucciso da un segnale esterno
//! - `TimedOut(limit)`: ucciso da noi allo scadere del timeout
//!
//! ## Esempio:
//! ```rust,ignore
//! let runner = SubprocessRunner::new();
//! let argv = args!["gltf-transform", "--version"];
//! let result = runner.run(&argv, Duration::from_secs(10)).await?;
//! if result.success() {
//!     info!("version: {}", result.stdout.trim());
//! }
//! ```

use crate::error::{FailureCause, OptimizeError, Result};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Upper bound on captured text per stream; lines past it are only logged
const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// How long the pipes may stay open once the child is gone
const PUMP_GRACE: Duration = Duration::from_millis(500);

/// How a launched process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Terminated,
    TimedOut(Duration),
}

/// Captured result of one process run
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub outcome: ExitOutcome,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.outcome == ExitOutcome::Exited(0)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            ExitOutcome::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// `None` when the run succeeded
    pub fn failure_cause(&self) -> Option<FailureCause> {
        match self.outcome {
            ExitOutcome::Exited(0) => None,
            ExitOutcome::Exited(code) => Some(FailureCause::NonZeroExit(code)),
            ExitOutcome::Terminated => Some(FailureCause::Terminated),
            ExitOutcome::TimedOut(limit) => Some(FailureCause::Timeout(limit)),
        }
    }

    /// Turn the captured diagnostics into an `OptimizationFailed` error
    pub fn into_failure(self, cause: FailureCause) -> OptimizeError {
        OptimizeError::OptimizationFailed {
            cause,
            exit_code: self.exit_code(),
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

/// Process launching capability
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run `argv[0]` with `argv[1..]`, killing it after `timeout`.
    ///
    /// Every launch failure comes back as `ToolNotFound`; every process that
    /// actually started yields `Ok`.
    async fn run(&self, argv: &[String], timeout: Duration) -> Result<ProcessResult>;
}

/// `ProcessLauncher` backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn label(self) -> &'static str {
        match self {
            Self::Stdout => "STDOUT",
            Self::Stderr => "STDERR",
        }
    }
}

#[async_trait]
impl ProcessLauncher for SubprocessRunner {
    async fn run(&self, argv: &[String], timeout: Duration) -> Result<ProcessResult> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| OptimizeError::InvalidArgument("empty argument vector".to_string()))?;

        debug!("Executing process: {}", argv.join(" "));
        let start_time = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let stdout = Arc::new(Mutex::new(String::new()));
        let stderr = Arc::new(Mutex::new(String::new()));
        let stdout_pump = tokio::spawn(pump_lines(child.stdout.take(), StreamKind::Stdout, stdout.clone()));
        let stderr_pump = tokio::spawn(pump_lines(child.stderr.take(), StreamKind::Stderr, stderr.clone()));

        // Only the child's own exit counts against the budget, pipes held open
        // by its descendants do not
        let outcome = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => match status?.code() {
                Some(code) => ExitOutcome::Exited(code),
                None => ExitOutcome::Terminated,
            },
            Err(_) => {
                warn!("{} exceeded {:?}, terminating", program, timeout);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", program, e);
                }
                ExitOutcome::TimedOut(timeout)
            }
        };

        drain(stdout_pump, StreamKind::Stdout).await;
        drain(stderr_pump, StreamKind::Stderr).await;

        let elapsed = start_time.elapsed();
        debug!("{} finished with {:?} in {:?}", program, outcome, elapsed);

        Ok(ProcessResult {
            outcome,
            stdout: take_capture(&stdout),
            stderr: take_capture(&stderr),
            elapsed,
        })
    }
}

/// A program that cannot be started is reported as missing, whatever the OS said
fn spawn_error(program: &str, error: io::Error) -> OptimizeError {
    OptimizeError::ToolNotFound {
        tool: program.to_string(),
        reason: error.to_string(),
    }
}

/// Wait up to `PUMP_GRACE` for a pump to reach EOF, then stop it
async fn drain(mut pump: JoinHandle<()>, stream: StreamKind) {
    if tokio::time::timeout(PUMP_GRACE, &mut pump).await.is_err() {
        debug!("{} still open after exit, detaching", stream.label());
        pump.abort();
    }
}

fn take_capture(sink: &Mutex<String>) -> String {
    std::mem::take(&mut *sink.lock().unwrap_or_else(|e| e.into_inner()))
}

/// Forward every line of `reader` to the log and into `sink`
async fn pump_lines<R>(reader: Option<R>, stream: StreamKind, sink: Arc<Mutex<String>>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                debug!("{} > {}", stream.label(), text.trim_end());
                let mut sink = sink.lock().unwrap_or_else(|e| e.into_inner());
                if sink.len() + text.len() <= MAX_CAPTURE_BYTES {
                    sink.push_str(&text);
                }
            }
            Err(e) => {
                warn!("Failed reading {}: {}", stream.label(), e);
                break;
            }
        }
    }
}
