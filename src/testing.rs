//! In-memory doubles for the filesystem and process capabilities.

use crate::error::{OptimizeError, Result};
use crate::file_manager::FileSystem;
use crate::process_runner::{ExitOutcome, ProcessLauncher, ProcessResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<HashSet<PathBuf>>,
    read_only: AtomicBool,
    discard_under: Mutex<Option<PathBuf>>,
}

impl FakeFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: &[u8]) {
        self.files.lock().unwrap().insert(path.into(), contents.to_vec());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn set_writable(&self, writable: bool) {
        self.read_only.store(!writable, Ordering::SeqCst);
    }

    /// Accept writes below `prefix` without keeping them, like a file
    /// deleted right after upload
    pub fn discard_writes_under(&self, prefix: impl Into<PathBuf>) {
        *self.discard_under.lock().unwrap() = Some(prefix.into());
    }
}

#[async_trait]
impl FileSystem for FakeFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path) || self.dirs.lock().unwrap().contains(path)
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.dirs.lock().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    async fn is_writable_dir(&self, dir: &Path) -> bool {
        !self.read_only.load(Ordering::SeqCst) && self.dirs.lock().unwrap().contains(dir)
    }

    async fn file_size(&self, path: &Path) -> io::Result<u64> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut files = self.files.lock().unwrap();
        let contents = files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        let discarded = self
            .discard_under
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|prefix| path.starts_with(prefix));
        if !discarded {
            self.add_file(path, contents);
        }
        Ok(())
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.contents(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

/// What the fake `gltf-transform optimize` does
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Writes these bytes to the output argument and exits 0
    Succeed(Vec<u8>),
    /// Exits 0 without writing anything
    SucceedWithoutOutput,
    Exit { code: i32, stderr: String },
    Hang,
}

/// Scripted `ProcessLauncher` recording every argv it receives
pub struct FakeLauncher {
    fs: Arc<FakeFileSystem>,
    installed: bool,
    behavior: FakeBehavior,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeLauncher {
    pub fn new(fs: Arc<FakeFileSystem>, behavior: FakeBehavior) -> Self {
        Self {
            fs,
            installed: true,
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn missing_tool(fs: Arc<FakeFileSystem>) -> Self {
        Self {
            installed: false,
            ..Self::new(fs, FakeBehavior::SucceedWithoutOutput)
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn optimize_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|argv| argv.get(1).map(String::as_str) == Some("optimize"))
            .count()
    }
}

fn exited(code: i32, stdout: &str, stderr: &str) -> ProcessResult {
    ProcessResult {
        outcome: ExitOutcome::Exited(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        elapsed: Duration::from_millis(1),
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn run(&self, argv: &[String], timeout: Duration) -> Result<ProcessResult> {
        self.calls.lock().unwrap().push(argv.to_vec());

        if !self.installed {
            return Err(OptimizeError::ToolNotFound {
                tool: argv[0].clone(),
                reason: "No such file or directory (os error 2)".to_string(),
            });
        }

        if argv.get(1).map(String::as_str) == Some("--version") {
            return Ok(exited(0, "4.1.0\n", ""));
        }

        match &self.behavior {
            FakeBehavior::Succeed(bytes) => {
                self.fs.add_file(&argv[3], bytes);
                Ok(exited(0, "optimize: done\n", ""))
            }
            FakeBehavior::SucceedWithoutOutput => Ok(exited(0, "", "")),
            FakeBehavior::Exit { code, stderr } => Ok(exited(*code, "", stderr)),
            FakeBehavior::Hang => Ok(ProcessResult {
                outcome: ExitOutcome::TimedOut(timeout),
                stdout: "reading input\n".to_string(),
                stderr: String::new(),
                elapsed: timeout,
            }),
        }
    }
}
