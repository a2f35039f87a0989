//! # Utility Functions Module
//!
//! Helpers for building argument vectors for the external optimizer.

use std::path::Path;

/// Lossy string form of a path, for argv entries and log lines
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Macro for argument building with mixed item types.
///
/// # Example
/// ```rust,ignore
/// use glb_optimizer::args;
///
/// let size = 1024;
/// let args = args!["--texture-size", size, "--compress", "draco"];
/// assert_eq!(args[1], "1024");
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$(::std::string::ToString::to_string(&$item)),*]
    };
}
