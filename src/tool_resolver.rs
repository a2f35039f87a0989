//! # Tool Path Resolver
//!
//! This module handles finding the `gltf-transform` executable:
//! - Explicit path from configuration
//! - `TOOLS_DIR` environment override
//! - Project-local npm install (`node_modules/.bin`)
//! - System `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// npm package that ships the `gltf-transform` binary
pub const GLTF_TRANSFORM_PACKAGE: &str = "@gltf-transform/cli";

/// Tool path resolver for different deployment environments
pub struct ToolPathResolver {
    /// Directory searched before PATH (from `TOOLS_DIR`)
    tools_dir: Option<PathBuf>,
    /// Directory whose `node_modules/.bin` is searched
    project_dir: Option<PathBuf>,
    /// Value of PATH at construction time
    search_path: Option<std::ffi::OsString>,
}

impl ToolPathResolver {
    /// Create a new path resolver from the process environment
    pub fn new() -> Self {
        Self {
            tools_dir: env::var_os("TOOLS_DIR").map(PathBuf::from),
            project_dir: env::current_dir().ok(),
            search_path: env::var_os("PATH"),
        }
    }

    /// Resolver with explicit search locations, for tests and embedding
    pub fn with_locations(
        tools_dir: Option<PathBuf>,
        project_dir: Option<PathBuf>,
        search_path: Option<std::ffi::OsString>,
    ) -> Self {
        Self {
            tools_dir,
            project_dir,
            search_path,
        }
    }

    /// Resolve the path to a specific tool.
    ///
    /// A configured value containing a path separator is taken literally.
    pub fn resolve_tool(&self, tool: &str) -> Option<PathBuf> {
        debug!("Resolving tool: {}", tool);

        if tool.contains(std::path::MAIN_SEPARATOR) || tool.contains('/') {
            let path = PathBuf::from(tool);
            return path.is_file().then_some(path);
        }

        let file_name = format!("{}{}", tool, env::consts::EXE_SUFFIX);

        if let Some(ref tools_dir) = self.tools_dir {
            let candidate = tools_dir.join(&file_name);
            debug!("Checking TOOLS_DIR: {:?}", candidate);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if let Some(ref project_dir) = self.project_dir {
            let candidate = project_dir.join("node_modules").join(".bin").join(&file_name);
            debug!("Checking local npm install: {:?}", candidate);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        self.find_in_system_path(&file_name)
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, file_name: &str) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        env::split_paths(search_path)
            .map(|dir| dir.join(file_name))
            .find(|path| path.is_file())
    }

    /// Program to put in argv[0]: the resolved path, or the bare name so the
    /// launch failure itself reports the problem
    pub fn program_for(&self, tool: &str) -> String {
        self.resolve_tool(tool)
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| tool.to_string())
    }

    /// Installation instructions for the optimizer
    pub fn install_instructions(tool: &str) -> String {
        let name = Path::new(tool)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| tool.to_string());

        if name == "gltf-transform" {
            format!("npm install --global {}", GLTF_TRANSFORM_PACKAGE)
        } else {
            format!("install '{}' and make sure it is on PATH", name)
        }
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self, tool: &str) -> String {
        let mut report = String::new();
        report.push_str("Tool Path Resolver Report\n");
        report.push_str(&format!("TOOLS_DIR: {:?}\n", self.tools_dir));
        report.push_str(&format!("Project dir: {:?}\n\n", self.project_dir));

        match self.resolve_tool(tool) {
            Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", tool, path)),
            None => report.push_str(&format!(
                "  ❌ {} (install with: {})\n",
                tool,
                Self::install_instructions(tool)
            )),
        }

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"#!/bin/sh\n").unwrap();
    }

    #[test]
    fn test_tools_dir_wins_over_path() {
        let temp = TempDir::new().unwrap();
        let tools = temp.path().join("tools");
        let bin = temp.path().join("bin");
        let exe = format!("gltf-transform{}", env::consts::EXE_SUFFIX);
        touch(&tools.join(&exe));
        touch(&bin.join(&exe));

        let resolver = ToolPathResolver::with_locations(
            Some(tools.clone()),
            None,
            Some(env::join_paths([&bin]).unwrap()),
        );
        assert_eq!(resolver.resolve_tool("gltf-transform"), Some(tools.join(&exe)));
    }

    #[test]
    fn test_local_node_modules() {
        let temp = TempDir::new().unwrap();
        let exe = format!("gltf-transform{}", env::consts::EXE_SUFFIX);
        let local = temp.path().join("node_modules").join(".bin").join(&exe);
        touch(&local);

        let resolver = ToolPathResolver::with_locations(None, Some(temp.path().to_path_buf()), None);
        assert_eq!(resolver.resolve_tool("gltf-transform"), Some(local));
    }

    #[test]
    fn test_missing_tool_keeps_bare_name() {
        let temp = TempDir::new().unwrap();
        let resolver = ToolPathResolver::with_locations(
            None,
            None,
            Some(env::join_paths([temp.path()]).unwrap()),
        );
        assert_eq!(resolver.resolve_tool("gltf-transform"), None);
        assert_eq!(resolver.program_for("gltf-transform"), "gltf-transform");
        assert!(resolver.get_tools_report("gltf-transform").contains(GLTF_TRANSFORM_PACKAGE));
    }

    #[test]
    fn test_explicit_path_taken_literally() {
        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("custom-gltf");
        touch(&tool);

        let resolver = ToolPathResolver::with_locations(None, None, None);
        let configured = tool.to_string_lossy().into_owned();
        assert_eq!(resolver.resolve_tool(&configured), Some(tool));
        assert_eq!(resolver.resolve_tool("/nonexistent/gltf-transform"), None);
    }
}
