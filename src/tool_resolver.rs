//! # Tool Path Resolver
//!
//! This module handles finding the external lossless optimizers:
//! - Bundled next to the binary or in `MINIMAGE_TOOLS_DIR`
//! - System-installed tools on `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lossless optimizers used by the codec pipeline
pub const CODEC_TOOLS: &[&str] = &["jpegtran", "gifsicle", "optipng"];

/// Tool path resolver for bundled and system tools
#[derive(Debug, Clone)]
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
    /// Directories from `PATH`
    search_path: Vec<PathBuf>,
}

impl ToolPathResolver {
    /// Create a resolver from the process environment
    pub fn new() -> Self {
        let tools_dir = Self::detect_bundled_tools_dir();
        let search_path = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();

        Self {
            tools_dir,
            search_path,
        }
    }

    /// Resolver with an explicit search path, ignoring the environment
    pub fn with_search_path(tools_dir: Option<PathBuf>, search_path: Vec<PathBuf>) -> Self {
        Self {
            tools_dir,
            search_path,
        }
    }

    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        // Strategy 1: explicit override
        if let Some(dir) = env::var_os("MINIMAGE_TOOLS_DIR") {
            let tools_path = PathBuf::from(dir);
            debug!("Checking MINIMAGE_TOOLS_DIR: {:?}", tools_path);
            if tools_path.is_dir() {
                return Some(tools_path);
            }
        }

        // Strategy 2: `tools/` next to the executable
        let exe_path = env::current_exe().ok()?;
        let tools_path = exe_path.parent()?.join("tools");
        debug!("Checking bundled tools path: {:?}", tools_path);
        if tools_path.is_dir() {
            return Some(tools_path);
        }

        None
    }

    /// Resolve the path to a specific tool, bundled first then `PATH`
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        let file_name = Self::executable_name(tool_name);

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled = tools_dir.join(&file_name);
            if bundled.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled);
                return Some(bundled);
            }
        }

        let found = self
            .search_path
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file());

        match &found {
            Some(path) => debug!("Using system tool: {} -> {:?}", tool_name, path),
            None => debug!("Tool not found: {}", tool_name),
        }
        found
    }

    fn executable_name(tool_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", tool_name)
        } else {
            tool_name.to_string()
        }
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Installation hint for a missing tool
    pub fn install_instructions(tool_name: &str) -> String {
        match tool_name {
            "jpegtran" => "sudo apt-get install libjpeg-turbo-progs  # macOS: brew install jpeg-turbo".to_string(),
            "gifsicle" => "sudo apt-get install gifsicle  # macOS: brew install gifsicle".to_string(),
            "optipng" => "sudo apt-get install optipng  # macOS: brew install optipng".to_string(),
            _ => format!("sudo apt-get install {}", tool_name),
        }
    }

    /// Check if a tool is available and provide installation instructions if not
    pub fn check_tool_with_instructions(&self, tool_name: &str) -> Result<PathBuf, String> {
        self.resolve_tool(tool_name).ok_or_else(|| {
            format!(
                "Tool '{}' not found in bundled tools or PATH.\nTo install, run:\n  {}",
                tool_name,
                Self::install_instructions(tool_name)
            )
        })
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::new();
        report.push_str("Tool Path Resolver Report\n");
        report.push_str(&format!("Bundled tools dir: {:?}\n", self.tools_dir));
        report.push_str("\nTool Availability:\n");

        for (format, tool) in [("JPEG", "jpegtran"), ("GIF", "gifsicle"), ("PNG", "optipng")] {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} ({}) -> {:?}\n", tool, format, path)),
                None => report.push_str(&format!(
                    "  ❌ {} ({}) (install with: {})\n",
                    tool,
                    format,
                    Self::install_instructions(tool)
                )),
            }
        }

        report
    }

    /// Tools directory in use, if any
    pub fn tools_dir(&self) -> Option<&Path> {
        self.tools_dir.as_deref()
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

    #[test]
    fn test_resolve_prefers_bundled_tools() {
        let bundled = TempDir::new().unwrap();
        let system = TempDir::new().unwrap();
        let name = ToolPathResolver::executable_name("optipng");
        std::fs::write(bundled.path().join(&name), b"").unwrap();
        std::fs::write(system.path().join(&name), b"").unwrap();

        let resolver = ToolPathResolver::with_search_path(
            Some(bundled.path().to_path_buf()),
            vec![system.path().to_path_buf()],
        );
        assert_eq!(resolver.resolve_tool("optipng"), Some(bundled.path().join(&name)));
    }

    #[test]
    fn test_resolve_falls_back_to_search_path() {
        let system = TempDir::new().unwrap();
        let name = ToolPathResolver::executable_name("gifsicle");
        std::fs::write(system.path().join(&name), b"").unwrap();

        let resolver = ToolPathResolver::with_search_path(None, vec![system.path().to_path_buf()]);
        assert!(resolver.is_tool_available("gifsicle"));
        assert!(!resolver.is_tool_available("jpegtran"));
    }

    #[test]
    fn test_missing_tool_has_instructions() {
        let resolver = ToolPathResolver::with_search_path(None, Vec::new());
        let err = resolver.check_tool_with_instructions("jpegtran").unwrap_err();
        assert!(err.contains("libjpeg-turbo-progs"));

        let report = resolver.get_tools_report();
        for tool in CODEC_TOOLS {
            assert!(report.contains(tool));
        }
    }
}
