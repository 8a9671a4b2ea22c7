//! Runtime tool path resolution
//!
//! For each external tool (e.g. `oras`) ferry:
//! 1. Checks for an environment variable `{TOOL}_BIN` (e.g. `ORAS_BIN`)
//! 2. Falls back to PATH-based invocation if the envvar is not set
//!
//! [`resolve_tool`] additionally verifies the binary can be found, so a
//! missing tool is reported once at setup rather than on the first image.

use std::env;

use crate::error::ToolError;

/// Environment variable consulted for a tool, e.g. `ORAS_BIN`
pub fn tool_env_var(tool: &str) -> String {
    format!("{}_BIN", tool.to_uppercase())
}

/// Get the path to an external tool
///
/// Returns the value of `{TOOL}_BIN` if set, otherwise the tool name itself.
pub fn get_tool_path(tool: &str) -> String {
    env::var(tool_env_var(tool)).unwrap_or_else(|_| tool.to_string())
}

/// Resolve a tool path and check that it exists
pub fn resolve_tool(tool: &str) -> Result<String, ToolError> {
    let path = get_tool_path(tool);
    which::which(&path)
        .map(|p| p.display().to_string())
        .map_err(|_| ToolError::NotInstalled {
            tool: tool.to_string(),
            env_var: tool_env_var(tool),
        })
}

/// Tool names ferry drives
pub mod tools {
    pub const AWS: &str = "aws";
    pub const ORAS: &str = "oras";
    pub const NOTATION: &str = "notation";
}
