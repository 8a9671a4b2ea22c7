//! Centralized error types for ferry
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

use crate::infrastructure::process::ToolOutput;

/// Top-level error type for promotion runs
#[derive(Error, Debug)]
pub enum PromoteError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Image reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("External tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Container registry API errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    #[error("Request throttled ({code}): {message}")]
    Throttled { code: String, message: String },

    #[error("Not authorized ({code}): {message}")]
    Unauthorized { code: String, message: String },

    #[error("Registry call failed: {message}")]
    Unknown { message: String },
}

impl RegistryError {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }
}

/// Image reference parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Image reference '{input}' has no tag. Expected: repository:tag")]
    MissingTag { input: String },

    #[error("Image reference '{input}' has an empty repository name")]
    EmptyRepository { input: String },

    #[error("Image reference '{input}' has an empty tag")]
    EmptyTag { input: String },

    #[error("Invalid repository name '{repository}' in '{input}'")]
    InvalidRepository { input: String, repository: String },

    #[error("Invalid tag '{tag}' in '{input}'")]
    InvalidTag { input: String, tag: String },
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required configuration missing: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },
}

/// External tool (aws, oras, notation) errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} not found. Install it or set {env_var}")]
    NotInstalled { tool: String, env_var: String },

    #[error("Failed to start {tool}: {message}")]
    Spawn { tool: String, message: String },

    #[error(
        "Registry login via {} failed with exit code {:?}: {}",
        .output.tool,
        .output.exit_code,
        .output.stderr.trim()
    )]
    LoginFailed { output: ToolOutput },

    #[error("Could not copy image to {destination} (exit code {:?})", .output.exit_code)]
    CopyFailed {
        destination: String,
        output: ToolOutput,
    },

    #[error("Could not sign image {reference} (exit code {:?})", .output.exit_code)]
    SignFailed {
        reference: String,
        output: ToolOutput,
    },

    #[error("Failed to prepare plugin workspace at {path}: {message}")]
    PluginWorkspace { path: String, message: String },
}
