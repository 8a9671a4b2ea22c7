//! Command entrypoints
//!
//! Each command resolves configuration, builds the [`PipelineContext`] once
//! and hands it to the matching workflow.

pub mod check;
pub mod cycle;
pub mod promote;
pub mod pull;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::cli::PipelineArgs;
use crate::config::{FileConfig, PipelineConfig};

/// Resolve the pipeline configuration from args/env plus the optional file
pub fn load_config(args: PipelineArgs, config_path: Option<&Path>) -> Result<PipelineConfig> {
    let file = match config_path {
        Some(path) => {
            debug!("Loading config file {}", path.display());
            Some(FileConfig::load(path).context("Failed to load config file")?)
        }
        None => None,
    };

    let config = PipelineConfig::resolve(args.into_overrides(), file)
        .context("Invalid pipeline configuration")?;
    debug!(
        "Resolved {} image(s), blocking severities {:?}",
        config.images.len(),
        config.gate_policy.blocking_severities()
    );
    Ok(config)
}
