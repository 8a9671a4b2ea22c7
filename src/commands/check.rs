use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::domain::Workflow;
use crate::services::{promotion, PipelineContext};
use crate::trigger::Invocation;
use crate::ui;

pub async fn execute(config: PipelineConfig) -> Result<()> {
    ui::print_header(&format!(
        "Check gate for {} image(s) (blocking: {})",
        config.images.len(),
        config.gate_policy.blocking_severities().join(",")
    ));

    let invocation = Invocation::new();
    let ctx = PipelineContext::initialize(config, Workflow::Check, &invocation)
        .context("Failed to initialize check")?;

    let all_allowed = promotion::check(&ctx, &invocation).await?;
    if !all_allowed {
        anyhow::bail!("One or more images would not be promoted");
    }

    ui::print_success("Every image passes the gate");
    Ok(())
}
