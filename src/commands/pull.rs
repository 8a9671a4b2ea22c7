use anyhow::{Context, Result};
use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::Workflow;
use crate::services::{puller, PipelineContext, PullPolicy};
use crate::trigger::{Invocation, TriggerEvent};
use crate::ui;

pub async fn execute(
    config: PipelineConfig,
    event: Option<String>,
    continue_on_error: bool,
) -> Result<()> {
    let event = TriggerEvent::parse(event.as_deref())?;
    let policy = if continue_on_error {
        PullPolicy::ContinueOnError
    } else {
        PullPolicy::FailFast
    };

    ui::print_header(&format!(
        "Pull {} image(s) into {}",
        config.images.len(),
        config.namespaces.staging
    ));

    let invocation = Invocation::new();
    info!("Invocation {}", invocation.id);
    let ctx = PipelineContext::initialize(config, Workflow::Pull, &invocation)
        .context("Failed to initialize pull workflow")?;

    let ok = puller::run(&ctx, &event, &invocation, policy)
        .await
        .context("Pull workflow failed")?;
    if !ok {
        anyhow::bail!("One or more images could not be pulled");
    }

    ui::print_success("All images pulled");
    Ok(())
}
