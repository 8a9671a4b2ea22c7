use anyhow::{Context, Result};
use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::Workflow;
use crate::services::{promotion, PipelineContext};
use crate::trigger::{Invocation, TriggerEvent};
use crate::ui;

pub async fn execute(config: PipelineConfig, event: Option<String>) -> Result<()> {
    let event = TriggerEvent::parse(event.as_deref())?;

    ui::print_header(&format!(
        "Promote {} image(s) into {}",
        config.images.len(),
        config.namespaces.production
    ));

    let invocation = Invocation::new();
    info!("Invocation {}", invocation.id);
    let ctx = PipelineContext::initialize(config, Workflow::Promote, &invocation)
        .context("Failed to initialize promote workflow")?;

    promotion::run(&ctx, &event, &invocation)
        .await
        .context("Promote workflow failed")?;

    ui::print_success("Promotion run completed");
    Ok(())
}
