//! Pull, wait for the scanner, promote
//!
//! Runs both workflows back to back in one process, the way a scheduler
//! would chain the two triggers with a wait state in between.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::Workflow;
use crate::services::{promotion, puller, PipelineContext, PullPolicy};
use crate::trigger::{Invocation, TriggerEvent};
use crate::ui;

pub async fn execute(config: PipelineConfig, settle_secs: u64, continue_on_error: bool) -> Result<()> {
    let policy = if continue_on_error {
        PullPolicy::ContinueOnError
    } else {
        PullPolicy::FailFast
    };
    let event = TriggerEvent::default();

    ui::print_header(&format!(
        "Cycle {} image(s): {} -> {}",
        config.images.len(),
        config.namespaces.staging,
        config.namespaces.production
    ));

    // Resolve the promote tools before pulling anything
    let promote_invocation = Invocation::new();
    let promote_ctx =
        PipelineContext::initialize(config.clone(), Workflow::Promote, &promote_invocation)
            .context("Failed to initialize promotion")?;
    let pull_invocation = Invocation::new();
    let pull_ctx = PipelineContext::initialize(config, Workflow::Pull, &pull_invocation)
        .context("Failed to initialize pull")?;

    let pulled_all = puller::run(&pull_ctx, &event, &pull_invocation, policy)
        .await
        .context("Pull workflow failed")?;
    if !pulled_all {
        ui::print_error("Some pulls failed; promoting whatever reached staging");
    }

    if settle_secs > 0 {
        ui::print_info(&format!("Waiting {}s for scans to settle", settle_secs));
        info!("Sleeping {}s before promotion", settle_secs);
        tokio::time::sleep(Duration::from_secs(settle_secs)).await;
    }

    promotion::run(&promote_ctx, &event, &promote_invocation)
        .await
        .context("Promote workflow failed")?;

    if !pulled_all {
        anyhow::bail!("Cycle completed with pull failures");
    }
    ui::print_success("Cycle completed");
    Ok(())
}
