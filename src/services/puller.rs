//! Puller workflow
//!
//! Asks the registry to materialize every configured image under the staging
//! namespace, which also triggers the registry's vulnerability scan.

use std::time::Instant;
use tracing::{error, info, warn};

use crate::domain::{ImageOutcome, RunSummary, Workflow};
use crate::error::PromoteError;
use crate::observability::RunEvents;
use crate::services::context::PipelineContext;
use crate::trigger::{Invocation, TriggerEvent};
use crate::ui;

/// How the puller reacts to a failed pull
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullPolicy {
    /// Abort the batch on the first failure
    #[default]
    FailFast,
    /// Attempt every image; report failure at the end
    ContinueOnError,
}

/// Pull every image into `{staging}/{repository}`
///
/// Returns `Ok(true)` when every pull succeeded and `Ok(false)` when some
/// failed under [`PullPolicy::ContinueOnError`].
pub async fn run(
    ctx: &PipelineContext,
    event: &TriggerEvent,
    invocation: &Invocation,
    policy: PullPolicy,
) -> Result<bool, PromoteError> {
    let start = Instant::now();
    let events = RunEvents::new(invocation.id, Workflow::Pull);
    let config = &ctx.config;

    info!(
        "Pull invocation {} started with event {}",
        invocation.id, event.0
    );
    events.started(&config.images);

    let mut summary = RunSummary::new(Workflow::Pull);

    for image in &config.images {
        let repository = config.namespaces.staging_repository(image);
        info!("Pulling {} into {}", image, repository);

        match ctx.registry.request_image_pull(&repository, &image.tag).await {
            Ok(()) => {
                info!("Pulled {}:{}", repository, image.tag);
                events.pulled(image, &repository);
                summary.record(ImageOutcome::pulled(image.clone()));
            }
            Err(e) => {
                let message = e.to_string();
                events.pull_failed(image, &message);
                summary.record(ImageOutcome::pull_failed(image.clone(), message.clone()));

                if policy == PullPolicy::FailFast {
                    error!("Pull of {} failed, aborting batch: {}", image, message);
                    summary.duration = start.elapsed();
                    ui::print_summary(&summary);
                    events.failed(summary.duration.as_secs_f64(), Some(image), &message);
                    return Err(e.into());
                }
                warn!("Pull of {} failed, continuing: {}", image, message);
            }
        }
    }

    summary.duration = start.elapsed();
    ui::print_summary(&summary);
    events.completed(&summary);

    Ok(summary.all_succeeded())
}
