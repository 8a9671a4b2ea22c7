//! Promotion workflow
//!
//! For each configured image, in order:
//!
//! ```text
//! scan gate -> provision {production}/{staging}/{repo} -> copy -> sign
//! ```
//!
//! A denied or skipped image is logged and the loop moves on. A failed
//! provision, copy or sign aborts the whole batch.

use std::time::Instant;
use tracing::{error, info};

use crate::domain::{
    ArtifactRef, DenyReason, GateDecision, ImageOutcome, ImagePromotion, ImageReference,
    PromotionState, PromotionStep, RunSummary, Workflow,
};
use crate::error::{PromoteError, ToolError};
use crate::observability::RunEvents;
use crate::services::context::PipelineContext;
use crate::services::RepositoryProvisioner;
use crate::trigger::{Invocation, TriggerEvent};
use crate::ui;

/// Run the promotion workflow over every configured image
///
/// Returns `Ok(true)` once every image reached a terminal state; a fatal
/// step failure is returned as `Err` after the summary is printed.
pub async fn run(
    ctx: &PipelineContext,
    event: &TriggerEvent,
    invocation: &Invocation,
) -> Result<bool, PromoteError> {
    let start = Instant::now();
    let events = RunEvents::new(invocation.id, Workflow::Promote);
    let config = &ctx.config;

    info!(
        "Promote invocation {} started with event {}",
        invocation.id, event.0
    );
    events.started(&config.images);

    let mut summary = RunSummary::new(Workflow::Promote);

    for image in &config.images {
        let mut promotion = ImagePromotion::new(image.clone());
        let decision = gate(ctx, &events, image).await;

        match &decision {
            GateDecision::Allow(_) => promotion.advance(PromotionState::Allowed),
            GateDecision::Deny(_) => {
                promotion.advance(PromotionState::Denied);
                summary.record(ImageOutcome::promotion(&promotion, Some(decision.to_string())));
                continue;
            }
            GateDecision::Skip { error } => {
                promotion.advance(PromotionState::Skipped);
                summary.record(ImageOutcome::promotion(&promotion, Some(error.clone())));
                continue;
            }
        }

        match promote(ctx, &events, &mut promotion).await {
            Ok(()) => summary.record(ImageOutcome::promotion(&promotion, None)),
            Err(e) => {
                let message = e.to_string();
                error!("Promotion of {} failed, aborting batch: {}", image, message);
                summary.record(ImageOutcome::promotion(&promotion, Some(message.clone())));
                summary.duration = start.elapsed();
                ui::print_summary(&summary);
                events.failed(summary.duration.as_secs_f64(), Some(image), &message);
                return Err(e);
            }
        }
    }

    summary.duration = start.elapsed();
    ui::print_summary(&summary);
    events.completed(&summary);

    Ok(true)
}

/// Evaluate the gate for every image without changing anything
///
/// Returns `Ok(true)` when every image would be promoted.
pub async fn check(ctx: &PipelineContext, invocation: &Invocation) -> Result<bool, PromoteError> {
    let start = Instant::now();
    let events = RunEvents::new(invocation.id, Workflow::Check);
    events.started(&ctx.config.images);

    let mut summary = RunSummary::new(Workflow::Check);
    for image in &ctx.config.images {
        let mut promotion = ImagePromotion::new(image.clone());
        let decision = gate(ctx, &events, image).await;
        let next = match &decision {
            GateDecision::Allow(_) => PromotionState::Allowed,
            GateDecision::Deny(_) => PromotionState::Denied,
            GateDecision::Skip { .. } => PromotionState::Skipped,
        };
        promotion.advance(next);
        summary.record(ImageOutcome::promotion(&promotion, Some(decision.to_string())));
    }

    summary.duration = start.elapsed();
    ui::print_summary(&summary);
    events.completed(&summary);

    Ok(summary.count_promotion(PromotionState::Allowed) == summary.outcomes.len())
}

/// Fetch the staging scan snapshot and evaluate it; fetch errors become a skip
async fn gate(ctx: &PipelineContext, events: &RunEvents, image: &ImageReference) -> GateDecision {
    let config = &ctx.config;
    let repository = config.namespaces.staging_repository(image);

    let decision = match ctx.registry.scan_result(&repository, &image.tag).await {
        Ok(scan) => config.gate_policy.evaluate(&scan),
        Err(e) => GateDecision::Skip {
            error: e.to_string(),
        },
    };

    match &decision {
        GateDecision::Allow(_) => info!("{}: {}", image, decision),
        GateDecision::Deny(DenyReason::Vulnerability { finding }) => error!(
            "{} has a {} finding {}; not promoting",
            image,
            finding.severity,
            finding.label()
        ),
        GateDecision::Deny(DenyReason::ScanState { status }) => error!(
            "{} scan status is {}; not promoting",
            image, status
        ),
        GateDecision::Skip { error } => error!(
            "Could not read scan findings for {}; skipping: {}",
            image, error
        ),
    }
    events.gated(image, &decision);

    decision
}

/// Provision, copy and sign one allowed image
async fn promote(
    ctx: &PipelineContext,
    events: &RunEvents,
    promotion: &mut ImagePromotion,
) -> Result<(), PromoteError> {
    let config = &ctx.config;
    let image = promotion.image.clone();
    let source = ArtifactRef::staging(&config.endpoint, &config.namespaces, &image);
    let destination = ArtifactRef::production(&config.endpoint, &config.namespaces, &image);

    let provisioner = RepositoryProvisioner::new(ctx.registry.as_ref(), events);
    if let Err(e) = provisioner.ensure(&destination.repository).await {
        promotion.advance(PromotionState::Failed(PromotionStep::Provision));
        return Err(e.into());
    }
    promotion.advance(PromotionState::RepoReady);

    info!("Copying {} to {}", source, destination);
    let copied = ctx
        .copier
        .copy(&source, &destination)
        .await
        .and_then(|output| {
            output.log();
            if output.success() {
                Ok(())
            } else {
                Err(ToolError::CopyFailed {
                    destination: destination.to_string(),
                    output,
                })
            }
        });
    if let Err(e) = copied {
        promotion.advance(PromotionState::Failed(PromotionStep::Copy));
        return Err(e.into());
    }
    promotion.advance(PromotionState::Copied);

    info!("Signing {}", destination);
    let signed = ctx.signer.sign(&destination).await.and_then(|output| {
        output.log();
        if output.success() {
            Ok(())
        } else {
            Err(ToolError::SignFailed {
                reference: destination.to_string(),
                output,
            })
        }
    });
    if let Err(e) = signed {
        promotion.advance(PromotionState::Failed(PromotionStep::Sign));
        return Err(e.into());
    }
    promotion.advance(PromotionState::Signed);

    info!("Promoted {} to {}", image, destination);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Namespaces, ScanFinding, ScanResult, ScanStatus, Severity};
    use crate::error::RegistryError;
    use crate::fakes::{
        prod_ref, test_config, test_context, MemoryRegistry, RecordingCopier, RecordingSigner,
        TEST_HOST,
    };
    use std::sync::Arc;

    fn clean() -> ScanResult {
        ScanResult::new(ScanStatus::Complete, None)
    }

    fn critical() -> ScanResult {
        ScanResult::new(
            ScanStatus::Complete,
            Some(vec![
                ScanFinding::new(Severity::Low),
                ScanFinding::new(Severity::Critical).with_name("CVE-2024-0001"),
            ]),
        )
    }

    async fn promote_all(ctx: &PipelineContext) -> Result<bool, PromoteError> {
        run(ctx, &TriggerEvent::default(), &Invocation::new()).await
    }

    #[tokio::test]
    async fn test_denied_image_is_never_copied_or_signed() {
        let registry = Arc::new(
            MemoryRegistry::new()
                .with_scan("cache/a", "1", clean())
                .with_scan("cache/b", "2", critical())
                .with_scan("cache/c", "3", clean()),
        );
        let copier = Arc::new(RecordingCopier::new());
        let signer = Arc::new(RecordingSigner::new());
        let ctx = test_context(
            &["a:1", "b:2", "c:3"],
            registry.clone(),
            copier.clone(),
            signer.clone(),
        );

        assert!(promote_all(&ctx).await.unwrap());

        let destinations: Vec<String> = copier.calls().into_iter().map(|(_, d)| d).collect();
        assert_eq!(destinations, vec![prod_ref("a", "1"), prod_ref("c", "3")]);
        assert_eq!(signer.calls(), vec![prod_ref("a", "1"), prod_ref("c", "3")]);
        assert_eq!(registry.created(), vec!["prod/cache/a", "prod/cache/c"]);
    }

    #[tokio::test]
    async fn test_scan_fetch_error_skips_image_only() {
        let registry = Arc::new(
            MemoryRegistry::new()
                .with_scan_error(
                    "cache/a",
                    "1",
                    RegistryError::Throttled {
                        code: "ThrottlingException".to_string(),
                        message: "rate exceeded".to_string(),
                    },
                )
                .with_scan("cache/b", "2", clean()),
        );
        let copier = Arc::new(RecordingCopier::new());
        let signer = Arc::new(RecordingSigner::new());
        let ctx = test_context(&["a:1", "b:2"], registry, copier.clone(), signer.clone());

        assert!(promote_all(&ctx).await.unwrap());
        assert_eq!(copier.calls().len(), 1);
        assert_eq!(signer.calls(), vec![prod_ref("b", "2")]);
    }

    #[tokio::test]
    async fn test_scan_in_progress_is_not_promoted() {
        let registry = Arc::new(MemoryRegistry::new().with_scan(
            "cache/a",
            "1",
            ScanResult::new(ScanStatus::InProgress, None),
        ));
        let copier = Arc::new(RecordingCopier::new());
        let ctx = test_context(
            &["a:1"],
            registry,
            copier.clone(),
            Arc::new(RecordingSigner::new()),
        );

        assert!(promote_all(&ctx).await.unwrap());
        assert!(copier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_copy_failure_aborts_batch() {
        let registry = Arc::new(
            MemoryRegistry::new()
                .with_scan("cache/a", "1", clean())
                .with_scan("cache/b", "2", clean()),
        );
        let copier = Arc::new(RecordingCopier::new().failing_for(&prod_ref("a", "1")));
        let signer = Arc::new(RecordingSigner::new());
        let ctx = test_context(
            &["a:1", "b:2"],
            registry.clone(),
            copier.clone(),
            signer.clone(),
        );

        let err = promote_all(&ctx).await.unwrap_err();
        assert!(matches!(err, PromoteError::Tool(ToolError::CopyFailed { .. })));
        assert_eq!(copier.calls().len(), 1);
        assert!(signer.calls().is_empty());
        // the second image is never gated or provisioned
        assert_eq!(registry.scanned(), vec!["cache/a:1"]);
        assert_eq!(registry.created(), vec!["prod/cache/a"]);
    }

    #[tokio::test]
    async fn test_sign_failure_aborts_batch() {
        let registry = Arc::new(
            MemoryRegistry::new()
                .with_scan("cache/a", "1", clean())
                .with_scan("cache/b", "2", clean()),
        );
        let copier = Arc::new(RecordingCopier::new());
        let signer = Arc::new(RecordingSigner::new().failing_for(&prod_ref("a", "1")));
        let ctx = test_context(&["a:1", "b:2"], registry, copier.clone(), signer.clone());

        let err = promote_all(&ctx).await.unwrap_err();
        assert!(matches!(err, PromoteError::Tool(ToolError::SignFailed { .. })));
        assert_eq!(copier.calls().len(), 1);
        assert_eq!(signer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_production_repository_still_promotes() {
        let registry = Arc::new(
            MemoryRegistry::new()
                .with_scan("cache/a", "1", clean())
                .with_repository("prod/cache/a"),
        );
        let signer = Arc::new(RecordingSigner::new());
        let ctx = test_context(
            &["a:1"],
            registry,
            Arc::new(RecordingCopier::new()),
            signer.clone(),
        );

        assert!(promote_all(&ctx).await.unwrap());
        assert_eq!(signer.calls(), vec![prod_ref("a", "1")]);
    }

    #[tokio::test]
    async fn test_production_reference_nests_staging_namespace() {
        let mut config = test_config(&["library/nginx:1.27"]);
        config.namespaces = Namespaces::new("ecr-public/docker", "team/prod");

        let registry = Arc::new(MemoryRegistry::new().with_scan(
            "ecr-public/docker/library/nginx",
            "1.27",
            clean(),
        ));
        let copier = Arc::new(RecordingCopier::new());
        let signer = Arc::new(RecordingSigner::new());
        let ctx = PipelineContext::from_parts(config, registry, copier.clone(), signer.clone());

        assert!(promote_all(&ctx).await.unwrap());
        assert_eq!(
            copier.calls(),
            vec![(
                format!("{}/ecr-public/docker/library/nginx:1.27", TEST_HOST),
                format!("{}/team/prod/ecr-public/docker/library/nginx:1.27", TEST_HOST),
            )]
        );
        assert_eq!(
            signer.calls(),
            vec![format!(
                "{}/team/prod/ecr-public/docker/library/nginx:1.27",
                TEST_HOST
            )]
        );
    }

    #[tokio::test]
    async fn test_check_changes_nothing() {
        let registry = Arc::new(
            MemoryRegistry::new()
                .with_scan("cache/a", "1", clean())
                .with_scan("cache/b", "2", critical()),
        );
        let copier = Arc::new(RecordingCopier::new());
        let signer = Arc::new(RecordingSigner::new());
        let ctx = test_context(&["a:1", "b:2"], registry.clone(), copier.clone(), signer.clone());

        let all_allowed = check(&ctx, &Invocation::new()).await.unwrap();
        assert!(!all_allowed);
        assert!(registry.created().is_empty());
        assert!(copier.calls().is_empty());
        assert!(signer.calls().is_empty());
    }
}
