//! Promotion domain types
//!
//! Defines the per-image promotion workflow as a state machine and the
//! summary returned by each workflow run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::image::ImageReference;

/// Steps after the gate that can fail an allowed image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStep {
    Provision,
    Copy,
    Sign,
}

impl PromotionStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Provision => "Provision",
            Self::Copy => "Copy",
            Self::Sign => "Sign",
        }
    }
}

/// Per-image promotion state
///
/// ```text
/// Scanned -> Allowed | Denied | Skipped
/// Allowed -> RepoReady -> Copied -> Signed
/// Allowed | RepoReady | Copied -> Failed(step)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum PromotionState {
    Scanned,
    Allowed,
    Denied,
    Skipped,
    RepoReady,
    Copied,
    Signed,
    Failed(PromotionStep),
}

impl PromotionState {
    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(&self, next: PromotionState) -> bool {
        use PromotionState::*;
        match (self, next) {
            (Scanned, Allowed | Denied | Skipped) => true,
            (Allowed, RepoReady) => true,
            (RepoReady, Copied) => true,
            (Copied, Signed) => true,
            (Allowed, Failed(PromotionStep::Provision)) => true,
            (RepoReady, Failed(PromotionStep::Copy)) => true,
            (Copied, Failed(PromotionStep::Sign)) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Denied | Self::Skipped | Self::Signed | Self::Failed(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scanned => "scanned",
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Skipped => "skipped",
            Self::RepoReady => "repo_ready",
            Self::Copied => "copied",
            Self::Signed => "signed",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for PromotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(step) => write!(f, "failed at {}", step.name()),
            other => f.write_str(other.name()),
        }
    }
}

/// Tracks one image through the promotion state machine
#[derive(Debug, Clone)]
pub struct ImagePromotion {
    pub image: ImageReference,
    state: PromotionState,
    history: Vec<PromotionState>,
}

impl ImagePromotion {
    pub fn new(image: ImageReference) -> Self {
        Self {
            image,
            state: PromotionState::Scanned,
            history: vec![PromotionState::Scanned],
        }
    }

    pub fn state(&self) -> PromotionState {
        self.state
    }

    pub fn history(&self) -> &[PromotionState] {
        &self.history
    }

    /// Move to `next`; illegal transitions are a programming error
    pub fn advance(&mut self, next: PromotionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal promotion transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
        self.history.push(next);
    }
}

/// Terminal state of one image in a workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageState {
    Pulled,
    PullFailed,
    Promotion { state: PromotionState },
}

/// Per-image result line of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub image: ImageReference,
    pub state: ImageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ImageOutcome {
    pub fn pulled(image: ImageReference) -> Self {
        Self {
            image,
            state: ImageState::Pulled,
            detail: None,
        }
    }

    pub fn pull_failed(image: ImageReference, error: impl Into<String>) -> Self {
        Self {
            image,
            state: ImageState::PullFailed,
            detail: Some(error.into()),
        }
    }

    pub fn promotion(promotion: &ImagePromotion, detail: Option<String>) -> Self {
        Self {
            image: promotion.image.clone(),
            state: ImageState::Promotion {
                state: promotion.state(),
            },
            detail,
        }
    }

    pub fn is_success(&self) -> bool {
        match &self.state {
            ImageState::Pulled => true,
            ImageState::PullFailed => false,
            ImageState::Promotion { state } => !matches!(state, PromotionState::Failed(_)),
        }
    }
}

/// Which workflow produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    Pull,
    Promote,
    Check,
}

impl Workflow {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Promote => "promote",
            Self::Check => "check",
        }
    }
}

/// Result of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub workflow: Workflow,
    pub outcomes: Vec<ImageOutcome>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            outcomes: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn record(&mut self, outcome: ImageOutcome) {
        self.outcomes.push(outcome);
    }

    /// Count outcomes in a given promotion state
    pub fn count_promotion(&self, wanted: PromotionState) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, ImageState::Promotion { state } if state == wanted))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(ImageOutcome::is_success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageReference {
        ImageReference {
            repository: "app".to_string(),
            tag: "1.0".to_string(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut promotion = ImagePromotion::new(image());
        for next in [
            PromotionState::Allowed,
            PromotionState::RepoReady,
            PromotionState::Copied,
            PromotionState::Signed,
        ] {
            promotion.advance(next);
        }
        assert_eq!(promotion.state(), PromotionState::Signed);
        assert!(promotion.state().is_terminal());
        assert_eq!(promotion.history().len(), 5);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        assert!(!PromotionState::Denied.can_advance_to(PromotionState::RepoReady));
        assert!(!PromotionState::Scanned.can_advance_to(PromotionState::Copied));
        assert!(!PromotionState::Allowed.can_advance_to(PromotionState::Failed(PromotionStep::Sign)));
        assert!(PromotionState::Copied.can_advance_to(PromotionState::Failed(PromotionStep::Sign)));
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new(Workflow::Promote);
        let mut signed = ImagePromotion::new(image());
        signed.advance(PromotionState::Allowed);
        signed.advance(PromotionState::RepoReady);
        signed.advance(PromotionState::Copied);
        signed.advance(PromotionState::Signed);
        summary.record(ImageOutcome::promotion(&signed, None));

        let mut denied = ImagePromotion::new(image());
        denied.advance(PromotionState::Denied);
        summary.record(ImageOutcome::promotion(&denied, Some("HIGH".into())));

        assert_eq!(summary.count_promotion(PromotionState::Signed), 1);
        assert_eq!(summary.count_promotion(PromotionState::Denied), 1);
        assert!(summary.all_succeeded());
    }

    #[test]
    fn test_pull_failure_marks_summary_failed() {
        let mut summary = RunSummary::new(Workflow::Pull);
        summary.record(ImageOutcome::pulled(image()));
        summary.record(ImageOutcome::pull_failed(image(), "throttled"));
        assert_eq!(summary.outcomes[0].state, ImageState::Pulled);
        assert!(!summary.all_succeeded());
    }
}
