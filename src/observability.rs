//! # Promotion Observability Module
//!
//! Structured events for pull and promotion runs, written as JSON lines to
//! stdout with a `FERRY_EVENT:` prefix so a log shipper can pick them out of
//! the regular tracing output.
//!
//! ```text
//! ferry → JSON stdout → log shipper → log store → dashboards / alerts
//! ```
//!
//! Operators only see a pass/fail from the trigger, so every gate decision,
//! repository outcome and tool result is emitted here as well as logged.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{GateDecision, ImageReference, RunSummary, Workflow};
use crate::infrastructure::process::ToolOutput;

/// Event prefix for log shippers to identify structured events
const EVENT_PREFIX: &str = "FERRY_EVENT:";

/// Promotion event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum PromotionEvent {
    /// Workflow invocation started
    InvocationStarted(InvocationStartedEvent),
    /// Registry accepted a pull request
    ImagePulled(ImageEvent),
    /// Registry rejected a pull request
    ImagePullFailed(ImagePullFailedEvent),
    /// Gate produced a decision
    ImageGated(ImageGatedEvent),
    /// Production repository ensured
    RepositoryProvisioned(RepositoryProvisionedEvent),
    /// External tool finished
    ToolInvoked(ToolInvokedEvent),
    /// Workflow invocation completed
    InvocationCompleted(InvocationCompletedEvent),
    /// Workflow invocation aborted
    InvocationFailed(InvocationFailedEvent),
}

/// Common fields for invocation-scoped events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Timestamp in RFC3339 format
    pub timestamp: String,
    pub invocation_id: Uuid,
    pub workflow: Workflow,
}

impl EventMetadata {
    pub fn new(invocation_id: Uuid, workflow: Workflow) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            invocation_id,
            workflow,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationStartedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub image: String,
    pub repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePullFailedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub image: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGatedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub image: String,
    /// allow / deny_vulnerability / deny_scan_state / skip
    pub outcome: String,
    pub decision: GateDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryProvisionedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub repository: String,
    /// created / already_exists
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvokedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub tool: String,
    pub subcommand: Option<String>,
    pub exit_code: Option<i32>,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub duration_secs: f64,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationFailedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub error: String,
}

/// Emits a structured event as JSON to stdout
pub fn emit_event(event: PromotionEvent) {
    match serde_json::to_string(&event) {
        Ok(json) => {
            println!("{}{}", EVENT_PREFIX, json);
        }
        Err(e) => {
            tracing::error!("Failed to serialize event: {}", e);
        }
    }
}

/// Emits invocation-scoped events with shared metadata
#[derive(Debug, Clone)]
pub struct RunEvents {
    invocation_id: Uuid,
    workflow: Workflow,
}

impl RunEvents {
    pub fn new(invocation_id: Uuid, workflow: Workflow) -> Self {
        Self {
            invocation_id,
            workflow,
        }
    }

    fn metadata(&self) -> EventMetadata {
        EventMetadata::new(self.invocation_id, self.workflow)
    }

    pub fn started(&self, images: &[ImageReference]) {
        emit_event(PromotionEvent::InvocationStarted(InvocationStartedEvent {
            metadata: self.metadata(),
            images: images.iter().map(ToString::to_string).collect(),
        }));
    }

    pub fn pulled(&self, image: &ImageReference, repository: &str) {
        emit_event(PromotionEvent::ImagePulled(ImageEvent {
            metadata: self.metadata(),
            image: image.to_string(),
            repository: repository.to_string(),
        }));
    }

    pub fn pull_failed(&self, image: &ImageReference, error: &str) {
        emit_event(PromotionEvent::ImagePullFailed(ImagePullFailedEvent {
            metadata: self.metadata(),
            image: image.to_string(),
            error: error.to_string(),
        }));
    }

    pub fn gated(&self, image: &ImageReference, decision: &GateDecision) {
        emit_event(PromotionEvent::ImageGated(ImageGatedEvent {
            metadata: self.metadata(),
            image: image.to_string(),
            outcome: decision.kind().to_string(),
            decision: decision.clone(),
        }));
    }

    /// Tool result without its output streams; login output may carry secrets
    pub fn tool_event(&self, output: &ToolOutput) -> ToolInvokedEvent {
        ToolInvokedEvent {
            metadata: self.metadata(),
            tool: output.tool.clone(),
            subcommand: output.args.first().cloned(),
            exit_code: output.exit_code,
            duration_secs: output.duration.as_secs_f64(),
        }
    }

    pub fn tool_invoked(&self, output: &ToolOutput) {
        emit_event(PromotionEvent::ToolInvoked(self.tool_event(output)));
    }

    pub fn provisioned(&self, repository: &str, outcome: &str) {
        emit_event(PromotionEvent::RepositoryProvisioned(
            RepositoryProvisionedEvent {
                metadata: self.metadata(),
                repository: repository.to_string(),
                outcome: outcome.to_string(),
            },
        ));
    }

    pub fn completed(&self, summary: &RunSummary) {
        emit_event(PromotionEvent::InvocationCompleted(InvocationCompletedEvent {
            metadata: self.metadata(),
            duration_secs: summary.duration.as_secs_f64(),
            summary: summary.clone(),
        }));
    }

    pub fn failed(&self, duration_secs: f64, image: Option<&ImageReference>, error: &str) {
        emit_event(PromotionEvent::InvocationFailed(InvocationFailedEvent {
            metadata: self.metadata(),
            duration_secs,
            image: image.map(ToString::to_string),
            error: error.to_string(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DenyReason, ScanStatus};
    use std::time::Duration;

    #[test]
    fn test_event_serialization() {
        let event = PromotionEvent::ImageGated(ImageGatedEvent {
            metadata: EventMetadata::new(Uuid::nil(), Workflow::Promote),
            image: "app:1.0".to_string(),
            outcome: "deny_scan_state".to_string(),
            decision: GateDecision::Deny(DenyReason::ScanState {
                status: ScanStatus::InProgress,
            }),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "ImageGated");
        assert_eq!(json["workflow"], "promote");
        assert_eq!(json["outcome"], "deny_scan_state");
        assert_eq!(json["decision"]["status"], "IN_PROGRESS");
    }

    #[test]
    fn test_tool_event_carries_invocation() {
        let output = ToolOutput {
            tool: "aws".to_string(),
            args: vec!["ecr".to_string(), "get-login-password".to_string()],
            exit_code: Some(0),
            stdout: "very-secret".to_string(),
            stderr: String::new(),
            duration: Duration::from_millis(1500),
        };
        let invocation_id = Uuid::new_v4();
        let events = RunEvents::new(invocation_id, Workflow::Pull);
        let event = PromotionEvent::ToolInvoked(events.tool_event(&output));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "ToolInvoked");
        assert_eq!(json["invocation_id"], invocation_id.to_string());
        assert_eq!(json["workflow"], "pull");
        assert_eq!(json["subcommand"], "ecr");
        assert!(!json.to_string().contains("very-secret"));
    }
}
