//! Vulnerability gate
//!
//! Pure decision function from a scan snapshot to a promotion decision.
//! Deny (policy) and skip (could not evaluate) both stop promotion and are
//! reported separately.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::scan::{ScanFinding, ScanResult, ScanStatus, Severity};

/// Severities that block promotion unless configured otherwise
pub const DEFAULT_BLOCKING_SEVERITIES: [Severity; 2] = [Severity::High, Severity::Critical];

/// Gate policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    blocking: BTreeSet<Severity>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::blocking(DEFAULT_BLOCKING_SEVERITIES)
    }
}

impl GatePolicy {
    pub fn blocking(severities: impl IntoIterator<Item = Severity>) -> Self {
        Self {
            blocking: severities.into_iter().collect(),
        }
    }

    pub fn blocks(&self, severity: Severity) -> bool {
        self.blocking.contains(&severity)
    }

    pub fn blocking_severities(&self) -> Vec<&'static str> {
        self.blocking.iter().map(|s| s.as_str()).collect()
    }

    /// Evaluate a scan snapshot
    pub fn evaluate(&self, scan: &ScanResult) -> GateDecision {
        if scan.status == ScanStatus::UnsupportedImage {
            return GateDecision::Allow(AllowReason::UnsupportedImage);
        }

        if !scan.status.is_finished() {
            return GateDecision::Deny(DenyReason::ScanState {
                status: scan.status,
            });
        }

        let findings = match scan.findings.as_deref() {
            None | Some([]) => return GateDecision::Allow(AllowReason::NoFindings),
            Some(findings) => findings,
        };

        match findings.iter().find(|f| self.blocks(f.severity)) {
            Some(finding) => GateDecision::Deny(DenyReason::Vulnerability {
                finding: Box::new(finding.clone()),
            }),
            None => GateDecision::Allow(AllowReason::BelowThreshold {
                findings: findings.len(),
            }),
        }
    }
}

/// Why an image was allowed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllowReason {
    /// Registry cannot scan this artifact type; allowed by policy
    UnsupportedImage,
    NoFindings,
    BelowThreshold { findings: usize },
}

/// Why an image was denied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// A finding at a blocking severity
    Vulnerability { finding: Box<ScanFinding> },
    /// Scan not finished (in progress, failed, unknown)
    ScanState { status: ScanStatus },
}

/// Outcome of the gate for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Allow(AllowReason),
    Deny(DenyReason),
    /// Scan result could not be fetched or interpreted
    Skip { error: String },
}

impl GateDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Allow(_) => "allow",
            Self::Deny(DenyReason::Vulnerability { .. }) => "deny_vulnerability",
            Self::Deny(DenyReason::ScanState { .. }) => "deny_scan_state",
            Self::Skip { .. } => "skip",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow(AllowReason::UnsupportedImage) => {
                write!(f, "allowed (image type not supported by scanner)")
            }
            Self::Allow(AllowReason::NoFindings) => write!(f, "allowed (no findings)"),
            Self::Allow(AllowReason::BelowThreshold { findings }) => {
                write!(f, "allowed ({} findings below threshold)", findings)
            }
            Self::Deny(DenyReason::Vulnerability { finding }) => write!(
                f,
                "denied ({} finding: {})",
                finding.severity,
                finding.label()
            ),
            Self::Deny(DenyReason::ScanState { status }) => {
                write!(f, "denied (scan state {})", status)
            }
            Self::Skip { error } => write!(f, "skipped ({})", error),
        }
    }
}
