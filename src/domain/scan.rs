//! Vulnerability scan snapshot types
//!
//! Owned by the registry's scanner; ferry only reads them at promotion time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scan lifecycle status reported by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    Active,
    Complete,
    InProgress,
    Pending,
    Failed,
    UnsupportedImage,
    ScanEligibilityExpired,
    FindingsUnavailable,
    #[serde(other)]
    Unknown,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Complete => "COMPLETE",
            Self::InProgress => "IN_PROGRESS",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
            Self::UnsupportedImage => "UNSUPPORTED_IMAGE",
            Self::ScanEligibilityExpired => "SCAN_ELIGIBILITY_EXPIRED",
            Self::FindingsUnavailable => "FINDINGS_UNAVAILABLE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether the scanner has produced a usable findings snapshot
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Active | Self::Complete)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
    Untriaged,
    #[serde(other)]
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "INFORMATIONAL",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
            Self::Untriaged => "UNTRIAGED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INFORMATIONAL" => Some(Self::Informational),
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            "UNTRIAGED" => Some(Self::Untriaged),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scanner finding
///
/// Basic scanning reports `name`; enhanced scanning reports `title`.
/// Everything else the registry returns is kept in `details` for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFinding {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ScanFinding {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            name: None,
            title: None,
            description: None,
            details: serde_json::Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Best identifier for logs (title, then name)
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("unnamed finding")
    }
}

/// Snapshot of an image's scan state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub status: ScanStatus,
    /// `None` when the registry returned no findings section at all
    pub findings: Option<Vec<ScanFinding>>,
}

impl ScanResult {
    pub fn new(status: ScanStatus, findings: Option<Vec<ScanFinding>>) -> Self {
        Self { status, findings }
    }
}
