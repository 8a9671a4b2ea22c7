//! Trigger boundary
//!
//! Each workflow is activated by an external scheduler with an opaque event.
//! ferry does not interpret the event beyond logging it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// Opaque activation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerEvent(pub serde_json::Value);

impl TriggerEvent {
    /// Parse a JSON payload; `None` yields an empty object
    pub fn parse(raw: Option<&str>) -> Result<Self, ConfigError> {
        match raw {
            None => Ok(Self(serde_json::Value::Object(Default::default()))),
            Some(raw) => serde_json::from_str(raw)
                .map(Self)
                .map_err(|e| ConfigError::ParseError {
                    message: format!("trigger event is not valid JSON: {}", e),
                }),
        }
    }
}

/// Per-activation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl Invocation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

impl Default for Invocation {
    fn default() -> Self {
        Self::new()
    }
}
