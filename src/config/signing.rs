//! Signing and tool workspace configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Signing section of `ferry.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Signing profile name (required)
    #[serde(default)]
    pub profile: Option<String>,

    /// Writable HOME and working directory for oras/notation
    #[serde(default)]
    pub work_home: Option<PathBuf>,

    /// Read-only notation config directory holding the signer plugin
    #[serde(default)]
    pub plugin_source: Option<PathBuf>,
}

pub fn default_work_home() -> PathBuf {
    PathBuf::from("/tmp")
}

pub fn default_plugin_source() -> PathBuf {
    PathBuf::from("/root/.config/notation")
}

impl SigningConfig {
    /// Fill unset fields from `other`
    pub fn or(self, other: SigningConfig) -> Self {
        Self {
            profile: self.profile.or(other.profile),
            work_home: self.work_home.or(other.work_home),
            plugin_source: self.plugin_source.or(other.plugin_source),
        }
    }
}
