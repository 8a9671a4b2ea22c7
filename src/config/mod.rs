//! # Pipeline Configuration
//!
//! Layered configuration: command line → environment → `ferry.yaml`.
//!
//! The command line and environment are merged by clap (`#[arg(env = ...)]`);
//! the optional YAML file fills whatever is still unset. The six core keys
//! (account, images, staging namespace, production namespace, region,
//! signing profile) have no defaults.
//!
//! ## Example `ferry.yaml`
//!
//! ```yaml
//! registry:
//!   account_id: "123456789012"
//!   region: us-east-1
//!   staging_namespace: ecr-public
//!   production_namespace: prod
//! signing:
//!   profile: release_signer
//! images:
//!   - docker/library/nginx:1.27
//!   - docker/library/redis:7.2
//! blocking_severities: [HIGH, CRITICAL]
//! ```

mod registry;
mod signing;

pub use registry::RegistryConfig;
pub use signing::{default_plugin_source, default_work_home, SigningConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{
    parse_image_list, GatePolicy, ImageReference, Namespaces, RegistryEndpoint, Severity,
};
use crate::error::{ConfigError, PromoteError};

/// Image list as either a YAML sequence or a comma-separated string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageList {
    Joined(String),
    Items(Vec<String>),
}

impl ImageList {
    pub fn joined(&self) -> String {
        match self {
            Self::Joined(s) => s.clone(),
            Self::Items(items) => items.join(","),
        }
    }
}

/// Partially specified configuration from one source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub images: Option<ImageList>,

    #[serde(default)]
    pub blocking_severities: Option<Vec<String>>,
}

impl FileConfig {
    /// Load `ferry.yaml`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Fill unset fields from `other` (self wins)
    pub fn or(self, other: FileConfig) -> Self {
        Self {
            registry: self.registry.or(other.registry),
            signing: self.signing.or(other.signing),
            images: self.images.or(other.images),
            blocking_severities: self.blocking_severities.or(other.blocking_severities),
        }
    }
}

/// Fully resolved, validated configuration shared by both workflows
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub endpoint: RegistryEndpoint,
    pub namespaces: Namespaces,
    pub images: Vec<ImageReference>,
    pub signing_profile: String,
    pub work_home: PathBuf,
    pub plugin_source: PathBuf,
    pub gate_policy: GatePolicy,
}

impl PipelineConfig {
    /// Resolve from command-line/env values, falling back to an optional file
    pub fn resolve(
        overrides: FileConfig,
        file: Option<FileConfig>,
    ) -> Result<Self, PromoteError> {
        let merged = match file {
            Some(file) => overrides.or(file),
            None => overrides,
        };

        let account_id = required(merged.registry.account_id, "account_id")?;
        if !account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                field: "account_id".to_string(),
                value: account_id,
            }
            .into());
        }

        let region = required(merged.registry.region, "region")?;
        let staging = namespace(merged.registry.staging_namespace, "staging_namespace")?;
        let production = namespace(merged.registry.production_namespace, "production_namespace")?;
        let signing_profile = required(merged.signing.profile, "signing_profile")?;

        let raw_images = required(merged.images.map(|i| i.joined()), "images")?;
        let images = parse_image_list(&raw_images)?;
        if images.is_empty() {
            return Err(ConfigError::MissingField {
                field: "images".to_string(),
            }
            .into());
        }

        let gate_policy = match merged.blocking_severities {
            None => GatePolicy::default(),
            Some(names) => parse_severities(&names)?,
        };

        Ok(Self {
            endpoint: RegistryEndpoint::new(account_id, region),
            namespaces: Namespaces::new(staging, production),
            images,
            signing_profile,
            work_home: merged.signing.work_home.unwrap_or_else(default_work_home),
            plugin_source: merged
                .signing
                .plugin_source
                .unwrap_or_else(default_plugin_source),
            gate_policy,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
        })
}

fn namespace(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    let value = required(value, field)?;
    if value.starts_with('/') || value.ends_with('/') || value.contains("//") {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

fn parse_severities(names: &[String]) -> Result<GatePolicy, ConfigError> {
    let severities = names
        .iter()
        .flat_map(|n| n.split(','))
        .filter(|n| !n.trim().is_empty())
        .map(|n| {
            Severity::from_str(n).ok_or_else(|| ConfigError::InvalidValue {
                field: "blocking_severities".to_string(),
                value: n.trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if severities.is_empty() {
        return Err(ConfigError::MissingField {
            field: "blocking_severities".to_string(),
        });
    }
    Ok(GatePolicy::blocking(severities))
}
