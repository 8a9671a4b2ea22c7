//! Registry configuration: account, region and namespaces.

use serde::{Deserialize, Serialize};

/// Registry section of `ferry.yaml`
///
/// Every field is required overall but may come from the file, the
/// environment or the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Numeric account id (e.g., "123456789012")
    #[serde(default)]
    pub account_id: Option<String>,

    /// Registry and signing region (e.g., "us-east-1")
    #[serde(default)]
    pub region: Option<String>,

    /// Namespace images are pulled and scanned under (e.g., "ecr-public")
    #[serde(default)]
    pub staging_namespace: Option<String>,

    /// Namespace promoted images are stored under (e.g., "prod")
    #[serde(default)]
    pub production_namespace: Option<String>,
}

impl RegistryConfig {
    /// Fill unset fields from `other`
    pub fn or(self, other: RegistryConfig) -> Self {
        Self {
            account_id: self.account_id.or(other.account_id),
            region: self.region.or(other.region),
            staging_namespace: self.staging_namespace.or(other.staging_namespace),
            production_namespace: self.production_namespace.or(other.production_namespace),
        }
    }
}
