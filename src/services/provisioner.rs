//! Production repository provisioning

use tracing::info;

use crate::error::RegistryError;
use crate::infrastructure::{RegistryApi, RepositoryCreation};
use crate::observability::RunEvents;

/// Ensures production repositories exist before an image is copied in
pub struct RepositoryProvisioner<'a> {
    registry: &'a dyn RegistryApi,
    events: &'a RunEvents,
}

impl<'a> RepositoryProvisioner<'a> {
    pub fn new(registry: &'a dyn RegistryApi, events: &'a RunEvents) -> Self {
        Self { registry, events }
    }

    /// Create `repository` if missing; an existing repository counts as success
    pub async fn ensure(&self, repository: &str) -> Result<RepositoryCreation, RegistryError> {
        let outcome = self.registry.create_repository(repository).await?;
        match outcome {
            RepositoryCreation::Created => info!("Created repository {}", repository),
            RepositoryCreation::AlreadyExists => {
                info!("Repository {} already exists", repository)
            }
        }
        self.events.provisioned(repository, outcome.as_str());
        Ok(outcome)
    }
}
