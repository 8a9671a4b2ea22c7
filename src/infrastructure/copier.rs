//! Artifact copy between registry repositories
//!
//! Copies are referrer-aware (`oras cp -r`) so signatures and SBOMs attached
//! to the staging manifest follow it into production.

use async_trait::async_trait;

use crate::domain::image::ArtifactRef;
use crate::error::ToolError;
use crate::infrastructure::auth::RegistryLogin;
use crate::infrastructure::process::{ToolOutput, ToolRunner};
use crate::tools::tools;

/// Copies an artifact and everything that refers to it
#[async_trait]
pub trait ArtifactCopier: Send + Sync {
    /// Authenticate, then copy `source` to `destination`
    ///
    /// `Ok` carries the raw copy result even for a non-zero exit; `Err` means
    /// the copy could not be attempted (login or spawn failure).
    async fn copy(
        &self,
        source: &ArtifactRef,
        destination: &ArtifactRef,
    ) -> Result<ToolOutput, ToolError>;
}

/// `oras cp --recursive`
pub struct OrasCopier {
    runner: ToolRunner,
    login: RegistryLogin,
    oras: String,
}

impl OrasCopier {
    pub fn new(runner: ToolRunner, login: RegistryLogin, oras: impl Into<String>) -> Self {
        Self {
            runner,
            login,
            oras: oras.into(),
        }
    }
}

#[async_trait]
impl ArtifactCopier for OrasCopier {
    async fn copy(
        &self,
        source: &ArtifactRef,
        destination: &ArtifactRef,
    ) -> Result<ToolOutput, ToolError> {
        self.login.login(tools::ORAS, &self.oras).await?;

        let args = vec![
            "cp".to_string(),
            "--recursive".to_string(),
            source.to_string(),
            destination.to_string(),
        ];
        self.runner.run(tools::ORAS, &self.oras, &args, None).await
    }
}
