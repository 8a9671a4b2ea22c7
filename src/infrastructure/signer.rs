//! Artifact signing with notation and the AWS Signer plugin
//!
//! notation looks for plugins under its config directory, which it also
//! writes to. The read-only plugin installation is therefore copied once per
//! process into the writable work home ([`PluginWorkspace`]).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::image::ArtifactRef;
use crate::error::ToolError;
use crate::infrastructure::auth::RegistryLogin;
use crate::infrastructure::process::{ToolOutput, ToolRunner};
use crate::tools::tools;

/// notation plugin id for AWS Signer
pub const SIGNER_PLUGIN_ID: &str = "com.amazonaws.signer.notation.plugin";

/// Signs an artifact in place
#[async_trait]
pub trait ArtifactSigner: Send + Sync {
    /// Authenticate, then sign `artifact`
    ///
    /// `Ok` carries the raw sign result even for a non-zero exit; `Err` means
    /// signing could not be attempted.
    async fn sign(&self, artifact: &ArtifactRef) -> Result<ToolOutput, ToolError>;
}

/// Signing identity and plugin configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    /// Signing profile ARN passed as `--id`
    pub profile_arn: String,
    pub region: String,
}

/// `notation sign --plugin ... --id ... --plugin-config aws-region=...`
pub struct NotationSigner {
    runner: ToolRunner,
    login: RegistryLogin,
    notation: String,
    identity: SigningIdentity,
}

impl NotationSigner {
    pub fn new(
        runner: ToolRunner,
        login: RegistryLogin,
        notation: impl Into<String>,
        identity: SigningIdentity,
    ) -> Self {
        Self {
            runner,
            login,
            notation: notation.into(),
            identity,
        }
    }

    fn sign_args(&self, artifact: &ArtifactRef) -> Vec<String> {
        vec![
            "sign".to_string(),
            artifact.to_string(),
            "--plugin".to_string(),
            SIGNER_PLUGIN_ID.to_string(),
            "--id".to_string(),
            self.identity.profile_arn.clone(),
            "--plugin-config".to_string(),
            format!("aws-region={}", self.identity.region),
        ]
    }
}

#[async_trait]
impl ArtifactSigner for NotationSigner {
    async fn sign(&self, artifact: &ArtifactRef) -> Result<ToolOutput, ToolError> {
        self.login.login(tools::NOTATION, &self.notation).await?;
        let args = self.sign_args(artifact);
        self.runner
            .run(tools::NOTATION, &self.notation, &args, None)
            .await
    }
}

/// Result of preparing the plugin workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceSetup {
    Copied { files: usize },
    AlreadyPresent,
}

/// Writable copy of the notation config + plugin tree
#[derive(Debug, Clone)]
pub struct PluginWorkspace {
    source: PathBuf,
    destination: PathBuf,
}

impl PluginWorkspace {
    /// `destination` is `{work_home}/.config/notation`
    pub fn new(source: impl Into<PathBuf>, work_home: &Path) -> Self {
        Self {
            source: source.into(),
            destination: work_home.join(".config").join("notation"),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Copy the plugin tree unless the destination already exists
    pub fn prepare(&self) -> Result<WorkspaceSetup, ToolError> {
        if self.destination.exists() {
            info!(
                "Plugin workspace {} already exists, not copying",
                self.destination.display()
            );
            return Ok(WorkspaceSetup::AlreadyPresent);
        }

        let files = copy_tree(&self.source, &self.destination).map_err(|message| {
            ToolError::PluginWorkspace {
                path: self.destination.display().to_string(),
                message,
            }
        })?;
        info!(
            "Copied {} plugin files from {} to {}",
            files,
            self.source.display(),
            self.destination.display()
        );
        Ok(WorkspaceSetup::Copied { files })
    }
}

fn copy_tree(source: &Path, destination: &Path) -> Result<usize, String> {
    if !source.is_dir() {
        return Err(format!("{} is not a directory", source.display()));
    }

    let mut files = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| e.to_string())?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| e.to_string())?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| format!("create {}: {}", target.display(), e))?;
        } else {
            debug!("Copying {}", relative.display());
            std::fs::copy(entry.path(), &target)
                .map_err(|e| format!("copy {}: {}", entry.path().display(), e))?;
            files += 1;
        }
    }
    Ok(files)
}
