//! Setup for one workflow invocation
//!
//! Built once at startup and passed to each entrypoint explicitly.

use std::sync::Arc;
use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::Workflow;
use crate::error::{PromoteError, ToolError};
use crate::infrastructure::signer::WorkspaceSetup;
use crate::observability::RunEvents;
use crate::infrastructure::{
    ArtifactCopier, ArtifactSigner, AwsCliRegistry, NotationSigner, OrasCopier, PluginWorkspace,
    RegistryApi, RegistryLogin, SigningIdentity, ToolRunner,
};
use crate::tools::{get_tool_path, resolve_tool, tools};
use crate::trigger::Invocation;

/// Configuration plus the registry, copy and sign capabilities
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub registry: Arc<dyn RegistryApi>,
    pub copier: Arc<dyn ArtifactCopier>,
    pub signer: Arc<dyn ArtifactSigner>,
}

impl PipelineContext {
    /// Assemble a context from already-built capabilities
    pub fn from_parts(
        config: PipelineConfig,
        registry: Arc<dyn RegistryApi>,
        copier: Arc<dyn ArtifactCopier>,
        signer: Arc<dyn ArtifactSigner>,
    ) -> Self {
        Self {
            config,
            registry,
            copier,
            signer,
        }
    }

    /// Build the production context for one `workflow` invocation
    ///
    /// Only the promote workflow needs oras, notation and the plugin
    /// workspace; the others skip those checks. Tool events carry the
    /// invocation id.
    pub fn initialize(
        config: PipelineConfig,
        workflow: Workflow,
        invocation: &Invocation,
    ) -> Result<Self, PromoteError> {
        std::fs::create_dir_all(&config.work_home).map_err(|e| ToolError::PluginWorkspace {
            path: config.work_home.display().to_string(),
            message: e.to_string(),
        })?;

        let runner = ToolRunner::new(
            &config.work_home,
            RunEvents::new(invocation.id, workflow),
        );
        let aws = resolve_tool(tools::AWS)?;

        let (oras, notation) = if workflow == Workflow::Promote {
            let oras = resolve_tool(tools::ORAS)?;
            let notation = resolve_tool(tools::NOTATION)?;
            let workspace = PluginWorkspace::new(&config.plugin_source, &config.work_home);
            if let WorkspaceSetup::Copied { files } = workspace.prepare()? {
                info!("Prepared notation workspace ({} files)", files);
            }
            (oras, notation)
        } else {
            (get_tool_path(tools::ORAS), get_tool_path(tools::NOTATION))
        };

        let endpoint = &config.endpoint;
        let login = RegistryLogin::new(
            runner.clone(),
            aws.clone(),
            endpoint.region.clone(),
            endpoint.host(),
        );
        let identity = SigningIdentity {
            profile_arn: endpoint.signing_profile_arn(&config.signing_profile),
            region: endpoint.region.clone(),
        };

        let registry = Arc::new(AwsCliRegistry::new(
            runner.clone(),
            aws,
            endpoint.region.clone(),
        ));
        let copier = Arc::new(OrasCopier::new(runner.clone(), login.clone(), oras));
        let signer = Arc::new(NotationSigner::new(runner, login, notation, identity));

        info!(
            "Initialized {} workflow against {} (work home {})",
            workflow.name(),
            endpoint.host(),
            config.work_home.display()
        );

        Ok(Self::from_parts(config, registry, copier, signer))
    }
}
