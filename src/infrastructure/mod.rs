//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Container registry API (via the aws CLI)
//! - Registry login
//! - Artifact copy (oras)
//! - Artifact signing (notation)

pub mod auth;
pub mod copier;
pub mod process;
pub mod registry;
pub mod signer;

// Re-export commonly used types
pub use auth::RegistryLogin;
pub use copier::{ArtifactCopier, OrasCopier};
pub use process::ToolRunner;
pub use registry::{AwsCliRegistry, RegistryApi, RepositoryCreation};
pub use signer::{ArtifactSigner, NotationSigner, PluginWorkspace, SigningIdentity};
