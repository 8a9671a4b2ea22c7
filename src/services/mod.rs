//! Services layer - orchestration logic
//!
//! This module coordinates between domain logic and infrastructure.
//! Services reach the registry and external tools only through the
//! capabilities held by [`PipelineContext`].

pub mod context;
pub mod promotion;
pub mod provisioner;
pub mod puller;

// Re-export commonly used types
pub use context::PipelineContext;
pub use provisioner::RepositoryProvisioner;
pub use puller::PullPolicy;
