//! In-memory fakes for the capability traits (testing only)
//!
//! `MemoryRegistry`, `RecordingCopier` and `RecordingSigner` record every call
//! and fail on demand, so workflows can be exercised without a registry or
//! external tools.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::domain::{
    ArtifactRef, GatePolicy, ImageReference, Namespaces, RegistryEndpoint, ScanResult, Workflow,
};
use crate::error::{RegistryError, ToolError};
use crate::infrastructure::process::{ToolOutput, ToolRunner};
use crate::observability::RunEvents;
use crate::infrastructure::{ArtifactCopier, ArtifactSigner, RegistryApi, RepositoryCreation};
use crate::services::PipelineContext;

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// Registry backed by maps keyed on `repository:tag`
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    scans: Mutex<HashMap<String, Result<ScanResult, RegistryError>>>,
    pull_failures: Mutex<HashMap<String, RegistryError>>,
    repositories: Mutex<HashSet<String>>,
    pulls: Mutex<Vec<String>>,
    scanned: Mutex<Vec<String>>,
    created: Mutex<Vec<String>>,
}

fn key(repository: &str, tag: &str) -> String {
    format!("{}:{}", repository, tag)
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scan(self, repository: &str, tag: &str, scan: ScanResult) -> Self {
        self.scans
            .lock()
            .unwrap()
            .insert(key(repository, tag), Ok(scan));
        self
    }

    pub fn with_scan_error(self, repository: &str, tag: &str, error: RegistryError) -> Self {
        self.scans
            .lock()
            .unwrap()
            .insert(key(repository, tag), Err(error));
        self
    }

    pub fn with_pull_failure(self, repository: &str, tag: &str, error: RegistryError) -> Self {
        self.pull_failures
            .lock()
            .unwrap()
            .insert(key(repository, tag), error);
        self
    }

    pub fn with_repository(self, repository: &str) -> Self {
        self.repositories
            .lock()
            .unwrap()
            .insert(repository.to_string());
        self
    }

    pub fn pulls(&self) -> Vec<String> {
        self.pulls.lock().unwrap().clone()
    }

    pub fn scanned(&self) -> Vec<String> {
        self.scanned.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryApi for MemoryRegistry {
    async fn request_image_pull(&self, repository: &str, tag: &str) -> Result<(), RegistryError> {
        let k = key(repository, tag);
        self.pulls.lock().unwrap().push(k.clone());
        match self.pull_failures.lock().unwrap().get(&k) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn scan_result(&self, repository: &str, tag: &str) -> Result<ScanResult, RegistryError> {
        let k = key(repository, tag);
        self.scanned.lock().unwrap().push(k.clone());
        self.scans
            .lock()
            .unwrap()
            .get(&k)
            .cloned()
            .unwrap_or_else(|| {
                Err(RegistryError::NotFound {
                    code: "ScanNotFoundException".to_string(),
                    message: format!("no scan for {}", k),
                })
            })
    }

    async fn create_repository(
        &self,
        repository: &str,
    ) -> Result<RepositoryCreation, RegistryError> {
        let inserted = self
            .repositories
            .lock()
            .unwrap()
            .insert(repository.to_string());
        if inserted {
            self.created.lock().unwrap().push(repository.to_string());
            Ok(RepositoryCreation::Created)
        } else {
            Ok(RepositoryCreation::AlreadyExists)
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingCopier / RecordingSigner
// ---------------------------------------------------------------------------

fn output(tool: &str, args: Vec<String>, exit_code: i32) -> ToolOutput {
    ToolOutput {
        tool: tool.to_string(),
        args,
        exit_code: Some(exit_code),
        stdout: String::new(),
        stderr: if exit_code == 0 {
            String::new()
        } else {
            "simulated failure".to_string()
        },
        duration: Duration::from_millis(1),
    }
}

/// Copier that records `(source, destination)` pairs
#[derive(Debug, Default)]
pub struct RecordingCopier {
    calls: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit non-zero when copying to `destination`
    pub fn failing_for(self, destination: &str) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(destination.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactCopier for RecordingCopier {
    async fn copy(
        &self,
        source: &ArtifactRef,
        destination: &ArtifactRef,
    ) -> Result<ToolOutput, ToolError> {
        let (src, dst) = (source.to_string(), destination.to_string());
        self.calls.lock().unwrap().push((src.clone(), dst.clone()));
        let exit_code = if self.failing.lock().unwrap().contains(&dst) {
            1
        } else {
            0
        };
        Ok(output("oras", vec!["cp".to_string(), src, dst], exit_code))
    }
}

/// Signer that records signed references
#[derive(Debug, Default)]
pub struct RecordingSigner {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit non-zero when signing `reference`
    pub fn failing_for(self, reference: &str) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(reference.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactSigner for RecordingSigner {
    async fn sign(&self, artifact: &ArtifactRef) -> Result<ToolOutput, ToolError> {
        let reference = artifact.to_string();
        self.calls.lock().unwrap().push(reference.clone());
        let exit_code = if self.failing.lock().unwrap().contains(&reference) {
            1
        } else {
            0
        };
        Ok(output("notation", vec!["sign".to_string(), reference], exit_code))
    }
}

// ---------------------------------------------------------------------------
// Context helpers
// ---------------------------------------------------------------------------

/// Tool runner whose events carry a nil invocation id
pub fn test_runner(work_home: impl Into<PathBuf>) -> ToolRunner {
    ToolRunner::new(work_home, RunEvents::new(uuid::Uuid::nil(), Workflow::Promote))
}

pub const TEST_HOST: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com";

pub fn test_config(images: &[&str]) -> PipelineConfig {
    PipelineConfig {
        endpoint: RegistryEndpoint::new("123456789012", "us-east-1"),
        namespaces: Namespaces::new("cache", "prod"),
        images: images
            .iter()
            .map(|i| ImageReference::parse(i).unwrap())
            .collect(),
        signing_profile: "release_signer".to_string(),
        work_home: PathBuf::from("/tmp"),
        plugin_source: PathBuf::from("/nonexistent"),
        gate_policy: GatePolicy::default(),
    }
}

pub fn test_context(
    images: &[&str],
    registry: Arc<MemoryRegistry>,
    copier: Arc<RecordingCopier>,
    signer: Arc<RecordingSigner>,
) -> PipelineContext {
    PipelineContext::from_parts(test_config(images), registry, copier, signer)
}

/// Production reference as the workflows compose it
pub fn prod_ref(repository: &str, tag: &str) -> String {
    format!("{}/prod/cache/{}:{}", TEST_HOST, repository, tag)
}
