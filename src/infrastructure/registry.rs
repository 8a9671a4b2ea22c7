//! Container registry operations
//!
//! [`RegistryApi`] is the contract both workflows use: trigger a pull into a
//! staging repository, read the scan snapshot, create a repository.
//! [`AwsCliRegistry`] implements it with `aws ecr ... --output json`.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::domain::scan::{ScanFinding, ScanResult, ScanStatus};
use crate::error::RegistryError;
use crate::infrastructure::process::{ToolOutput, ToolRunner};
use crate::tools::tools;

/// Outcome of a create-repository call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryCreation {
    Created,
    AlreadyExists,
}

impl RepositoryCreation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
        }
    }
}

/// Registry operations needed by the puller and the promoter
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Ask the registry to materialize `repository:tag` (pull-through cache)
    async fn request_image_pull(&self, repository: &str, tag: &str) -> Result<(), RegistryError>;

    /// Read the current scan snapshot for `repository:tag`
    async fn scan_result(&self, repository: &str, tag: &str) -> Result<ScanResult, RegistryError>;

    /// Create `repository`, reporting an existing one as `AlreadyExists`
    async fn create_repository(&self, repository: &str)
        -> Result<RepositoryCreation, RegistryError>;
}

/// Registry client driving the `aws` CLI
pub struct AwsCliRegistry {
    runner: ToolRunner,
    aws: String,
    region: String,
}

impl AwsCliRegistry {
    pub fn new(runner: ToolRunner, aws: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            runner,
            aws: aws.into(),
            region: region.into(),
        }
    }

    async fn ecr(&self, operation: &str, args: &[&str]) -> Result<ToolOutput, RegistryError> {
        let mut full_args = vec!["ecr".to_string(), operation.to_string()];
        full_args.extend(args.iter().map(|a| a.to_string()));
        full_args.extend([
            "--region".to_string(),
            self.region.clone(),
            "--output".to_string(),
            "json".to_string(),
        ]);

        let output = self
            .runner
            .run(tools::AWS, &self.aws, &full_args, None)
            .await
            .map_err(|e| RegistryError::unknown(e.to_string()))?;

        debug!(
            "aws ecr {} exited with {:?}",
            operation, output.exit_code
        );
        Ok(output)
    }
}

#[async_trait]
impl RegistryApi for AwsCliRegistry {
    async fn request_image_pull(&self, repository: &str, tag: &str) -> Result<(), RegistryError> {
        let image_ids = format!("imageTag={}", tag);
        let output = self
            .ecr(
                "batch-get-image",
                &["--repository-name", repository, "--image-ids", &image_ids],
            )
            .await?;

        if !output.success() {
            return Err(classify_cli_error(&output.stderr));
        }

        let response: BatchGetImageResponse = parse_json(&output.stdout)?;
        match response.failures.into_iter().next() {
            None => Ok(()),
            Some(failure) => Err(failure.into_error()),
        }
    }

    async fn scan_result(&self, repository: &str, tag: &str) -> Result<ScanResult, RegistryError> {
        let image_id = format!("imageTag={}", tag);
        let output = self
            .ecr(
                "describe-image-scan-findings",
                &["--repository-name", repository, "--image-id", &image_id],
            )
            .await?;

        if !output.success() {
            return Err(classify_cli_error(&output.stderr));
        }

        let response: ScanFindingsResponse = parse_json(&output.stdout)?;
        Ok(response.into_scan_result())
    }

    async fn create_repository(
        &self,
        repository: &str,
    ) -> Result<RepositoryCreation, RegistryError> {
        let output = self
            .ecr("create-repository", &["--repository-name", repository])
            .await?;

        if output.success() {
            return Ok(RepositoryCreation::Created);
        }

        if error_code(&output.stderr).as_deref() == Some(REPOSITORY_EXISTS) {
            return Ok(RepositoryCreation::AlreadyExists);
        }
        Err(classify_cli_error(&output.stderr))
    }
}

const REPOSITORY_EXISTS: &str = "RepositoryAlreadyExistsException";

static ERROR_CODE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Extract `Code` from `An error occurred (Code) when calling ...`
fn error_code(stderr: &str) -> Option<String> {
    let pattern = ERROR_CODE_PATTERN.get_or_init(|| {
        Regex::new(r"An error occurred \(([A-Za-z0-9_.]+)\)").expect("error code pattern is valid")
    });
    pattern
        .captures(stderr)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Map `aws` CLI stderr to a [`RegistryError`]
pub fn classify_cli_error(stderr: &str) -> RegistryError {
    let message = stderr.trim().to_string();
    match error_code(stderr) {
        Some(code) => classify_code(code, message),
        None => RegistryError::unknown(message),
    }
}

fn classify_code(code: String, message: String) -> RegistryError {
    if code.contains("NotFound") {
        RegistryError::NotFound { code, message }
    } else if code.starts_with("Throttling") || code.starts_with("TooManyRequests") {
        RegistryError::Throttled { code, message }
    } else if code.starts_with("AccessDenied")
        || code.starts_with("UnrecognizedClient")
        || code.starts_with("ExpiredToken")
        || code.starts_with("InvalidSignature")
    {
        RegistryError::Unauthorized { code, message }
    } else {
        RegistryError::Unknown {
            message: format!("{}: {}", code, message),
        }
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(stdout: &str) -> Result<T, RegistryError> {
    serde_json::from_str(stdout)
        .map_err(|e| RegistryError::unknown(format!("unexpected registry response: {}", e)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetImageResponse {
    #[serde(default)]
    failures: Vec<ImageFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageFailure {
    #[serde(default)]
    failure_code: String,
    #[serde(default)]
    failure_reason: String,
}

impl ImageFailure {
    fn into_error(self) -> RegistryError {
        match self.failure_code.as_str() {
            "ImageNotFound" | "RepositoryNotFound" | "ImageTagDoesNotMatchDigest" => {
                RegistryError::NotFound {
                    code: self.failure_code,
                    message: self.failure_reason,
                }
            }
            _ => RegistryError::Unknown {
                message: format!("{}: {}", self.failure_code, self.failure_reason),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanFindingsResponse {
    image_scan_status: ImageScanStatus,
    #[serde(default)]
    image_scan_findings: Option<ImageScanFindings>,
}

#[derive(Debug, Deserialize)]
struct ImageScanStatus {
    status: ScanStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageScanFindings {
    #[serde(default)]
    enhanced_findings: Option<Vec<ScanFinding>>,
    #[serde(default)]
    findings: Option<Vec<ScanFinding>>,
}

impl ScanFindingsResponse {
    fn into_scan_result(self) -> ScanResult {
        let findings = self
            .image_scan_findings
            .and_then(|f| f.enhanced_findings.or(f.findings));
        ScanResult::new(self.image_scan_status.status, findings)
    }
}
