//! Image reference domain types
//!
//! Parses the configured `repository:tag` list and composes the fully
//! qualified staging and production references from namespaces.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::ReferenceError;

static REPOSITORY_PATTERN: OnceLock<Regex> = OnceLock::new();
static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn repository_pattern() -> &'static Regex {
    REPOSITORY_PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9]+(?:[._-][a-z0-9]+)*/)*[a-z0-9]+(?:[._-][a-z0-9]+)*$")
            .expect("repository pattern is valid")
    })
}

fn tag_pattern() -> &'static Regex {
    TAG_PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]{0,127}$").expect("tag pattern is valid")
    })
}

/// A single `repository:tag` pair from the image list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    /// Parse a `repository:tag` token
    ///
    /// Splits on the first `:` after trimming the token. Whitespace around the
    /// separator is ignored; whitespace inside a name is rejected by validation.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let token = input.trim();
        let (repository, tag) = token
            .split_once(':')
            .ok_or_else(|| ReferenceError::MissingTag {
                input: token.to_string(),
            })?;
        let repository = repository.trim();
        let tag = tag.trim();

        if repository.is_empty() {
            return Err(ReferenceError::EmptyRepository {
                input: token.to_string(),
            });
        }
        if tag.is_empty() {
            return Err(ReferenceError::EmptyTag {
                input: token.to_string(),
            });
        }
        if !repository_pattern().is_match(repository) {
            return Err(ReferenceError::InvalidRepository {
                input: token.to_string(),
                repository: repository.to_string(),
            });
        }
        if !tag_pattern().is_match(tag) {
            return Err(ReferenceError::InvalidTag {
                input: token.to_string(),
                tag: tag.to_string(),
            });
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Parse a comma-separated image list, preserving declaration order
///
/// Empty segments (e.g. from a trailing comma) are ignored. Duplicates are kept.
pub fn parse_image_list(input: &str) -> Result<Vec<ImageReference>, ReferenceError> {
    input
        .split(',')
        .filter(|segment| !segment.trim().is_empty())
        .map(ImageReference::parse)
        .collect()
}

/// Staging and production namespace prefixes
///
/// Production repositories nest the staging namespace:
/// `{production}/{staging}/{repository}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespaces {
    pub staging: String,
    pub production: String,
}

impl Namespaces {
    pub fn new(staging: impl Into<String>, production: impl Into<String>) -> Self {
        Self {
            staging: staging.into(),
            production: production.into(),
        }
    }

    /// Staging repository name: `{staging}/{repository}`
    pub fn staging_repository(&self, image: &ImageReference) -> String {
        format!("{}/{}", self.staging, image.repository)
    }

    /// Production repository name: `{production}/{staging}/{repository}`
    pub fn production_repository(&self, image: &ImageReference) -> String {
        format!("{}/{}/{}", self.production, self.staging, image.repository)
    }
}

/// Registry account and region, used to build hostnames and identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEndpoint {
    pub account_id: String,
    pub region: String,
}

impl RegistryEndpoint {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }

    /// Registry hostname, e.g. `123456789012.dkr.ecr.us-east-1.amazonaws.com`
    pub fn host(&self) -> String {
        format!("{}.dkr.ecr.{}.amazonaws.com", self.account_id, self.region)
    }

    /// Signer profile ARN for a named signing profile
    pub fn signing_profile_arn(&self, profile: &str) -> String {
        format!(
            "arn:aws:signer:{}:{}:/signing-profiles/{}",
            self.region, self.account_id, profile
        )
    }
}

/// Fully qualified artifact reference: `{host}/{repository}:{tag}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub host: String,
    pub repository: String,
    pub tag: String,
}

impl ArtifactRef {
    /// Staging artifact for an image
    pub fn staging(
        endpoint: &RegistryEndpoint,
        namespaces: &Namespaces,
        image: &ImageReference,
    ) -> Self {
        Self {
            host: endpoint.host(),
            repository: namespaces.staging_repository(image),
            tag: image.tag.clone(),
        }
    }

    /// Production artifact for an image
    pub fn production(
        endpoint: &RegistryEndpoint,
        namespaces: &Namespaces,
        image: &ImageReference,
    ) -> Self {
        Self {
            host: endpoint.host(),
            repository: namespaces.production_repository(image),
            tag: image.tag.clone(),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.host, self.repository, self.tag)
    }
}
