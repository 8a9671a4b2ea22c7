//! CLI definitions for ferry
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{FileConfig, ImageList, RegistryConfig, SigningConfig};

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Two-stage container image promotion pipeline",
    long_about = "Pulls images into a staging namespace, gates them on registry scan findings,\nthen copies them (with referrers) into a production namespace and signs them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// YAML config file filling any value not given on the command line or in the environment
    #[arg(long, env = "FERRY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Pipeline settings shared by every workflow
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Numeric registry account id
    #[arg(long, env = "FERRY_ACCOUNT_ID", global = true)]
    pub account_id: Option<String>,

    /// Comma-separated repository:tag list
    #[arg(long, env = "FERRY_IMAGES", global = true)]
    pub images: Option<String>,

    /// Namespace images are pulled and scanned under
    #[arg(long, env = "FERRY_STAGING_NAMESPACE", global = true)]
    pub staging_namespace: Option<String>,

    /// Namespace promoted images are stored under
    #[arg(long, env = "FERRY_PRODUCTION_NAMESPACE", global = true)]
    pub production_namespace: Option<String>,

    /// Registry and signer region
    #[arg(long, env = "FERRY_REGION", global = true)]
    pub region: Option<String>,

    /// Signing profile name
    #[arg(long, env = "FERRY_SIGNING_PROFILE", global = true)]
    pub signing_profile: Option<String>,

    /// Writable HOME and working directory for external tools [default: /tmp]
    #[arg(long, env = "FERRY_WORK_HOME", global = true)]
    pub work_home: Option<PathBuf>,

    /// Notation config directory holding the signer plugin [default: /root/.config/notation]
    #[arg(long, env = "FERRY_NOTATION_PLUGIN_SOURCE", global = true)]
    pub plugin_source: Option<PathBuf>,

    /// Severities that block promotion [default: HIGH,CRITICAL]
    #[arg(long, env = "FERRY_BLOCKING_SEVERITIES", global = true)]
    pub blocking_severities: Option<String>,
}

impl PipelineArgs {
    /// Command line and environment values as the highest-priority config layer
    pub fn into_overrides(self) -> FileConfig {
        FileConfig {
            registry: RegistryConfig {
                account_id: self.account_id,
                region: self.region,
                staging_namespace: self.staging_namespace,
                production_namespace: self.production_namespace,
            },
            signing: SigningConfig {
                profile: self.signing_profile,
                work_home: self.work_home,
                plugin_source: self.plugin_source,
            },
            images: self.images.map(ImageList::Joined),
            blocking_severities: self.blocking_severities.map(|s| vec![s]),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull every image into the staging namespace
    Pull {
        /// Trigger event payload (JSON)
        #[arg(long)]
        event: Option<String>,

        /// Attempt every image even after a failed pull
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Gate, copy and sign every image into the production namespace
    Promote {
        /// Trigger event payload (JSON)
        #[arg(long)]
        event: Option<String>,
    },

    /// Report gate decisions without provisioning, copying or signing
    Check,

    /// Pull, wait for scans to settle, then promote
    Cycle {
        /// Seconds to wait between pull and promote
        #[arg(long, default_value = "720")]
        settle_secs: u64,

        /// Attempt every pull even after a failure
        #[arg(long)]
        continue_on_error: bool,
    },
}
