//! Command line and environment configuration

use std::time::Duration;

use clap::Parser;

use importer_common::poll::PollConfig;
use importer_common::telemetry::LogFormat;
use importer_common::IMPORTER_IMAGE_REPOSITORY;

/// Importer controller - copies external data into annotated PersistentVolumeClaims
#[derive(Parser, Debug, Clone)]
#[command(name = "importer-controller", version, about, long_about = None)]
pub struct Cli {
    /// Tag of the importer image run in worker pods
    #[arg(long, env = "IMPORTER_TAG", default_value = "latest")]
    pub importer_tag: String,

    /// Only watch claims in this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Log line format: json or text
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,

    /// Seconds spent retrying a conflicting status update before giving up
    #[arg(long, env = "STATUS_TIMEOUT_SECS", default_value_t = 4)]
    pub status_timeout_secs: u64,
}

impl Cli {
    /// Reconciler settings derived from the command line
    pub fn importer_config(&self) -> ImporterConfig {
        ImporterConfig {
            image: importer_image(&self.importer_tag),
            status_poll: PollConfig::with_timeout(Duration::from_secs(self.status_timeout_secs)),
        }
    }
}

/// Full image reference of the importer for a tag
pub fn importer_image(tag: &str) -> String {
    format!("{}:{}", IMPORTER_IMAGE_REPOSITORY, tag)
}

/// Settings used by the reconciler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImporterConfig {
    /// Importer image reference
    pub image: String,
    /// Budget for conflicting status updates
    pub status_poll: PollConfig,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            image: importer_image("latest"),
            status_poll: PollConfig::default(),
        }
    }
}
