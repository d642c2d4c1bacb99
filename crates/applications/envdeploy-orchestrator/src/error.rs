//! Error types for the orchestrator

use envdeploy_core::CoreError;
use thiserror::Error;

/// Orchestrator result type
pub type Result<T> = std::result::Result<T, DeployError>;

/// Errors surfaced by an environment deployment
#[derive(Error, Debug)]
pub enum DeployError {
    /// Regional resource lookup failed
    #[error("get app resources in region {region}: {source}")]
    AppResources {
        /// Region that was looked up
        region: String,
        /// Locator failure
        #[source]
        source: CoreError,
    },

    /// Lookup succeeded but the region has no artifact bucket
    #[error("cannot find the S3 artifact bucket in region {region}")]
    MissingArtifactBucket {
        /// Region without a bucket
        region: String,
    },

    /// Either upload strategy failed; no partial URL map is kept
    #[error("upload custom resources to bucket {bucket}: {source}")]
    UploadCustomResources {
        /// Destination bucket
        bucket: String,
        /// Strategy failure
        #[source]
        source: CoreError,
    },

    /// Stack updater failure, passed through unchanged
    #[error(transparent)]
    Stack(CoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeployError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
