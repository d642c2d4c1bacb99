//! Collaborator traits for environment deployment
//!
//! Every external system the orchestrator talks to is reached through one of
//! these narrow capabilities. The orchestrator works through this interface
//! ONLY - network clients, credentials and retries live behind it.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::*;

/// Looks up the support resources provisioned for an application in a region.
#[async_trait]
pub trait AppResourcesGetter: Send + Sync {
    /// Fails when the region is not provisioned for the application
    async fn get_app_resources_by_region(
        &self,
        app: &Application,
        region: &str,
    ) -> Result<RegionalResources>;
}

/// Pushes a body to object storage.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `body` to `bucket` under `key` and return a URL for the object.
    ///
    /// The URL may be empty.
    async fn upload(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String>;
}

/// Legacy batch packager for environment custom resources.
#[async_trait]
pub trait CustomResourcesUploader: Send + Sync {
    /// Package and upload every environment custom resource to `bucket`
    async fn upload_environment_custom_resources(&self, bucket: &str) -> Result<ArtifactUrls>;
}

/// Write-only sink for stack progress lines.
pub trait ProgressWriter: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Applies a deployment request against the infrastructure stack engine.
#[async_trait]
pub trait EnvironmentDeployer: Send + Sync {
    /// Render the environment stack from `request` and create or update it
    async fn update_and_render_environment(
        &self,
        progress: &dyn ProgressWriter,
        request: &DeploymentRequest,
        options: &[StackOption],
    ) -> Result<()>;
}
