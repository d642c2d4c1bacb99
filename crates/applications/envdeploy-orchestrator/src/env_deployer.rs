//! Environment deployment orchestration
//!
//! Drives the two phases of an environment deployment:
//!
//! ```text
//! Init
//!   │  get app resources in region (never cached)
//! ResourcesResolved
//!   │  upload custom resources (legacy packager | direct upload)
//! ArtifactsUploaded
//!   │  render + apply environment stack
//! Submitted ──► Succeeded | Failed
//! ```
//!
//! Each arrow is a single collaborator call. A failure at any edge stops the
//! deployment; nothing is checkpointed here (the stack engine owns its own
//! state).

use crate::artifacts::UploadStrategy;
use crate::error::{DeployError, Result};
use crate::progress::TracingProgress;
use envdeploy_core::{
    AppInformation, AppResourcesGetter, Application, ArtifactUrls, DeploymentInput,
    DeploymentRequest, Environment, EnvironmentDeployer, ProgressWriter, RegionalResources,
    StackOption, LATEST_ENV_TEMPLATE_VERSION,
};
use std::sync::Arc;
use tracing::info;

/// Deploys one environment of one application
pub struct EnvDeployer {
    app: Application,
    env: Environment,

    /// Regional resource locator
    app_resources: Arc<dyn AppResourcesGetter>,

    /// How custom resources are staged
    uploads: UploadStrategy,

    /// Stack updater
    env_deployer: Arc<dyn EnvironmentDeployer>,

    /// Receives stack engine output
    progress: Arc<dyn ProgressWriter>,

    /// Engine parallelism for the stack operation
    parallelism: Option<u32>,
}

impl EnvDeployer {
    /// Create a deployer; progress goes to tracing until overridden
    pub fn new(
        app: Application,
        env: Environment,
        app_resources: Arc<dyn AppResourcesGetter>,
        uploads: UploadStrategy,
        env_deployer: Arc<dyn EnvironmentDeployer>,
    ) -> Self {
        Self {
            app,
            env,
            app_resources,
            uploads,
            env_deployer,
            progress: Arc::new(TracingProgress),
            parallelism: None,
        }
    }

    /// Set the progress sink
    pub fn with_progress(mut self, progress: Arc<dyn ProgressWriter>) -> Self {
        self.progress = progress;
        self
    }

    /// Set engine parallelism
    pub fn with_parallelism(mut self, parallelism: Option<u32>) -> Self {
        self.parallelism = parallelism;
        self
    }

    async fn app_resources(&self) -> Result<RegionalResources> {
        self.app_resources
            .get_app_resources_by_region(&self.app, &self.env.region)
            .await
            .map_err(|source| DeployError::AppResources {
                region: self.env.region.clone(),
                source,
            })
    }

    /// Stage the environment's custom resources in the regional artifact bucket.
    ///
    /// Returns one URL per custom resource. URLs may be empty.
    pub async fn upload_artifacts(&self) -> Result<ArtifactUrls> {
        let resources = self.app_resources().await?;
        if resources.s3_bucket.is_empty() {
            return Err(DeployError::MissingArtifactBucket {
                region: self.env.region.clone(),
            });
        }
        let bucket = resources.s3_bucket;

        info!(
            env = %self.env.name,
            region = %self.env.region,
            bucket = %bucket,
            strategy = self.uploads.name(),
            "Uploading environment artifacts"
        );

        let urls = self
            .uploads
            .upload(&bucket)
            .await
            .map_err(|source| DeployError::UploadCustomResources {
                bucket: bucket.clone(),
                source,
            })?;

        info!(count = urls.len(), "Environment artifacts uploaded");
        Ok(urls)
    }

    /// Create or update the environment stack.
    ///
    /// Stack updater errors are returned unchanged.
    pub async fn deploy_environment(&self, input: &DeploymentInput) -> Result<()> {
        let resources = self.app_resources().await?;
        let request = self.build_request(input, &resources);
        let options = self.stack_options();

        info!(
            env = %self.env.name,
            region = %self.env.region,
            version = %request.version,
            "Deploying environment"
        );

        self.env_deployer
            .update_and_render_environment(self.progress.as_ref(), &request, &options)
            .await
            .map_err(DeployError::Stack)
    }

    fn build_request(
        &self,
        input: &DeploymentInput,
        resources: &RegionalResources,
    ) -> DeploymentRequest {
        DeploymentRequest {
            name: self.env.name.clone(),
            app: AppInformation {
                name: self.app.name.clone(),
                domain: self.app.domain.clone(),
                account_principal_arn: input.root_user_arn.clone(),
            },
            additional_tags: self.app.tags.clone(),
            custom_resources_urls: input.custom_resources_urls.clone(),
            artifact_bucket_arn: resources.bucket_arn(),
            artifact_bucket_key_arn: Some(resources.kms_key_arn.clone())
                .filter(|arn| !arn.is_empty()),
            force_update_id: input
                .force_new_update
                .then(|| uuid::Uuid::new_v4().to_string()),
            version: LATEST_ENV_TEMPLATE_VERSION.to_string(),
        }
    }

    fn stack_options(&self) -> Vec<StackOption> {
        let mut options = Vec::new();
        if let Some(arn) = &self.env.execution_role_arn {
            options.push(StackOption::RoleArn(arn.clone()));
        }
        if !self.app.tags.is_empty() {
            options.push(StackOption::Tags(self.app.tags.clone()));
        }
        if let Some(n) = self.parallelism {
            options.push(StackOption::Parallelism(n));
        }
        options
    }
}
