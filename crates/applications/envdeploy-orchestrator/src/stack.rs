//! Environment stack updater
//!
//! Renders a [`DeploymentRequest`] into `terraform.tfvars.json` inside the
//! environment's stack directory and applies it:
//!
//! ```text
//! <infra>/environments/<app>/<env>/
//! ├── main.tf                  environment template (owned by the template authors)
//! └── terraform.tfvars.json    rendered on every deployment
//! ```
//!
//! Engine output is streamed line by line to the progress sink.

use crate::terraform::TerraformRunner;
use async_trait::async_trait;
use envdeploy_core::{
    CoreError, DeploymentRequest, EnvironmentDeployer, ProgressWriter, Result, StackOption,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Variables file rendered from the deployment request
pub const TFVARS_FILE: &str = "terraform.tfvars.json";

/// Render the request as Terraform variables
pub fn render_variables(request: &DeploymentRequest) -> serde_json::Value {
    json!({
        "app_name": request.app.name,
        "app_domain": request.app.domain,
        "account_principal_arn": request.app.account_principal_arn,
        "environment_name": request.name,
        "additional_tags": request.additional_tags,
        "custom_resources_urls": request.custom_resources_urls,
        "artifact_bucket_arn": request.artifact_bucket_arn,
        "artifact_bucket_key_arn": request.artifact_bucket_key_arn,
        "force_update_id": request.force_update_id,
        "template_version": request.version,
    })
}

/// Command-line arguments for the stack operation modifiers
pub fn option_args(options: &[StackOption]) -> Vec<String> {
    options
        .iter()
        .map(|option| match option {
            StackOption::RoleArn(arn) => format!("-var=assume_role_arn={arn}"),
            StackOption::Tags(tags) => {
                // HCL accepts JSON object syntax for map variables
                format!("-var=tags={}", json!(tags))
            }
            StackOption::Parallelism(n) => format!("-parallelism={n}"),
        })
        .collect()
}

/// Applies environment stacks with Terraform
pub struct TerraformEnvironmentDeployer {
    infra_dir: PathBuf,
    terraform_bin: String,
}

impl TerraformEnvironmentDeployer {
    /// Create an updater over the stacks under `infra_dir`
    pub fn new(infra_dir: impl Into<PathBuf>, terraform_bin: impl Into<String>) -> Self {
        Self {
            infra_dir: infra_dir.into(),
            terraform_bin: terraform_bin.into(),
        }
    }

    /// Stack directory for an environment
    pub fn stack_dir(&self, app: &str, env: &str) -> PathBuf {
        self.infra_dir.join("environments").join(app).join(env)
    }

    async fn write_variables(&self, dir: &Path, request: &DeploymentRequest) -> Result<()> {
        let rendered = serde_json::to_vec_pretty(&render_variables(request))
            .map_err(|e| CoreError::provider(format!("render variables: {e}")))?;
        tokio::fs::write(dir.join(TFVARS_FILE), rendered).await?;
        Ok(())
    }
}

#[async_trait]
impl EnvironmentDeployer for TerraformEnvironmentDeployer {
    async fn update_and_render_environment(
        &self,
        progress: &dyn ProgressWriter,
        request: &DeploymentRequest,
        options: &[StackOption],
    ) -> Result<()> {
        let stack = format!("{}-{}", request.app.name, request.name);
        let dir = self.stack_dir(&request.app.name, &request.name);

        if !tokio::fs::try_exists(&dir).await? {
            return Err(CoreError::stack(
                &stack,
                format!("environment template not found at {}", dir.display()),
            ));
        }

        info!(
            stack = %stack,
            version = %request.version,
            custom_resources = request.custom_resources_urls.len(),
            "Rendering environment stack"
        );

        self.write_variables(&dir, request)
            .await
            .map_err(|e| CoreError::stack(&stack, e.to_string()))?;

        let terraform = TerraformRunner::new(&self.terraform_bin, &dir);
        terraform
            .init()
            .await
            .map_err(|e| CoreError::stack(&stack, e.to_string()))?;

        progress.write_line(&format!("Deploying environment stack {stack}"));
        terraform
            .apply(&option_args(options), |line| progress.write_line(line))
            .await
            .map_err(|e| CoreError::stack(&stack, e.to_string()))?;

        info!(stack = %stack, "Environment stack deployed");
        Ok(())
    }
}
