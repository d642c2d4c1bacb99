//! Regional resource lookup
//!
//! Every region an application is deployed to has a small support stack
//! (artifact bucket, KMS key, image repositories) at
//! `<infra>/applications/<app>/<region>`. Its Terraform outputs are read
//! fresh on every lookup.

use crate::terraform::TerraformRunner;
use async_trait::async_trait;
use envdeploy_core::{AppResourcesGetter, Application, CoreError, RegionalResources, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output holding the artifact bucket name
pub const BUCKET_OUTPUT: &str = "s3_bucket";

/// Output holding the artifact bucket KMS key ARN
pub const KMS_KEY_OUTPUT: &str = "kms_key_arn";

/// Output holding repository URLs by service
pub const REPOSITORIES_OUTPUT: &str = "repository_urls";

/// Reads regional resources from the application's regional stacks
pub struct TerraformAppResources {
    infra_dir: PathBuf,
    terraform_bin: String,
}

impl TerraformAppResources {
    /// Create a locator over the stacks under `infra_dir`
    pub fn new(infra_dir: impl Into<PathBuf>, terraform_bin: impl Into<String>) -> Self {
        Self {
            infra_dir: infra_dir.into(),
            terraform_bin: terraform_bin.into(),
        }
    }

    /// Stack directory for an application's region
    pub fn stack_dir(&self, app: &str, region: &str) -> PathBuf {
        regional_stack_dir(&self.infra_dir, app, region)
    }
}

fn regional_stack_dir(infra_dir: &Path, app: &str, region: &str) -> PathBuf {
    infra_dir.join("applications").join(app).join(region)
}

/// Build regional resources from stack outputs.
///
/// Missing outputs are left empty; deciding whether that is fatal is up to
/// the caller.
pub fn resources_from_outputs(
    region: &str,
    outputs: &BTreeMap<String, serde_json::Value>,
) -> RegionalResources {
    let string_output = |name: &str| {
        outputs
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let repository_urls = outputs
        .get(REPOSITORIES_OUTPUT)
        .and_then(|v| v.as_object())
        .map(|repos| {
            repos
                .iter()
                .filter_map(|(svc, url)| url.as_str().map(|u| (svc.clone(), u.to_string())))
                .collect()
        })
        .unwrap_or_default();

    RegionalResources {
        region: region.to_string(),
        s3_bucket: string_output(BUCKET_OUTPUT),
        kms_key_arn: string_output(KMS_KEY_OUTPUT),
        repository_urls,
    }
}

#[async_trait]
impl AppResourcesGetter for TerraformAppResources {
    async fn get_app_resources_by_region(
        &self,
        app: &Application,
        region: &str,
    ) -> Result<RegionalResources> {
        let dir = self.stack_dir(&app.name, region);
        if !tokio::fs::try_exists(&dir).await? {
            return Err(CoreError::RegionNotProvisioned {
                app: app.name.clone(),
                region: region.to_string(),
            });
        }

        let outputs = TerraformRunner::new(&self.terraform_bin, &dir).outputs().await?;
        let resources = resources_from_outputs(region, &outputs);

        debug!(
            app = %app.name,
            region = %region,
            bucket = %resources.s3_bucket,
            "Resolved regional resources"
        );

        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resources_from_outputs() {
        let outputs = BTreeMap::from([
            (BUCKET_OUTPUT.to_string(), json!("phonetool-artifacts")),
            (KMS_KEY_OUTPUT.to_string(), json!("arn:aws:kms:us-west-2:1234:key/abc")),
            (
                REPOSITORIES_OUTPUT.to_string(),
                json!({"frontend": "1234.dkr.ecr.us-west-2.amazonaws.com/frontend"}),
            ),
        ]);

        let resources = resources_from_outputs("us-west-2", &outputs);

        assert_eq!(resources.region, "us-west-2");
        assert_eq!(resources.s3_bucket, "phonetool-artifacts");
        assert_eq!(resources.kms_key_arn, "arn:aws:kms:us-west-2:1234:key/abc");
        assert_eq!(
            resources.repository_urls["frontend"],
            "1234.dkr.ecr.us-west-2.amazonaws.com/frontend"
        );
    }

    #[test]
    fn test_missing_bucket_output_is_empty() {
        let resources = resources_from_outputs("us-west-2", &BTreeMap::new());
        assert!(resources.s3_bucket.is_empty());
        assert!(resources.repository_urls.is_empty());
    }

    #[test]
    fn test_stack_dir_layout() {
        let locator = TerraformAppResources::new("/infra", "terraform");
        assert_eq!(
            locator.stack_dir("phonetool", "eu-west-1"),
            PathBuf::from("/infra/applications/phonetool/eu-west-1")
        );
    }

    #[tokio::test]
    async fn test_unprovisioned_region() {
        let dir = tempfile::tempdir().unwrap();
        let locator = TerraformAppResources::new(dir.path(), "terraform");

        let err = locator
            .get_app_resources_by_region(&Application::new("phonetool"), "ap-south-1")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "region ap-south-1 is not provisioned for application phonetool"
        );
    }
}
