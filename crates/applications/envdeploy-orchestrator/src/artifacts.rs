//! Custom resource upload strategies
//!
//! Both strategies produce the same thing: a map from custom resource logical
//! name to the URL it was staged at, given the artifact bucket.
//!
//! - **Legacy**: the bucket is handed to a packager that uploads a pre-built
//!   batch and returns the map.
//! - **Direct**: the template tree is enumerated and every custom resource is
//!   rendered and uploaded on its own, keyed by its lower-cased name.
//!
//! Any failure aborts the whole batch. No partial map is ever returned and
//! nothing is retried.

use crate::template::{artifact_key, CustomResource, TemplateTree};
use envdeploy_core::{ArtifactUrls, CoreError, CustomResourcesUploader, Result, Uploader};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Renders and uploads each custom resource in a template tree
pub struct DirectUpload {
    templates: TemplateTree,
    uploader: Arc<dyn Uploader>,
    concurrency: usize,
}

impl DirectUpload {
    /// Create a direct uploader with sequential uploads
    pub fn new(templates: TemplateTree, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            templates,
            uploader,
            concurrency: 1,
        }
    }

    /// Upload up to `concurrency` custom resources at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Upload every custom resource in the tree to `bucket`.
    ///
    /// The first failure drops the uploads still in flight, so the number of
    /// attempts never exceeds the number of custom resources.
    pub async fn upload(&self, bucket: &str) -> Result<ArtifactUrls> {
        let resources = self.templates.env_custom_resources()?;

        info!(
            bucket = %bucket,
            count = resources.len(),
            concurrency = self.concurrency,
            "Uploading custom resources"
        );

        let uploaded: Vec<(String, String)> = stream::iter(resources)
            .map(|cr| self.upload_one(bucket, cr))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        Ok(uploaded.into_iter().collect())
    }

    async fn upload_one(&self, bucket: &str, cr: CustomResource) -> Result<(String, String)> {
        let name = cr.function_name().to_string();
        let body = cr.render()?;
        let key = artifact_key(&name, &body);

        debug!(
            name = %name,
            key = %key,
            size_bytes = body.len(),
            "Uploading custom resource"
        );

        let url = self
            .uploader
            .upload(bucket, &key, body)
            .await
            .map_err(|e| CoreError::upload(&name, e))?;

        Ok((name, url))
    }
}

/// The two ways custom resources can be staged
pub enum UploadStrategy {
    /// Deprecated batch packager
    Legacy(Arc<dyn CustomResourcesUploader>),

    /// Enumerate the template tree and upload each resource
    Direct(DirectUpload),
}

impl UploadStrategy {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "legacy",
            Self::Direct(_) => "direct",
        }
    }

    /// Stage every custom resource in `bucket` and return name → URL
    pub async fn upload(&self, bucket: &str) -> Result<ArtifactUrls> {
        match self {
            Self::Legacy(packager) => packager.upload_environment_custom_resources(bucket).await,
            Self::Direct(direct) => direct.upload(bucket).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_template_tree, FakePackager, FakeUploader};

    const FUNCTIONS: [&str; 3] = [
        "CertificateValidationFunction",
        "CustomDomainFunction",
        "DNSDelegationFunction",
    ];

    fn matching_uploader() -> FakeUploader {
        FakeUploader::new(|_, key| {
            if FUNCTIONS
                .iter()
                .any(|name| key.contains(&name.to_lowercase()))
            {
                Ok(format!("https://mockS3Bucket.s3.amazonaws.com/{key}"))
            } else {
                Err("did not match any custom resource".to_string())
            }
        })
    }

    #[tokio::test]
    async fn test_direct_upload_maps_every_resource() {
        let dir = fake_template_tree();
        let uploader = Arc::new(matching_uploader());
        let direct = DirectUpload::new(TemplateTree::new(dir.path()), uploader.clone());

        let urls = direct.upload("mockS3Bucket").await.unwrap();

        assert_eq!(urls.len(), 3);
        for name in FUNCTIONS {
            let url = &urls[name];
            assert!(url.contains(&name.to_lowercase()), "{url} should contain {name}");
        }
        assert_eq!(uploader.attempts(), 3);
    }

    #[tokio::test]
    async fn test_direct_upload_parallel_matches_sequential() {
        let dir = fake_template_tree();
        let tree = TemplateTree::new(dir.path());

        let sequential = DirectUpload::new(tree.clone(), Arc::new(matching_uploader()))
            .upload("mockS3Bucket")
            .await
            .unwrap();
        let parallel = DirectUpload::new(tree, Arc::new(matching_uploader()))
            .with_concurrency(8)
            .upload("mockS3Bucket")
            .await
            .unwrap();

        assert_eq!(sequential, parallel);
    }

    #[tokio::test]
    async fn test_direct_upload_stops_on_first_failure() {
        let dir = fake_template_tree();
        let uploader = Arc::new(FakeUploader::failing("some error"));
        let direct = DirectUpload::new(TemplateTree::new(dir.path()), uploader.clone());

        let err = direct.upload("mockS3Bucket").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "upload custom resource CertificateValidationFunction: some error"
        );
        assert_eq!(uploader.attempts(), 1);
    }

    #[tokio::test]
    async fn test_parallel_upload_aborts_on_failure() {
        let dir = fake_template_tree();
        let uploader = Arc::new(FakeUploader::new(|_, key| {
            if key.contains("customdomainfunction") {
                Err("boom".to_string())
            } else {
                Ok(format!("https://mockS3Bucket.s3.amazonaws.com/{key}"))
            }
        }));
        let direct = DirectUpload::new(TemplateTree::new(dir.path()), uploader.clone())
            .with_concurrency(8);

        let err = direct.upload("mockS3Bucket").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "upload custom resource CustomDomainFunction: boom"
        );
        assert!(uploader.attempts() <= FUNCTIONS.len());
        assert!(uploader
            .keys()
            .iter()
            .any(|key| key.contains("customdomainfunction")));
    }

    #[tokio::test]
    async fn test_direct_upload_bad_tree_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(matching_uploader());
        let direct = DirectUpload::new(TemplateTree::new(dir.path()), uploader.clone());

        assert!(direct.upload("mockS3Bucket").await.is_err());
        assert_eq!(uploader.attempts(), 0);
    }

    #[tokio::test]
    async fn test_legacy_strategy_delegates_bucket() {
        let packager = Arc::new(FakePackager::returning(ArtifactUrls::from([(
            "mockResource".to_string(),
            "mockURL".to_string(),
        )])));
        let strategy = UploadStrategy::Legacy(packager.clone());

        let urls = strategy.upload("mockS3Bucket").await.unwrap();

        assert_eq!(strategy.name(), "legacy");
        assert_eq!(urls["mockResource"], "mockURL");
        assert_eq!(packager.buckets(), vec!["mockS3Bucket".to_string()]);
    }

    #[test]
    fn test_concurrency_floor() {
        let dir = fake_template_tree();
        let direct = DirectUpload::new(
            TemplateTree::new(dir.path()),
            Arc::new(FakeUploader::failing("unused")),
        )
        .with_concurrency(0);
        assert_eq!(direct.concurrency, 1);
    }
}
