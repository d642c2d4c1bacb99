//! Legacy custom resource packager
//!
//! Uploads a directory of pre-built `<LogicalName>.zip` archives as one batch.
//! Kept for environments whose templates still reference the bundled layout;
//! new deployments use [`crate::artifacts::DirectUpload`].

use async_trait::async_trait;
use envdeploy_core::{ArtifactUrls, CoreError, CustomResourcesUploader, Result, Uploader};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Key prefix for bundled custom resources
pub const BUNDLE_KEY_PREFIX: &str = "custom-resources";

/// Storage key for a pre-built archive
pub fn bundle_key(name: &str, body: &[u8]) -> String {
    format!(
        "{}/{}/{}.zip",
        BUNDLE_KEY_PREFIX,
        name.to_lowercase(),
        hex::encode(Sha256::digest(body))
    )
}

/// Uploads pre-built custom resource archives from a bundle directory
pub struct BundledCustomResources {
    bundle_dir: PathBuf,
    uploader: Arc<dyn Uploader>,
}

impl BundledCustomResources {
    /// Create a packager reading archives from `bundle_dir`
    pub fn new(bundle_dir: impl Into<PathBuf>, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            uploader,
        }
    }

    /// Logical names and paths of the bundled archives, sorted by name
    async fn archives(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = tokio::fs::read_dir(&self.bundle_dir)
            .await
            .map_err(|source| CoreError::Template {
                path: self.bundle_dir.clone(),
                source,
            })?;

        let mut seen = HashSet::new();
        let mut archives = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file()
                || path.extension().is_none_or(|ext| ext != "zip")
            {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !seen.insert(name.to_lowercase()) {
                return Err(CoreError::DuplicateCustomResource(name.to_string()));
            }
            archives.push((name.to_string(), path.clone()));
        }

        archives.sort();
        Ok(archives)
    }
}

#[async_trait]
impl CustomResourcesUploader for BundledCustomResources {
    async fn upload_environment_custom_resources(&self, bucket: &str) -> Result<ArtifactUrls> {
        let archives = self.archives().await?;

        info!(
            bucket = %bucket,
            bundle_dir = %self.bundle_dir.display(),
            count = archives.len(),
            "Uploading bundled custom resources"
        );

        let mut urls = ArtifactUrls::new();
        for (name, path) in archives {
            let body = tokio::fs::read(&path)
                .await
                .map_err(|source| CoreError::Template {
                    path: path.clone(),
                    source,
                })?;
            let key = bundle_key(&name, &body);

            debug!(name = %name, key = %key, "Uploading bundled custom resource");

            let url = self
                .uploader
                .upload(bucket, &key, body)
                .await
                .map_err(|e| CoreError::upload(&name, e))?;
            urls.insert(name, url);
        }

        Ok(urls)
    }
}
