//! S3 object uploader
//!
//! Stages custom resource archives in the application's artifact bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use envdeploy_core::{partition_for_region, CoreError, Result, Uploader};
use tracing::{debug, info};

/// Content type for packaged custom resources
const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Virtual-hosted-style URL of an object
pub fn object_url(bucket: &str, region: &str, key: &str) -> String {
    let dns_suffix = match partition_for_region(region) {
        "aws-cn" => "amazonaws.com.cn",
        _ => "amazonaws.com",
    };
    format!("https://{bucket}.s3.{region}.{dns_suffix}/{key}")
}

/// Uploads objects with `PutObject`
pub struct S3Uploader {
    /// S3 client
    client: Client,

    /// Region of the artifact bucket
    region: String,
}

impl S3Uploader {
    /// Create a new uploader for buckets in `region`
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    /// Create from AWS config
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();
        Self::new(Client::new(config), region)
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String> {
        info!("Uploading {} bytes to s3://{}/{}", body.len(), bucket, key);

        let response = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(ZIP_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| CoreError::provider(aws_sdk_s3::Error::from(e).to_string()))?;

        debug!(
            etag = ?response.e_tag(),
            version_id = ?response.version_id(),
            "Object uploaded"
        );

        Ok(object_url(bucket, &self.region, key))
    }
}
