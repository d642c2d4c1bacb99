//! Test doubles for the deployment collaborators

use async_trait::async_trait;
use envdeploy_core::{
    AppResourcesGetter, Application, ArtifactUrls, CoreError, CustomResourcesUploader,
    DeploymentRequest, EnvironmentDeployer, ProgressWriter, RegionalResources, Result,
    StackOption, Uploader,
};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::template::CUSTOM_RESOURCES_DIR;

/// Template tree with the three environment functions as single scripts
pub(crate) fn fake_template_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let cr_dir = dir.path().join(CUSTOM_RESOURCES_DIR);
    fs::create_dir_all(&cr_dir).unwrap();
    for name in [
        "CertificateValidationFunction",
        "CustomDomainFunction",
        "DNSDelegationFunction",
    ] {
        fs::write(
            cr_dir.join(format!("{name}.js")),
            format!("// {name}\nexports.handler = async () => {{}};\n"),
        )
        .unwrap();
    }
    dir
}

/// Locator returning a fixed response and recording (app, region) lookups
pub(crate) struct FakeAppResources {
    response: std::result::Result<RegionalResources, String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeAppResources {
    pub fn with_bucket(bucket: &str) -> Self {
        Self {
            response: Ok(RegionalResources {
                s3_bucket: bucket.to_string(),
                ..Default::default()
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_resources(resources: RegionalResources) -> Self {
        Self {
            response: Ok(resources),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            response: Err(msg.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppResourcesGetter for FakeAppResources {
    async fn get_app_resources_by_region(
        &self,
        app: &Application,
        region: &str,
    ) -> Result<RegionalResources> {
        self.calls
            .lock()
            .unwrap()
            .push((app.name.clone(), region.to_string()));
        match &self.response {
            Ok(resources) => Ok(RegionalResources {
                region: region.to_string(),
                ..resources.clone()
            }),
            Err(msg) => Err(CoreError::provider(msg.clone())),
        }
    }
}

type UploadHandler = Box<dyn Fn(&str, &str) -> std::result::Result<String, String> + Send + Sync>;

/// Uploader driven by a `(bucket, key)` handler, recording every key
pub(crate) struct FakeUploader {
    handler: UploadHandler,
    keys: Mutex<Vec<String>>,
}

impl FakeUploader {
    pub fn new(
        handler: impl Fn(&str, &str) -> std::result::Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        let msg = msg.to_string();
        Self::new(move |_, _| Err(msg.clone()))
    }

    pub fn attempts(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(&self, bucket: &str, key: &str, _body: Vec<u8>) -> Result<String> {
        self.keys.lock().unwrap().push(key.to_string());
        (self.handler)(bucket, key).map_err(CoreError::provider)
    }
}

/// Legacy packager returning a fixed response
pub(crate) struct FakePackager {
    response: std::result::Result<ArtifactUrls, String>,
    buckets: Mutex<Vec<String>>,
}

impl FakePackager {
    pub fn returning(urls: ArtifactUrls) -> Self {
        Self {
            response: Ok(urls),
            buckets: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            response: Err(msg.to_string()),
            buckets: Mutex::new(Vec::new()),
        }
    }

    pub fn buckets(&self) -> Vec<String> {
        self.buckets.lock().unwrap().clone()
    }
}

#[async_trait]
impl CustomResourcesUploader for FakePackager {
    async fn upload_environment_custom_resources(&self, bucket: &str) -> Result<ArtifactUrls> {
        self.buckets.lock().unwrap().push(bucket.to_string());
        self.response.clone().map_err(CoreError::provider)
    }
}

/// Stack updater recording every submitted request
pub(crate) struct FakeStack {
    error: Option<String>,
    submitted: Mutex<Vec<(DeploymentRequest, Vec<StackOption>)>>,
}

impl FakeStack {
    pub fn succeeding() -> Self {
        Self {
            error: None,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            error: Some(msg.to_string()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<(DeploymentRequest, Vec<StackOption>)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnvironmentDeployer for FakeStack {
    async fn update_and_render_environment(
        &self,
        progress: &dyn ProgressWriter,
        request: &DeploymentRequest,
        options: &[StackOption],
    ) -> Result<()> {
        progress.write_line(&format!("applying {}", request.name));
        self.submitted
            .lock()
            .unwrap()
            .push((request.clone(), options.to_vec()));
        match &self.error {
            Some(msg) => Err(CoreError::provider(msg.clone())),
            None => Ok(()),
        }
    }
}

/// Progress sink keeping every line
#[derive(Default)]
pub(crate) struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ProgressWriter for RecordingProgress {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
