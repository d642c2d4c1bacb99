//! Deployment configuration

use crate::error::{DeployError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of custom resources uploaded at once on the direct path
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// How custom resources are staged before the stack is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Enumerate the template tree and upload each custom resource
    #[default]
    Direct,

    /// Hand the bucket to the pre-built bundle packager
    Legacy,
}

impl UploadMode {
    /// Parse from a CLI / environment string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "legacy" => Some(Self::Legacy),
            _ => None,
        }
    }
}

/// Configuration for an environment deployment
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Upload strategy
    pub upload_mode: UploadMode,

    /// Template tree scanned on the direct path
    pub template_dir: PathBuf,

    /// Directory of pre-built custom resource archives (legacy path)
    pub bundle_dir: PathBuf,

    /// Root of the Terraform stacks
    pub infra_dir: PathBuf,

    /// Concurrent uploads on the direct path (1 = sequential)
    pub upload_concurrency: usize,

    /// Terraform executable
    pub terraform_bin: String,

    /// Engine parallelism passed to the stack operation
    pub parallelism: Option<u32>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            upload_mode: UploadMode::Direct,
            template_dir: PathBuf::from("./templates"),
            bundle_dir: PathBuf::from("./custom-resources"),
            infra_dir: PathBuf::from("./infra"),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            terraform_bin: "terraform".to_string(),
            parallelism: None,
        }
    }
}

impl DeployConfig {
    /// Use the legacy bundle packager
    pub fn legacy(mut self) -> Self {
        self.upload_mode = UploadMode::Legacy;
        self
    }

    /// Set upload mode
    pub fn with_upload_mode(mut self, mode: UploadMode) -> Self {
        self.upload_mode = mode;
        self
    }

    /// Set the template tree
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Set the legacy bundle directory
    pub fn with_bundle_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundle_dir = dir.into();
        self
    }

    /// Set the Terraform root
    pub fn with_infra_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.infra_dir = dir.into();
        self
    }

    /// Set direct-path upload concurrency
    pub fn with_upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = concurrency;
        self
    }

    /// Set the Terraform executable
    pub fn with_terraform_bin(mut self, bin: impl Into<String>) -> Self {
        self.terraform_bin = bin.into();
        self
    }

    /// Set engine parallelism
    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Reject settings that cannot run
    pub fn validate(&self) -> Result<()> {
        if self.upload_concurrency == 0 {
            return Err(DeployError::config("upload concurrency must be at least 1"));
        }
        if self.parallelism == Some(0) {
            return Err(DeployError::config("parallelism must be at least 1"));
        }
        if self.terraform_bin.trim().is_empty() {
            return Err(DeployError::config("terraform binary must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_mode_from_str() {
        assert_eq!(UploadMode::from_str("direct"), Some(UploadMode::Direct));
        assert_eq!(UploadMode::from_str("LEGACY"), Some(UploadMode::Legacy));
        assert_eq!(UploadMode::from_str("batch"), None);
    }

    #[test]
    fn test_config_builder() {
        let config = DeployConfig::default()
            .legacy()
            .with_bundle_dir("/opt/bundles")
            .with_upload_concurrency(1)
            .with_parallelism(20);

        assert_eq!(config.upload_mode, UploadMode::Legacy);
        assert_eq!(config.bundle_dir, PathBuf::from("/opt/bundles"));
        assert_eq!(config.upload_concurrency, 1);
        assert_eq!(config.parallelism, Some(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let err = DeployConfig::default()
            .with_upload_concurrency(0)
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: upload concurrency must be at least 1"
        );
    }
}
