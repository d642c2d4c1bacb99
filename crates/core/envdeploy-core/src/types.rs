//! Core types shared across envdeploy components

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment template version rendered by this build.
///
/// Fixed at build time; never negotiated with the stack engine.
pub const LATEST_ENV_TEMPLATE_VERSION: &str = "v1.4.0";

/// Mapping from custom resource logical name to the URL it was uploaded to.
///
/// A URL may legitimately be empty (inline-referenced artifact).
pub type ArtifactUrls = BTreeMap<String, String>;

/// Application that owns the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Application name
    pub name: String,

    /// Hosted zone domain associated with the application
    pub domain: Option<String>,

    /// Tags applied to every resource in the application's stacks
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Application {
    /// Create an application with no domain or tags
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the application domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Add a resource tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Region-scoped deployment target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Name of the owning application
    pub app: String,

    /// Environment name
    pub name: String,

    /// Region the environment is deployed to (e.g. us-west-2)
    pub region: String,

    /// Role that manages the environment's resources
    pub manager_role_arn: String,

    /// Role the stack engine assumes while applying the environment stack
    pub execution_role_arn: Option<String>,
}

impl Environment {
    /// Create an environment target
    pub fn new(
        app: impl Into<String>,
        name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            name: name.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    /// Set the manager role ARN
    pub fn with_manager_role_arn(mut self, arn: impl Into<String>) -> Self {
        self.manager_role_arn = arn.into();
        self
    }

    /// Set the execution role ARN
    pub fn with_execution_role_arn(mut self, arn: impl Into<String>) -> Self {
        self.execution_role_arn = Some(arn.into());
        self
    }

    /// Name of the environment stack (`<app>-<env>`)
    pub fn stack_name(&self) -> String {
        format!("{}-{}", self.app, self.name)
    }
}

/// Support resources provisioned for an application in one region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalResources {
    /// Region the resources live in
    pub region: String,

    /// Artifact bucket name (empty when the region was never bootstrapped)
    pub s3_bucket: String,

    /// KMS key ARN encrypting the artifact bucket (may be empty)
    pub kms_key_arn: String,

    /// Image repository URL by service name
    #[serde(default)]
    pub repository_urls: BTreeMap<String, String>,
}

impl RegionalResources {
    /// ARN of the artifact bucket, or `None` when no bucket is provisioned
    pub fn bucket_arn(&self) -> Option<String> {
        if self.s3_bucket.is_empty() {
            return None;
        }
        Some(format!(
            "arn:{}:s3:::{}",
            partition_for_region(&self.region),
            self.s3_bucket
        ))
    }
}

/// AWS partition a region belongs to
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else {
        "aws"
    }
}

/// Application information carried into the environment stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInformation {
    /// Application name
    pub name: String,

    /// Application domain
    pub domain: Option<String>,

    /// Principal allowed to assume the environment's manager role
    pub account_principal_arn: String,
}

/// Fully-parameterized environment definition submitted to the stack updater
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Environment name
    pub name: String,

    /// Owning application
    pub app: AppInformation,

    /// Tags added to the environment stack
    pub additional_tags: BTreeMap<String, String>,

    /// Custom resource logical name to uploaded URL
    pub custom_resources_urls: ArtifactUrls,

    /// ARN of the artifact bucket
    pub artifact_bucket_arn: Option<String>,

    /// ARN of the KMS key encrypting the artifact bucket
    pub artifact_bucket_key_arn: Option<String>,

    /// Changes on every forced update so the engine re-applies an unchanged template
    pub force_update_id: Option<String>,

    /// Environment template version
    pub version: String,
}

/// Caller-supplied input for an environment deployment
#[derive(Debug, Clone, Default)]
pub struct DeploymentInput {
    /// Root user ARN of the application account
    pub root_user_arn: String,

    /// Custom resource URLs, typically produced by an upload phase
    pub custom_resources_urls: ArtifactUrls,

    /// Force the stack engine to apply even when nothing changed
    pub force_new_update: bool,
}

/// Modifier applied to a single stack operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOption {
    /// Role the stack engine assumes for the operation
    RoleArn(String),

    /// Tags applied to every resource in the stack
    Tags(BTreeMap<String, String>),

    /// Maximum concurrent resource operations inside the engine
    Parallelism(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_for_region() {
        assert_eq!(partition_for_region("us-west-2"), "aws");
        assert_eq!(partition_for_region("cn-north-1"), "aws-cn");
        assert_eq!(partition_for_region("us-gov-west-1"), "aws-us-gov");
    }

    #[test]
    fn test_bucket_arn() {
        let resources = RegionalResources {
            region: "cn-northwest-1".to_string(),
            s3_bucket: "artifacts".to_string(),
            ..Default::default()
        };
        assert_eq!(
            resources.bucket_arn(),
            Some("arn:aws-cn:s3:::artifacts".to_string())
        );

        assert_eq!(RegionalResources::default().bucket_arn(), None);
    }

    #[test]
    fn test_environment_builder() {
        let env = Environment::new("phonetool", "test", "us-west-2")
            .with_manager_role_arn("arn:aws:iam::1234:role/manager")
            .with_execution_role_arn("arn:aws:iam::1234:role/exec");

        assert_eq!(env.stack_name(), "phonetool-test");
        assert_eq!(env.manager_role_arn, "arn:aws:iam::1234:role/manager");
        assert_eq!(
            env.execution_role_arn,
            Some("arn:aws:iam::1234:role/exec".to_string())
        );
    }

    #[test]
    fn test_regional_resources_defaults_repositories() {
        let json = r#"{"region":"us-east-1","s3_bucket":"b","kms_key_arn":""}"#;
        let parsed: RegionalResources = serde_json::from_str(json).unwrap();
        assert!(parsed.repository_urls.is_empty());
        assert_eq!(parsed.s3_bucket, "b");
    }
}
