//! # Envdeploy Orchestrator
//!
//! Deploys an application's regional environment stack.
//!
//! ## Architecture
//!
//! ```text
//! EnvDeployer
//! ├── TerraformAppResources   regional artifact bucket lookup
//! ├── UploadStrategy
//! │   ├── Legacy  ─── BundledCustomResources (pre-built archives)
//! │   └── Direct  ─── TemplateTree + S3Uploader (one upload per function)
//! └── TerraformEnvironmentDeployer   render tfvars + terraform apply
//! ```
//!
//! A deployment runs in two phases:
//!
//! 1. **Upload**: resolve the artifact bucket for the environment's region and
//!    stage every custom resource the environment template references
//! 2. **Deploy**: resolve the region again, build the deployment request from
//!    the uploaded URLs and apply the environment stack
//!
//! See [`env_deployer`] for the error surface of each phase.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifacts;
pub mod config;
pub mod env_deployer;
pub mod error;
pub mod packager;
pub mod progress;
pub mod resources;
pub mod s3;
pub mod stack;
pub mod template;
pub mod terraform;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Public exports
// ============================================================================

// Orchestration
pub use env_deployer::EnvDeployer;

// Error handling
pub use error::{DeployError, Result};

// Configuration
pub use config::{DeployConfig, UploadMode, DEFAULT_UPLOAD_CONCURRENCY};

// Upload strategies
pub use artifacts::{DirectUpload, UploadStrategy};
pub use packager::BundledCustomResources;
pub use template::{artifact_key, CustomResource, TemplateTree};

// Collaborators
pub use progress::{ConsoleProgress, TracingProgress};
pub use resources::TerraformAppResources;
pub use s3::S3Uploader;
pub use stack::TerraformEnvironmentDeployer;
pub use terraform::TerraformRunner;
