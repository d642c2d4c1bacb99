//! Envdeploy Core - Shared types and collaborator traits
//!
//! This crate defines the abstractions the environment deployment
//! orchestrator is written against:
//! - Application / environment identity and the deployment request
//! - Narrow capability traits for every external collaborator
//!   (resource locator, object uploader, legacy packager, stack updater)
//! - The collaborator error type
//!
//! Concrete AWS/Terraform implementations live in `envdeploy-orchestrator`.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
