//! Error types returned by deployment collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Result type for collaborator operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure reported by a collaborator (locator, uploader, packager, stack engine)
/// or by local template handling.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Opaque collaborator failure, displayed as the bare cause
    #[error("{0}")]
    Provider(String),

    #[error("region {region} is not provisioned for application {app}")]
    RegionNotProvisioned { app: String, region: String },

    /// Two custom resources resolve to the same storage key prefix
    #[error("duplicate custom resource {0}")]
    DuplicateCustomResource(String),

    #[error("read template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("package custom resource {name}: {message}")]
    Package { name: String, message: String },

    #[error("upload custom resource {name}: {source}")]
    Upload {
        name: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("stack {stack}: {message}")]
    Stack { stack: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create an opaque collaborator error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a stack engine error
    pub fn stack(stack: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stack {
            stack: stack.into(),
            message: message.into(),
        }
    }

    /// Wrap an upload failure with the custom resource it was uploading
    pub fn upload(name: impl Into<String>, source: CoreError) -> Self {
        Self::Upload {
            name: name.into(),
            source: Box::new(source),
        }
    }
}
