//! Custom resource discovery in a local template tree
//!
//! The environment template references helper functions ("custom resources")
//! that must be staged in the artifact bucket before the stack is applied.
//! They live under `<templates>/custom-resources/`:
//!
//! ```text
//! templates/custom-resources/
//! ├── CertificateValidationFunction.js     single-file function (packaged as index.js)
//! └── DNSDelegationFunction/               multi-file function
//!     ├── index.js
//!     └── lib/route53.js
//! ```
//!
//! The logical name is the file stem or directory name, verbatim. Storage
//! keys embed the lower-cased name, so consumers can correlate a key back to
//! its function with a case-insensitive substring match.

use envdeploy_core::{CoreError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Directory under the template root holding custom resources
pub const CUSTOM_RESOURCES_DIR: &str = "custom-resources";

/// Key prefix for directly uploaded custom resources
pub const CUSTOM_RESOURCES_KEY_PREFIX: &str = "manual/scripts/custom-resources";

/// Entry point file name inside a packaged function
const HANDLER_FILE: &str = "index.js";

/// Storage key for a rendered custom resource.
///
/// `<prefix>/<lower-cased name>/<sha256 of body>.zip`; identical bodies map to
/// identical keys.
pub fn artifact_key(name: &str, body: &[u8]) -> String {
    format!(
        "{}/{}/{}.zip",
        CUSTOM_RESOURCES_KEY_PREFIX,
        name.to_lowercase(),
        hex::encode(Sha256::digest(body))
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Script(PathBuf),
    Directory(PathBuf),
}

/// A helper function referenced by the environment template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomResource {
    name: String,
    source: Source,
}

impl CustomResource {
    /// Logical name, used as the URL map key
    pub fn function_name(&self) -> &str {
        &self.name
    }

    /// Path the function is read from
    pub fn source_path(&self) -> &Path {
        match &self.source {
            Source::Script(path) | Source::Directory(path) => path,
        }
    }

    /// Package the function as a zip archive.
    ///
    /// Entries are sorted and timestamps fixed, so the same sources always
    /// render to the same bytes.
    pub fn render(&self) -> Result<Vec<u8>> {
        let files = self.files()?;
        if files.is_empty() {
            return Err(self.package_error("no files to package"));
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (entry, path) in files {
            let contents = fs::read(&path).map_err(|source| CoreError::Template {
                path: path.clone(),
                source,
            })?;
            writer
                .start_file(entry, options)
                .map_err(|e| self.package_error(e))?;
            writer.write_all(&contents)?;
        }
        let cursor = writer.finish().map_err(|e| self.package_error(e))?;

        Ok(cursor.into_inner())
    }

    /// Archive entry name and source path of every file in the function
    fn files(&self) -> Result<Vec<(String, PathBuf)>> {
        match &self.source {
            Source::Script(path) => Ok(vec![(HANDLER_FILE.to_string(), path.clone())]),
            Source::Directory(dir) => {
                let mut files = Vec::new();
                for entry in WalkDir::new(dir).sort_by_file_name() {
                    let entry = entry.map_err(|e| CoreError::Template {
                        path: dir.clone(),
                        source: e.into(),
                    })?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let Ok(relative) = entry.path().strip_prefix(dir) else {
                        continue;
                    };
                    let entry_name = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    files.push((entry_name, entry.path().to_path_buf()));
                }
                Ok(files)
            }
        }
    }

    fn package_error(&self, err: impl std::fmt::Display) -> CoreError {
        CoreError::Package {
            name: self.name.clone(),
            message: err.to_string(),
        }
    }
}

/// Local template source tree
#[derive(Debug, Clone)]
pub struct TemplateTree {
    root: PathBuf,
}

impl TemplateTree {
    /// Create a template tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Template root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate the environment's custom resources, sorted by name.
    ///
    /// Re-reads the tree on every call. Two resources whose lower-cased names
    /// collide are rejected because their storage keys would collide.
    pub fn env_custom_resources(&self) -> Result<Vec<CustomResource>> {
        let dir = self.root.join(CUSTOM_RESOURCES_DIR);
        let entries = fs::read_dir(&dir).map_err(|source| CoreError::Template {
            path: dir.clone(),
            source,
        })?;

        let mut resources = Vec::new();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }

            let resource = if file_type.is_dir() {
                CustomResource {
                    name: file_name.to_string(),
                    source: Source::Directory(path.clone()),
                }
            } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "js") {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                CustomResource {
                    name: stem.to_string(),
                    source: Source::Script(path.clone()),
                }
            } else {
                continue;
            };

            debug!(
                name = %resource.name,
                path = %path.display(),
                "Found custom resource"
            );
            resources.push(resource);
        }

        resources.sort_by(|a, b| a.name.cmp(&b.name));
        let mut seen = HashSet::new();
        for resource in &resources {
            if !seen.insert(resource.name.to_lowercase()) {
                return Err(CoreError::DuplicateCustomResource(resource.name.clone()));
            }
        }
        Ok(resources)
    }
}
