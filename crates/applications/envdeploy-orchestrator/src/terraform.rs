//! Terraform command runner.
//!
//! Wraps the terraform CLI for one stack directory. Terraform is the stack
//! engine behind both the regional resource lookup and the environment
//! stack update.

use envdeploy_core::{CoreError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct OutputValue {
    value: serde_json::Value,
}

/// Parse `terraform output -json` into name → value.
pub fn parse_outputs(json: &str) -> Result<BTreeMap<String, serde_json::Value>> {
    let outputs: BTreeMap<String, OutputValue> = serde_json::from_str(json)
        .map_err(|e| CoreError::provider(format!("parse terraform outputs: {e}")))?;
    Ok(outputs.into_iter().map(|(k, v)| (k, v.value)).collect())
}

/// Pass each line of `reader` to `on_line`, replacing invalid UTF-8.
async fn stream_lines(
    reader: impl AsyncRead + Unpin,
    on_line: &mut impl FnMut(&str),
) -> std::io::Result<()> {
    let mut segments = BufReader::new(reader).split(b'\n');
    while let Some(segment) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&segment);
        on_line(line.trim_end_matches('\r'));
    }
    Ok(())
}

/// Terraform runner bound to a stack directory.
#[derive(Debug, Clone)]
pub struct TerraformRunner {
    /// Terraform executable
    bin: String,
    /// Directory containing the stack configuration
    dir: PathBuf,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(bin: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            dir: dir.into(),
        }
    }

    /// Stack directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Initialize Terraform (terraform init).
    pub async fn init(&self) -> Result<()> {
        info!("Running terraform init in {}", self.dir.display());

        let output = Command::new(&self.bin)
            .args(["init", "-input=false", "-no-color"])
            .current_dir(&self.dir)
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CoreError::provider(format!(
                "terraform init failed: {}",
                stderr.trim()
            )))
        }
    }

    /// Apply the configuration (terraform apply), passing each stdout line to `on_line`.
    pub async fn apply(&self, extra_args: &[String], mut on_line: impl FnMut(&str)) -> Result<()> {
        info!("Applying Terraform configuration in {}", self.dir.display());

        let mut child = Command::new(&self.bin)
            .args(["apply", "-auto-approve", "-input=false", "-no-color"])
            .args(extra_args)
            .current_dir(&self.dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::provider("terraform apply: stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CoreError::provider("terraform apply: stderr not captured"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr
                .read_to_end(&mut buf)
                .await
                .map(|_| String::from_utf8_lossy(&buf).into_owned())
        });

        if let Err(e) = stream_lines(stdout, &mut on_line).await {
            // The apply must not outlive a failed deployment.
            let _ = child.kill().await;
            return Err(e.into());
        }

        let status = child.wait().await?;
        let stderr = stderr_task
            .await
            .map_err(|e| CoreError::provider(format!("terraform apply: {e}")))??;

        if status.success() {
            Ok(())
        } else {
            Err(CoreError::provider(format!(
                "terraform apply failed: {}",
                stderr.trim()
            )))
        }
    }

    /// Read all outputs (terraform output -json).
    pub async fn outputs(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        debug!("Reading terraform outputs in {}", self.dir.display());

        let output = Command::new(&self.bin)
            .args(["output", "-json", "-no-color"])
            .current_dir(&self.dir)
            .output()
            .await?;

        if output.status.success() {
            parse_outputs(&String::from_utf8_lossy(&output.stdout))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CoreError::provider(format!(
                "failed to read outputs in {}: {}",
                self.dir.display(),
                stderr.trim()
            )))
        }
    }
}
