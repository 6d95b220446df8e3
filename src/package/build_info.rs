//! Build facts recorded after a packaging run.

use super::Artifact;
use crate::error::{Error, ErrorExt, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Summary of the primary artifact, consumed by CI release steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Tag the release is published under, `v<version>`
    pub release_tag: String,
    /// Application name from the manifest backup
    pub app_name: String,
    /// Path to the artifact as seen from the project root
    pub artifact_path: String,
    /// Artifact file name
    pub artifact_name: String,
    /// Size for display, e.g. `152MB`
    pub file_size_human: String,
    /// Hex-encoded SHA-256 of the artifact
    pub sha256: String,
}

impl BuildInfo {
    /// Hash `artifact` and assemble the record.
    pub async fn compute(app_name: &str, version: &str, artifact: &Artifact) -> Result<Self> {
        let path = artifact.path.clone();
        let sha256 = tokio::task::spawn_blocking(move || sha256_file(&path))
            .await
            .map_err(|e| Error::CommandFailed {
                command: "sha256".to_string(),
                reason: e.to_string(),
            })??;

        Ok(Self {
            release_tag: format!("v{version}"),
            app_name: app_name.to_string(),
            artifact_path: artifact.path.display().to_string(),
            artifact_name: artifact.name.clone(),
            file_size_human: format_size(artifact.size_bytes),
            sha256,
        })
    }

    /// Write the record as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).fs_context("writing build info", path)
    }

    /// `key=value` facts for the CI output file
    pub fn ci_facts(&self) -> Vec<(&'static str, String)> {
        vec![
            ("release_tag", self.release_tag.clone()),
            ("app_name", self.app_name.clone()),
            ("artifact_path", self.artifact_path.clone()),
            ("artifact_name", self.artifact_name.clone()),
            ("file_size_human", self.file_size_human.clone()),
            ("sha256", self.sha256.clone()),
        ]
    }
}

/// SHA-256 of a file, hex encoded
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buffer)
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whole megabytes above 1 MiB, whole kilobytes below
pub fn format_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes > MIB {
        format!("{}MB", (bytes / MIB).round())
    } else {
        format!("{}KB", (bytes / 1024.0).round())
    }
}
