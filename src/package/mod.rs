//! Packaging through electron-builder.
//!
//! The packager is an external collaborator: this module only passes the
//! extracted app's version as a metadata override, then inspects `dist/`.

mod build_info;

pub use build_info::{BuildInfo, format_size, sha256_file};

use crate::error::{Error, ErrorExt, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Extensions of files worth reporting from `dist/`
const ARTIFACT_EXTENSIONS: &[&str] = &["AppImage", "yml"];

/// A file produced by the packager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
}

impl Artifact {
    /// Whether this is the distributable image rather than update metadata
    pub fn is_app_image(&self) -> bool {
        self.name.ends_with(".AppImage")
    }
}

/// Handle to `npx`, used to run electron-builder
#[derive(Debug, Clone)]
pub struct Packager {
    program: PathBuf,
}

impl Packager {
    /// Find `npx` on PATH
    pub fn locate() -> Result<Self> {
        let program = which::which("npx").map_err(|_| Error::MissingTool {
            tool: "npx".to_string(),
            hint: "Install Node.js and npm, then run 'npm install' in the project root".to_string(),
        })?;
        Ok(Self::at(program))
    }

    /// Use a specific binary
    pub fn at(program: PathBuf) -> Self {
        Self { program }
    }

    /// Arguments passed to `npx`
    pub fn build_args(version: &str) -> Vec<String> {
        vec![
            "electron-builder".to_string(),
            "--linux".to_string(),
            format!("-c.extraMetadata.version={version}"),
        ]
    }

    /// Run electron-builder in `project_root`, stdio inherited.
    pub async fn build(&self, project_root: &Path, version: &str) -> Result<()> {
        let args = Self::build_args(version);
        let command_line = format!("{} {}", self.program.display(), args.join(" "));
        log::info!("Running {}", command_line);

        let status = Command::new(&self.program)
            .args(&args)
            .current_dir(project_root)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::CommandFailed {
                command: command_line.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(Error::CommandFailed {
                command: command_line,
                reason: format!("exited with {status}"),
            });
        }
        Ok(())
    }
}

/// List `.AppImage` and `.yml` files in `dist_dir`, sorted by name.
///
/// A missing directory yields an empty list.
pub fn list_artifacts(dist_dir: &Path) -> Result<Vec<Artifact>> {
    if !dist_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dist_dir).fs_context("listing directory", dist_dir)? {
        let entry = entry.fs_context("listing directory", dist_dir)?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ARTIFACT_EXTENSIONS.contains(&ext));
        if !matches {
            continue;
        }
        let metadata = entry.metadata().fs_context("reading metadata", &path)?;
        if !metadata.is_file() {
            continue;
        }
        artifacts.push(Artifact {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size_bytes: metadata.len(),
        });
    }
    artifacts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(artifacts)
}

/// The artifact [`BuildInfo`] describes: the first `.AppImage`.
pub fn primary_artifact<'a>(artifacts: &'a [Artifact], dist_dir: &Path) -> Result<&'a Artifact> {
    artifacts
        .iter()
        .find(|a| a.is_app_image())
        .ok_or_else(|| Error::NotFound {
            what: "AppImage artifact".to_string(),
            path: dist_dir.to_path_buf(),
        })
}
