//! The external archive tool (7-Zip) used to read DMG images.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Binaries tried in order
const CANDIDATE_BINARIES: &[&str] = &["7z", "7zz"];

/// Outcome of one tool invocation
#[derive(Debug, Clone)]
pub struct ToolRun {
    /// Whether the tool exited with status 0
    pub success: bool,
    /// Exit code, if the tool was not killed by a signal
    pub code: Option<i32>,
    /// Captured standard error
    pub stderr: String,
}

/// Handle to a 7-Zip compatible binary
#[derive(Debug, Clone)]
pub struct ArchiveTool {
    program: PathBuf,
}

impl ArchiveTool {
    /// Find `7z` (or `7zz`) on PATH.
    pub fn locate() -> Result<Self> {
        CANDIDATE_BINARIES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::at)
            .ok_or_else(|| Error::MissingTool {
                tool: "7z".to_string(),
                hint: "Please install it using: sudo apt-get install p7zip-full".to_string(),
            })
    }

    /// Use a specific binary
    pub fn at(program: PathBuf) -> Self {
        Self { program }
    }

    /// Path of the binary
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Extract entries of `container` matching `pattern` into `cwd`.
    ///
    /// A non-zero exit is reported in the returned [`ToolRun`], not as an error; only a
    /// failure to start the tool is an error.
    pub async fn extract(&self, container: &Path, pattern: &str, cwd: &Path) -> Result<ToolRun> {
        log::debug!(
            "Running {} x {} {} in {}",
            self.program.display(),
            container.display(),
            pattern,
            cwd.display()
        );
        let output = Command::new(&self.program)
            .arg("x")
            .arg(container)
            .arg(pattern)
            .arg("-y")
            .current_dir(cwd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::CommandFailed {
                command: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(ToolRun {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
