//! Container (DMG) extraction.
//!
//! 7-Zip pulls only the nested `app.asar*` path out of the disk image into a
//! scratch directory. The Resources directory is then found by its structural
//! suffix (the volume folder name embeds the mutable app name), the asar is
//! unpacked natively into the output tree, and the scratch folders are removed.

pub mod asar;
mod tool;

pub use asar::{AsarArchive, ExtractStats};
pub use tool::{ArchiveTool, ToolRun};

use crate::error::{Error, ErrorExt, Result};
use std::path::{Path, PathBuf};

/// Names that locate the payload inside the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLayout {
    /// Prefix of the top-level volume folder, e.g. `Zalo` for `Zalo 25.8.2/`
    pub volume_prefix: String,
    /// Application bundle directory, e.g. `Zalo.app`
    pub app_bundle: String,
    /// Embedded archive file name inside `Contents/Resources`
    pub archive_name: String,
}

impl Default for ContainerLayout {
    fn default() -> Self {
        Self {
            volume_prefix: "Zalo".to_string(),
            app_bundle: "Zalo.app".to_string(),
            archive_name: "app.asar".to_string(),
        }
    }
}

impl ContainerLayout {
    /// Layout for an app whose volume and bundle share `name`
    pub fn for_app(name: &str) -> Self {
        Self {
            volume_prefix: name.to_string(),
            app_bundle: format!("{name}.app"),
            ..Self::default()
        }
    }

    /// Glob handed to the archive tool; matches the archive and its `.unpacked` directory
    pub fn include_pattern(&self) -> String {
        format!(
            "{}*/{}/Contents/Resources/{}*",
            self.volume_prefix, self.app_bundle, self.archive_name
        )
    }

    /// Relative path the Resources directory must end with
    pub fn resources_suffix(&self) -> PathBuf {
        Path::new(&self.app_bundle).join("Contents").join("Resources")
    }
}

/// Drives the archive tool and unpacks the embedded archive
#[derive(Debug, Clone)]
pub struct ContainerExtractor {
    tool: ArchiveTool,
    layout: ContainerLayout,
}

impl ContainerExtractor {
    /// Extractor using the archive tool found on PATH
    pub fn locate(layout: ContainerLayout) -> Result<Self> {
        let tool = ArchiveTool::locate()?;
        log::info!("Using archive tool {}", tool.program().display());
        Ok(Self::with_tool(tool, layout))
    }

    /// Extractor using a specific tool binary
    pub fn with_tool(tool: ArchiveTool, layout: ContainerLayout) -> Self {
        Self { tool, layout }
    }

    /// Layout in use
    pub fn layout(&self) -> &ContainerLayout {
        &self.layout
    }

    /// Unpack the embedded archive of `container` into `output`.
    ///
    /// `output` is removed and recreated first. Volume folders left in `scratch` by an
    /// earlier run are removed before the tool runs, so only this container's payload
    /// can be found. `scratch` keeps everything else, including the container.
    pub async fn extract_embedded_archive(
        &self,
        container: &Path,
        scratch: &Path,
        output: &Path,
    ) -> Result<ExtractStats> {
        recreate_dir(output).await?;
        tokio::fs::create_dir_all(scratch)
            .await
            .fs_context("creating directory", scratch)?;
        let stale = self.clean_scratch(scratch).await?;
        if stale > 0 {
            log::warn!("Removed {} leftover folder(s) from {}", stale, scratch.display());
        }

        log::info!("Extracting {} from {}", self.layout.archive_name, container.display());
        let run = self
            .tool
            .extract(container, &self.layout.include_pattern(), scratch)
            .await?;
        if !run.success {
            // DMG headers trip 7-Zip even when the requested entries come out fine
            log::warn!(
                "Archive tool exited with {:?} (this is normal for DMG files): {}",
                run.code,
                run.stderr.lines().last().unwrap_or_default()
            );
        }

        let resources = self.find_resources_dir(scratch)?;
        log::info!("Found Resources at {}", resources.display());

        let archive_path = resources.join(&self.layout.archive_name);
        let destination = output.to_path_buf();
        let stats = tokio::task::spawn_blocking(move || {
            AsarArchive::open(&archive_path)?.extract_all(&destination)
        })
        .await
        .map_err(|e| Error::CommandFailed {
            command: "asar extraction".to_string(),
            reason: e.to_string(),
        })??;

        let removed = self.clean_scratch(scratch).await?;
        log::debug!("Removed {} extracted folder(s) from {}", removed, scratch.display());
        log::info!("App extracted to {}", output.display());
        Ok(stats)
    }

    /// Find the directory ending in `<bundle>/Contents/Resources` that holds the archive.
    pub fn find_resources_dir(&self, scratch: &Path) -> Result<PathBuf> {
        let suffix = self.layout.resources_suffix();
        for entry in walkdir::WalkDir::new(scratch).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_dir()
                && entry.path().ends_with(&suffix)
                && entry.path().join(&self.layout.archive_name).is_file()
            {
                return Ok(entry.into_path());
            }
        }
        Err(Error::PayloadNotFound {
            scratch: scratch.to_path_buf(),
            suffix: suffix.display().to_string(),
            archive: self.layout.archive_name.clone(),
        })
    }

    /// Remove top-level scratch directories named after the volume prefix.
    pub async fn clean_scratch(&self, scratch: &Path) -> Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(scratch)
            .await
            .fs_context("listing directory", scratch)?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .fs_context("listing directory", scratch)?
        {
            let is_dir = entry
                .file_type()
                .await
                .fs_context("reading file type", entry.path())?
                .is_dir();
            let name = entry.file_name();
            if is_dir && name.to_string_lossy().starts_with(&self.layout.volume_prefix) {
                tokio::fs::remove_dir_all(entry.path())
                    .await
                    .fs_context("removing directory", entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

async fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        tokio::fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path)?;
    }
    tokio::fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}
