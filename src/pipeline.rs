//! Stage functions chaining the collaborators.
//!
//! Each stage takes what it needs explicitly and returns what later stages
//! consume; nothing is shared through globals.

use crate::candidate::{self, Candidate, Chooser};
use crate::ci::{BuildDecision, CiContext, ReleaseChecker};
use crate::config::{CONTAINER_EXTENSION, ProjectLayout};
use crate::error::Result;
use crate::extract::{ContainerExtractor, ExtractStats};
use crate::fetch::{self, DownloadOutcome, DownloadProgress, Fetcher, UrlSource};
use crate::manifest::{self, AppManifest};
use crate::package::{self, Artifact, BuildInfo, Packager};
use crate::patch;
use crate::version::Version;
use std::path::{Path, PathBuf};

/// Result of the download stage
#[derive(Debug, Clone)]
pub struct DownloadReport {
    /// URL the container was fetched from
    pub url: String,
    /// Cached container path
    pub destination: PathBuf,
    /// Whether bytes were transferred
    pub outcome: DownloadOutcome,
}

/// Result of the extraction stage, handed to later stages by value
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Container that was extracted
    pub container: Candidate,
    /// Extracted app tree
    pub app_dir: PathBuf,
    /// Manifest found in the app, now stored as the backup
    pub manifest: Option<AppManifest>,
    /// What the archive unpack produced
    pub stats: ExtractStats,
}

impl ExtractionOutcome {
    /// App version: the manifest's, else the one in the container name
    pub fn version(&self) -> Option<&str> {
        self.manifest
            .as_ref()
            .and_then(|m| m.version.as_deref())
            .or_else(|| self.container.version.as_ref().map(|v| v.raw.as_str()))
    }
}

/// Result of the packaging stage
#[derive(Debug, Clone)]
pub struct PackageReport {
    /// Version passed to the packager
    pub version: String,
    /// Files found in `dist/`
    pub artifacts: Vec<Artifact>,
    /// Facts about the primary artifact, when one was built
    pub build_info: Option<BuildInfo>,
}

/// Resolve the container URL and download it into the work directory.
pub async fn download<F>(
    layout: &ProjectLayout,
    fetcher: &Fetcher,
    source: &UrlSource,
    force: bool,
    on_progress: F,
) -> Result<DownloadReport>
where
    F: FnMut(&DownloadProgress),
{
    let url = fetcher.resolve_url(source).await?;
    let destination = layout.work_dir().join(fetch::file_name_from_url(&url));
    log::info!("Container URL: {}", url);
    log::info!("Destination: {}", destination.display());

    let outcome = fetcher.download(&url, &destination, force, on_progress).await?;
    Ok(DownloadReport {
        url,
        destination,
        outcome,
    })
}

/// Pick a cached container, unpack it into `app/` and back up its manifest.
pub async fn extract<C: Chooser>(
    layout: &ProjectLayout,
    extractor: &ContainerExtractor,
    target_version: Option<&str>,
    chooser: &mut C,
) -> Result<ExtractionOutcome> {
    let work_dir = layout.work_dir();
    let candidates = candidate::scan(&work_dir, CONTAINER_EXTENSION)?;
    log::info!("Found {} container file(s) in {}", candidates.len(), work_dir.display());

    let container = candidate::select(
        candidates,
        &work_dir,
        CONTAINER_EXTENSION,
        target_version,
        chooser,
    )
    .await?;
    log::info!("Selected {} ({})", container.name, container.version_label());

    let app_dir = layout.app_dir();
    let stats = extractor
        .extract_embedded_archive(&container.path, &work_dir, &app_dir)
        .await?;
    let manifest = manifest::rewrite(&app_dir)?;

    Ok(ExtractionOutcome {
        container,
        app_dir,
        manifest,
        stats,
    })
}

/// In CI, decide whether `target` still needs a build and record the decision.
///
/// Outside CI, or without a repository to check, the answer is always to build.
pub async fn release_gate(
    ci: &CiContext,
    checker: &ReleaseChecker,
    target: &Version,
) -> Result<BuildDecision> {
    if !ci.enabled {
        return Ok(BuildDecision::Build);
    }
    let Some(repository) = ci.repository.as_deref() else {
        log::warn!("CI mode without GITHUB_REPOSITORY, skipping release check");
        return Ok(BuildDecision::Build);
    };

    let published = checker.latest_version(repository).await?;
    let decision = BuildDecision::decide(target, published.as_ref());
    match &decision {
        BuildDecision::Build => log::info!(
            "Version {} not released yet (latest: {})",
            target,
            published.as_ref().map_or("none".to_string(), Version::to_string)
        ),
        BuildDecision::Skip { published } => {
            log::info!("Version {} already released as {}, skipping build", target, published)
        }
    }
    ci.emit(&decision.ci_facts(target))?;
    Ok(decision)
}

/// Prepare the patch module and apply it to the extracted app.
pub async fn apply_patch(layout: &ProjectLayout, pinned_ref: Option<&str>) -> Result<PathBuf> {
    let module = patch::prepare(&layout.patch_dir(), pinned_ref).await?;
    patch::apply(&module, &layout.app_dir()).await?;
    Ok(module.entry().to_path_buf())
}

/// Copy the app version into the project manifest.
pub fn sync_version(layout: &ProjectLayout) -> Result<(String, Option<String>)> {
    let app_dir = layout.app_dir();
    let manifest = manifest::read_backup(&app_dir)?;
    let version = manifest
        .require_version(&app_dir.join(manifest::BACKUP_FILE))?
        .to_string();
    let previous = manifest::sync_project_version(&layout.project_manifest(), &version)?;
    Ok((version, previous))
}

/// Build with the packager, then record facts about the result.
pub async fn package(
    layout: &ProjectLayout,
    packager: &Packager,
    ci: &CiContext,
) -> Result<PackageReport> {
    let app_dir = layout.app_dir();
    let manifest = manifest::read_backup(&app_dir)?;
    let version = manifest
        .require_version(&app_dir.join(manifest::BACKUP_FILE))?
        .to_string();
    log::info!("Packaging {} {}", manifest.display_name(), version);

    packager.build(layout.root(), &version).await?;

    let dist_dir = layout.dist_dir();
    let artifacts = package::list_artifacts(&dist_dir)?;
    let build_info = record_build_info(layout, &dist_dir, &artifacts, &manifest, &version, ci).await?;

    Ok(PackageReport {
        version,
        artifacts,
        build_info,
    })
}

async fn record_build_info(
    layout: &ProjectLayout,
    dist_dir: &Path,
    artifacts: &[Artifact],
    manifest: &AppManifest,
    version: &str,
    ci: &CiContext,
) -> Result<Option<BuildInfo>> {
    let primary = match package::primary_artifact(artifacts, dist_dir) {
        Ok(primary) => primary,
        Err(e) => {
            log::warn!("No build info written: {}", e);
            return Ok(None);
        }
    };

    let info = BuildInfo::compute(manifest.display_name(), version, primary).await?;
    info.write(&layout.build_info())?;
    ci.emit(&info.ci_facts())?;
    log::info!("Build info written to {}", layout.build_info().display());
    Ok(Some(info))
}
