//! `run`: every stage in order.

use super::download::fetch_container;
use super::extract::extract_app;
use super::patch::apply_patch;
use crate::ci::{BuildDecision, GITHUB_API, ReleaseChecker};
use crate::cli::{PatchArgs, RuntimeConfig, SourceArgs};
use crate::error::Result;
use crate::package::Packager;
use crate::version::Version;
use crate::{manifest, pipeline};

pub(super) async fn execute_run(
    source: &SourceArgs,
    patch_args: &PatchArgs,
    with_patch: bool,
    skip_build: bool,
    config: &RuntimeConfig,
) -> Result<i32> {
    let output = config.output();
    let ci = config.ci();

    output.section("Download");
    let download = fetch_container(source, config).await?;

    let file_name = download
        .destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let target = Version::parse(&file_name)
        .or_else(|| source.target_version.as_deref().and_then(Version::parse));

    if ci.enabled {
        match &target {
            Some(target) => {
                let checker = ReleaseChecker::new(GITHUB_API, ci.token.clone())?;
                if let BuildDecision::Skip { published } =
                    pipeline::release_gate(ci, &checker, target).await?
                {
                    output.success(&format!(
                        "Version {target} already released ({published}), nothing to build"
                    ));
                    return Ok(0);
                }
            }
            None => output.warn("Container version unknown, skipping release check"),
        }
    }

    output.section("Extract");
    let outcome = extract_app(source.target_version.as_deref(), config).await?;

    if with_patch {
        output.section("Visual patch");
        apply_patch(patch_args, config).await?;
    }

    output.section("Manifest");
    if outcome.manifest.is_some() {
        let removed = manifest::write_sanitized(&outcome.app_dir)?;
        output.verbose(&format!("Sanitized manifest, {} item(s) removed", removed.len()));
        let (version, previous) = pipeline::sync_version(config.layout())?;
        if previous.is_some() {
            output.success(&format!("Project version set to {version}"));
        }
    } else {
        output.warn("No app manifest, project version left unchanged");
    }

    if skip_build {
        output.info("Build skipped");
        return Ok(0);
    }

    output.section("Build");
    let packager = Packager::locate()?;
    let report = pipeline::package(config.layout(), &packager, ci).await?;
    output.success(&format!(
        "{} {} built: {} artifact(s)",
        outcome.container.name,
        report.version,
        report.artifacts.len()
    ));
    Ok(0)
}
