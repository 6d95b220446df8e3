//! `extract`: unpack the app from a cached image into app/.

use crate::chooser::TerminalChooser;
use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::extract::{ContainerExtractor, ContainerLayout};
use crate::pipeline::{self, ExtractionOutcome};

pub(super) async fn execute_extract(
    target_version: Option<&str>,
    config: &RuntimeConfig,
) -> Result<i32> {
    config.output().section("Extract");
    extract_app(target_version, config).await?;
    Ok(0)
}

/// Extract and report, shared with `run`
pub(super) async fn extract_app(
    target_version: Option<&str>,
    config: &RuntimeConfig,
) -> Result<ExtractionOutcome> {
    let output = config.output();
    let extractor = ContainerExtractor::locate(ContainerLayout::default())?;
    output.verbose(&format!(
        "Payload pattern: {}",
        extractor.layout().include_pattern()
    ));

    let mut chooser = TerminalChooser::new();
    let outcome =
        pipeline::extract(config.layout(), &extractor, target_version, &mut chooser).await?;

    output.success(&format!(
        "Extracted {} to {}",
        outcome.container.name,
        outcome.app_dir.display()
    ));
    output.indent(&format!(
        "{} files ({} unpacked), {} directories, {} links",
        outcome.stats.files, outcome.stats.unpacked, outcome.stats.directories, outcome.stats.links
    ));
    match &outcome.manifest {
        Some(manifest) => output.indent(&format!(
            "{} {}",
            manifest.display_name(),
            manifest.version.as_deref().unwrap_or("unknown")
        )),
        None => output.warn("No package.json in the extracted app"),
    }
    Ok(outcome)
}
