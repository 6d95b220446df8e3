//! `download`: fetch the installer image into temp/.

use crate::cli::{RuntimeConfig, SourceArgs};
use crate::error::Result;
use crate::fetch::{DownloadOutcome, Fetcher};
use crate::pipeline::{self, DownloadReport};

pub(super) async fn execute_download(source: &SourceArgs, config: &RuntimeConfig) -> Result<i32> {
    config.output().section("Download");
    fetch_container(source, config).await?;
    Ok(0)
}

/// Download with inline progress, shared with `run`
pub(super) async fn fetch_container(
    source: &SourceArgs,
    config: &RuntimeConfig,
) -> Result<DownloadReport> {
    let output = config.output();
    let fetcher = Fetcher::new(source.fetch_config())?;

    let mut reported = false;
    let result = pipeline::download(
        config.layout(),
        &fetcher,
        &source.url_source(),
        source.force,
        |progress| {
            output.progress_inline(&progress.summary());
            reported = true;
        },
    )
    .await;
    if reported {
        output.progress_done();
    }
    let report = result?;

    output.verbose(&format!("Source: {}", report.url));
    match report.outcome {
        DownloadOutcome::Downloaded { bytes } => output.success(&format!(
            "Downloaded {} ({:.2} MB)",
            report.destination.display(),
            bytes as f64 / 1024.0 / 1024.0
        )),
        DownloadOutcome::Skipped { existing_bytes } => {
            output.info(&format!(
                "Using cached {} ({:.2} MB)",
                report.destination.display(),
                existing_bytes as f64 / 1024.0 / 1024.0
            ));
            output.indent("Set FORCE_DOWNLOAD=true to download it again");
        }
    }
    Ok(report)
}
