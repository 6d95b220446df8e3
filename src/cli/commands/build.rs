//! `build`: package app/ with electron-builder.

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::package::{Packager, format_size};
use crate::pipeline;

pub(super) async fn execute_build(config: &RuntimeConfig) -> Result<i32> {
    let output = config.output();
    output.section("Build");

    let packager = Packager::locate()?;
    let report = pipeline::package(config.layout(), &packager, config.ci()).await?;
    output.success(&format!("Built version {}", report.version));

    if !report.artifacts.is_empty() {
        output.println("Built files:");
        for artifact in &report.artifacts {
            output.indent(&format!(
                "• {} ({})",
                artifact.name,
                format_size(artifact.size_bytes)
            ));
        }
    }

    if let Some(info) = &report.build_info {
        output.verbose(&format!("sha256 {}", info.sha256));
        output.info(&format!(
            "Build info written to {}",
            config.layout().build_info().display()
        ));
    }
    Ok(0)
}
