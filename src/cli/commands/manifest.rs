//! `sync-version` and `sanitize-manifest`.

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::{manifest, pipeline};

pub(super) fn execute_sync_version(config: &RuntimeConfig) -> Result<i32> {
    let output = config.output();
    let (version, previous) = pipeline::sync_version(config.layout())?;
    match previous {
        Some(previous) => output.success(&format!(
            "Updated project version: {} → {}",
            if previous.is_empty() { "none" } else { previous.as_str() },
            version
        )),
        None => output.info(&format!("Project version already {version}")),
    }
    Ok(0)
}

pub(super) fn execute_sanitize_manifest(config: &RuntimeConfig) -> Result<i32> {
    let output = config.output();
    let app_dir = config.layout().app_dir();
    let removed = manifest::write_sanitized(&app_dir)?;
    if removed.is_empty() {
        output.info("Nothing to remove from the app manifest");
    } else {
        for item in &removed {
            output.indent(&format!("removed {item}"));
        }
    }
    output.success(&format!(
        "Wrote {}",
        app_dir.join(manifest::SANITIZED_FILE).display()
    ));
    Ok(0)
}
