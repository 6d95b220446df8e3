//! Command execution, one module per pipeline stage.

mod build;
mod download;
mod extract;
mod locate;
mod manifest;
mod patch;
mod run;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use build::execute_build;
use download::execute_download;
use extract::execute_extract;
use locate::execute_locate;
use manifest::{execute_sanitize_manifest, execute_sync_version};
use patch::execute_prepare_patch;
use run::execute_run;

/// Execute the command named by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);
    log::debug!("Running '{}' in {}", args.command.name(), config.layout().root().display());

    match &args.command {
        Command::Download { source } => execute_download(source, &config).await,
        Command::Extract { target_version } => {
            execute_extract(target_version.as_deref(), &config).await
        }
        Command::PreparePatch { patch, no_apply } => {
            execute_prepare_patch(patch, *no_apply, &config).await
        }
        Command::Build => execute_build(&config).await,
        Command::SyncVersion => execute_sync_version(&config),
        Command::SanitizeManifest => execute_sanitize_manifest(&config),
        Command::Locate { exe_dir } => execute_locate(exe_dir.as_deref(), &config),
        Command::Run {
            source,
            patch,
            with_patch,
            skip_build,
        } => execute_run(source, patch, *with_patch, *skip_build, &config).await,
    }
}
