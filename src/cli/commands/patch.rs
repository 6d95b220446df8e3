//! `prepare-patch`: ready the visual-patch module and apply it.

use crate::cli::{PatchArgs, RuntimeConfig};
use crate::error::Result;
use crate::{patch, pipeline};

pub(super) async fn execute_prepare_patch(
    patch_args: &PatchArgs,
    no_apply: bool,
    config: &RuntimeConfig,
) -> Result<i32> {
    config.output().section("Visual patch");
    let pinned = config.pinned_patch_ref(patch_args);

    if no_apply {
        let module = patch::prepare(&config.layout().patch_dir(), pinned).await?;
        config
            .output()
            .success(&format!("Patch module ready at {}", module.entry().display()));
        return Ok(0);
    }

    apply_patch(patch_args, config).await?;
    Ok(0)
}

/// Prepare and apply, shared with `run`
pub(super) async fn apply_patch(patch_args: &PatchArgs, config: &RuntimeConfig) -> Result<()> {
    let pinned = config.pinned_patch_ref(patch_args);
    if let Some(git_ref) = pinned {
        config.output().verbose(&format!("Pinning patch module to {git_ref}"));
    }
    let entry = pipeline::apply_patch(config.layout(), pinned).await?;
    config.output().success(&format!(
        "Applied {} to {}",
        entry.display(),
        config.layout().app_dir().display()
    ));
    Ok(())
}
