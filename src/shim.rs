//! Where the packaged launcher finds the extracted app.
//!
//! The launcher looks beside the project sources first (development) and
//! beside its own executable second (packaged build).

use std::path::{Path, PathBuf};

/// Entry script the launcher hands control to
pub const ENTRY_SCRIPT: &str = "bootstrap.js";

/// First of `<dev_base>/app` and `<exe_dir>/app` that holds the entry script.
pub fn locate_app_dir(dev_base: &Path, exe_dir: &Path) -> Option<PathBuf> {
    [dev_base.join("app"), exe_dir.join("app")]
        .into_iter()
        .find(|dir| dir.join(ENTRY_SCRIPT).is_file())
}
