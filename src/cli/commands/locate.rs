//! `locate`: show which app directory the launcher would load.

use crate::cli::RuntimeConfig;
use crate::error::{Error, ErrorExt, Result};
use crate::shim;
use std::path::{Path, PathBuf};

pub(super) fn execute_locate(exe_dir: Option<&Path>, config: &RuntimeConfig) -> Result<i32> {
    let exe_dir = match exe_dir {
        Some(dir) => dir.to_path_buf(),
        None => current_exe_dir()?,
    };
    let dev_base = config.layout().root();

    match shim::locate_app_dir(dev_base, &exe_dir) {
        Some(app_dir) => {
            // Plain stdout so scripts can capture it
            println!("{}", app_dir.display());
            Ok(0)
        }
        None => Err(Error::NotFound {
            what: format!("app/{}", shim::ENTRY_SCRIPT),
            path: config.layout().app_dir(),
        }),
    }
}

fn current_exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().fs_context("resolving executable path", "current_exe")?;
    Ok(exe.parent().map(Path::to_path_buf).unwrap_or_default())
}
