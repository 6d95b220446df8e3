//! Project layout and source defaults.

use std::path::{Path, PathBuf};

/// Container URL used when nothing else is configured
pub const DEFAULT_DMG_URL: &str =
    "https://res-download-pc-te-vnso-pt-51.zadn.vn/mac/ZaloSetup-universal-25.5.3.dmg";

/// Landing page that redirects to the newest container
pub const DEFAULT_LANDING_URL: &str = "https://zalo.me/download/zalo-pc";

/// Container file extension
pub const CONTAINER_EXTENSION: &str = ".dmg";

/// Paths the pipeline reads and writes, all relative to one project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Download cache and extraction scratch (`temp/`)
    pub fn work_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Extracted application tree (`app/`)
    pub fn app_dir(&self) -> PathBuf {
        self.root.join("app")
    }

    /// Packager output (`dist/`)
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join("dist")
    }

    /// Build facts written after packaging
    pub fn build_info(&self) -> PathBuf {
        self.root.join("build-info.json")
    }

    /// Visual-patch module checkout
    pub fn patch_dir(&self) -> PathBuf {
        self.root.join("plugins").join("zadark")
    }

    /// The project's own `package.json`
    pub fn project_manifest(&self) -> PathBuf {
        self.root.join("package.json")
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new(".")
    }
}
