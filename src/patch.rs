//! Visual-patch module integration.
//!
//! The patch module is a downstream Node.js package. Only its contract is
//! used here: four exported capabilities, each called with the extracted app
//! directory. The module is checked for those exports when loaded and is
//! never modified.

use crate::error::{Error, ErrorExt, PatchError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::process::Command;

/// Exported functions the module must provide, in application order
pub const REQUIRED_CAPABILITIES: [&str; 4] = [
    "copyZaDarkAssets",
    "writeIndexFile",
    "writeBootstrapFile",
    "writePopupViewerFile",
];

static EXPORTS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"module\.exports\s*=\s*\{[\s\S]*?\}").expect("exports pattern is valid")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("identifier pattern is valid"));

/// Calls a capability by name with the app directory as its only argument
const INVOKE_SCRIPT: &str = "const m = require(process.argv[1]);\
Promise.resolve(m[process.argv[2]](process.argv[3]))\
.catch((e) => { console.error((e && e.message) || e); process.exit(1); });";

/// Theming operations applied to an extracted app
#[allow(async_fn_in_trait)]
pub trait VisualPatch {
    /// Copy theme assets into the app tree
    async fn copy_assets(&self, app_dir: &Path) -> Result<()>;
    /// Rewrite the main window's index file
    async fn write_index_file(&self, app_dir: &Path) -> Result<()>;
    /// Rewrite the app's bootstrap file
    async fn write_bootstrap_file(&self, app_dir: &Path) -> Result<()>;
    /// Rewrite the popup viewer file
    async fn write_popup_viewer_file(&self, app_dir: &Path) -> Result<()>;
}

/// Run every capability of `patch` against `app_dir`, stopping at the first failure.
pub async fn apply<P: VisualPatch>(patch: &P, app_dir: &Path) -> Result<()> {
    log::info!("Applying visual patch to {}", app_dir.display());
    patch.copy_assets(app_dir).await?;
    patch.write_index_file(app_dir).await?;
    patch.write_bootstrap_file(app_dir).await?;
    patch.write_popup_viewer_file(app_dir).await?;
    log::info!("Visual patch applied");
    Ok(())
}

/// Capabilities missing from a module's `module.exports = { ... }` block.
///
/// Without an exports block every capability is missing.
pub fn missing_capabilities(source: &str) -> Vec<String> {
    let block = EXPORTS_BLOCK
        .find(source)
        .map(|m| m.as_str())
        .unwrap_or_default();
    let exported: HashSet<&str> = IDENTIFIER.find_iter(block).map(|m| m.as_str()).collect();
    REQUIRED_CAPABILITIES
        .iter()
        .filter(|name| !exported.contains(*name))
        .map(|name| name.to_string())
        .collect()
}

/// The patch module, called through `node`
#[derive(Debug, Clone)]
pub struct NodePatchModule {
    entry: PathBuf,
    node: PathBuf,
}

impl NodePatchModule {
    /// Entry file inside a module checkout
    pub fn entry_for(module_dir: &Path) -> PathBuf {
        module_dir.join("src").join("pc").join("zadark-pc.js")
    }

    /// Load the module in `module_dir`, failing if any capability is not exported.
    pub fn load(module_dir: &Path) -> Result<Self> {
        let entry = Self::entry_for(module_dir);
        if !entry.is_file() {
            return Err(PatchError::ModuleMissing { path: entry }.into());
        }

        let source = std::fs::read_to_string(&entry).fs_context("reading patch module", &entry)?;
        let missing = missing_capabilities(&source);
        if !missing.is_empty() {
            return Err(PatchError::MissingCapabilities { path: entry, missing }.into());
        }

        let node = which::which("node").map_err(|_| Error::MissingTool {
            tool: "node".to_string(),
            hint: "Install Node.js to apply the visual patch".to_string(),
        })?;
        log::debug!("Patch module {} exports all capabilities", entry.display());
        Ok(Self { entry, node })
    }

    /// Module entry file
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    async fn invoke(&self, capability: &str, app_dir: &Path) -> Result<()> {
        log::debug!("Calling {} on {}", capability, app_dir.display());
        let output = Command::new(&self.node)
            .arg("-e")
            .arg(INVOKE_SCRIPT)
            .arg(&self.entry)
            .arg(capability)
            .arg(app_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PatchError::CapabilityFailed {
                capability: capability.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PatchError::CapabilityFailed {
                capability: capability.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl VisualPatch for NodePatchModule {
    async fn copy_assets(&self, app_dir: &Path) -> Result<()> {
        self.invoke(REQUIRED_CAPABILITIES[0], app_dir).await
    }

    async fn write_index_file(&self, app_dir: &Path) -> Result<()> {
        self.invoke(REQUIRED_CAPABILITIES[1], app_dir).await
    }

    async fn write_bootstrap_file(&self, app_dir: &Path) -> Result<()> {
        self.invoke(REQUIRED_CAPABILITIES[2], app_dir).await
    }

    async fn write_popup_viewer_file(&self, app_dir: &Path) -> Result<()> {
        self.invoke(REQUIRED_CAPABILITIES[3], app_dir).await
    }
}

/// Bring the module checkout up to date, validate it and build its assets.
///
/// `pinned_ref` is checked out after the update when set (CI builds). Update and
/// checkout failures leave the current checkout in place; a failed asset build is fatal.
pub async fn prepare(module_dir: &Path, pinned_ref: Option<&str>) -> Result<NodePatchModule> {
    if !module_dir.is_dir() {
        return Err(PatchError::ModuleMissing {
            path: module_dir.to_path_buf(),
        }
        .into());
    }
    log::info!("Patch module found at {}", module_dir.display());

    let parent = module_dir.parent().unwrap_or(module_dir);
    match run_quiet("git", &["submodule", "update", "--remote"], parent).await {
        Ok(()) => log::info!("Patch module updated to latest"),
        Err(e) => log::warn!("Could not update patch module, using current version: {}", e),
    }

    if let Some(git_ref) = pinned_ref {
        log::info!("Checking out patch module version {}", git_ref);
        let checkout = async {
            run_quiet("git", &["rev-parse", "--verify", git_ref], module_dir).await?;
            run_quiet("git", &["checkout", git_ref], module_dir).await
        };
        if let Err(e) = checkout.await {
            log::warn!("Could not check out {}, using current version: {}", git_ref, e);
        }
    }

    let module = NodePatchModule::load(module_dir)?;

    let assets = module_dir.join("build").join("pc").join("assets");
    if assets.is_dir() {
        log::info!("Patch assets already built");
    } else {
        log::info!("Building patch assets");
        run_quiet("npm", &["install", "--silent"], module_dir).await?;
        run_quiet("npm", &["run", "build"], module_dir).await?;
        log::info!("Patch assets built");
    }

    Ok(module)
}

async fn run_quiet(program: &str, args: &[&str], cwd: &Path) -> Result<()> {
    let command = format!("{} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::CommandFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::CommandFailed {
            command,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const FULL_EXPORTS: &str = r#"
const installZaDark = () => {};
module.exports = {
  installZaDark,
  uninstallZaDark,
  copyZaDarkAssets,
  writeIndexFile,
  writeBootstrapFile,
  writePopupViewerFile
}
"#;

    #[test]
    fn test_missing_capabilities() {
        assert!(missing_capabilities(FULL_EXPORTS).is_empty());

        let partial = "module.exports = { installZaDark, uninstallZaDark, writeIndexFile }";
        assert_eq!(
            missing_capabilities(partial),
            ["copyZaDarkAssets", "writeBootstrapFile", "writePopupViewerFile"]
        );

        // Names outside the exports block do not count
        let outside = "function copyZaDarkAssets() {}\nmodule.exports = { installZaDark }";
        assert_eq!(missing_capabilities(outside).len(), 4);
        assert_eq!(missing_capabilities("").len(), 4);
    }

    #[test]
    fn test_capabilities_match_whole_names() {
        let renamed = "module.exports = {\n  copyZaDarkAssets,\n  writeIndexFileLegacy,\n  \
            writeBootstrapFile: bootstrap,\n  writePopupViewerFile\n}";
        assert_eq!(missing_capabilities(renamed), ["writeIndexFile"]);
    }

    #[test]
    fn test_load_rejects_incomplete_module_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let entry = NodePatchModule::entry_for(dir.path());
        std::fs::create_dir_all(entry.parent().unwrap()).unwrap();
        let source = "module.exports = {\n  installZaDark,\n  uninstallZaDark\n}";
        std::fs::write(&entry, source).unwrap();

        let err = NodePatchModule::load(dir.path()).unwrap_err();
        match err {
            Error::Patch(PatchError::MissingCapabilities { missing, .. }) => {
                assert_eq!(missing.len(), 4)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read_to_string(&entry).unwrap(), source);
    }

    #[test]
    fn test_load_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NodePatchModule::load(dir.path()).unwrap_err(),
            Error::Patch(PatchError::ModuleMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_requires_checkout() {
        let root = tempfile::tempdir().unwrap();
        let err = prepare(&root.path().join("plugins/zadark"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Patch(PatchError::ModuleMissing { .. })));
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[derive(Default)]
    struct RecordingPatch {
        calls: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingPatch {
        fn record(&self, name: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(name);
            if self.fail_on == Some(name) {
                return Err(PatchError::CapabilityFailed {
                    capability: name.to_string(),
                    reason: "boom".to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    impl VisualPatch for RecordingPatch {
        async fn copy_assets(&self, _: &Path) -> Result<()> {
            self.record("copy")
        }
        async fn write_index_file(&self, _: &Path) -> Result<()> {
            self.record("index")
        }
        async fn write_bootstrap_file(&self, _: &Path) -> Result<()> {
            self.record("bootstrap")
        }
        async fn write_popup_viewer_file(&self, _: &Path) -> Result<()> {
            self.record("popup")
        }
    }

    #[tokio::test]
    async fn test_apply_runs_capabilities_in_order() {
        let patch = RecordingPatch::default();
        apply(&patch, Path::new("app")).await.unwrap();
        assert_eq!(
            *patch.calls.lock().unwrap(),
            ["copy", "index", "bootstrap", "popup"]
        );
    }

    #[tokio::test]
    async fn test_apply_stops_at_first_failure() {
        let patch = RecordingPatch {
            fail_on: Some("index"),
            ..Default::default()
        };
        assert!(apply(&patch, Path::new("app")).await.is_err());
        assert_eq!(*patch.calls.lock().unwrap(), ["copy", "index"]);
    }
}
