//! Bookkeeping for the extracted app's `package.json`.
//!
//! The packager treats a `package.json` inside `app/` as authoritative project
//! metadata, so after extraction it is renamed to `package.json.backup`. Later
//! stages read name and version from the backup.

use crate::error::{Error, ErrorExt, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Manifest file name inside the app tree
pub const MANIFEST_FILE: &str = "package.json";
/// Name the manifest is renamed to
pub const BACKUP_FILE: &str = "package.json.backup";
/// Sanitized copy written for packaging
pub const SANITIZED_FILE: &str = "package.json.original";

/// Dependencies that break packaging (private git sources)
const PROBLEMATIC_DEPENDENCIES: &[&str] = &["unload"];
/// Lifecycle scripts that must not run at packaging time
const LIFECYCLE_SCRIPTS: &[&str] = &["postinstall", "preinstall", "install"];
/// Top-level sections irrelevant to packaging
const DROPPED_SECTIONS: &[&str] = &["devDependencies", "lint-staged", "husky", "engines"];

/// Name and version of the extracted app, plus everything else it declared
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppManifest {
    /// Package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Package version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Remaining fields, preserved verbatim
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl AppManifest {
    /// Parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).fs_context("reading manifest", path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Name for display, `unknown` when absent
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    /// The version, or an error naming the manifest
    pub fn require_version(&self, source: &Path) -> Result<&str> {
        self.version.as_deref().ok_or_else(|| Error::InvalidConfig {
            reason: format!("No version found in {}", source.display()),
        })
    }
}

/// Rename `app_dir/package.json` to the backup name.
///
/// A missing manifest is logged and reported as `None`; some containers ship without one.
pub fn rewrite(app_dir: &Path) -> Result<Option<AppManifest>> {
    let manifest_path = app_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        log::warn!("package.json not found in extracted app at {}", app_dir.display());
        return Ok(None);
    }

    let manifest = AppManifest::load(&manifest_path)?;
    log::info!(
        "App info: {} {}",
        manifest.display_name(),
        manifest.version.as_deref().unwrap_or("unknown")
    );

    let backup_path = app_dir.join(BACKUP_FILE);
    std::fs::rename(&manifest_path, &backup_path).fs_context("renaming manifest", &manifest_path)?;
    log::info!("Renamed {} -> {}", MANIFEST_FILE, BACKUP_FILE);
    Ok(Some(manifest))
}

/// Read the backup written by [`rewrite`].
pub fn read_backup(app_dir: &Path) -> Result<AppManifest> {
    let backup_path = app_dir.join(BACKUP_FILE);
    if !backup_path.is_file() {
        return Err(Error::NotFound {
            what: "app manifest backup".to_string(),
            path: backup_path,
        });
    }
    AppManifest::load(&backup_path)
}

/// Strip packaging hazards from a manifest value; returns a description per removal.
pub fn sanitize(manifest: &mut Value) -> Vec<String> {
    let mut removed = Vec::new();
    let Some(root) = manifest.as_object_mut() else {
        return removed;
    };

    if let Some(deps) = root.get_mut("dependencies").and_then(Value::as_object_mut) {
        for dep in PROBLEMATIC_DEPENDENCIES {
            if let Some(spec) = deps.shift_remove(*dep) {
                removed.push(format!("dependency {dep} = {spec}"));
            }
        }
    }

    if let Some(scripts) = root.get_mut("scripts").and_then(Value::as_object_mut) {
        for script in LIFECYCLE_SCRIPTS {
            if scripts.shift_remove(*script).is_some() {
                removed.push(format!("script {script}"));
            }
        }
    }

    for section in DROPPED_SECTIONS {
        if root.shift_remove(*section).is_some() {
            removed.push(format!("section {section}"));
        }
    }

    removed
}

/// Write a sanitized copy of the backup manifest for the packager.
pub fn write_sanitized(app_dir: &Path) -> Result<Vec<String>> {
    let backup_path = app_dir.join(BACKUP_FILE);
    if !backup_path.is_file() {
        return Err(Error::NotFound {
            what: "app manifest backup".to_string(),
            path: backup_path,
        });
    }
    let content = std::fs::read_to_string(&backup_path).fs_context("reading manifest", &backup_path)?;
    let mut value: Value = serde_json::from_str(&content)?;
    let removed = sanitize(&mut value);
    for item in &removed {
        log::info!("Removed {}", item);
    }

    let out = app_dir.join(SANITIZED_FILE);
    std::fs::write(&out, serde_json::to_string_pretty(&value)?).fs_context("writing manifest", &out)?;
    Ok(removed)
}

/// Set the project manifest's version to `version`.
///
/// Returns the previous version when it changed, `None` when it already matched.
pub fn sync_project_version(project_manifest: &Path, version: &str) -> Result<Option<String>> {
    let content = std::fs::read_to_string(project_manifest)
        .fs_context("reading manifest", project_manifest)?;
    let mut value: Value = serde_json::from_str(&content)?;
    let root = value.as_object_mut().ok_or_else(|| Error::InvalidConfig {
        reason: format!("{} is not a JSON object", project_manifest.display()),
    })?;

    let current = root
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if current == version {
        return Ok(None);
    }

    root.insert("version".to_string(), Value::String(version.to_string()));
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    std::fs::write(project_manifest, out).fs_context("writing manifest", project_manifest)?;
    Ok(Some(current))
}
