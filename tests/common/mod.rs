//! Shared fixtures for integration tests.

#![allow(dead_code)]

use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

/// Builds asar archives file by file
#[derive(Default)]
pub struct AsarBuilder {
    root: Map<String, Value>,
    data: Vec<u8>,
}

impl AsarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a packed file at a `/`-separated path
    pub fn file(mut self, path: &str, contents: &[u8]) -> Self {
        let offset = self.data.len();
        self.data.extend_from_slice(contents);
        let node = json!({ "offset": offset.to_string(), "size": contents.len() });
        self.insert(path, node);
        self
    }

    /// Add a file that lives in `app.asar.unpacked`
    pub fn unpacked_file(mut self, path: &str, size: usize) -> Self {
        self.insert(path, json!({ "size": size, "unpacked": true }));
        self
    }

    fn insert(&mut self, path: &str, node: Value) {
        let parts: Vec<&str> = path.split('/').collect();
        let (name, dirs) = parts.split_last().unwrap();
        let mut current = &mut self.root;
        for dir in dirs {
            let entry = current
                .entry(dir.to_string())
                .or_insert_with(|| json!({ "files": {} }));
            current = entry["files"].as_object_mut().unwrap();
        }
        current.insert(name.to_string(), node);
    }

    pub fn build(self) -> Vec<u8> {
        let header = json!({ "files": Value::Object(self.root) });
        let json = serde_json::to_vec(&header).unwrap();
        let padded = json.len().div_ceil(4) * 4;
        let payload_size = 4 + padded;
        let header_size = 4 + payload_size;

        let mut out = Vec::new();
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(&(header_size as u32).to_le_bytes());
        out.extend_from_slice(&(payload_size as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&json);
        out.resize(8 + header_size, 0);
        out.extend_from_slice(&self.data);
        out
    }
}

/// A minimal Electron app: entry script, manifest and one nested module
pub fn sample_app_asar(name: &str, version: &str) -> Vec<u8> {
    let manifest = format!(r#"{{"name":"{name}","version":"{version}","main":"bootstrap.js"}}"#);
    AsarBuilder::new()
        .file("bootstrap.js", b"require('./lib/main.js');\n")
        .file("package.json", manifest.as_bytes())
        .file("lib/main.js", b"module.exports = {};\n")
        .build()
}

/// Lay out `<volume>/<bundle>/Contents/Resources/app.asar` under `root`.
pub fn write_payload_tree(root: &Path, volume: &str, bundle: &str, asar: &[u8]) -> PathBuf {
    let resources = root.join(volume).join(bundle).join("Contents/Resources");
    std::fs::create_dir_all(&resources).unwrap();
    std::fs::write(resources.join("app.asar"), asar).unwrap();
    resources
}

/// Shell script standing in for 7z: copies `payload_root` into the working
/// directory and exits with `exit_code`, the way 7z reports DMG header warnings.
#[cfg(unix)]
pub fn fake_archive_tool(dir: &Path, payload_root: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-7z");
    let body = format!(
        "#!/bin/sh\ncp -R \"{}/.\" .\necho 'ERROR: Headers Error' >&2\nexit {}\n",
        payload_root.display(),
        exit_code
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}
