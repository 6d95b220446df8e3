use super::Candidate;
use crate::error::{Error, ErrorExt, Result};
use crate::version::Version;
use chrono::{DateTime, Local};
use std::path::Path;

/// List `directory` for files whose name ends with `extension` (case-insensitive).
///
/// A missing directory is an error; an empty one yields an empty list.
/// Results are ordered by file name.
pub fn scan(directory: &Path, extension: &str) -> Result<Vec<Candidate>> {
    if !directory.is_dir() {
        return Err(Error::NotFound {
            what: "work directory".to_string(),
            path: directory.to_path_buf(),
        });
    }

    let suffix = extension.to_lowercase();
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(directory).fs_context("listing directory", directory)? {
        let entry = entry.fs_context("listing directory", directory)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.to_lowercase().ends_with(&suffix) {
            continue;
        }

        let path = entry.path();
        let metadata = entry.metadata().fs_context("reading metadata", &path)?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().fs_context("reading modification time", &path)?;
        let path = std::path::absolute(&path).fs_context("resolving path", &path)?;

        candidates.push(Candidate {
            version: Version::parse(&name),
            name,
            path,
            size_bytes: metadata.len(),
            modified_at: DateTime::<Local>::from(modified),
        });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!(
        "Found {} {} file(s) in {}",
        candidates.len(),
        extension,
        directory.display()
    );
    Ok(candidates)
}
