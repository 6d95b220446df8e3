//! Reader for the Electron asar archive format.
//!
//! Layout: an 8-byte size pickle (`u32 4`, `u32 header_size`), then the header
//! pickle (`u32 payload_size`, `u32 json_len`, JSON text, padding). File data
//! starts at `8 + header_size`; file offsets in the JSON are relative to it.
//! Files flagged `unpacked` live beside the archive in `<archive>.unpacked/`.

use crate::error::{ArchiveError, Error, ErrorExt, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// One node of the header tree
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Directory with named children
    Directory {
        /// Children by name
        files: BTreeMap<String, Node>,
    },
    /// Symbolic link, target relative to the archive root
    Link {
        /// Link target
        link: String,
    },
    /// Regular file
    File {
        /// Offset into the data section, as a decimal string; absent for unpacked files
        #[serde(default)]
        offset: Option<String>,
        /// Size in bytes
        size: u64,
        /// Whether the executable bit should be set
        #[serde(default)]
        executable: bool,
        /// Whether the content lives in the `.unpacked` directory
        #[serde(default)]
        unpacked: bool,
    },
}

/// Counts reported after extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Regular files written
    pub files: usize,
    /// Of which copied from the unpacked directory
    pub unpacked: usize,
    /// Directories created
    pub directories: usize,
    /// Symbolic links created
    pub links: usize,
    /// Bytes written
    pub bytes: u64,
}

/// An opened asar archive
#[derive(Debug)]
pub struct AsarArchive {
    path: PathBuf,
    unpacked_dir: PathBuf,
    data_offset: u64,
    data_len: u64,
    root: Node,
}

impl AsarArchive {
    /// Open `path` and decode its header.
    ///
    /// Unpacked companion files are resolved from `<path>.unpacked` next to the archive.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).fs_context("opening archive", path)?;
        let file_len = file.metadata().fs_context("reading metadata", path)?.len();

        let invalid = |reason: String| {
            Error::from(ArchiveError::InvalidHeader {
                path: path.to_path_buf(),
                reason,
            })
        };

        let mut size_pickle = [0u8; 8];
        file.read_exact(&mut size_pickle)
            .map_err(|e| invalid(format!("reading size pickle: {e}")))?;
        let header_size = u64::from(read_u32(&size_pickle, 4));
        if 8 + header_size > file_len {
            return Err(invalid(format!(
                "header size {header_size} exceeds file size {file_len}"
            )));
        }

        let mut header = vec![0u8; header_size as usize];
        file.read_exact(&mut header)
            .map_err(|e| invalid(format!("reading header: {e}")))?;
        if header.len() < 8 {
            return Err(invalid("header pickle too short".to_string()));
        }
        let json_len = read_u32(&header, 4) as usize;
        let json = header
            .get(8..8 + json_len)
            .ok_or_else(|| invalid(format!("header string length {json_len} out of range")))?;

        let root: Node = serde_json::from_slice(json)
            .map_err(|e| invalid(format!("decoding header JSON: {e}")))?;
        if !matches!(root, Node::Directory { .. }) {
            return Err(invalid("root entry is not a directory".to_string()));
        }

        let data_offset = 8 + header_size;
        Ok(Self {
            path: path.to_path_buf(),
            unpacked_dir: unpacked_dir_for(path),
            data_offset,
            data_len: file_len - data_offset,
            root,
        })
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding unpacked companion files
    pub fn unpacked_dir(&self) -> &Path {
        &self.unpacked_dir
    }

    /// Root directory node
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Extract every entry into `dest`, which is created if missing.
    pub fn extract_all(&self, dest: &Path) -> Result<ExtractStats> {
        std::fs::create_dir_all(dest).fs_context("creating directory", dest)?;
        let mut archive = File::open(&self.path).fs_context("opening archive", &self.path)?;
        let mut stats = ExtractStats::default();
        let Node::Directory { files } = &self.root else {
            return Ok(stats);
        };
        self.extract_dir(files, Path::new(""), dest, &mut archive, &mut stats)?;
        log::debug!(
            "Extracted {} files ({} unpacked), {} directories, {} links from {}",
            stats.files,
            stats.unpacked,
            stats.directories,
            stats.links,
            self.path.display()
        );
        Ok(stats)
    }

    fn extract_dir(
        &self,
        children: &BTreeMap<String, Node>,
        relative: &Path,
        dest: &Path,
        archive: &mut File,
        stats: &mut ExtractStats,
    ) -> Result<()> {
        for (name, node) in children {
            validate_name(name)?;
            let entry_rel = relative.join(name);
            let target = dest.join(&entry_rel);

            match node {
                Node::Directory { files } => {
                    std::fs::create_dir_all(&target).fs_context("creating directory", &target)?;
                    stats.directories += 1;
                    self.extract_dir(files, &entry_rel, dest, archive, stats)?;
                }
                Node::Link { link } => {
                    create_link(&entry_rel, link, &target)?;
                    stats.links += 1;
                }
                Node::File {
                    offset,
                    size,
                    executable,
                    unpacked,
                } => {
                    if *unpacked {
                        let source = self.unpacked_dir.join(&entry_rel);
                        std::fs::copy(&source, &target).fs_context("copying unpacked file", &source)?;
                        stats.unpacked += 1;
                    } else {
                        let offset = parse_offset(offset.as_deref(), &entry_rel)?;
                        self.copy_range(archive, &entry_rel, offset, *size, &target)?;
                    }
                    if *executable {
                        set_executable(&target)?;
                    }
                    stats.files += 1;
                    stats.bytes += size;
                }
            }
        }
        Ok(())
    }

    fn copy_range(
        &self,
        archive: &mut File,
        entry: &Path,
        offset: u64,
        size: u64,
        target: &Path,
    ) -> Result<()> {
        let end = offset.checked_add(size);
        if end.is_none_or(|end| end > self.data_len) {
            return Err(ArchiveError::OutOfBounds {
                entry: entry.display().to_string(),
                offset,
                size,
            }
            .into());
        }

        archive
            .seek(SeekFrom::Start(self.data_offset + offset))
            .fs_context("seeking archive", &self.path)?;
        let mut out = File::create(target).fs_context("creating file", target)?;
        let copied = io::copy(&mut archive.by_ref().take(size), &mut out)
            .fs_context("writing file", target)?;
        if copied != size {
            return Err(ArchiveError::OutOfBounds {
                entry: entry.display().to_string(),
                offset,
                size,
            }
            .into());
        }
        Ok(())
    }
}

/// `<archive>.unpacked` beside the archive
pub fn unpacked_dir_for(archive: &Path) -> PathBuf {
    let mut name = archive
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".unpacked");
    archive.with_file_name(name)
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\')
    {
        return Err(ArchiveError::UnsafeEntry {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

fn parse_offset(offset: Option<&str>, entry: &Path) -> Result<u64> {
    offset
        .and_then(|o| o.parse::<u64>().ok())
        .ok_or_else(|| {
            ArchiveError::InvalidHeader {
                path: entry.to_path_buf(),
                reason: format!("file entry has invalid offset {offset:?}"),
            }
            .into()
        })
}

/// Link target relative to the link's own directory
fn relative_link_target(entry_rel: &Path, link: &str) -> Result<PathBuf> {
    let link_path = Path::new(link);
    if link_path.is_absolute() || link_path.components().any(|c| c == std::path::Component::ParentDir)
    {
        return Err(ArchiveError::UnsafeEntry {
            name: link.to_string(),
        }
        .into());
    }
    let depth = entry_rel.components().count().saturating_sub(1);
    let mut target = PathBuf::new();
    for _ in 0..depth {
        target.push("..");
    }
    target.push(link_path);
    Ok(target)
}

#[cfg(unix)]
fn create_link(entry_rel: &Path, link: &str, target: &Path) -> Result<()> {
    let relative = relative_link_target(entry_rel, link)?;
    std::os::unix::fs::symlink(&relative, target).fs_context("creating symlink", target)
}

#[cfg(not(unix))]
fn create_link(entry_rel: &Path, link: &str, _target: &Path) -> Result<()> {
    relative_link_target(entry_rel, link)?;
    log::warn!("Skipping symlink {} -> {} on this platform", entry_rel.display(), link);
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)
        .fs_context("reading metadata", path)?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions).fs_context("setting permissions", path)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
