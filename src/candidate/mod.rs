//! Container file candidates found in the work directory.

mod scanner;
mod selector;

pub use scanner::scan;
pub use selector::{Chooser, select, sort_candidates};

use crate::version::Version;
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// A container file that could be extracted
#[derive(Debug, Clone)]
pub struct Candidate {
    /// File name
    pub name: String,
    /// Absolute path
    pub path: PathBuf,
    /// Version parsed from the file name
    pub version: Option<Version>,
    /// Size on disk
    pub size_bytes: u64,
    /// Last modification time
    pub modified_at: DateTime<Local>,
}

impl Candidate {
    /// Version text for display, `unknown` when the name carries none
    pub fn version_label(&self) -> &str {
        self.version.as_ref().map_or("unknown", |v| v.raw.as_str())
    }

    /// Size in megabytes with two decimals
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}
