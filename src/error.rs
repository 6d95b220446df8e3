//! Error types for dmg_repack operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dmg_repack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for all pipeline stages
#[derive(Error, Debug)]
pub enum Error {
    /// An expected file or directory is absent
    #[error("{what} not found at {}", path.display())]
    NotFound {
        /// Description of the missing item
        what: String,
        /// Path that was checked
        path: PathBuf,
    },

    /// A required external binary is not on PATH
    #[error("Dependency missing: {tool} is not installed")]
    MissingTool {
        /// Tool name
        tool: String,
        /// How to install it
        hint: String,
    },

    /// The container did not contain the expected payload layout
    #[error("Could not find '{suffix}' containing {archive} under {}", scratch.display())]
    PayloadNotFound {
        /// Directory that was searched
        scratch: PathBuf,
        /// Structural path suffix that was expected
        suffix: String,
        /// Archive file expected inside the suffix directory
        archive: String,
    },

    /// Network and download errors
    #[error("Download error: {0}")]
    Fetch(#[from] FetchError),

    /// Candidate selection errors
    #[error("{0}")]
    Selection(#[from] SelectionError),

    /// Embedded archive format errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Visual-patch module errors
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    /// File system error with path context
    #[error("{context} {}: {error}", path.display())]
    Fs {
        /// Operation being performed (e.g. "reading manifest")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: std::io::Error,
    },

    /// External command could not be run or reported failure
    #[error("Command execution failed: {command} - {reason}")]
    CommandFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Invalid configuration or arguments
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for the error
        reason: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal errors
    #[error("{0}")]
    Walkdir(#[from] walkdir::Error),
}

/// Download-specific errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Server answered with a status that is neither 200 nor a redirect
    #[error("HTTP {status}: {reason} ({url})")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Canonical reason phrase
        reason: String,
        /// URL that produced the status
        url: String,
    },

    /// The operation did not finish within its time budget
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Budget in seconds
        seconds: u64,
    },

    /// The redirect chain was longer than allowed
    #[error("Too many redirects (more than {limit}) starting from {url}")]
    TooManyRedirects {
        /// Maximum number of redirects followed
        limit: usize,
        /// URL the chain started from
        url: String,
    },

    /// Auto-detection expected a redirect to a container file
    #[error("Unexpected response from {url}: {reason}")]
    UnexpectedResponse {
        /// Probed URL
        url: String,
        /// What was wrong with the response
        reason: String,
    },

    /// URL could not be parsed or joined
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// Offending URL text
        url: String,
        /// Parse error
        #[source]
        source: url::ParseError,
    },

    /// Transport-level HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Candidate selection errors
#[derive(Error, Debug)]
pub enum SelectionError {
    /// Nothing to choose from
    #[error("No {extension} files found in {}", directory.display())]
    NoCandidates {
        /// Directory that was scanned
        directory: PathBuf,
        /// Extension filter that was applied
        extension: String,
    },

    /// User left the interactive menu without choosing
    #[error("Selection cancelled")]
    Cancelled,
}

/// Embedded archive (asar) format errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Header could not be decoded
    #[error("Invalid archive header in {}: {reason}", path.display())]
    InvalidHeader {
        /// Archive path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Entry name would escape the output directory
    #[error("Refusing unsafe entry name '{name}'")]
    UnsafeEntry {
        /// Offending name
        name: String,
    },

    /// Entry points outside the archive data
    #[error("Entry '{entry}' at offset {offset} (+{size}) is outside the archive")]
    OutOfBounds {
        /// Entry path inside the archive
        entry: String,
        /// Data offset
        offset: u64,
        /// Data size
        size: u64,
    },
}

/// Visual-patch module errors
#[derive(Error, Debug)]
pub enum PatchError {
    /// Module directory does not exist
    #[error("Patch module not found at {}", path.display())]
    ModuleMissing {
        /// Expected module directory
        path: PathBuf,
    },

    /// Module does not export every required capability
    #[error("Patch module {} does not export: {}", path.display(), missing.join(", "))]
    MissingCapabilities {
        /// Module entry file
        path: PathBuf,
        /// Capability names not found in the export surface
        missing: Vec<String>,
    },

    /// A capability call failed
    #[error("Patch capability '{capability}' failed: {reason}")]
    CapabilityFailed {
        /// Capability name
        capability: String,
        /// Reason for the error
        reason: String,
    },
}

impl Error {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            Error::MissingTool { hint, .. } => vec![hint.clone()],
            Error::Selection(SelectionError::NoCandidates { .. }) => vec![
                "Run 'dmg_repack download' first to download the DMG file".to_string(),
            ],
            Error::NotFound { what, .. } if what.contains("manifest backup") => vec![
                "Run 'dmg_repack extract' first to extract the app".to_string(),
            ],
            Error::NotFound { what, .. } if what.contains("work directory") => vec![
                "Run 'dmg_repack download' first to populate the temp directory".to_string(),
            ],
            Error::Fetch(FetchError::Timeout { .. })
            | Error::Fetch(FetchError::Http(_)) => vec![
                "Check your network connection and retry".to_string(),
                "Set DMG_URL to a mirror if the default host is unreachable".to_string(),
            ],
            Error::Fetch(FetchError::UnexpectedResponse { .. }) => vec![
                "Set DMG_URL or DMG_VERSION instead of relying on auto-detection".to_string(),
            ],
            Error::PayloadNotFound { .. } => vec![
                "Delete the cached DMG and run 'dmg_repack download' with FORCE_DOWNLOAD=true"
                    .to_string(),
            ],
            Error::Patch(PatchError::ModuleMissing { .. }) => vec![
                "Initialize submodules: git submodule update --init --recursive".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    /// Whether the user ended the run from the interactive chooser
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Selection(SelectionError::Cancelled))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// Wraps I/O errors with the path that caused them for better diagnostics.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}
