//! # dmg_repack
//!
//! Repackage the Electron app inside a macOS installer image for Linux.
//!
//! The pipeline downloads the disk image, extracts its embedded `app.asar`
//! into `app/`, optionally applies a visual patch, and hands the result to
//! electron-builder.
//!
//! ## Usage
//!
//! ```bash
//! dmg_repack download                    # fetch the image into temp/
//! dmg_repack extract --dmg-version 25.8.2
//! dmg_repack build                       # AppImage into dist/
//! dmg_repack run --with-patch            # all stages
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod candidate;
pub mod chooser;
pub mod ci;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod manifest;
pub mod package;
pub mod patch;
pub mod pipeline;
pub mod shim;
pub mod version;

pub use candidate::{Candidate, Chooser};
pub use cli::Args;
pub use config::ProjectLayout;
pub use error::{Error, Result};
pub use extract::{ContainerExtractor, ContainerLayout};
pub use fetch::{DownloadOutcome, FetchConfig, Fetcher, UrlSource};
pub use manifest::AppManifest;
pub use pipeline::ExtractionOutcome;
pub use version::Version;
