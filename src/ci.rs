//! CI integration: skip builds already released, and emit build facts.
//!
//! In CI the latest published release is looked up through the GitHub API.
//! When it already carries the version about to be built, the build is
//! skipped. Facts are appended to the file named by `GITHUB_OUTPUT` as
//! `key=value` lines.

use crate::error::{Error, ErrorExt, FetchError, Result};
use crate::version::Version;
use reqwest::StatusCode;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default GitHub API base
pub const GITHUB_API: &str = "https://api.github.com";

/// CI settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    /// `CI=true`
    pub enabled: bool,
    /// `owner/repo` whose releases are checked
    pub repository: Option<String>,
    /// Token for the release API
    pub token: Option<String>,
    /// File receiving `key=value` facts
    pub output_file: Option<PathBuf>,
}

impl CiContext {
    /// Append facts to the output file, if one is configured.
    pub fn emit(&self, facts: &[(&str, String)]) -> Result<()> {
        match &self.output_file {
            Some(path) => append_outputs(path, facts),
            None => Ok(()),
        }
    }
}

/// Whether the pipeline should build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDecision {
    /// Nothing newer than the target is published
    Build,
    /// The target (or a newer version) is already released
    Skip {
        /// Version of the latest release
        published: Version,
    },
}

impl BuildDecision {
    /// Compare the target version with the latest published one.
    pub fn decide(target: &Version, published: Option<&Version>) -> Self {
        match published {
            Some(published) if published >= target => Self::Skip {
                published: published.clone(),
            },
            _ => Self::Build,
        }
    }

    /// Facts for the CI output file
    pub fn ci_facts(&self, target: &Version) -> Vec<(&'static str, String)> {
        let should_build = matches!(self, Self::Build);
        vec![
            ("should_build", should_build.to_string()),
            ("version", target.to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// Looks up the latest release of a repository
#[derive(Debug, Clone)]
pub struct ReleaseChecker {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl ReleaseChecker {
    /// Checker against `api_base` (normally [`GITHUB_API`])
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dmg_repack/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Version of the latest release of `repository`, `None` when there are no releases.
    pub async fn latest_version(&self, repository: &str) -> Result<Option<Version>> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, repository);
        log::debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(FetchError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                url,
            }
            .into());
        }

        let release: LatestRelease = response.json().await.map_err(FetchError::Http)?;
        let version = Version::parse(&release.tag_name);
        if version.is_none() {
            log::warn!("Latest release tag '{}' has no version", release.tag_name);
        }
        Ok(version)
    }
}

/// Append `key=value` lines to `path`, creating it if needed.
///
/// Nothing is written unless every value fits on one line.
pub fn append_outputs(path: &Path, facts: &[(&str, String)]) -> Result<()> {
    if let Some((key, _)) = facts.iter().find(|(_, value)| value.contains('\n')) {
        return Err(Error::InvalidConfig {
            reason: format!("CI output '{key}' spans multiple lines"),
        });
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .fs_context("opening CI output file", path)?;
    for (key, value) in facts {
        writeln!(file, "{key}={value}").fs_context("writing CI output file", path)?;
    }
    Ok(())
}
