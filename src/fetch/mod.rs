//! Container file download.
//!
//! Resolves the download URL (static, templated or auto-detected through a
//! redirect probe) and streams the remote file to disk. Redirects are followed
//! manually so the chain length is bounded and relative `Location` headers are
//! resolved against the current request URL.

mod progress;

pub use progress::{DownloadProgress, ProgressTracker};

use crate::error::{Error, ErrorExt, FetchError, Result};
use futures_lite::StreamExt;
use reqwest::{Response, StatusCode, header::LOCATION, redirect::Policy};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Placeholder substituted by [`UrlSource::Templated`]
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Network settings for the fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Budget for metadata requests (auto-detect probe, response headers)
    pub probe_timeout: Duration,
    /// Budget for a complete download including the body
    pub transfer_timeout: Duration,
    /// Maximum number of redirects followed
    pub max_redirects: usize,
    /// Minimum time between progress reports
    pub progress_interval: Duration,
    /// User-Agent header
    pub user_agent: String,
    /// Honor HTTP(S)_PROXY environment variables
    pub use_system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(10 * 60),
            max_redirects: 10,
            progress_interval: Duration::from_secs(1),
            user_agent: concat!("dmg_repack/", env!("CARGO_PKG_VERSION")).to_string(),
            use_system_proxy: true,
        }
    }
}

/// Where the container URL comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    /// Fixed URL
    Static(String),
    /// URL pattern with a `{version}` placeholder
    Templated {
        /// Pattern, e.g. `https://host/mac/App-{version}.dmg`
        template: String,
        /// Version substituted into the pattern
        version: String,
    },
    /// Landing page that redirects to the current container file
    AutoDetect {
        /// Landing page URL
        landing_url: String,
    },
}

/// What `download` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File was fetched
    Downloaded {
        /// Bytes written
        bytes: u64,
    },
    /// Destination already existed and force was off
    Skipped {
        /// Size of the file that was kept
        existing_bytes: u64,
    },
}

/// HTTP downloader for container files
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Build a fetcher. Automatic redirects are disabled; they are followed manually.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(FetchError::Http)?;
        Ok(Self { client, config })
    }

    /// Configuration in use
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Turn a [`UrlSource`] into a concrete URL.
    pub async fn resolve_url(&self, source: &UrlSource) -> Result<String> {
        match source {
            UrlSource::Static(url) => {
                parse_url(url)?;
                Ok(url.clone())
            }
            UrlSource::Templated { template, version } => {
                if !template.contains(VERSION_PLACEHOLDER) {
                    return Err(Error::InvalidConfig {
                        reason: format!(
                            "URL template '{template}' has no {VERSION_PLACEHOLDER} placeholder"
                        ),
                    });
                }
                let url = template.replace(VERSION_PLACEHOLDER, version.trim());
                parse_url(&url)?;
                Ok(url)
            }
            UrlSource::AutoDetect { landing_url } => self.detect_container_url(landing_url).await,
        }
    }

    /// Probe a landing page expecting a 301/302 whose `Location` is a container file.
    async fn detect_container_url(&self, landing_url: &str) -> Result<String> {
        log::info!("Detecting latest container URL from {}", landing_url);
        let landing = parse_url(landing_url)?;
        let response = self
            .with_timeout("Auto-detect probe", self.config.probe_timeout, async {
                self.client
                    .get(landing.clone())
                    .send()
                    .await
                    .map_err(|e| Error::from(FetchError::Http(e)))
            })
            .await?;

        let status = response.status();
        if !matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND) {
            return Err(FetchError::UnexpectedResponse {
                url: landing_url.to_string(),
                reason: format!("expected a 301/302 redirect, got HTTP {}", status.as_u16()),
            }
            .into());
        }

        let location = location_header(&response).ok_or_else(|| FetchError::UnexpectedResponse {
            url: landing_url.to_string(),
            reason: "redirect without a Location header".to_string(),
        })?;
        let target = join_url(&landing, &location)?;

        if !looks_like_container(&target) {
            return Err(FetchError::UnexpectedResponse {
                url: landing_url.to_string(),
                reason: format!("redirect target '{target}' is not a .dmg file"),
            }
            .into());
        }

        log::info!("Detected container URL: {}", target);
        Ok(target.to_string())
    }

    /// Stream `url` into `destination`.
    ///
    /// An existing destination is kept as-is unless `force` is set; no request is made
    /// in that case. The existing file is not verified.
    pub async fn download<F>(
        &self,
        url: &str,
        destination: &Path,
        force: bool,
        mut on_progress: F,
    ) -> Result<DownloadOutcome>
    where
        F: FnMut(&DownloadProgress),
    {
        if destination.exists() {
            let existing_bytes = tokio::fs::metadata(destination)
                .await
                .fs_context("reading metadata", destination)?
                .len();
            if !force {
                log::info!(
                    "Download skipped - {} already exists ({} bytes)",
                    destination.display(),
                    existing_bytes
                );
                return Ok(DownloadOutcome::Skipped { existing_bytes });
            }
            log::info!("Force download enabled, removing {}", destination.display());
            tokio::fs::remove_file(destination)
                .await
                .fs_context("removing existing file", destination)?;
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }

        let result = self
            .with_timeout("Download", self.config.transfer_timeout, async {
                let response = self.follow_redirects(url).await?;
                self.stream_to_file(response, destination, &mut on_progress).await
            })
            .await;

        match result {
            Ok(bytes) => {
                log::info!("Download completed: {} ({} bytes)", destination.display(), bytes);
                Ok(DownloadOutcome::Downloaded { bytes })
            }
            Err(e) => {
                // Only an in-process failure is cleaned up; a killed process still leaves a partial file
                if destination.exists() {
                    let _ = tokio::fs::remove_file(destination).await;
                }
                Err(e)
            }
        }
    }

    /// GET `url`, following up to `max_redirects` redirects, and return the 200 response.
    async fn follow_redirects(&self, url: &str) -> Result<Response> {
        let mut current = parse_url(url)?;
        let mut followed = 0usize;

        loop {
            log::debug!("GET {}", current);
            let request = self.client.get(current.clone()).send();
            let response = self
                .with_timeout("Request", self.config.probe_timeout, async {
                    request.await.map_err(|e| Error::from(FetchError::Http(e)))
                })
                .await?;

            let status = response.status();
            if status.is_redirection() && status != StatusCode::NOT_MODIFIED {
                if followed >= self.config.max_redirects {
                    return Err(FetchError::TooManyRedirects {
                        limit: self.config.max_redirects,
                        url: url.to_string(),
                    }
                    .into());
                }
                let location =
                    location_header(&response).ok_or_else(|| FetchError::UnexpectedResponse {
                        url: current.to_string(),
                        reason: format!("HTTP {} without a Location header", status.as_u16()),
                    })?;
                let next = join_url(&current, &location)?;
                log::debug!("Redirect {} -> {}", status.as_u16(), next);
                current = next;
                followed += 1;
                continue;
            }

            if status != StatusCode::OK {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    url: current.to_string(),
                }
                .into());
            }

            return Ok(response);
        }
    }

    async fn stream_to_file<F>(
        &self,
        response: Response,
        destination: &Path,
        on_progress: &mut F,
    ) -> Result<u64>
    where
        F: FnMut(&DownloadProgress),
    {
        let total_bytes = response.content_length();
        log::debug!("Content-Length: {:?}", total_bytes);

        let mut file = tokio::fs::File::create(destination)
            .await
            .fs_context("creating file", destination)?;

        let mut tracker =
            ProgressTracker::new(total_bytes, self.config.progress_interval, Instant::now());
        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::Http)?;
            file.write_all(&chunk)
                .await
                .fs_context("writing file", destination)?;
            bytes_downloaded += chunk.len() as u64;
            if let Some(report) = tracker.update(bytes_downloaded, Instant::now()) {
                on_progress(&report);
            }
        }

        file.flush().await.fs_context("flushing file", destination)?;
        on_progress(&tracker.finish(bytes_downloaded, Instant::now()));
        Ok(bytes_downloaded)
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        budget: Duration,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(budget, fut).await.map_err(|_| {
            Error::from(FetchError::Timeout {
                operation: operation.to_string(),
                seconds: budget.as_secs(),
            })
        })?
    }
}

/// File name for a download, taken from the last URL path segment.
pub fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "app.dmg".to_string())
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| {
        FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        }
        .into()
    })
}

fn join_url(base: &Url, location: &str) -> Result<Url> {
    base.join(location).map_err(|source| {
        FetchError::InvalidUrl {
            url: location.to_string(),
            source,
        }
        .into()
    })
}

fn location_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn looks_like_container(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".dmg")
}
