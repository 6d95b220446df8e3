//! Command line argument parsing.
//!
//! Every option that the build scripts historically read from the environment
//! is bound to its variable through clap's `env` support, so CI jobs keep
//! working without flags.

use crate::ci::CiContext;
use crate::config::{DEFAULT_DMG_URL, DEFAULT_LANDING_URL, ProjectLayout};
use crate::fetch::{FetchConfig, UrlSource};
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Repackage the Electron app inside a macOS disk image for Linux
#[derive(Parser, Debug)]
#[command(
    name = "dmg_repack",
    version,
    about = "Repackage the Electron app inside a macOS disk image for Linux",
    long_about = "Download a macOS installer image, extract its embedded app.asar into app/,
optionally apply a visual patch, and build a Linux AppImage with electron-builder.

Usage:
  dmg_repack download
  dmg_repack extract --dmg-version 25.8.2
  dmg_repack build
  dmg_repack run --with-patch"
)]
pub struct Args {
    /// Project root holding temp/, app/ and dist/
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Show detailed output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// CI settings
    #[command(flatten)]
    pub ci: CiArgs,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Pipeline commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the installer image into temp/
    Download {
        /// Where the image comes from
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Extract the app from a downloaded image into app/
    Extract {
        /// Version to pick among downloaded images
        #[arg(long = "dmg-version", env = "DMG_VERSION", value_name = "VERSION")]
        target_version: Option<String>,
    },

    /// Update, validate and build the visual-patch module, then apply it to app/
    PreparePatch {
        /// Patch options
        #[command(flatten)]
        patch: PatchArgs,

        /// Only prepare the module, do not touch app/
        #[arg(long)]
        no_apply: bool,
    },

    /// Build the Linux package from app/ with electron-builder
    Build,

    /// Set the project package.json version to the extracted app's version
    SyncVersion,

    /// Write app/package.json.original without packaging hazards
    SanitizeManifest,

    /// Print the app directory the launcher would load
    Locate {
        /// Directory of the packaged launcher executable
        #[arg(long, value_name = "DIR")]
        exe_dir: Option<PathBuf>,
    },

    /// Run every stage: download, extract, patch, sync, build
    Run {
        /// Where the image comes from
        #[command(flatten)]
        source: SourceArgs,

        /// Patch options
        #[command(flatten)]
        patch: PatchArgs,

        /// Apply the visual patch
        #[arg(long)]
        with_patch: bool,

        /// Stop after extraction and version sync
        #[arg(long)]
        skip_build: bool,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Download { .. } => "download",
            Command::Extract { .. } => "extract",
            Command::PreparePatch { .. } => "prepare-patch",
            Command::Build => "build",
            Command::SyncVersion => "sync-version",
            Command::SanitizeManifest => "sanitize-manifest",
            Command::Locate { .. } => "locate",
            Command::Run { .. } => "run",
        }
    }
}

/// Download source options
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Installer image URL
    #[arg(long, env = "DMG_URL", value_name = "URL")]
    pub url: Option<String>,

    /// URL pattern with a {version} placeholder, filled from --dmg-version
    #[arg(long, env = "DMG_URL_TEMPLATE", value_name = "TEMPLATE")]
    pub url_template: Option<String>,

    /// Target version, substituted into the template and used to pick a cached image
    #[arg(long = "dmg-version", env = "DMG_VERSION", value_name = "VERSION")]
    pub target_version: Option<String>,

    /// Find the newest image through the landing page redirect
    #[arg(long, env = "DMG_AUTO_DETECT", value_parser = FalseyValueParser::new())]
    pub auto_detect: bool,

    /// Landing page used by --auto-detect
    #[arg(long, env = "DMG_LANDING_URL", default_value = DEFAULT_LANDING_URL, value_name = "URL")]
    pub landing_url: String,

    /// Download again even if the image is cached
    #[arg(long, env = "FORCE_DOWNLOAD", value_parser = FalseyValueParser::new())]
    pub force: bool,

    /// Download timeout in seconds
    #[arg(long, default_value_t = 600, value_name = "SECONDS")]
    pub timeout: u64,
}

impl SourceArgs {
    /// The URL source these options describe.
    ///
    /// An explicit URL wins, then the template (when a version is given), then
    /// auto-detection, then the built-in default URL.
    pub fn url_source(&self) -> UrlSource {
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty()) {
            return UrlSource::Static(url.clone());
        }
        if let (Some(template), Some(version)) = (&self.url_template, &self.target_version) {
            return UrlSource::Templated {
                template: template.clone(),
                version: version.clone(),
            };
        }
        if self.auto_detect {
            return UrlSource::AutoDetect {
                landing_url: self.landing_url.clone(),
            };
        }
        UrlSource::Static(DEFAULT_DMG_URL.to_string())
    }

    /// Fetcher settings
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            transfer_timeout: Duration::from_secs(self.timeout),
            ..FetchConfig::default()
        }
    }
}

/// Visual-patch options
#[derive(clap::Args, Debug, Clone)]
pub struct PatchArgs {
    /// Git ref of the patch module checked out in CI
    #[arg(long, env = "ZADARK_VERSION", value_name = "REF")]
    pub patch_version: Option<String>,
}

/// CI environment
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CiArgs {
    /// Running in CI: skip versions already released, pin the patch module
    #[arg(long, global = true, env = "CI", value_parser = FalseyValueParser::new())]
    pub ci: bool,

    /// Repository (owner/repo) whose releases are checked
    #[arg(long, global = true, env = "GITHUB_REPOSITORY", value_name = "OWNER/REPO")]
    pub github_repository: Option<String>,

    /// Token for the release API
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub github_token: Option<String>,

    /// File receiving key=value build facts
    #[arg(long, global = true, env = "GITHUB_OUTPUT", value_name = "FILE")]
    pub github_output: Option<PathBuf>,
}

impl From<&CiArgs> for CiContext {
    fn from(args: &CiArgs) -> Self {
        Self {
            enabled: args.ci,
            repository: args.github_repository.clone().filter(|r| !r.is_empty()),
            token: args.github_token.clone().filter(|t| !t.is_empty()),
            output_file: args.github_output.clone(),
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Print a parse failure and return the exit code for it.
    ///
    /// `--help` and `--version` exit 0; usage errors exit 1 like every other failure.
    pub fn report_parse_error(err: &clap::Error) -> i32 {
        let _ = err.print();
        if err.use_stderr() { 1 } else { 0 }
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        let source = match &self.command {
            Command::Download { source } | Command::Run { source, .. } => source,
            _ => return Ok(()),
        };
        if source.timeout == 0 {
            return Err("--timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
    layout: ProjectLayout,
    ci: CiContext,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
            layout: ProjectLayout::new(args.root.clone()),
            ci: CiContext::from(&args.ci),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Project layout
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// CI settings
    pub fn ci(&self) -> &CiContext {
        &self.ci
    }

    /// Patch ref to pin: only in CI
    pub fn pinned_patch_ref<'a>(&self, patch: &'a PatchArgs) -> Option<&'a str> {
        if self.ci.enabled {
            patch.patch_version.as_deref().filter(|r| !r.is_empty())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    fn source(args: &Args) -> &SourceArgs {
        match &args.command {
            Command::Download { source } | Command::Run { source, .. } => source,
            other => panic!("no source for {}", other.name()),
        }
    }

    #[test]
    fn test_url_source_precedence() {
        let args = parse(&[
            "dmg_repack",
            "download",
            "--url",
            "https://h/a.dmg",
            "--url-template",
            "https://h/{version}.dmg",
            "--dmg-version",
            "1.2.3",
        ]);
        assert_eq!(
            source(&args).url_source(),
            UrlSource::Static("https://h/a.dmg".to_string())
        );

        let args = parse(&[
            "dmg_repack",
            "download",
            "--url-template",
            "https://h/{version}.dmg",
            "--dmg-version",
            "1.2.3",
        ]);
        assert_eq!(
            source(&args).url_source(),
            UrlSource::Templated {
                template: "https://h/{version}.dmg".to_string(),
                version: "1.2.3".to_string()
            }
        );

        let args = parse(&["dmg_repack", "download", "--auto-detect", "--landing-url", "https://h/"]);
        assert_eq!(
            source(&args).url_source(),
            UrlSource::AutoDetect {
                landing_url: "https://h/".to_string()
            }
        );
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = parse(&["dmg_repack", "build", "--root", "/work", "--quiet"]);
        assert_eq!(args.root, PathBuf::from("/work"));
        assert!(args.quiet);
        assert_eq!(args.command.name(), "build");
    }

    #[test]
    fn test_parse_error_exit_codes() {
        let help = Args::try_parse_from(["dmg_repack", "--help"]).unwrap_err();
        assert!(!help.use_stderr());
        let version = Args::try_parse_from(["dmg_repack", "--version"]).unwrap_err();
        assert!(!version.use_stderr());

        let usage = Args::try_parse_from(["dmg_repack", "repack-everything"]).unwrap_err();
        assert_eq!(Args::report_parse_error(&usage), 1);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let args = parse(&["dmg_repack", "download", "--timeout", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_patch_ref_only_pinned_in_ci() {
        let args = parse(&[
            "dmg_repack",
            "prepare-patch",
            "--patch-version",
            "v1.0.0",
        ]);
        let Command::PreparePatch { patch, .. } = &args.command else {
            panic!("wrong command");
        };

        let mut config = RuntimeConfig::from(&args);
        config.ci.enabled = false;
        assert_eq!(config.pinned_patch_ref(patch), None);
        config.ci.enabled = true;
        assert_eq!(config.pinned_patch_ref(patch), Some("v1.0.0"));
    }
}
