//! Application configuration constants.
//! Defaults, platform limits and tuning in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    failures_filename: String,
    user_agent: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                failures_filename: format!("{pkg}.failures"),
                user_agent: format!("{pkg}/{}", env!("CARGO_PKG_VERSION")),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// File inside the output root that receives the failure list when it is too long for stdout.
    pub fn failures_filename(&self) -> &str {
        &self.failures_filename
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

// ---- Defaults for collaborator-supplied options ----

/// Default option values (CLI, config file and [`MineOpts`](crate::MineOpts)).
pub struct Defaults;

impl Defaults {
    pub const OUTPUT: &'static str = "mined";
    pub const LANGUAGE: &'static str = "Java";
    pub const EXTENSION: &'static str = ".java";
    /// Keeps Android projects out of a Java crawl.
    pub const EXCLUDE_QUERY: &'static str = "NOT android";
    pub const MIN_STARS: u64 = 50;
    pub const MAX_REPOS: usize = 5000;
    pub const MAX_DOWNLOAD_THREADS: usize = 20;
    /// Added to the last score of a capped window so repositories that gained stars mid-crawl are not lost.
    pub const STARS_BUFFER: u64 = 10;
}

// ---- Remote platform ----

/// Limits and endpoints of the hosting platform.
pub struct PlatformLimits;

impl PlatformLimits {
    /// Search never enumerates past this many matches per distinct query.
    pub const SEARCH_RESULT_CAP: usize = 1000;
    /// Max results per search page.
    pub const PAGE_SIZE: usize = 100;
    pub const API_URL: &'static str = "https://api.github.com";
    pub const RAW_HOST: &'static str = "https://raw.githubusercontent.com";
}

/// Retry policy for transient HTTP failures.
pub struct RetryConsts;

impl RetryConsts {
    pub const ATTEMPTS: usize = 3;
    /// First backoff; doubles per attempt.
    pub const BASE_BACKOFF_MS: u64 = 200;
    /// Connect + read timeout for a single request (seconds).
    pub const TIMEOUT_SECS: u64 = 60;
}

// ---- Download queue ----

/// Job queue sizing for the download dispatcher.
pub struct DownloadQueueCap;

impl DownloadQueueCap {
    /// Queue slots per worker when no capacity is configured.
    pub const PER_WORKER: usize = 50;
    /// Lower bound so a single worker still gets some slack.
    pub const MIN: usize = 100;

    /// Capacity for `workers` when the caller did not set one.
    pub fn for_workers(workers: usize) -> usize {
        (workers * Self::PER_WORKER).max(Self::MIN)
    }
}

// ---- Progress ----

pub struct ProgressConsts;

impl ProgressConsts {
    /// Summary log every N completed downloads when no progress bar is shown.
    pub const LOG_EVERY: usize = 500;
}

// ---- Failure list output ----

/// When --list is set and failures exceed this, write them to the failures file instead of stdout.
pub const LIST_THRESHOLD: usize = 100;
