//! Public and internal types for the repominer API and pipeline.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::config::{Defaults, PlatformLimits};

/// One repository returned by the search endpoint. Immutable once obtained.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepositoryDescriptor {
    /// Unique `owner/name`.
    pub full_name: String,
    pub default_branch: String,
    /// Star (watcher) count; used both for search ordering and window derivation.
    pub popularity_score: u64,
}

impl RepositoryDescriptor {
    /// Owner half of `owner/name` (whole name when there is no slash).
    pub fn owner(&self) -> &str {
        self.full_name
            .split_once('/')
            .map_or(self.full_name.as_str(), |(o, _)| o)
    }
}

/// Popularity range one search query is restricted to.
///
/// Never mutated: [`SearchWindow::narrowed`] derives the next window from the last score observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    pub lower_bound: u64,
    /// `None` = unbounded above (the first query of a crawl).
    pub upper_bound: Option<u64>,
}

impl SearchWindow {
    pub fn unbounded(lower_bound: u64) -> Self {
        Self {
            lower_bound,
            upper_bound: None,
        }
    }

    /// Qualifier for the search `q` parameter: `stars:>=50` or `stars:50..120`.
    pub fn qualifier(&self) -> String {
        match self.upper_bound {
            None => format!("stars:>={}", self.lower_bound),
            Some(upper) => format!("stars:{}..{}", self.lower_bound, upper),
        }
    }

    /// True if `score` falls inside the window (inclusive on both ends).
    pub fn contains(&self, score: u64) -> bool {
        score >= self.lower_bound && self.upper_bound.is_none_or(|u| score <= u)
    }

    /// Next window after a capped query whose lowest-ranked entry had `last_score`.
    ///
    /// Upper bound becomes `last_score + buffer`, clamped so it never exceeds the current upper
    /// bound. When the clamp leaves it unchanged the window could not shrink (more than a full
    /// result cap shares that score band), so the bound is forced one below the current one.
    /// Returns `None` when the derived window is empty.
    pub fn narrowed(&self, last_score: u64, buffer: u64) -> Option<SearchWindow> {
        let widened = last_score.saturating_add(buffer);
        let upper = match self.upper_bound {
            None => widened,
            Some(current) if widened < current => widened,
            Some(current) => current.checked_sub(1)?,
        };
        (upper >= self.lower_bound).then_some(SearchWindow {
            lower_bound: self.lower_bound,
            upper_bound: Some(upper),
        })
    }
}

impl fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper_bound {
            None => write!(f, "[{}, ∞)", self.lower_bound),
            Some(u) => write!(f, "[{}, {}]", self.lower_bound, u),
        }
    }
}

/// Static part of a repository search: everything except the popularity window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    /// Language qualifier, e.g. `Java`. Empty = no language filter.
    pub language: String,
    /// Free-text terms, e.g. `NOT android`.
    pub exclude_query: String,
    /// Lower popularity bound shared by every window of the crawl.
    pub min_stars: u64,
}

impl SearchQuery {
    /// Full `q` value for `window`: exclusion terms, language and star range joined by spaces.
    pub fn render(&self, window: &SearchWindow) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if !self.exclude_query.trim().is_empty() {
            parts.push(self.exclude_query.trim().to_string());
        }
        if !self.language.trim().is_empty() {
            parts.push(format!("language:{}", self.language.trim()));
        }
        parts.push(window.qualifier());
        parts.join(" ")
    }
}

/// Kind of a tree entry. Git reports `blob` and `tree`; submodule `commit` entries map to `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Subtree,
    Other,
}

impl EntryKind {
    pub fn from_git_type(kind: &str) -> Self {
        match kind {
            "blob" => EntryKind::File,
            "tree" => EntryKind::Subtree,
            _ => EntryKind::Other,
        }
    }
}

/// One node of a tree listing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TreeEntry {
    /// Path relative to the repository root (walker joins per-level names onto their parent).
    pub relative_path: String,
    pub kind: EntryKind,
    /// Blob or subtree SHA, usable for a follow-up tree request.
    pub content_reference: String,
    /// API URL reported by the platform. Not trusted for downloads.
    pub blob_url: Option<String>,
}

/// One file to download. Created by the walker + path allocator; consumed exactly once by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileJob {
    pub repository_full_name: String,
    pub branch: String,
    pub relative_path: String,
    pub download_url: String,
    pub destination_path: PathBuf,
}

/// Counts reported at the end of a run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Repositories accepted by the search cursor.
    pub repositories_accepted: usize,
    /// Repositories whose tree was walked (possibly partially).
    pub repositories_walked: usize,
    /// Repositories skipped by the match-ratio filter.
    pub repositories_filtered: usize,
    /// Repositories with at least one tree or subtree fetch failure.
    pub repositories_with_tree_errors: usize,
    pub files_matched: usize,
    pub files_downloaded: usize,
    pub files_failed: usize,
    pub bytes_written: u64,
    /// `(destination, error)` for each failed download.
    pub failures: Vec<(PathBuf, String)>,
    pub elapsed: Duration,
}

/// Lib-only options for [`mine`](crate::mine). Only the fields that apply when using the crate (no CLI).
#[derive(Clone, Debug)]
pub struct MineOpts {
    pub output_root: PathBuf,
    pub language: String,
    pub exclude_query: String,
    /// Only files whose path ends with this suffix are kept. Empty keeps every file.
    pub extension: String,
    pub min_stars: u64,
    pub max_repos: usize,
    pub max_download_threads: usize,
    /// Bounded job queue size. When None, derived from the worker count.
    pub queue_capacity: Option<usize>,
    /// Skip repositories whose exclusion-filtered share of matching files is below this ratio.
    pub min_match_ratio: Option<f64>,
    /// Walk and count only; download nothing.
    pub dry_run: bool,
    /// Host serving raw file content.
    pub raw_host: String,
}

impl Default for MineOpts {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(Defaults::OUTPUT),
            language: Defaults::LANGUAGE.to_string(),
            exclude_query: Defaults::EXCLUDE_QUERY.to_string(),
            extension: Defaults::EXTENSION.to_string(),
            min_stars: Defaults::MIN_STARS,
            max_repos: Defaults::MAX_REPOS,
            max_download_threads: Defaults::MAX_DOWNLOAD_THREADS,
            queue_capacity: None,
            min_match_ratio: None,
            dry_run: false,
            raw_host: PlatformLimits::RAW_HOST.to_string(),
        }
    }
}

impl From<&MineOpts> for Opts {
    fn from(o: &MineOpts) -> Self {
        Opts {
            output_root: o.output_root.clone(),
            language: o.language.clone(),
            exclude_query: o.exclude_query.clone(),
            extension: o.extension.clone(),
            min_stars: o.min_stars,
            max_repos: o.max_repos,
            max_download_threads: o.max_download_threads,
            queue_capacity: o.queue_capacity,
            min_match_ratio: o.min_match_ratio,
            dry_run: o.dry_run,
            raw_host: o.raw_host.clone(),
            ..Opts::default()
        }
    }
}

/// Full options (CLI and lib). Use [`MineOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Root directory that receives one sub-directory per repository.
    pub output_root: PathBuf,
    /// Language qualifier for the repository search.
    pub language: String,
    /// Free-text exclusion terms added to every search (e.g. `NOT android`).
    pub exclude_query: String,
    /// File suffix filter (e.g. `.java`).
    pub extension: String,
    /// Minimum popularity score.
    pub min_stars: u64,
    /// Stop accepting repositories after this many.
    pub max_repos: usize,
    /// Download worker count (capped by FD limit at runtime).
    pub max_download_threads: usize,
    /// Job queue capacity. When None, workers × per-worker default.
    pub queue_capacity: Option<usize>,
    /// Optional match-ratio filter (0.0–1.0).
    pub min_match_ratio: Option<f64>,
    /// Margin added to the last score when narrowing a search window.
    pub stars_buffer: u64,
    /// Walk and count only; download nothing.
    pub dry_run: bool,
    /// Show debug logs and a download counter.
    pub verbose: bool,
    /// List failed downloads at the end. Above LIST_THRESHOLD, write to the failures file instead of stdout.
    pub list_failures: bool,
    /// REST API base url.
    pub api_url: String,
    /// Host serving raw file content.
    pub raw_host: String,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(Defaults::OUTPUT),
            language: Defaults::LANGUAGE.to_string(),
            exclude_query: Defaults::EXCLUDE_QUERY.to_string(),
            extension: Defaults::EXTENSION.to_string(),
            min_stars: Defaults::MIN_STARS,
            max_repos: Defaults::MAX_REPOS,
            max_download_threads: Defaults::MAX_DOWNLOAD_THREADS,
            queue_capacity: None,
            min_match_ratio: None,
            stars_buffer: Defaults::STARS_BUFFER,
            dry_run: false,
            verbose: false,
            list_failures: false,
            api_url: PlatformLimits::API_URL.to_string(),
            raw_host: PlatformLimits::RAW_HOST.to_string(),
        }
    }
}

impl Opts {
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            language: self.language.clone(),
            exclude_query: self.exclude_query.clone(),
            min_stars: self.min_stars,
        }
    }
}
