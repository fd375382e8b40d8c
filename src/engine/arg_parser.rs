use clap::Parser;
use std::path::PathBuf;

/// Mine popular GitHub repositories for source files with a given extension.
#[derive(Clone, Parser)]
#[command(name = "repominer")]
#[command(
    about = "Search popular repositories and download every file with a given extension; use --dry-run to only count."
)]
pub struct Cli {
    /// Output root; one sub-directory per repository. Default: `mined`.
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Config file. Default: `.repominer.toml` in the current directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Language qualifier for the repository search (e.g. Java). Empty string disables it.
    #[arg(long, short = 'L')]
    pub language: Option<String>,

    /// Free-text terms added to every search (e.g. "NOT android").
    #[arg(long, short = 'q')]
    pub exclude_query: Option<String>,

    /// Keep only files whose path ends with this suffix (e.g. .java). Empty string keeps everything.
    #[arg(long, short = 'x')]
    pub extension: Option<String>,

    /// Minimum star count of searched repositories.
    #[arg(long, short = 's', value_parser = clap::value_parser!(u64))]
    pub min_stars: Option<u64>,

    /// Stop after accepting this many repositories.
    #[arg(long, short = 'n', value_parser = clap::value_parser!(usize))]
    pub max_repos: Option<usize>,

    /// Concurrent download workers (capped by the open-file limit).
    #[arg(long, short = 't', value_parser = clap::value_parser!(usize))]
    pub threads: Option<usize>,

    /// Download queue capacity. Default: derived from the worker count.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub queue_capacity: Option<usize>,

    /// Skip repositories where fewer than this share (0.0-1.0) of matching files survive the exclusion terms.
    #[arg(long, short = 'r', value_parser = parse_ratio)]
    pub min_match_ratio: Option<f64>,

    /// Margin added to the lowest star count when narrowing the search window.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub stars_buffer: Option<u64>,

    /// REST API base url (GitHub Enterprise: `https://host/api/v3`).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Host serving raw file content.
    #[arg(long)]
    pub raw_host: Option<String>,

    /// Search and walk trees but download nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// List each failed download. If there are more than the threshold, write them to repominer.failures instead.
    #[arg(long, short = 'l', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub list: Option<bool>,

    /// Verbose output with a download counter.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Prompt for a GitHub token when none is found in the environment, .env or ~/.github.
    #[arg(long)]
    pub ask_token: bool,
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is not between 0.0 and 1.0"))
    }
}
