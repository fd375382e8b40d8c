//! Repominer: harvest source files from popular GitHub repositories.
//!
//! Three stages run concurrently: a search cursor that gets past the platform's result cap by
//! narrowing a star window, a tree walker that falls back to per-directory listings when a
//! recursive tree is truncated, and a bounded pool of download workers.

pub mod engine;
pub mod pipeline;
pub mod remote;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::sync::Arc;

pub use pipeline::{CancelFlag, DiscoveryAborted};
pub use remote::{GitHubClient, RemoteApi};

/// Result alias used by public repominer API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: crawl with `opts` against `api` and return the run summary.
///
/// Pass a [`GitHubClient`] for the real platform or your own [`RemoteApi`] implementation.
/// Discovery runs on the calling thread; downloads run on `opts.max_download_threads` workers.
/// Returns once every queued download has finished. If search fails mid-run the error wraps a
/// [`DiscoveryAborted`] holding the partial summary.
///
/// ```ignore
/// let api = Arc::new(repominer::GitHubClient::new(std::env::var("GITHUB_TOKEN").ok())?);
/// let opts = MineOpts { output_root: "out".into(), max_repos: 10, ..Default::default() };
/// let summary = repominer::mine(api, &opts)?;
/// ```
pub fn mine(api: Arc<dyn RemoteApi>, opts: &MineOpts) -> Result<RunSummary> {
    mine_with_cancel(api, opts, &CancelFlag::new())
}

/// Same as [`mine`], stopping discovery after the current repository once `cancel` is set.
pub fn mine_with_cancel(
    api: Arc<dyn RemoteApi>,
    opts: &MineOpts,
    cancel: &CancelFlag,
) -> Result<RunSummary> {
    let opts = Opts::from(opts);
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);
    pipeline::run_pipeline(api, &opts, cancel)
}
