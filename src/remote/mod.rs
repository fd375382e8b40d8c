//! Narrow capability interface to the hosting platform, plus the GitHub implementation.
//!
//! Everything the miner needs from the network goes through [`RemoteApi`], so tests can swap the
//! platform for an in-memory fake.

use std::io::Read;

use anyhow::Result;

use crate::types::{RepositoryDescriptor, SearchQuery, SearchWindow, TreeEntry};

mod github;
mod http_client;
mod wire;

pub use github::GitHubClient;
pub use http_client::with_retries;

/// One page of repository search results.
#[derive(Clone, Debug, Default)]
pub struct SearchPage {
    /// Total matches the platform reports for the query (may exceed what it will enumerate).
    pub total_count: u64,
    /// Ordered by popularity descending.
    pub items: Vec<RepositoryDescriptor>,
}

/// Outcome of a tree request. Truncation is an expected result, not an error.
#[derive(Clone, Debug)]
pub enum TreeResult {
    Complete(Vec<TreeEntry>),
    /// The listing exceeded the platform's size limit. `partial` holds whatever was returned.
    Truncated { partial: Vec<TreeEntry> },
}

/// Byte stream of one raw file.
pub type BlobStream = Box<dyn Read + Send>;

pub trait RemoteApi: Send + Sync {
    /// Page `page` (1-based) of the repository search for `query` restricted to `window`,
    /// sorted by popularity descending, at most `per_page` items.
    fn search_repositories(
        &self,
        query: &SearchQuery,
        window: &SearchWindow,
        page: u32,
        per_page: usize,
    ) -> Result<SearchPage>;

    /// Tree listing of `reference` (branch name or tree SHA) in `full_name`.
    /// Entry paths are relative to the listed tree.
    fn get_tree(&self, full_name: &str, reference: &str, recursive: bool) -> Result<TreeResult>;

    /// Open a streaming GET of a raw file URL.
    fn open_blob_stream(&self, url: &str) -> Result<BlobStream>;

    /// Number of code-search hits for files with `extension` in `full_name`, optionally narrowed
    /// by extra query terms. Only used by the match-ratio filter.
    fn count_code_matches(
        &self,
        full_name: &str,
        extension: &str,
        extra_terms: Option<&str>,
    ) -> Result<u64>;
}
