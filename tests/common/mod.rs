//! In-memory platform used by the integration tests.

#![allow(dead_code)]

use anyhow::{Result, anyhow, bail};
use repominer::remote::{BlobStream, RemoteApi, SearchPage, TreeResult};
use repominer::{EntryKind, RepositoryDescriptor, SearchQuery, SearchWindow, TreeEntry};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;

pub const RAW_HOST: &str = "https://raw.example";

/// Canned tree response for one `(repository, reference, recursive)` request.
#[derive(Clone)]
pub enum FakeTree {
    Complete(Vec<TreeEntry>),
    Truncated(Vec<TreeEntry>),
    Fail,
}

/// Fake platform: search honours windows, the result cap and paging like the real one.
pub struct FakeApi {
    /// Sorted by score descending, ties by name.
    repos: Vec<RepositoryDescriptor>,
    pub result_cap: usize,
    pub fail_search_page: Option<u32>,
    trees: HashMap<(String, String, bool), FakeTree>,
    blobs: HashMap<String, Vec<u8>>,
    /// Bodies that break off with a connection reset after these bytes.
    broken_blobs: HashMap<String, Vec<u8>>,
    code_counts: HashMap<(String, bool), u64>,
    /// Every search request as (window, page).
    pub search_log: Mutex<Vec<(SearchWindow, u32)>>,
    pub tree_log: Mutex<Vec<(String, String, bool)>>,
    pub code_search_log: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(mut repos: Vec<RepositoryDescriptor>) -> Self {
        repos.sort_by(|a, b| {
            b.popularity_score
                .cmp(&a.popularity_score)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        Self {
            repos,
            result_cap: 1000,
            fail_search_page: None,
            trees: HashMap::new(),
            blobs: HashMap::new(),
            broken_blobs: HashMap::new(),
            code_counts: HashMap::new(),
            search_log: Mutex::new(Vec::new()),
            tree_log: Mutex::new(Vec::new()),
            code_search_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tree(
        mut self,
        full_name: &str,
        reference: &str,
        recursive: bool,
        tree: FakeTree,
    ) -> Self {
        self.trees.insert(
            (full_name.to_string(), reference.to_string(), recursive),
            tree,
        );
        self
    }

    pub fn with_blob(mut self, url: &str, body: &[u8]) -> Self {
        self.blobs.insert(url.to_string(), body.to_vec());
        self
    }

    /// Body that yields `prefix` and then fails mid-transfer.
    pub fn with_broken_blob(mut self, url: &str, prefix: &[u8]) -> Self {
        self.broken_blobs.insert(url.to_string(), prefix.to_vec());
        self
    }

    /// `filtered`: count with the exclusion terms applied.
    pub fn with_code_count(mut self, full_name: &str, filtered: bool, count: u64) -> Self {
        self.code_counts.insert((full_name.to_string(), filtered), count);
        self
    }

    pub fn windows(&self) -> Vec<SearchWindow> {
        let mut out: Vec<SearchWindow> = Vec::new();
        for (w, _) in self.search_log.lock().unwrap().iter() {
            if out.last() != Some(w) {
                out.push(*w);
            }
        }
        out
    }

    pub fn search_requests(&self) -> usize {
        self.search_log.lock().unwrap().len()
    }
}

impl RemoteApi for FakeApi {
    fn search_repositories(
        &self,
        query: &SearchQuery,
        window: &SearchWindow,
        page: u32,
        per_page: usize,
    ) -> Result<SearchPage> {
        self.search_log.lock().unwrap().push((*window, page));
        if self.fail_search_page == Some(page) {
            bail!("search unavailable");
        }
        let matching: Vec<&RepositoryDescriptor> = self
            .repos
            .iter()
            .filter(|r| {
                r.popularity_score >= query.min_stars && window.contains(r.popularity_score)
            })
            .collect();
        let start = (page as usize - 1) * per_page;
        let end = (start + per_page).min(matching.len()).min(self.result_cap);
        let items = if start < end {
            matching[start..end].iter().map(|r| (*r).clone()).collect()
        } else {
            Vec::new()
        };
        Ok(SearchPage {
            total_count: matching.len() as u64,
            items,
        })
    }

    fn get_tree(&self, full_name: &str, reference: &str, recursive: bool) -> Result<TreeResult> {
        let key = (full_name.to_string(), reference.to_string(), recursive);
        self.tree_log.lock().unwrap().push(key.clone());
        match self.trees.get(&key) {
            Some(FakeTree::Complete(e)) => Ok(TreeResult::Complete(e.clone())),
            Some(FakeTree::Truncated(e)) => Ok(TreeResult::Truncated { partial: e.clone() }),
            Some(FakeTree::Fail) | None => {
                Err(anyhow!("tree {}@{} not found", full_name, reference))
            }
        }
    }

    fn open_blob_stream(&self, url: &str) -> Result<BlobStream> {
        if let Some(prefix) = self.broken_blobs.get(url) {
            return Ok(Box::new(BrokenBody {
                prefix: Cursor::new(prefix.clone()),
            }));
        }
        match self.blobs.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(anyhow!("404 for {}", url)),
        }
    }

    fn count_code_matches(
        &self,
        full_name: &str,
        _extension: &str,
        extra_terms: Option<&str>,
    ) -> Result<u64> {
        self.code_search_log
            .lock()
            .unwrap()
            .push(full_name.to_string());
        self.code_counts
            .get(&(full_name.to_string(), extra_terms.is_some()))
            .copied()
            .ok_or_else(|| anyhow!("code search failed for {}", full_name))
    }
}

/// Reader that returns its prefix, then a connection reset.
struct BrokenBody {
    prefix: Cursor<Vec<u8>>,
}

impl Read for BrokenBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.prefix.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset mid-body",
            )),
            n => Ok(n),
        }
    }
}

pub fn repo(full_name: &str, score: u64) -> RepositoryDescriptor {
    RepositoryDescriptor {
        full_name: full_name.to_string(),
        default_branch: "main".to_string(),
        popularity_score: score,
    }
}

pub fn file(path: &str) -> TreeEntry {
    TreeEntry {
        relative_path: path.to_string(),
        kind: EntryKind::File,
        content_reference: format!("blob-{path}"),
        blob_url: None,
    }
}

pub fn dir(path: &str, sha: &str) -> TreeEntry {
    TreeEntry {
        relative_path: path.to_string(),
        kind: EntryKind::Subtree,
        content_reference: sha.to_string(),
        blob_url: None,
    }
}

pub fn raw_url(full_name: &str, path: &str) -> String {
    format!("{RAW_HOST}/{full_name}/main/{path}")
}
