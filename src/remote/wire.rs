//! JSON shapes of the GitHub REST responses we read. Only the fields we use.

use serde::Deserialize;

use crate::types::{EntryKind, RepositoryDescriptor, TreeEntry};

#[derive(Debug, Deserialize)]
pub(super) struct SearchReposResponse {
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<RepoItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RepoItem {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
}

impl From<RepoItem> for RepositoryDescriptor {
    fn from(r: RepoItem) -> Self {
        RepositoryDescriptor {
            full_name: r.full_name,
            default_branch: r.default_branch.unwrap_or_else(|| "master".to_string()),
            popularity_score: r.stargazers_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TreeResponse {
    #[serde(default)]
    pub tree: Vec<TreeItem>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct TreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<TreeItem> for TreeEntry {
    fn from(t: TreeItem) -> Self {
        TreeEntry {
            relative_path: t.path,
            kind: EntryKind::from_git_type(&t.kind),
            content_reference: t.sha,
            blob_url: t.url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CodeSearchResponse {
    pub total_count: u64,
}

/// Body of a 4xx response.
#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub message: String,
}
