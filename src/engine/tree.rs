//! Collect the matching files of one repository from its tree listings.
//!
//! One recursive request is enough for most repositories. When the platform truncates it, the
//! walker lists the root non-recursively and descends into every subtree with one request per
//! directory. Failures there only cost the affected subtree.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::remote::{RemoteApi, TreeResult};
use crate::types::{EntryKind, RepositoryDescriptor, TreeEntry};

use super::tools::{join_tree_path, matches_extension};

/// A subtree (or the whole repository, `path == ""`) that could not be listed.
#[derive(Clone, Debug)]
pub struct TreeFetchFailure {
    pub path: String,
    pub reference: String,
    pub error: String,
}

/// Result of walking one repository.
#[derive(Clone, Debug, Default)]
pub struct TreeWalk {
    /// Matching file entries, unique by path, paths relative to the repository root.
    pub entries: Vec<TreeEntry>,
    /// Subtrees that failed to list. Non-empty means `entries` may be partial.
    pub failures: Vec<TreeFetchFailure>,
    /// True if the recursive listing was truncated and the manual fallback ran.
    pub used_fallback: bool,
    /// Per-level listings that were themselves truncated (entries beyond the limit are missing).
    pub truncated_levels: Vec<String>,
}

impl TreeWalk {
    /// True if the root listing failed and nothing could be collected.
    pub fn is_skipped(&self) -> bool {
        self.entries.is_empty() && self.failures.iter().any(|f| f.path.is_empty())
    }
}

pub struct TreeWalker<'a, A: RemoteApi + ?Sized> {
    api: &'a A,
    extension: &'a str,
}

impl<'a, A: RemoteApi + ?Sized> TreeWalker<'a, A> {
    pub fn new(api: &'a A, extension: &'a str) -> Self {
        Self { api, extension }
    }

    /// All file entries of `repo` at `branch` whose path ends with the configured extension.
    pub fn files_in_tree(&self, repo: &RepositoryDescriptor, branch: &str) -> TreeWalk {
        let mut walk = TreeWalk::default();
        let mut seen = HashSet::new();

        match self.api.get_tree(&repo.full_name, branch, true) {
            Ok(TreeResult::Complete(entries)) => {
                for entry in entries {
                    self.keep_if_match(entry, &mut walk, &mut seen);
                }
            }
            Ok(TreeResult::Truncated { .. }) => {
                info!(
                    "Recursive tree of {}@{} was truncated; listing it level by level",
                    repo.full_name, branch
                );
                walk.used_fallback = true;
                self.walk_level(repo, branch, "", &mut walk, &mut seen);
            }
            Err(e) => {
                warn!("Tree of {}@{}: {:#}", repo.full_name, branch, e);
                walk.failures.push(TreeFetchFailure {
                    path: String::new(),
                    reference: branch.to_string(),
                    error: format!("{:#}", e),
                });
            }
        }

        debug!(
            "{}: {} matching files ({} subtree failures)",
            repo.full_name,
            walk.entries.len(),
            walk.failures.len()
        );
        walk
    }

    /// Manual traversal of one directory level. Iterative so deep trees do not grow the stack.
    fn walk_level(
        &self,
        repo: &RepositoryDescriptor,
        root_reference: &str,
        root_path: &str,
        walk: &mut TreeWalk,
        seen: &mut HashSet<String>,
    ) {
        let mut pending = vec![(root_path.to_string(), root_reference.to_string())];
        while let Some((dir, reference)) = pending.pop() {
            let entries = match self.api.get_tree(&repo.full_name, &reference, false) {
                Ok(TreeResult::Complete(entries)) => entries,
                Ok(TreeResult::Truncated { partial }) => {
                    // A single level is never split further: what the platform returned is all we get.
                    warn!(
                        "Listing of {}:{} is truncated even without recursion; files beyond the limit are skipped",
                        repo.full_name,
                        display_dir(&dir)
                    );
                    walk.truncated_levels.push(dir.clone());
                    partial
                }
                Err(e) => {
                    warn!(
                        "Subtree {}:{} could not be listed: {:#}",
                        repo.full_name,
                        display_dir(&dir),
                        e
                    );
                    walk.failures.push(TreeFetchFailure {
                        path: dir,
                        reference,
                        error: format!("{:#}", e),
                    });
                    continue;
                }
            };
            for mut entry in entries {
                entry.relative_path = join_tree_path(&dir, &entry.relative_path);
                match entry.kind {
                    EntryKind::Subtree => {
                        pending.push((entry.relative_path, entry.content_reference));
                    }
                    _ => self.keep_if_match(entry, walk, seen),
                }
            }
        }
    }

    fn keep_if_match(&self, entry: TreeEntry, walk: &mut TreeWalk, seen: &mut HashSet<String>) {
        if entry.kind == EntryKind::File
            && matches_extension(&entry.relative_path, self.extension)
            && seen.insert(entry.relative_path.clone())
        {
            walk.entries.push(entry);
        }
    }
}

fn display_dir(dir: &str) -> &str {
    if dir.is_empty() { "/" } else { dir }
}
