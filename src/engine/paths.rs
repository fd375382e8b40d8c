//! Destination paths for downloaded files.
//!
//! Layout: `<output_root>/<sanitized owner_repo>/<sanitized relative path>`. Allocation is pure;
//! directories are created by the download workers (create-if-absent).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::warn;

use super::tools::{sanitize_component, sanitize_full_name};

/// Maps `(repository, relative path)` to a unique destination within one run.
///
/// Sanitization can fold distinct names together (`a/b` and `a_b` both become `a_b`). The allocator
/// remembers every root and file it handed out and appends `~2`, `~3`, … to the later claimant,
/// so two distinct pairs never share a destination. The same pair always gets the same answer.
///
/// Keys are compared case-folded, so `Foo.java` and `foo.java` stay apart on case-insensitive
/// filesystems too (the later one becomes `foo~2.java` everywhere).
#[derive(Debug)]
pub struct PathAllocator {
    output_root: PathBuf,
    /// Case-folded root dir → full name that owns it.
    roots: HashMap<String, String>,
    /// Full name → its root dir.
    root_of: HashMap<String, PathBuf>,
    /// Case-folded destination → (full name, relative path) that owns it.
    claimed: HashMap<String, (String, String)>,
}

impl PathAllocator {
    pub fn new(output_root: &Path) -> Self {
        Self {
            output_root: output_root.to_path_buf(),
            roots: HashMap::new(),
            root_of: HashMap::new(),
            claimed: HashMap::new(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Root directory for `full_name`, claiming a disambiguated one on collision.
    pub fn repository_root(&mut self, full_name: &str) -> PathBuf {
        if let Some(root) = self.root_of.get(full_name) {
            return root.clone();
        }
        let base = sanitize_full_name(full_name);
        let mut n = 1_usize;
        let root = loop {
            let candidate = self.output_root.join(with_suffix(&base, n));
            match self.roots.get(&fold_case(&candidate)) {
                None => break candidate,
                Some(owner) => {
                    if n == 1 {
                        warn!(
                            "{} and {} map to the same directory; using a suffixed name",
                            owner, full_name
                        );
                    }
                    n += 1;
                }
            }
        };
        self.roots.insert(fold_case(&root), full_name.to_string());
        self.root_of.insert(full_name.to_string(), root.clone());
        root
    }

    /// Destination for `relative_path` (tree path, `/`-separated) inside `full_name`.
    pub fn allocate(&mut self, full_name: &str, relative_path: &str) -> PathBuf {
        let root = self.repository_root(full_name);
        let components: Vec<String> = relative_path
            .split('/')
            .filter(|c| !c.is_empty())
            .map(sanitize_component)
            .collect();
        let (file_name, dirs) = match components.split_last() {
            Some((last, dirs)) => (last.clone(), dirs),
            None => (sanitize_component(""), &[][..]),
        };
        let dir = dirs.iter().fold(root, |acc, c| acc.join(c));

        let owner = (full_name.to_string(), relative_path.to_string());
        let mut n = 1_usize;
        loop {
            let candidate = dir.join(file_with_suffix(&file_name, n));
            let key = fold_case(&candidate);
            match self.claimed.get(&key) {
                Some(existing) if *existing == owner => return candidate,
                Some(_) => n += 1,
                None => {
                    self.claimed.insert(key, owner);
                    return candidate;
                }
            }
        }
    }

    /// Number of distinct destinations handed out so far.
    pub fn allocated(&self) -> usize {
        self.claimed.len()
    }
}

fn fold_case(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

fn with_suffix(name: &str, n: usize) -> String {
    if n == 1 {
        name.to_string()
    } else {
        format!("{name}~{n}")
    }
}

/// `Foo.java` → `Foo~2.java`; the extension stays last so the file still matches its filter.
fn file_with_suffix(name: &str, n: usize) -> String {
    if n == 1 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}~{n}.{ext}"),
        _ => format!("{name}~{n}"),
    }
}
