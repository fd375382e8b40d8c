//! Path, filter and URL utilities

use anyhow::{Context, Result};
use reqwest::Url;

/// Characters that are unsafe in a single file or directory name on common filesystems.
const UNSAFE_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Substitute for every unsafe character.
pub const SAFE_SUBSTITUTE: char = '_';

/// True if `path` passes the extension filter. Plain suffix match; an empty filter keeps everything.
pub fn matches_extension(path: &str, extension: &str) -> bool {
    extension.is_empty() || path.ends_with(extension)
}

/// Make one path component safe: unsafe and control characters become `_`,
/// and the special names `.`/`..`/empty become underscores so they cannot climb out of the root.
pub fn sanitize_component(name: &str) -> String {
    match name {
        "" => SAFE_SUBSTITUTE.to_string(),
        "." | ".." => SAFE_SUBSTITUTE.to_string().repeat(name.len()),
        _ => name
            .chars()
            .map(|c| {
                if UNSAFE_NAME_CHARS.contains(&c) || c.is_control() {
                    SAFE_SUBSTITUTE
                } else {
                    c
                }
            })
            .collect(),
    }
}

/// Per-repository directory name: `owner/name` → `owner_name`.
pub fn sanitize_full_name(full_name: &str) -> String {
    sanitize_component(full_name)
}

/// Join a per-level tree entry name onto its parent path (`""` parent = repository root).
pub fn join_tree_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// `<raw_host>/<owner>/<repo>/<branch>/<relative_path>`, every segment percent-encoded.
///
/// Built from parts rather than trusting the URL field of a tree entry, which does not point
/// at raw content.
pub fn raw_content_url(
    raw_host: &str,
    full_name: &str,
    branch: &str,
    relative_path: &str,
) -> Result<String> {
    let mut url = Url::parse(raw_host).with_context(|| format!("parse raw host {raw_host}"))?;
    {
        let mut segs = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("raw host cannot be a base: {raw_host}"))?;
        segs.pop_if_empty();
        segs.extend(full_name.split('/'));
        segs.extend(branch.split('/'));
        segs.extend(relative_path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url.to_string())
}

/// True if the process is running with effective uid 0 (e.g. via sudo).
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}
