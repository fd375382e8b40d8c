use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

/// Temporary sibling for a download: `Foo.java` → `.Foo.java.repominer-part`.
/// Hidden and suffixed so an interrupted run never leaves something that looks like a finished file.
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    dest.parent()
        .unwrap_or(Path::new("."))
        .join(format!(".{name}.{}-part", PackagePaths::get().pkg_name()))
}

/// Remove a leftover temp file; missing is fine.
pub fn remove_temp(temp_path: &Path) {
    let _ = fs::remove_file(temp_path);
}

pub fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "atomic rename temp download to final path ({} -> {})",
            temp_path.display(),
            final_path.display()
        )
    })
}
