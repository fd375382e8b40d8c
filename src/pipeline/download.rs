use anyhow::{Context, Result};
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use crate::FileJob;
use crate::remote::RemoteApi;
use crate::utils::{remove_temp, rename_temp_to_final, temp_path_for};

/// Stream `job.download_url` into `job.destination_path`.
///
/// Bytes go to a hidden temp sibling first and are renamed into place only after the whole body
/// was written, so a failed transfer never leaves a truncated file under the final name.
pub fn download_job(api: &dyn RemoteApi, job: &FileJob) -> Result<u64> {
    let dest = &job.destination_path;
    if let Some(parent) = dest.parent() {
        // create_dir_all tolerates siblings creating the same directories concurrently.
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    debug!("Downloading {} to {}", job.download_url, dest.display());

    let temp = temp_path_for(dest);
    let written = stream_to(api, job, &temp).and_then(|n| {
        rename_temp_to_final(&temp, dest)?;
        Ok(n)
    });
    if written.is_err() {
        remove_temp(&temp);
    }
    written.with_context(|| format!("{}: {}", job.repository_full_name, job.relative_path))
}

fn stream_to(api: &dyn RemoteApi, job: &FileJob, temp: &std::path::Path) -> Result<u64> {
    let mut stream = api.open_blob_stream(&job.download_url)?;
    let file =
        File::create(temp).with_context(|| format!("create temp file {}", temp.display()))?;
    let mut writer = BufWriter::new(file);
    let n = io::copy(&mut stream, &mut writer).context("read response body")?;
    writer.flush().context("flush temp file")?;
    Ok(n)
}
