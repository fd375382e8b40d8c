use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;

use crate::utils::config::{LIST_THRESHOLD, PackagePaths};
use crate::{Opts, RunSummary};

/// Search failed mid-run. Carries the summary of everything that finished before the abort,
/// including the downloads that were already queued and have since drained.
///
/// Returned inside an `anyhow::Error`; get it back with `err.downcast_ref::<DiscoveryAborted>()`.
#[derive(Debug)]
pub struct DiscoveryAborted {
    pub summary: RunSummary,
    pub cause: anyhow::Error,
}

impl fmt::Display for DiscoveryAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discovery aborted after {} repositories",
            self.summary.repositories_accepted
        )
    }
}

impl std::error::Error for DiscoveryAborted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause: &(dyn std::error::Error + 'static) = self.cause.as_ref();
        Some(cause)
    }
}

/// Summary carried by `err`, if it is a [`DiscoveryAborted`].
pub fn aborted_summary(err: &anyhow::Error) -> Option<&RunSummary> {
    err.downcast_ref::<DiscoveryAborted>().map(|a| &a.summary)
}

/// Log failed downloads; with `list_failures`, print each (or write them to the failures file when there are many).
/// Call after the dispatcher has drained.
pub fn report_failed_downloads(opts: &Opts, summary: &RunSummary) -> Result<()> {
    let failed = summary.failures.len();
    if failed == 0 {
        return Ok(());
    }
    log::warn!("{} files could not be downloaded", failed);
    if !opts.list_failures {
        return Ok(());
    }
    if failed > LIST_THRESHOLD {
        let path = opts
            .output_root
            .join(PackagePaths::get().failures_filename());
        let mut f = std::fs::File::create(&path)
            .with_context(|| format!("create {}", path.display()))?;
        for (dest, err) in &summary.failures {
            writeln!(f, "{}\t{}", dest.display(), err)
                .with_context(|| format!("write {}", path.display()))?;
        }
        log::info!("Wrote {} failures to {}", failed, path.display());
    } else {
        for (dest, err) in &summary.failures {
            eprintln!("  failed: {} ({})", dest.display(), err);
        }
    }
    Ok(())
}
