//! Discovery loop feeding the download pool.
//!
//! One thread (the caller's) drives search → tree walk → path allocation and submits jobs as each
//! repository is walked; the dispatcher's workers download them concurrently. Search errors end
//! the run; tree and download errors only cost the affected repository, subtree or file.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::engine::paths::PathAllocator;
use crate::engine::progress::{ProgressBar, create_counter, progress_callback, refresh_bar};
use crate::engine::search::{CrawlSession, CursorLimits, SearchCursor, WindowStep};
use crate::engine::tools::raw_content_url;
use crate::engine::tree::TreeWalker;
use crate::remote::RemoteApi;
use crate::utils::config::{DownloadQueueCap, ProgressConsts};
use crate::utils::{Colors, download_workers};
use crate::{FileJob, Opts, RepositoryDescriptor, RunSummary, TreeEntry};

use super::context::{CancelFlag, PipelineTuning};
use super::dispatcher::{
    DispatchReport, DownloadDispatcher, DownloadTask, JobOutcome, OutcomeCallback,
};
use super::download::download_job;
use super::error_handler::DiscoveryAborted;

/// Worker count (FD-capped) and queue capacity for `opts`.
pub fn pipeline_tuning(opts: &Opts) -> PipelineTuning {
    let num_workers = download_workers(opts.max_download_threads);
    let queue_cap = opts
        .queue_capacity
        .unwrap_or_else(|| DownloadQueueCap::for_workers(num_workers));
    PipelineTuning {
        num_workers,
        queue_cap,
    }
}

/// Outcome callback: tick the counter bar, or log a line every `ProgressConsts::LOG_EVERY` jobs.
fn outcome_callback(bar: &Option<ProgressBar>) -> OutcomeCallback {
    match progress_callback(bar) {
        Some(tick) => Box::new(move |_: &JobOutcome| tick(1)),
        None => {
            let done = AtomicUsize::new(0);
            Box::new(move |_: &JobOutcome| {
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n.is_multiple_of(ProgressConsts::LOG_EVERY) {
                    info!("{} downloads finished", n);
                }
            })
        }
    }
}

fn start_dispatcher(
    api: Arc<dyn RemoteApi>,
    tuning: PipelineTuning,
    bar: &Option<ProgressBar>,
) -> DownloadDispatcher {
    let task: DownloadTask = Arc::new(move |job: &FileJob| download_job(api.as_ref(), job));
    DownloadDispatcher::start(tuning, task, Some(outcome_callback(bar)))
}

/// Run a whole crawl: search, walk, download. Returns the summary once every queued job has an outcome.
///
/// A search failure is returned as a [`DiscoveryAborted`] error, but only after the downloads
/// already queued have drained; it carries the summary of what finished.
pub fn run_pipeline(
    api: Arc<dyn RemoteApi>,
    opts: &Opts,
    cancel: &CancelFlag,
) -> Result<RunSummary> {
    let start = Instant::now();
    reqwest::Url::parse(&opts.raw_host)
        .with_context(|| format!("invalid raw content host {}", opts.raw_host))?;
    if !opts.dry_run {
        std::fs::create_dir_all(&opts.output_root).with_context(|| {
            format!("create output directory {}", opts.output_root.display())
        })?;
    }

    let tuning = pipeline_tuning(opts);
    let bar = (opts.verbose && !opts.dry_run).then(|| {
        let b = create_counter("Downloading");
        refresh_bar(&b);
        b
    });
    let mut dispatcher =
        (!opts.dry_run).then(|| start_dispatcher(Arc::clone(&api), tuning, &bar));

    let mut summary = RunSummary::default();
    let discovered = discover(
        api.as_ref(),
        opts,
        cancel,
        dispatcher.as_mut(),
        &mut summary,
    );

    if let Some(d) = dispatcher {
        info!("All repositories submitted; waiting for downloads");
        let report = d.drain_and_shutdown();
        apply_dispatch_report(&mut summary, report);
    }
    summary.elapsed = start.elapsed();

    if let Err(e) = discovered {
        warn!(
            "Discovery aborted after {} repositories; {} files downloaded before the abort",
            summary.repositories_accepted, summary.files_downloaded
        );
        return Err(DiscoveryAborted { summary, cause: e }.into());
    }
    Ok(summary)
}

fn apply_dispatch_report(summary: &mut RunSummary, report: DispatchReport) {
    summary.files_downloaded = report.succeeded;
    summary.files_failed += report.failed.len();
    summary.bytes_written = report.bytes;
    summary.failures.extend(
        report
            .failed
            .into_iter()
            .map(|(job, err)| (job.destination_path, err)),
    );
}

/// Search, walk each accepted repository, and submit its files. Returns the search error, if any.
fn discover(
    api: &dyn RemoteApi,
    opts: &Opts,
    cancel: &CancelFlag,
    mut dispatcher: Option<&mut DownloadDispatcher>,
    summary: &mut RunSummary,
) -> Result<()> {
    let walker = TreeWalker::new(api, &opts.extension);
    let mut allocator = PathAllocator::new(&opts.output_root);
    let limits = CursorLimits {
        stars_buffer: opts.stars_buffer,
        ..CursorLimits::default()
    };
    let mut cursor = SearchCursor::with_limits(
        api,
        opts.search_query(),
        CrawlSession::new(opts.max_repos),
        limits,
    );
    let mut submit_error: Option<anyhow::Error> = None;
    let mut ratio_filter = opts.min_match_ratio;

    let step = cursor.crawl(|repo| {
        if cancel.is_cancelled() {
            info!("Cancelled; no further repositories will be walked");
            return ControlFlow::Break(());
        }
        summary.repositories_accepted += 1;
        info!(
            "Handling {}. repository: {} ({} stars)",
            summary.repositories_accepted, repo.full_name, repo.popularity_score
        );

        if let Some(min_ratio) = ratio_filter {
            match check_match_ratio(api, &repo, opts, min_ratio) {
                RatioCheck::Pass => {}
                RatioCheck::Skip => {
                    summary.repositories_filtered += 1;
                    return ControlFlow::Continue(());
                }
                RatioCheck::Unavailable(e) => {
                    warn!(
                        "Code search failed for {} ({:#}); match-ratio filter disabled for the rest of the run",
                        repo.full_name, e
                    );
                    ratio_filter = None;
                }
            }
        }

        let walk = walker.files_in_tree(&repo, &repo.default_branch);
        if !walk.failures.is_empty() {
            summary.repositories_with_tree_errors += 1;
        }
        if walk.is_skipped() {
            return ControlFlow::Continue(());
        }
        summary.repositories_walked += 1;
        summary.files_matched += walk.entries.len();
        info!(
            "Found {} matching files in {}",
            walk.entries.len(),
            repo.full_name
        );

        for entry in &walk.entries {
            let job = match build_job(&mut allocator, &repo, entry, &opts.raw_host) {
                Ok(job) => job,
                Err(e) => {
                    warn!("{:#}", e);
                    summary.files_failed += 1;
                    summary.failures.push((
                        allocator.allocate(&repo.full_name, &entry.relative_path),
                        format!("{:#}", e),
                    ));
                    continue;
                }
            };
            match dispatcher.as_deref_mut() {
                Some(d) => {
                    if let Err(e) = d.submit(job) {
                        submit_error = Some(e);
                        return ControlFlow::Break(());
                    }
                }
                None => debug!(
                    "dry run: {} -> {}",
                    job.download_url,
                    job.destination_path.display()
                ),
            }
        }
        ControlFlow::Continue(())
    });

    let step = step?;
    if let Some(e) = submit_error {
        return Err(e);
    }
    if step == WindowStep::LimitReached {
        info!("Reached the maximum of {} repositories", opts.max_repos);
    }
    Ok(())
}

/// FileJob for one tree entry: raw URL composed from parts, destination from the allocator.
pub fn build_job(
    allocator: &mut PathAllocator,
    repo: &RepositoryDescriptor,
    entry: &TreeEntry,
    raw_host: &str,
) -> Result<FileJob> {
    let download_url = raw_content_url(
        raw_host,
        &repo.full_name,
        &repo.default_branch,
        &entry.relative_path,
    )?;
    Ok(FileJob {
        repository_full_name: repo.full_name.clone(),
        branch: repo.default_branch.clone(),
        relative_path: entry.relative_path.clone(),
        download_url,
        destination_path: allocator.allocate(&repo.full_name, &entry.relative_path),
    })
}

/// Verdict of the match-ratio filter for one repository.
#[derive(Debug)]
pub enum RatioCheck {
    Pass,
    Skip,
    /// Code search failed; the repository is kept.
    Unavailable(anyhow::Error),
}

/// Match-ratio filter: share of extension matches that survive the exclusion terms.
///
/// No matching files at all fails the filter.
pub fn check_match_ratio(
    api: &dyn RemoteApi,
    repo: &RepositoryDescriptor,
    opts: &Opts,
    min_ratio: f64,
) -> RatioCheck {
    let counts = api
        .count_code_matches(&repo.full_name, &opts.extension, None)
        .and_then(|all| {
            let kept = api.count_code_matches(
                &repo.full_name,
                &opts.extension,
                Some(&opts.exclude_query),
            )?;
            Ok((all, kept))
        });
    match counts {
        Ok((0, _)) => {
            info!("No matching files in {}; skipping", repo.full_name);
            RatioCheck::Skip
        }
        Ok((all, kept)) => {
            let ratio = kept as f64 / all as f64;
            info!(
                "{}: {} valid files (invalid: {})",
                repo.full_name,
                kept,
                all.saturating_sub(kept)
            );
            if ratio < min_ratio {
                info!(
                    "Match ratio {:.2} of {} is below {:.2}; skipping",
                    ratio, repo.full_name, min_ratio
                );
                RatioCheck::Skip
            } else {
                RatioCheck::Pass
            }
        }
        Err(e) => RatioCheck::Unavailable(e),
    }
}

/// Print the run summary.
pub fn print_summary(summary: &RunSummary, dry_run: bool) {
    info!(
        "{} | {} | {} | {}",
        Colors::colorize(
            Colors::INFO,
            &format!("Repositories: {}", summary.repositories_walked)
        ),
        Colors::colorize(
            Colors::SKIPPED,
            &format!(
                "Filtered: {} / tree errors: {}",
                summary.repositories_filtered, summary.repositories_with_tree_errors
            )
        ),
        Colors::colorize(Colors::INFO, &format!("Matched: {}", summary.files_matched)),
        if dry_run {
            Colors::colorize(Colors::SKIPPED, "Dry run: nothing downloaded")
        } else {
            format!(
                "{} | {}",
                Colors::colorize(
                    Colors::OK,
                    &format!(
                        "Downloaded: {} ({} bytes)",
                        summary.files_downloaded, summary.bytes_written
                    )
                ),
                Colors::colorize(Colors::FAILED, &format!("Failed: {}", summary.files_failed))
            )
        }
    );
    debug!("Elapsed: {:?}", summary.elapsed);
}
