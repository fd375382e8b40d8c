//! Fixed pool of download workers fed by a bounded job queue.
//!
//! Discovery calls [`DownloadDispatcher::submit`] as files are found; each worker runs the task on
//! one job at a time and reports a [`JobOutcome`]. A failed or panicking job never affects its
//! siblings. [`DownloadDispatcher::drain_and_shutdown`] consumes the dispatcher, so no job can be
//! submitted after draining has begun.

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::FileJob;

use super::context::{PipelineTuning, create_pipeline_channels};

/// Per-job work: persist `job` and return the number of bytes written.
pub type DownloadTask = Arc<dyn Fn(&FileJob) -> Result<u64> + Send + Sync>;

/// Called by the collector thread for every finished job (progress display).
pub type OutcomeCallback = Box<dyn Fn(&JobOutcome) + Send>;

#[derive(Debug)]
pub enum JobOutcome {
    Downloaded { job: FileJob, bytes: u64 },
    Failed { job: FileJob, error: String },
}

impl JobOutcome {
    pub fn job(&self) -> &FileJob {
        match self {
            JobOutcome::Downloaded { job, .. } | JobOutcome::Failed { job, .. } => job,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Downloaded { .. })
    }
}

/// Aggregated outcomes, returned by [`DownloadDispatcher::drain_and_shutdown`].
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub bytes: u64,
    pub failed: Vec<(FileJob, String)>,
}

impl DispatchReport {
    /// Jobs with a recorded outcome.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Downloaded { bytes, .. } => {
                self.succeeded += 1;
                self.bytes += bytes;
            }
            JobOutcome::Failed { job, error } => self.failed.push((job, error)),
        }
    }
}

pub struct DownloadDispatcher {
    job_tx: Sender<FileJob>,
    worker_handles: Vec<JoinHandle<()>>,
    collector_handle: JoinHandle<DispatchReport>,
    submitted: usize,
}

/// Single worker: pull jobs until the queue is closed and empty, report every outcome.
fn worker_loop(job_rx: Receiver<FileJob>, outcome_tx: Sender<JobOutcome>, task: DownloadTask) {
    while let Ok(job) = job_rx.recv() {
        let outcome = match catch_unwind(AssertUnwindSafe(|| task(&job))) {
            Ok(Ok(bytes)) => JobOutcome::Downloaded { job, bytes },
            Ok(Err(e)) => JobOutcome::Failed {
                error: format!("{:#}", e),
                job,
            },
            Err(_) => JobOutcome::Failed {
                error: "download task panicked".to_string(),
                job,
            },
        };
        if outcome_tx.send(outcome).is_err() {
            break;
        }
    }
    drop(outcome_tx);
}

fn collector_loop(
    outcome_rx: Receiver<JobOutcome>,
    on_outcome: Option<OutcomeCallback>,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    while let Ok(outcome) = outcome_rx.recv() {
        if let Some(ref cb) = on_outcome {
            cb(&outcome);
        }
        report.record(outcome);
    }
    report
}

impl DownloadDispatcher {
    /// Spawn `tuning.num_workers` workers running `task`, plus one collector thread.
    pub fn start(
        tuning: PipelineTuning,
        task: DownloadTask,
        on_outcome: Option<OutcomeCallback>,
    ) -> Self {
        let channels = create_pipeline_channels(tuning.queue_cap);
        let num_workers = tuning.num_workers.max(1);
        debug!(
            "Starting {} download workers (queue capacity {})",
            num_workers, tuning.queue_cap
        );

        let worker_handles = (0..num_workers)
            .map(|_| {
                let job_rx = channels.job_rx.clone();
                let outcome_tx = channels.outcome_tx.clone();
                let task = Arc::clone(&task);
                thread::spawn(move || worker_loop(job_rx, outcome_tx, task))
            })
            .collect();

        let outcome_rx = channels.outcome_rx;
        let collector_handle = thread::spawn(move || collector_loop(outcome_rx, on_outcome));

        // Dropping the last outcome sender outside the workers lets the collector exit once they do.
        drop(channels.outcome_tx);

        Self {
            job_tx: channels.job_tx,
            worker_handles,
            collector_handle,
            submitted: 0,
        }
    }

    /// Queue `job`. Blocks while the queue is full. Fails only if every worker has exited.
    pub fn submit(&mut self, job: FileJob) -> Result<()> {
        self.job_tx
            .send(job)
            .map_err(|e| anyhow!("no download worker left to accept {}", e.0.relative_path))?;
        self.submitted += 1;
        Ok(())
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Close the queue, wait until every submitted job has an outcome, and return the report.
    pub fn drain_and_shutdown(self) -> DispatchReport {
        let Self {
            job_tx,
            worker_handles,
            collector_handle,
            submitted,
        } = self;
        info!("Waiting for {} queued downloads to finish", job_tx.len());
        // Dropping the last job sender closes the channel so workers exit after the queue empties.
        drop(job_tx);
        for h in worker_handles {
            if h.join().is_err() {
                error!("download worker panicked");
            }
        }
        let mut report = collector_handle.join().unwrap_or_else(|_| {
            error!("outcome collector panicked; counts are incomplete");
            DispatchReport::default()
        });
        report.submitted = submitted;
        info!(
            "Finished all downloads ({} ok, {} failed)",
            report.succeeded,
            report.failed.len()
        );
        report
    }
}
