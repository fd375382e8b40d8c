//! Channels and shared state for the download pipeline.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::FileJob;

use super::dispatcher::JobOutcome;

/// Tuning derived from options and the FD limit: worker count and job queue cap.
#[derive(Clone, Copy, Debug)]
pub struct PipelineTuning {
    pub num_workers: usize,
    /// Capacity of the job channel. Discovery blocks on submit once it is full.
    pub queue_cap: usize,
}

/// Job channel is bounded (backpressure); outcome channel is unbounded so workers never wait on the collector.
pub struct PipelineChannels {
    pub job_tx: Sender<FileJob>,
    pub job_rx: Receiver<FileJob>,
    pub outcome_tx: Sender<JobOutcome>,
    pub outcome_rx: Receiver<JobOutcome>,
}

pub fn create_pipeline_channels(queue_cap: usize) -> PipelineChannels {
    let (job_tx, job_rx) = bounded::<FileJob>(queue_cap.max(1));
    let (outcome_tx, outcome_rx) = unbounded::<JobOutcome>();
    PipelineChannels {
        job_tx,
        job_rx,
        outcome_tx,
        outcome_rx,
    }
}

/// Cancel flag checked by discovery between repositories. Set from the Ctrl+C handler.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
