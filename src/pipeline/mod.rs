//! Pipeline components: discovery loop, download dispatcher, per-job download, failure reporting.

pub mod context;
pub mod dispatcher;
pub mod download;
pub mod error_handler;
pub mod orchestrator;

pub use context::{CancelFlag, PipelineChannels, PipelineTuning, create_pipeline_channels};
pub use dispatcher::{
    DispatchReport, DownloadDispatcher, DownloadTask, JobOutcome, OutcomeCallback,
};
pub use download::download_job;
pub use error_handler::{DiscoveryAborted, aborted_summary, report_failed_downloads};
pub use orchestrator::{
    RatioCheck, build_job, check_match_ratio, pipeline_tuning, print_summary, run_pipeline,
};
