//! CLI command handler: layer defaults, config file and flags, then run the pipeline.

use anyhow::{Result, bail};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::engine::running_as_root;
use crate::pipeline::{
    CancelFlag, aborted_summary, print_summary, report_failed_downloads, run_pipeline,
};
use crate::remote::{GitHubClient, RemoteApi};
use crate::utils::{apply_file_to_opts, get_token, load_miner_toml, setup_logging};

/// Defaults, then `.repominer.toml` (or `--config`), then explicit flags.
/// Logging starts first so config file problems are reported; the file's `verbose` only adds the counter.
pub fn setup_opts(cli: &Cli) -> Opts {
    setup_logging(cli.verbose.unwrap_or(false));
    let mut opts = Opts::default();
    if let Some(file) = load_miner_toml(Path::new("."), cli.config.as_deref()) {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    opts
}

/// Overwrite `opts` with every flag given on the command line.
pub fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    if let Some(ref p) = cli.output {
        opts.output_root = p.clone();
    }
    if let Some(ref v) = cli.language {
        opts.language = v.clone();
    }
    if let Some(ref v) = cli.exclude_query {
        opts.exclude_query = v.clone();
    }
    if let Some(ref v) = cli.extension {
        opts.extension = v.clone();
    }
    if let Some(ref v) = cli.api_url {
        opts.api_url = v.clone();
    }
    if let Some(ref v) = cli.raw_host {
        opts.raw_host = v.clone();
    }
    opts.min_stars = cli.min_stars.unwrap_or(opts.min_stars);
    opts.max_repos = cli.max_repos.unwrap_or(opts.max_repos);
    opts.max_download_threads = cli.threads.unwrap_or(opts.max_download_threads);
    opts.stars_buffer = cli.stars_buffer.unwrap_or(opts.stars_buffer);
    opts.verbose = cli.verbose.unwrap_or(opts.verbose);
    opts.list_failures = cli.list.unwrap_or(opts.list_failures);
    if cli.queue_capacity.is_some() {
        opts.queue_capacity = cli.queue_capacity;
    }
    if cli.min_match_ratio.is_some() {
        opts.min_match_ratio = cli.min_match_ratio;
    }
    opts.dry_run = cli.dry_run;
}

/// Ctrl+C stops discovery after the current repository; queued downloads still finish.
fn install_cancel_handler(cancel: &CancelFlag) {
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupted; finishing queued downloads");
        flag.cancel();
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }
}

/// Run a crawl from the command line. Returns an error when discovery failed or was interrupted.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    if running_as_root() {
        info!("Running as root. Downloaded files will be owned by root.");
    }
    if opts.dry_run {
        warn!("RUNNING IN DRY-RUN MODE. NO FILES WILL BE DOWNLOADED.");
    }

    let token = get_token(Path::new("."), cli.ask_token)?;
    let client = GitHubClient::with_api_url(&opts.api_url, token)?;
    debug!(
        "Searching {} ({})",
        opts.api_url,
        if client.has_token() {
            "authenticated"
        } else {
            "anonymous"
        }
    );
    let api: Arc<dyn RemoteApi> = Arc::new(client);

    let cancel = CancelFlag::new();
    install_cancel_handler(&cancel);

    let summary = match run_pipeline(api, &opts, &cancel) {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(partial) = aborted_summary(&e) {
                print_summary(partial, opts.dry_run);
                report_failed_downloads(&opts, partial)?;
            }
            return Err(e);
        }
    };
    print_summary(&summary, opts.dry_run);
    report_failed_downloads(&opts, &summary)?;
    if cancel.is_cancelled() {
        bail!("interrupted");
    }
    Ok(())
}
