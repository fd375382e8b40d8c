//! repominer CLI: find popular repositories and download every file with a given extension.

use anyhow::Result;
use clap::Parser;
use repominer::engine::arg_parser::Cli;
use repominer::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
