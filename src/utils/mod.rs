pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod miner_toml;
pub mod tempfiles;
pub mod token;

pub use config::*;
pub use fd_limit::{FDS_PER_WORKER, download_workers, max_open_fds, max_workers_by_fd_limit};
pub use logger::{Colors, setup_logging};
pub use miner_toml::{MinerToml, apply_file_to_opts, load_miner_toml, parse_miner_toml};
pub use tempfiles::{remove_temp, rename_temp_to_final, temp_path_for};
pub use token::get_token;
