//! Load `.repominer.toml` (or `--config <path>`). CLI only; lib callers pass [`MineOpts`](crate::MineOpts).

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct MinerToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    remote: RemoteSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    output: Option<String>,
    language: Option<String>,
    exclude_query: Option<String>,
    extension: Option<String>,
    min_stars: Option<u64>,
    max_repos: Option<usize>,
    max_download_threads: Option<usize>,
    queue_capacity: Option<usize>,
    min_match_ratio: Option<f64>,
    stars_buffer: Option<u64>,
    verbose: Option<bool>,
    list: Option<bool>,
}

/// Endpoints; only useful against a GitHub Enterprise host or a test server.
#[derive(Debug, Default, Deserialize)]
struct RemoteSection {
    api_url: Option<String>,
    raw_host: Option<String>,
}

/// Parse config text. Errors are returned so the caller decides whether to warn or fail.
pub fn parse_miner_toml(s: &str) -> Result<MinerToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load `explicit` if given, else `.repominer.toml` in `dir`. Returns None if missing or unreadable.
pub fn load_miner_toml(dir: &Path, explicit: Option<&Path>) -> Option<MinerToml> {
    let path: PathBuf = match explicit {
        Some(p) => p.to_path_buf(),
        None => dir.join(PackagePaths::get().config_filename()),
    };
    let s = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            if explicit.is_some() {
                log::warn!("{}: {}", path.display(), e);
            }
            return None;
        }
    };
    parse_miner_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(ref v) = $sec.$sec_field {
            $opts.$opts_field = v.clone();
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &MinerToml, opts: &mut Opts) {
    let s = &file.settings;
    if let Some(ref p) = s.output {
        opts.output_root = PathBuf::from(p);
    }
    apply_file_opt!(s, opts, language => language);
    apply_file_opt!(s, opts, exclude_query => exclude_query);
    apply_file_opt!(s, opts, extension => extension);
    apply_file_opt!(s, opts, min_stars => min_stars);
    apply_file_opt!(s, opts, max_repos => max_repos);
    apply_file_opt!(s, opts, max_download_threads => max_download_threads);
    apply_file_opt!(s, opts, stars_buffer => stars_buffer);
    apply_file_opt!(s, opts, verbose => verbose);
    apply_file_opt!(s, opts, list => list_failures);
    if s.queue_capacity.is_some() {
        opts.queue_capacity = s.queue_capacity;
    }
    match s.min_match_ratio {
        Some(r) if (0.0..=1.0).contains(&r) => opts.min_match_ratio = Some(r),
        Some(r) => log::warn!("min_match_ratio {} is not between 0.0 and 1.0; ignored", r),
        None => {}
    }
    let r = &file.remote;
    apply_file_opt!(r, opts, api_url => api_url);
    apply_file_opt!(r, opts, raw_host => raw_host);
}
