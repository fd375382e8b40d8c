//! Cap on concurrent downloads derived from the open-file soft limit.

use log::debug;

/// Descriptors a download worker can hold at once: HTTP socket, temp file, one spare.
pub const FDS_PER_WORKER: usize = 4;

/// Share of the soft limit downloads may use; the rest stays free for the API client and logging.
const USABLE_PERCENT: u64 = 80;

/// Soft `RLIMIT_NOFILE`, or `None` when unlimited or unknown.
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes into the struct we own.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) } != 0 {
        return None;
    }
    let soft = rlim.rlim_cur;
    (soft != libc::RLIM_INFINITY && soft <= i64::MAX as u64).then_some(soft)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Worker count that keeps downloads under the usable share of the limit (at least 1).
pub fn max_workers_by_fd_limit() -> Option<usize> {
    let usable = max_open_fds()? * USABLE_PERCENT / 100;
    Some(((usable as usize) / FDS_PER_WORKER).max(1))
}

/// `requested` workers, capped by the FD limit and floored at 1.
pub fn download_workers(requested: usize) -> usize {
    let requested = requested.max(1);
    let Some(cap) = max_workers_by_fd_limit().filter(|&cap| cap < requested) else {
        return requested;
    };
    debug!(
        "Open-file limit allows {} download workers; {} requested",
        cap, requested
    );
    cap
}
