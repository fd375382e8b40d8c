//! Repository discovery past the search result cap.
//!
//! The platform enumerates at most [`PlatformLimits::SEARCH_RESULT_CAP`] matches per query. When a
//! query hits the cap, the cursor reads everything it can, then asks again with the upper
//! popularity bound lowered to the last score seen (plus a small buffer for repositories whose
//! score moved mid-crawl). Overlap between windows is removed by the [`CrawlSession`].

use std::collections::HashSet;
use std::ops::ControlFlow;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::remote::RemoteApi;
use crate::types::{RepositoryDescriptor, SearchQuery, SearchWindow};
use crate::utils::config::{Defaults, PlatformLimits};

/// Dedup set and acceptance counter for one crawl. Owned by the cursor, never shared across runs.
#[derive(Debug, Default)]
pub struct CrawlSession {
    seen: HashSet<String>,
    accepted: usize,
    max_repos: usize,
}

impl CrawlSession {
    pub fn new(max_repos: usize) -> Self {
        Self {
            seen: HashSet::new(),
            accepted: 0,
            max_repos,
        }
    }

    /// Record `repo` if it is new and the limit allows. Returns false for duplicates and when full.
    pub fn accept(&mut self, repo: &RepositoryDescriptor) -> bool {
        if self.is_full() || !self.seen.insert(repo.full_name.clone()) {
            return false;
        }
        self.accepted += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.accepted >= self.max_repos
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.seen.contains(full_name)
    }

    /// Forget everything; called at the start of each crawl.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.accepted = 0;
    }
}

/// What the cursor should do after one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowStep {
    /// The window hit the cap; continue with this narrower one.
    Next(SearchWindow),
    /// Every match has been enumerated.
    Exhausted,
    /// The configured maximum of repositories was reached.
    LimitReached,
    /// The consumer asked to stop.
    Stopped,
}

/// Tunables that normally come from [`PlatformLimits`] and [`Defaults`]; tests shrink them.
#[derive(Clone, Copy, Debug)]
pub struct CursorLimits {
    pub result_cap: usize,
    pub page_size: usize,
    pub stars_buffer: u64,
}

impl Default for CursorLimits {
    fn default() -> Self {
        Self {
            result_cap: PlatformLimits::SEARCH_RESULT_CAP,
            page_size: PlatformLimits::PAGE_SIZE,
            stars_buffer: Defaults::STARS_BUFFER,
        }
    }
}

pub struct SearchCursor<'a, A: RemoteApi + ?Sized> {
    api: &'a A,
    query: SearchQuery,
    session: CrawlSession,
    limits: CursorLimits,
    /// Every window queried in this crawl, in order.
    windows: Vec<SearchWindow>,
}

impl<'a, A: RemoteApi + ?Sized> SearchCursor<'a, A> {
    pub fn new(api: &'a A, query: SearchQuery, session: CrawlSession) -> Self {
        Self::with_limits(api, query, session, CursorLimits::default())
    }

    pub fn with_limits(
        api: &'a A,
        query: SearchQuery,
        session: CrawlSession,
        limits: CursorLimits,
    ) -> Self {
        Self {
            api,
            query,
            session,
            limits,
            windows: Vec::new(),
        }
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    pub fn into_session(self) -> CrawlSession {
        self.session
    }

    pub fn windows(&self) -> &[SearchWindow] {
        &self.windows
    }

    /// Stream every new repository of `window` to `on_repo`, in popularity order, and say what comes next.
    ///
    /// Any search error is returned as is: without search nothing more can be discovered.
    pub fn next_repositories<F>(
        &mut self,
        window: &SearchWindow,
        on_repo: &mut F,
    ) -> Result<WindowStep>
    where
        F: FnMut(RepositoryDescriptor) -> ControlFlow<()>,
    {
        if self.session.is_full() {
            return Ok(WindowStep::LimitReached);
        }
        self.windows.push(*window);

        let page_size = self.limits.page_size.max(1);
        let mut page = 1_u32;
        let mut total = 0_u64;
        let mut returned = 0_usize;
        let mut last_score: Option<u64> = None;

        loop {
            let result = self
                .api
                .search_repositories(&self.query, window, page, page_size)
                .with_context(|| format!("search repositories in {} (page {})", window, page))?;
            if page == 1 {
                total = result.total_count;
                info!(
                    "Found {} repositories matching {:?}",
                    total,
                    self.query.render(window)
                );
            }
            let n = result.items.len();
            for repo in result.items {
                last_score = Some(repo.popularity_score);
                if self.session.is_full() {
                    return Ok(WindowStep::LimitReached);
                }
                if !self.session.accept(&repo) {
                    debug!("{} already enumerated; skipping", repo.full_name);
                    continue;
                }
                if on_repo(repo).is_break() {
                    return Ok(WindowStep::Stopped);
                }
            }
            returned += n;
            let reachable = (total as usize).min(self.limits.result_cap);
            if n < page_size || returned >= reachable {
                break;
            }
            page += 1;
        }

        if self.session.is_full() {
            return Ok(WindowStep::LimitReached);
        }
        if (total as usize) < self.limits.result_cap {
            return Ok(WindowStep::Exhausted);
        }
        Ok(last_score
            .and_then(|s| window.narrowed(s, self.limits.stars_buffer))
            .map_or(WindowStep::Exhausted, WindowStep::Next))
    }

    /// Run the whole crawl from an unbounded window. Resets the session first.
    pub fn crawl<F>(&mut self, mut on_repo: F) -> Result<WindowStep>
    where
        F: FnMut(RepositoryDescriptor) -> ControlFlow<()>,
    {
        self.session.reset();
        self.windows.clear();
        let mut window = SearchWindow::unbounded(self.query.min_stars);
        loop {
            match self.next_repositories(&window, &mut on_repo)? {
                WindowStep::Next(next) => {
                    info!(
                        "Result cap reached; asking for more repositories in {}",
                        next
                    );
                    window = next;
                }
                done => {
                    info!(
                        "Search finished ({:?}) after {} window(s), {} repositories accepted",
                        done,
                        self.windows.len(),
                        self.session.accepted()
                    );
                    return Ok(done);
                }
            }
        }
    }
}
