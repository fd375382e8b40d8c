//! Search cursor tests: windowing past the result cap, dedup, limits, errors.

mod common;

use common::{FakeApi, repo};
use repominer::engine::{CrawlSession, SearchCursor, WindowStep};
use repominer::{SearchQuery, SearchWindow};
use std::collections::HashSet;
use std::ops::ControlFlow;

fn query(min_stars: u64) -> SearchQuery {
    SearchQuery {
        language: "Java".to_string(),
        exclude_query: String::new(),
        min_stars,
    }
}

/// 1050 repositories, three per score, so the cap boundary falls inside a tie group.
fn tied_repos() -> FakeApi {
    FakeApi::new(
        (0..1050_u64)
            .map(|i| repo(&format!("owner{i}/repo{i}"), 1050 - i / 3))
            .collect(),
    )
}

fn assert_upper_bounds_decrease(windows: &[SearchWindow]) {
    assert_eq!(windows[0].upper_bound, None);
    let uppers: Vec<u64> = windows[1..]
        .iter()
        .map(|w| w.upper_bound.unwrap())
        .collect();
    for pair in uppers.windows(2) {
        assert!(pair[1] < pair[0], "window did not shrink: {:?}", uppers);
    }
}

// --- crawl past the cap ---

#[test]
fn test_crawl_past_cap_yields_every_repository_once() {
    let api = tied_repos();
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(10_000));
    let mut names = Vec::new();
    let step = cursor
        .crawl(|r| {
            names.push(r.full_name);
            ControlFlow::Continue(())
        })
        .unwrap();

    assert_eq!(step, WindowStep::Exhausted);
    assert_eq!(names.len(), 1050);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), 1050);
    assert_eq!(cursor.session().accepted(), 1050);
}

#[test]
fn test_second_window_starts_at_last_score_plus_buffer() {
    let api = tied_repos();
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(10_000));
    cursor.crawl(|_| ControlFlow::Continue(())).unwrap();

    // 1000th result has score 1050 - 999 / 3 = 717; default buffer is 10.
    let windows = cursor.windows();
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[1], SearchWindow {
        lower_bound: 0,
        upper_bound: Some(727),
    });
    assert_eq!(api.windows(), windows);
}

#[test]
fn test_crawl_in_popularity_order_within_window() {
    let api = tied_repos();
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(300));
    let mut scores = Vec::new();
    cursor
        .crawl(|r| {
            scores.push(r.popularity_score);
            ControlFlow::Continue(())
        })
        .unwrap();
    assert!(scores.windows(2).all(|p| p[0] >= p[1]));
}

#[test]
fn test_windows_shrink_when_more_than_cap_share_a_score() {
    let api = FakeApi::new(
        (0..1200)
            .map(|i| repo(&format!("same/r{i}"), 100))
            .collect(),
    );
    let mut cursor = SearchCursor::new(&api, query(50), CrawlSession::new(10_000));
    let step = cursor.crawl(|_| ControlFlow::Continue(())).unwrap();

    assert_eq!(step, WindowStep::Exhausted);
    // Only the first 1000 of the tie group are reachable through search.
    assert_eq!(cursor.session().accepted(), 1000);
    assert_upper_bounds_decrease(cursor.windows());
    let last = cursor.windows().last().unwrap();
    assert!(last.upper_bound.unwrap() < 100);
}

#[test]
fn test_window_upper_bounds_never_grow() {
    let api = tied_repos();
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(10_000));
    cursor.crawl(|_| ControlFlow::Continue(())).unwrap();
    assert_upper_bounds_decrease(cursor.windows());
}

#[test]
fn test_below_cap_single_window() {
    let api = FakeApi::new(vec![repo("a/x", 300), repo("b/y", 200), repo("c/z", 10)]);
    let mut cursor = SearchCursor::new(&api, query(50), CrawlSession::new(100));
    let mut names = Vec::new();
    let step = cursor
        .crawl(|r| {
            names.push(r.full_name);
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(step, WindowStep::Exhausted);
    assert_eq!(names, vec!["a/x", "b/y"]);
    assert_eq!(api.search_requests(), 1);
}

// --- limits and stopping ---

#[test]
fn test_max_repos_stops_mid_page() {
    let api = tied_repos();
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(150));
    let mut count = 0;
    let step = cursor
        .crawl(|_| {
            count += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(step, WindowStep::LimitReached);
    assert_eq!(count, 150);
    assert_eq!(api.search_requests(), 2);
}

#[test]
fn test_consumer_break_stops_crawl() {
    let api = tied_repos();
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(10_000));
    let mut count = 0;
    let step = cursor
        .crawl(|_| {
            count += 1;
            if count == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
    assert_eq!(step, WindowStep::Stopped);
    assert_eq!(count, 5);
}

#[test]
fn test_crawl_resets_session() {
    let api = FakeApi::new(vec![repo("a/x", 300), repo("b/y", 200)]);
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(100));
    cursor.crawl(|_| ControlFlow::Continue(())).unwrap();
    let mut second = 0;
    cursor
        .crawl(|_| {
            second += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(second, 2);
}

// --- errors ---

#[test]
fn test_search_error_propagates() {
    let mut api = tied_repos();
    api.fail_search_page = Some(2);
    let mut cursor = SearchCursor::new(&api, query(0), CrawlSession::new(10_000));
    let mut count = 0;
    let result = cursor.crawl(|_| {
        count += 1;
        ControlFlow::Continue(())
    });
    assert!(result.is_err());
    assert_eq!(count, 100);
}

// --- session ---

#[test]
fn test_session_rejects_duplicates_and_overflow() {
    let mut session = CrawlSession::new(2);
    assert!(session.accept(&repo("a/x", 1)));
    assert!(!session.accept(&repo("a/x", 1)));
    assert!(session.accept(&repo("b/y", 1)));
    assert!(session.is_full());
    assert!(!session.accept(&repo("c/z", 1)));
    assert!(session.contains("b/y"));
    assert!(!session.contains("c/z"));
    assert_eq!(session.accepted(), 2);
}

// --- SearchWindow / SearchQuery ---

#[test]
fn test_narrowed_from_unbounded() {
    let w = SearchWindow::unbounded(50);
    assert_eq!(w.narrowed(717, 10), Some(SearchWindow {
        lower_bound: 50,
        upper_bound: Some(727),
    }));
}

#[test]
fn test_narrowed_forces_progress_when_buffer_overshoots() {
    let w = SearchWindow {
        lower_bound: 0,
        upper_bound: Some(727),
    };
    assert_eq!(w.narrowed(720, 10).unwrap().upper_bound, Some(726));
    assert_eq!(w.narrowed(700, 10).unwrap().upper_bound, Some(710));
}

#[test]
fn test_narrowed_empty_window_is_none() {
    let w = SearchWindow {
        lower_bound: 5,
        upper_bound: Some(5),
    };
    assert_eq!(w.narrowed(5, 10), None);
    let zero = SearchWindow {
        lower_bound: 0,
        upper_bound: Some(0),
    };
    assert_eq!(zero.narrowed(0, 0), None);
}

#[test]
fn test_window_contains_and_qualifier() {
    let w = SearchWindow {
        lower_bound: 50,
        upper_bound: Some(120),
    };
    assert!(w.contains(50));
    assert!(w.contains(120));
    assert!(!w.contains(121));
    assert!(!w.contains(49));
    assert_eq!(w.qualifier(), "stars:50..120");
    assert_eq!(SearchWindow::unbounded(50).qualifier(), "stars:>=50");
}

#[test]
fn test_query_render() {
    let q = SearchQuery {
        language: "Java".to_string(),
        exclude_query: "NOT android".to_string(),
        min_stars: 50,
    };
    assert_eq!(
        q.render(&SearchWindow::unbounded(50)),
        "NOT android language:Java stars:>=50"
    );
    let bare = SearchQuery {
        language: String::new(),
        exclude_query: "  ".to_string(),
        min_stars: 0,
    };
    assert_eq!(bare.render(&SearchWindow::unbounded(0)), "stars:>=0");
}
