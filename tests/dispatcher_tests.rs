//! Download dispatcher and single-job download tests.

mod common;

use anyhow::bail;
use common::{FakeApi, raw_url};
use repominer::FileJob;
use repominer::pipeline::{
    DownloadDispatcher, DownloadTask, JobOutcome, OutcomeCallback, PipelineTuning, download_job,
};
use repominer::utils::temp_path_for;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn job(root: &Path, name: &str) -> FileJob {
    FileJob {
        repository_full_name: "o/r".to_string(),
        branch: "main".to_string(),
        relative_path: name.to_string(),
        download_url: raw_url("o/r", name),
        destination_path: root.join(name),
    }
}

fn write_task() -> DownloadTask {
    Arc::new(|job: &FileJob| -> anyhow::Result<u64> {
        if job.relative_path == "5.java" {
            bail!("simulated failure");
        }
        std::fs::write(&job.destination_path, b"class X {}")?;
        Ok(10)
    })
}

#[test]
fn test_one_failure_does_not_affect_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let tuning = PipelineTuning {
        num_workers: 4,
        queue_cap: 4,
    };
    let mut dispatcher = DownloadDispatcher::start(tuning, write_task(), None);
    for i in 0..10 {
        dispatcher
            .submit(job(dir.path(), &format!("{i}.java")))
            .unwrap();
    }
    let report = dispatcher.drain_and_shutdown();

    assert_eq!(report.submitted, 10);
    assert_eq!(report.succeeded, 9);
    assert_eq!(report.bytes, 90);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.relative_path, "5.java");
    assert!(report.failed[0].1.contains("simulated failure"));
    let on_disk = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(on_disk, 9);
}

#[test]
fn test_drain_waits_for_every_job() {
    let dir = tempfile::tempdir().unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&done);
    let task: DownloadTask = Arc::new(move |_job: &FileJob| -> anyhow::Result<u64> {
        std::thread::sleep(Duration::from_millis(2));
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    });
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_cb = Arc::clone(&seen);
    let on_outcome: OutcomeCallback = Box::new(move |_: &JobOutcome| {
        seen_cb.fetch_add(1, Ordering::SeqCst);
    });
    let tuning = PipelineTuning {
        num_workers: 2,
        queue_cap: 1,
    };
    let mut dispatcher = DownloadDispatcher::start(tuning, task, Some(on_outcome));
    for i in 0..50 {
        dispatcher
            .submit(job(dir.path(), &format!("{i}.java")))
            .unwrap();
    }
    assert_eq!(dispatcher.submitted(), 50);
    let report = dispatcher.drain_and_shutdown();

    assert_eq!(done.load(Ordering::SeqCst), 50);
    assert_eq!(seen.load(Ordering::SeqCst), 50);
    assert_eq!(report.completed(), 50);
    assert!(report.failed.is_empty());
}

#[test]
fn test_panicking_task_is_recorded_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let task: DownloadTask = Arc::new(|job: &FileJob| -> anyhow::Result<u64> {
        if job.relative_path == "boom.java" {
            panic!("boom");
        }
        Ok(1)
    });
    let tuning = PipelineTuning {
        num_workers: 1,
        queue_cap: 2,
    };
    let mut dispatcher = DownloadDispatcher::start(tuning, task, None);
    dispatcher.submit(job(dir.path(), "a.java")).unwrap();
    dispatcher.submit(job(dir.path(), "boom.java")).unwrap();
    dispatcher.submit(job(dir.path(), "b.java")).unwrap();
    let report = dispatcher.drain_and_shutdown();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.contains("panicked"));
}

#[test]
fn test_drain_with_nothing_submitted() {
    let tuning = PipelineTuning {
        num_workers: 3,
        queue_cap: 10,
    };
    let report = DownloadDispatcher::start(tuning, write_task(), None).drain_and_shutdown();
    assert_eq!(report.submitted, 0);
    assert_eq!(report.completed(), 0);
}

// --- download_job ---

#[test]
fn test_download_job_writes_file_and_creates_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let api =
        FakeApi::new(Vec::new()).with_blob(&raw_url("o/r", "src/Foo.java"), b"class Foo {}");
    let j = FileJob {
        destination_path: dir.path().join("o_r/src/Foo.java"),
        ..job(dir.path(), "src/Foo.java")
    };
    let n = download_job(&api, &j).unwrap();
    assert_eq!(n, 12);
    assert_eq!(
        std::fs::read(&j.destination_path).unwrap(),
        b"class Foo {}".to_vec()
    );
    assert!(!temp_path_for(&j.destination_path).exists());
}

#[test]
fn test_download_job_failure_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(Vec::new());
    let j = job(dir.path(), "Missing.java");
    let err = download_job(&api, &j).unwrap_err();
    assert!(format!("{:#}", err).contains("Missing.java"));
    assert!(!j.destination_path.exists());
    assert!(!temp_path_for(&j.destination_path).exists());
}

#[test]
fn test_download_job_body_cut_off_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeApi::new(Vec::new()).with_broken_blob(&raw_url("o/r", "Half.java"), b"clas");
    let j = job(dir.path(), "Half.java");
    let err = download_job(&api, &j).unwrap_err();
    assert!(format!("{:#}", err).contains("connection reset"));
    assert!(!j.destination_path.exists());
    assert!(!temp_path_for(&j.destination_path).exists());
}

#[test]
fn test_body_cut_off_does_not_affect_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(
        FakeApi::new(Vec::new())
            .with_blob(&raw_url("o/r", "A.java"), b"class A {}")
            .with_broken_blob(&raw_url("o/r", "Half.java"), b"clas")
            .with_blob(&raw_url("o/r", "B.java"), b"class B {}"),
    );
    let task: DownloadTask =
        Arc::new(move |job: &FileJob| -> anyhow::Result<u64> { download_job(api.as_ref(), job) });
    let tuning = PipelineTuning {
        num_workers: 2,
        queue_cap: 2,
    };
    let mut dispatcher = DownloadDispatcher::start(tuning, task, None);
    for name in ["A.java", "Half.java", "B.java"] {
        dispatcher.submit(job(dir.path(), name)).unwrap();
    }
    let report = dispatcher.drain_and_shutdown();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.relative_path, "Half.java");
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["A.java", "B.java"]);
}
