//! Parallel runner tests against real subprocesses.
//!
//! Each task uses `sh -c <script>` as its "compiler", so exit statuses and
//! output files are fully controlled by the test.

#![cfg(unix)]

use kiln::build::{TaskRunner, TaskSelector, TaskState};
use kiln::fileset::FileSet;
use kiln::task::BuildTask;
use kiln::ui::Reporter;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

#[derive(Default)]
struct Log {
    commands: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, i32)>>,
}

impl Reporter for Log {
    fn command(&self, task: &str, _argv: &[String]) {
        self.commands.lock().unwrap().push(task.to_string());
    }

    fn failed(&self, task: &str, status: i32) {
        self.failures.lock().unwrap().push((task.to_string(), status));
    }
}

/// `sh -c <script> -o <output> <inputs...>`: `$1` is the output, `$2..` inputs.
fn shell_task(name: &str, script: &str) -> BuildTask {
    BuildTask::new(name)
        .set_compiler("sh")
        .add_cflags(["-c", script])
        .set_files(FileSet::new())
}

fn set_mtime(path: &Path, at: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(at)
        .unwrap();
}

#[test]
fn all_tasks_succeed() {
    let mut runner = TaskRunner::new();
    runner
        .add(shell_task("a", "exit 0"))
        .add(shell_task("b", "exit 0"))
        .add(shell_task("c", "exit 0"));
    let log = Log::default();

    let report = runner.execute(&log).unwrap();

    assert_eq!(report.status, 0);
    for name in ["a", "b", "c"] {
        assert_eq!(report.state_of(name), Some(TaskState::Succeeded));
    }
    assert_eq!(log.commands.lock().unwrap().len(), 3);
    assert!(log.failures.lock().unwrap().is_empty());
}

#[test]
fn one_failure_sets_the_status() {
    let mut runner = TaskRunner::new();
    runner
        .add(shell_task("ok-1", "exit 0"))
        .add(shell_task("bad", "exit 7"))
        .add(shell_task("ok-2", "exit 0"));
    let log = Log::default();

    let report = runner.execute(&log).unwrap();

    assert_eq!(report.status, 7);
    assert!(report.states.iter().all(|(_, s)| s.is_terminal()));
    assert_eq!(report.state_of("bad"), Some(TaskState::Failed(7)));
    assert_eq!(
        *log.failures.lock().unwrap(),
        vec![("bad".to_string(), 7)]
    );
}

#[test]
fn slow_sibling_still_completes_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("slow.done");
    let script = format!("sleep 0.3; touch '{}'", marker.display());

    let mut runner = TaskRunner::new();
    runner
        .add(shell_task("fast-fail", "exit 3"))
        .add(shell_task("slow", &script));

    let report = runner.execute(&Log::default()).unwrap();

    assert_eq!(report.status, 3);
    assert_eq!(report.state_of("slow"), Some(TaskState::Succeeded));
    assert!(marker.exists());
}

#[test]
fn fresh_task_is_never_spawned() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("fresh.txt");
    let out = dir.path().join("out").join("fresh");
    fs::write(&src, "hello").unwrap();

    let copy = BuildTask::new("fresh")
        .set_compiler("sh")
        .add_cflags(["-c", "cp \"$2\" \"$1\""])
        .set_output(out.to_string_lossy())
        .unwrap()
        .set_files(FileSet::new().append(src.to_string_lossy()))
        .enable_cache();

    let mut runner = TaskRunner::new();
    runner.add(copy);
    assert_eq!(runner.run_all().unwrap(), 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello");

    // Output is now newer than the input.
    let later = SystemTime::now() + Duration::from_secs(10);
    set_mtime(&out, later);
    runner.add(shell_task("stale", "exit 0"));

    let log = Log::default();
    let report = runner.execute(&log).unwrap();
    assert_eq!(report.state_of("fresh"), Some(TaskState::Skipped));
    assert_eq!(report.state_of("stale"), Some(TaskState::Succeeded));
    assert_eq!(*log.commands.lock().unwrap(), vec!["stale".to_string()]);

    // Touching the input makes it stale again.
    set_mtime(&src, later + Duration::from_secs(10));
    let report = runner.execute(&Log::default()).unwrap();
    assert_eq!(report.state_of("fresh"), Some(TaskState::Succeeded));
}

#[test]
fn missing_compiler_is_reported_as_status() {
    let mut runner = TaskRunner::new();
    runner.add(
        BuildTask::new("ghost")
            .set_compiler("kiln-no-such-compiler")
            .set_files(FileSet::new()),
    );
    let log = Log::default();

    let report = runner.execute(&log).unwrap();
    assert_eq!(report.status, kiln::job::SPAWN_FAILURE);
    assert_eq!(log.failures.lock().unwrap().len(), 1);
}

#[test]
fn selector_returns_child_status() {
    let mut selector = TaskSelector::new();
    selector
        .add(shell_task("default", "exit 0"))
        .learn(shell_task("broken", "exit 4"));

    assert_eq!(selector.run_default_with(&Log::default()).unwrap(), 0);
    assert_eq!(selector.run_named_with("broken", &Log::default()).unwrap(), 4);
    assert!(selector.run_named_with("nope", &Log::default()).is_err());
}
