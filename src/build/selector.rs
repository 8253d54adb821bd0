//! Serial pick-one-and-run execution.
//!
//! A [`TaskSelector`] owns an ordered list of tasks plus a default. Running a
//! task here ignores staleness: the chosen command is always executed and its
//! status is handed back unchanged.

use crate::error::BuildError;
use crate::job::{JobRunner, Subprocess};
use crate::task::BuildTask;
use crate::ui::{ConsoleReporter, Reporter};

pub struct TaskSelector<R: JobRunner = Subprocess> {
    tasks: Vec<BuildTask>,
    default: Option<usize>,
    jobs: R,
}

impl TaskSelector<Subprocess> {
    pub fn new() -> Self {
        Self::with_runner(Subprocess)
    }
}

impl Default for TaskSelector<Subprocess> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: JobRunner> TaskSelector<R> {
    pub fn with_runner(jobs: R) -> Self {
        Self {
            tasks: Vec::new(),
            default: None,
            jobs,
        }
    }

    /// Registers `task`; the first task registered becomes the default.
    pub fn add(&mut self, task: BuildTask) -> &mut Self {
        if self.default.is_none() {
            self.set_default(task)
        } else {
            self.learn(task)
        }
    }

    /// Registers `task` without touching the default.
    pub fn learn(&mut self, task: BuildTask) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Registers `task` and makes it the default.
    pub fn set_default(&mut self, task: BuildTask) -> &mut Self {
        self.default = Some(self.tasks.len());
        self.tasks.push(task);
        self
    }

    pub fn tasks(&self) -> &[BuildTask] {
        &self.tasks
    }

    pub fn default_task(&self) -> Option<&BuildTask> {
        self.default.and_then(|index| self.tasks.get(index))
    }

    pub fn find(&self, name: &str) -> Result<&BuildTask, BuildError> {
        if name.is_empty() {
            return Err(BuildError::EmptyTaskName);
        }
        self.tasks
            .iter()
            .find(|task| task.name() == name)
            .ok_or_else(|| BuildError::UnknownTask(name.to_string()))
    }

    pub fn run_default(&self) -> Result<i32, BuildError> {
        self.run_default_with(&ConsoleReporter::default())
    }

    pub fn run_named(&self, name: &str) -> Result<i32, BuildError> {
        self.run_named_with(name, &ConsoleReporter::default())
    }

    pub fn run_default_with(&self, reporter: &dyn Reporter) -> Result<i32, BuildError> {
        let task = self.default_task().ok_or(BuildError::NoTasks)?;
        self.run_task(task, reporter)
    }

    pub fn run_named_with(&self, name: &str, reporter: &dyn Reporter) -> Result<i32, BuildError> {
        let task = self.find(name)?;
        self.run_task(task, reporter)
    }

    fn run_task(&self, task: &BuildTask, reporter: &dyn Reporter) -> Result<i32, BuildError> {
        let argv = task.render_command()?;
        reporter.command(task.name(), &argv);
        let status = self.jobs.run(&argv);
        if status == 0 {
            reporter.succeeded(task.name());
        } else {
            reporter.failed(task.name(), status);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileset::FileSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Echo {
        ran: Mutex<Vec<String>>,
    }

    impl JobRunner for Echo {
        fn run(&self, argv: &[String]) -> i32 {
            self.ran.lock().unwrap().push(argv[0].clone());
            if argv[0] == "fail" { 2 } else { 0 }
        }
    }

    struct Quiet;

    impl Reporter for Quiet {
        fn command(&self, _task: &str, _argv: &[String]) {}
        fn failed(&self, _task: &str, _status: i32) {}
    }

    fn task(name: &str, compiler: &str) -> BuildTask {
        BuildTask::new(name)
            .set_compiler(compiler)
            .set_files(FileSet::new().append("main.c"))
    }

    #[test]
    fn test_first_added_is_default() {
        let mut chef = TaskSelector::with_runner(Echo::default());
        chef.add(task("debug", "dbg")).add(task("release", "rel"));
        assert_eq!(chef.default_task().unwrap().name(), "debug");
        assert_eq!(chef.run_default_with(&Quiet).unwrap(), 0);
        assert_eq!(*chef.jobs.ran.lock().unwrap(), vec!["dbg".to_string()]);
    }

    #[test]
    fn test_set_default_overrides() {
        let mut chef = TaskSelector::with_runner(Echo::default());
        chef.add(task("debug", "dbg")).set_default(task("release", "rel"));
        assert_eq!(chef.default_task().unwrap().name(), "release");
    }

    #[test]
    fn test_run_named_passes_status_through() {
        let mut chef = TaskSelector::with_runner(Echo::default());
        chef.add(task("ok", "cc")).learn(task("broken", "fail"));
        assert_eq!(chef.run_named_with("broken", &Quiet).unwrap(), 2);
    }

    #[test]
    fn test_unknown_name_is_reported() {
        let mut chef = TaskSelector::with_runner(Echo::default());
        chef.add(task("ok", "cc"));
        let err = chef.run_named_with("missing", &Quiet).unwrap_err();
        assert!(matches!(err, BuildError::UnknownTask(ref n) if n == "missing"));
        assert!(matches!(
            chef.run_named_with("", &Quiet),
            Err(BuildError::EmptyTaskName)
        ));
        assert!(chef.jobs.ran.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_selector_has_no_default() {
        let chef = TaskSelector::with_runner(Echo::default());
        assert!(matches!(chef.run_default_with(&Quiet), Err(BuildError::NoTasks)));
    }

    #[test]
    fn test_runs_even_when_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("main.c");
        let out = dir.path().join("main");
        std::fs::write(&src, "").unwrap();
        std::fs::write(&out, "").unwrap();

        let cached = BuildTask::new("cached")
            .set_compiler("cc")
            .set_output(out.to_string_lossy())
            .unwrap()
            .set_files(FileSet::new().append(src.to_string_lossy()))
            .enable_cache();

        let mut chef = TaskSelector::with_runner(Echo::default());
        chef.add(cached);
        chef.run_default_with(&Quiet).unwrap();
        assert_eq!(chef.jobs.ran.lock().unwrap().len(), 1);
    }
}
