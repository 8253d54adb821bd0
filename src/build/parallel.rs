//! Parallel fan-out of stale tasks.
//!
//! [`TaskRunner::execute`] decides staleness for every registered task, renders
//! the stale ones, then starts one scoped OS thread per stale task and joins
//! them all. Concurrency is unbounded: N stale tasks means N compilers at
//! once. Callers that need a cap should split their tasks across several
//! runners.
//!
//! Failures use first-error-wins aggregation. The shared slot starts at zero
//! and only the first failing store lands; later failures are still reported
//! but do not overwrite it. No task cancels its siblings.

use crate::build::JOIN_FAILURE;
use crate::error::BuildError;
use crate::job::{JobRunner, Subprocess};
use crate::task::BuildTask;
use crate::ui::{ConsoleReporter, Reporter};
use rayon::prelude::*;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

/// Lifecycle of a task inside one [`TaskRunner::execute`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Skipped,
    Scheduled,
    Running,
    Succeeded,
    Failed(i32),
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Skipped | TaskState::Succeeded | TaskState::Failed(_)
        )
    }
}

/// Result of a parallel run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// First failing status observed, or 0.
    pub status: i32,
    /// Final state of every registered task, in registration order.
    pub states: Vec<(String, TaskState)>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.states
            .iter()
            .find(|(task, _)| task == name)
            .map(|(_, state)| *state)
    }

    pub fn count(&self, wanted: fn(TaskState) -> bool) -> usize {
        self.states.iter().filter(|(_, s)| wanted(*s)).count()
    }
}

pub struct TaskRunner<R: JobRunner = Subprocess> {
    tasks: Vec<BuildTask>,
    jobs: R,
}

impl TaskRunner<Subprocess> {
    pub fn new() -> Self {
        Self::with_runner(Subprocess)
    }
}

impl Default for TaskRunner<Subprocess> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: JobRunner> TaskRunner<R> {
    pub fn with_runner(jobs: R) -> Self {
        Self {
            tasks: Vec::new(),
            jobs,
        }
    }

    pub fn add(&mut self, task: BuildTask) -> &mut Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(&self) -> &[BuildTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every stale task and returns the aggregated status, printing to
    /// the console.
    pub fn run_all(&self) -> Result<i32, BuildError> {
        let reporter = ConsoleReporter::default();
        self.execute(&reporter).map(|report| report.status)
    }

    /// Runs every stale task, reporting through `reporter`.
    ///
    /// Returns a configuration error, before anything is spawned, if any
    /// stale task cannot be rendered.
    pub fn execute(&self, reporter: &dyn Reporter) -> Result<RunReport, BuildError> {
        let mut states = vec![TaskState::Pending; self.tasks.len()];

        let stale: Vec<bool> = self.tasks.par_iter().map(|t| t.needs_rebuild()).collect();

        let mut scheduled = Vec::new();
        for (index, task) in self.tasks.iter().enumerate() {
            if stale[index] {
                scheduled.push((index, task.render_command()?));
            }
        }

        for (index, task) in self.tasks.iter().enumerate() {
            if !stale[index] {
                states[index] = TaskState::Skipped;
                reporter.skipped(task.name());
            }
        }
        for (index, _) in &scheduled {
            states[*index] = TaskState::Scheduled;
        }

        let error = AtomicI32::new(0);
        let jobs = &self.jobs;
        let tasks = &self.tasks;

        thread::scope(|scope| {
            let handles: Vec<_> = scheduled
                .iter()
                .map(|(index, argv)| {
                    states[*index] = TaskState::Running;
                    let name = tasks[*index].name();
                    let error = &error;
                    let handle = scope.spawn(move || {
                        reporter.command(name, argv);
                        let status = jobs.run(argv);
                        if status == 0 {
                            reporter.succeeded(name);
                        } else {
                            reporter.failed(name, status);
                            let _ = error.compare_exchange(
                                0,
                                status,
                                Ordering::SeqCst,
                                Ordering::SeqCst,
                            );
                        }
                        status
                    });
                    (*index, handle)
                })
                .collect();

            for (index, handle) in handles {
                let status = match handle.join() {
                    Ok(status) => status,
                    Err(_) => {
                        reporter.failed(tasks[index].name(), JOIN_FAILURE);
                        let _ = error.compare_exchange(
                            0,
                            JOIN_FAILURE,
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        );
                        JOIN_FAILURE
                    }
                };
                states[index] = if status == 0 {
                    TaskState::Succeeded
                } else {
                    TaskState::Failed(status)
                };
            }
        });

        let status = error.load(Ordering::SeqCst);
        reporter.finished(status);

        Ok(RunReport {
            status,
            states: self
                .tasks
                .iter()
                .map(|t| t.name().to_string())
                .zip(states)
                .collect(),
        })
    }
}
