pub mod bootstrap;
mod clean;
pub mod compile_commands;
pub mod parallel;
pub mod selector;
mod watcher;

pub use clean::clean;
pub use parallel::{RunReport, TaskRunner, TaskState};
pub use selector::TaskSelector;
pub use watcher::watch;

/// Status recorded for a worker thread that panicked instead of returning.
pub const JOIN_FAILURE: i32 = 101;
