//! # kiln - build recipes without a build system
//!
//! kiln describes compiler invocations as [`task::BuildTask`]s, groups input
//! files into [`fileset::FileSet`]s, and runs them either one at a time
//! ([`build::TaskSelector`]) or all at once ([`build::TaskRunner`]), skipping
//! tasks whose output is newer than every input.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kiln::build::TaskRunner;
//! use kiln::fileset::FileSet;
//! use kiln::task::{BuildTask, OptLevel};
//!
//! # fn main() -> Result<(), kiln::error::BuildError> {
//! let app = BuildTask::new("app")
//!     .set_compiler("clang++")
//!     .set_std("c++20")
//!     .set_optimization(OptLevel::O2)
//!     .set_output("build/app")?
//!     .set_files(FileSet::new().with_prefix("src/").append("main.cpp"))
//!     .enable_cache();
//!
//! let mut runner = TaskRunner::new();
//! runner.add(app);
//! std::process::exit(runner.run_all()?);
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Parallel runner, serial selector, self-rebuild, clean/watch
//! - [`config`] - `kiln.toml` parsing
//! - [`job`] - Subprocess execution and exit-status decoding

/// Task orchestration: parallel and serial runners.
pub mod build;

/// Configuration file parsing (`kiln.toml`).
pub mod config;

pub mod error;

/// Prefix-aware file lists.
pub mod fileset;

/// Subprocess execution.
pub mod job;

/// Output-vs-input timestamp checks.
pub mod staleness;

/// Compiler invocations.
pub mod task;

/// Terminal output and the diagnostic stream.
pub mod ui;
