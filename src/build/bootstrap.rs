//! Self-rebuilding build programs.
//!
//! A build program compiled from a single source file can call
//! [`SelfRebuild::run`] first thing in `main`. When the source is newer than
//! the running executable (or `force` is set) the source is recompiled in
//! place and the process image is replaced by the fresh binary, with the
//! original arguments forwarded unchanged.
//!
//! ```no_run
//! use kiln::build::bootstrap::SelfRebuild;
//!
//! fn main() -> anyhow::Result<()> {
//!     SelfRebuild::new("build.cpp", "clang++")
//!         .with_flags(["-Oz"])
//!         .run_from_env()?;
//!     // ... configure and run tasks ...
//!     Ok(())
//! }
//! ```

use crate::job::{JobRunner, Subprocess};
use crate::staleness;
use crate::ui::format_command;
use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Strips the last extension from a source file name: `build.cpp` → `build`.
pub fn executable_name_for(source_file: &str) -> String {
    match source_file.rfind('.') {
        Some(dot) if dot > 0 => source_file[..dot].to_string(),
        _ => source_file.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct SelfRebuild {
    source: PathBuf,
    executable: PathBuf,
    compiler: String,
    flags: Vec<String>,
    force: bool,
}

impl SelfRebuild {
    /// The executable defaults to the source's file stem in the current
    /// directory.
    pub fn new(source: impl Into<PathBuf>, compiler: impl Into<String>) -> Self {
        let source = source.into();
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let executable = Path::new(".").join(executable_name_for(&file_name));

        Self {
            source,
            executable,
            compiler: compiler.into(),
            flags: Vec::new(),
            force: false,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Rebuild on every start, regardless of timestamps.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// `true` if the executable is missing or older than its source.
    pub fn is_stale(&self) -> bool {
        self.force
            || staleness::needs_rebuild(Some(self.executable.as_path()), &[&self.source], true)
    }

    pub fn rebuild_command(&self) -> Vec<String> {
        let mut argv = vec![self.compiler.clone()];
        argv.extend(self.flags.iter().cloned());
        argv.push("-o".to_string());
        argv.push(self.executable.to_string_lossy().to_string());
        argv.push(self.source.to_string_lossy().to_string());
        argv
    }

    /// Rebuilds through `jobs` if stale, then re-executes with `args`
    /// (`args[0]` is the original program name and is replaced).
    ///
    /// Returns `Ok(())` without doing anything when up to date. On Unix a
    /// successful rebuild never returns.
    pub fn run<R: JobRunner>(&self, jobs: &R, args: &[String]) -> Result<()> {
        if !self.is_stale() {
            return Ok(());
        }

        println!(
            "{} Rebuilding {}...",
            "[INFO]:".cyan(),
            self.executable.display()
        );
        let argv = self.rebuild_command();
        println!("{}", format_command(&argv).dimmed());

        let status = jobs.run(&argv);
        if status != 0 {
            return Err(anyhow::anyhow!(
                "Rebuilding {} failed with status {}",
                self.executable.display(),
                status
            ));
        }

        self.reexec(args.get(1..).unwrap_or_default())
    }

    pub fn run_from_env(&self) -> Result<()> {
        let args: Vec<String> = std::env::args().collect();
        self.run(&Subprocess, &args)
    }

    #[cfg(unix)]
    fn reexec(&self, forwarded: &[String]) -> Result<()> {
        use std::os::unix::process::CommandExt;

        let err = Command::new(&self.executable).args(forwarded).exec();
        Err(err).with_context(|| format!("Failed to exec {}", self.executable.display()))
    }

    #[cfg(not(unix))]
    fn reexec(&self, forwarded: &[String]) -> Result<()> {
        let status = Command::new(&self.executable)
            .args(forwarded)
            .status()
            .with_context(|| format!("Failed to start {}", self.executable.display()))?;
        std::process::exit(crate::job::decode_status(status));
    }
}
