//! Timestamp-based rebuild decisions.
//!
//! The checker never fails: any filesystem error while reading a timestamp
//! is treated as "rebuild", and the compile step reports the real problem.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Outcome of a staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Caching is disabled for the task
    Uncached,
    /// No output path was declared
    NoOutput,
    /// The declared output does not exist (or cannot be read)
    OutputMissing,
    /// The task has no file set assigned
    NoFiles,
    /// An input could not be read; let the compiler report it
    InputMissing,
    /// An input is strictly newer than the output
    InputNewer,
    /// The output is at least as new as every input
    Fresh,
}

impl Freshness {
    pub fn needs_rebuild(self) -> bool {
        !matches!(self, Freshness::Fresh)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Freshness::Uncached => "caching disabled",
            Freshness::NoOutput => "no output declared",
            Freshness::OutputMissing => "output missing",
            Freshness::NoFiles => "no files assigned",
            Freshness::InputMissing => "input missing",
            Freshness::InputNewer => "input newer than output",
            Freshness::Fresh => "up to date",
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Classifies `output` against `inputs`.
pub fn check<P: AsRef<Path>>(output: Option<&Path>, inputs: &[P], cache: bool) -> Freshness {
    if !cache {
        return Freshness::Uncached;
    }

    let Some(output) = output else {
        return Freshness::NoOutput;
    };

    let Some(output_mtime) = modified(output) else {
        return Freshness::OutputMissing;
    };

    for input in inputs {
        match modified(input.as_ref()) {
            None => return Freshness::InputMissing,
            Some(input_mtime) if input_mtime > output_mtime => return Freshness::InputNewer,
            Some(_) => {}
        }
    }

    Freshness::Fresh
}

/// `true` if the output must be rebuilt.
pub fn needs_rebuild<P: AsRef<Path>>(output: Option<&Path>, inputs: &[P], cache: bool) -> bool {
    check(output, inputs, cache).needs_rebuild()
}
