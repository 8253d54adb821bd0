//! Build tasks: one compiler invocation each.
//!
//! A [`BuildTask`] is configured through a by-value builder and rendered into
//! an argv list by [`BuildTask::render_command`]. The rendered order is
//!
//! ```text
//! compiler cflags... [-std=<v>] [-O<level>] -l<lib>... [-o output] inputs... ldflags...
//! ```
//!
//! which keeps language and optimization flags ahead of sources and link
//! flags after them, for left-to-right symbol resolution.

use crate::error::BuildError;
use crate::fileset::{FileSet, to_host_separators};
use crate::staleness::{self, Freshness};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Optimization levels understood by GCC and Clang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptLevel {
    O0,
    O1,
    O2,
    O3,
    Ofast,
    Os,
    Oz,
    Og,
}

impl OptLevel {
    pub const ALL: [OptLevel; 8] = [
        OptLevel::O0,
        OptLevel::O1,
        OptLevel::O2,
        OptLevel::O3,
        OptLevel::Ofast,
        OptLevel::Os,
        OptLevel::Oz,
        OptLevel::Og,
    ];

    pub fn as_flag(self) -> &'static str {
        match self {
            OptLevel::O0 => "-O0",
            OptLevel::O1 => "-O1",
            OptLevel::O2 => "-O2",
            OptLevel::O3 => "-O3",
            OptLevel::Ofast => "-Ofast",
            OptLevel::Os => "-Os",
            OptLevel::Oz => "-Oz",
            OptLevel::Og => "-Og",
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

impl FromStr for OptLevel {
    type Err = String;

    /// Accepts `O2` and `-O2` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = normalize_opt_flag(s);
        OptLevel::ALL
            .into_iter()
            .find(|level| level.as_flag() == flag)
            .ok_or_else(|| format!("unknown optimization level '{}'", s))
    }
}

fn normalize_opt_flag(level: &str) -> String {
    if level.starts_with('-') {
        level.to_string()
    } else {
        format!("-{}", level)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildTask {
    name: String,
    compiler: Option<String>,
    std_version: Option<String>,
    optimization: Option<String>,
    cflags: Vec<String>,
    ldflags: Vec<String>,
    libraries: Vec<String>,
    output: Option<PathBuf>,
    files: Option<FileSet>,
    cache: bool,
}

impl BuildTask {
    /// Creates an unconfigured task. Caching starts disabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compiler(&self) -> Option<&str> {
        self.compiler.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn files(&self) -> Option<&FileSet> {
        self.files.as_ref()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache
    }

    pub fn set_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    /// Sets the language standard, rendered as `-std=<version>`.
    pub fn set_std(mut self, version: impl Into<String>) -> Self {
        self.std_version = Some(version.into());
        self
    }

    pub fn set_optimization(mut self, level: OptLevel) -> Self {
        self.optimization = Some(level.as_flag().to_string());
        self
    }

    /// Sets a raw optimization flag; a leading `-` is added when missing.
    pub fn set_optimization_flag(mut self, level: &str) -> Self {
        self.optimization = Some(normalize_opt_flag(level));
        self
    }

    pub fn add_cflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn add_ldflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ldflags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Adds library names, each rendered as `-l<name>`.
    pub fn add_libraries<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries.extend(libs.into_iter().map(Into::into));
        self
    }

    pub fn set_files(mut self, files: FileSet) -> Self {
        self.files = Some(files);
        self
    }

    pub fn enable_cache(self) -> Self {
        self.set_cache(true)
    }

    pub fn set_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the output path and creates its missing parent directories now,
    /// so a bad output location fails at configuration time. A blank path
    /// leaves the output unset.
    pub fn set_output(mut self, path: impl AsRef<str>) -> Result<Self, BuildError> {
        let path = path.as_ref().trim();
        if path.is_empty() {
            self.output = None;
            return Ok(self);
        }
        let output = PathBuf::from(to_host_separators(path));
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        self.output = Some(output);
        Ok(self)
    }

    /// Renders the argv for this task.
    pub fn render_command(&self) -> Result<Vec<String>, BuildError> {
        let compiler = self
            .compiler
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| BuildError::MissingCompiler {
                task: self.name.clone(),
            })?;
        let files = self.files.as_ref().ok_or_else(|| BuildError::MissingFiles {
            task: self.name.clone(),
        })?;

        let mut command = vec![compiler.to_string()];
        command.extend(self.cflags.iter().cloned());

        if let Some(version) = self.std_version.as_deref().filter(|v| !v.is_empty()) {
            command.push(format!("-std={}", version));
        }
        if let Some(level) = self.optimization.as_deref().filter(|l| !l.is_empty()) {
            command.push(level.to_string());
        }

        command.extend(self.libraries.iter().map(|lib| format!("-l{}", lib)));

        if let Some(output) = &self.output {
            command.push("-o".to_string());
            command.push(output.to_string_lossy().to_string());
        }

        command.extend(files.resolve());
        command.extend(self.ldflags.iter().cloned());

        Ok(command)
    }

    /// Classifies the declared output against the resolved inputs.
    ///
    /// A task with no files assigned reports [`Freshness::NoFiles`]; rendering
    /// it then raises the configuration error.
    pub fn freshness(&self) -> Freshness {
        if !self.cache {
            return Freshness::Uncached;
        }
        match &self.files {
            Some(files) => staleness::check(self.output(), &files.resolve(), true),
            None => Freshness::NoFiles,
        }
    }

    pub fn needs_rebuild(&self) -> bool {
        self.freshness().needs_rebuild()
    }
}
