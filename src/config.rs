//! `kiln.toml` parsing.
//!
//! Paths inside the file (outputs, files, source directories) are used as
//! written, relative to the directory `kiln` runs in.

use crate::build::parallel::TaskRunner;
use crate::build::selector::TaskSelector;
use crate::fileset::FileSet;
use crate::task::{BuildTask, OptLevel};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "kiln.toml";
pub const CONFIG_ENV: &str = "KILN_CONFIG";

#[derive(Deserialize, Debug, Default)]
pub struct KilnConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

/// Values applied to every task that leaves them unset.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct Defaults {
    pub compiler: Option<String>,
    pub std: Option<String>,
    pub opt: Option<String>,
    pub cache: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct TaskConfig {
    pub name: String,
    pub compiler: Option<String>,
    pub std: Option<String>,
    pub opt: Option<String>,
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub ldflags: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    pub output: Option<String>,
    pub prefix: Option<String>,
    pub files: Option<Vec<String>>,
    /// Directory scanned for C/C++ sources, appended after `files`.
    pub sources: Option<String>,
    pub cache: Option<bool>,
    #[serde(default)]
    pub default: bool,
}

impl TaskConfig {
    pub fn to_task(&self, defaults: &Defaults) -> Result<BuildTask> {
        let mut task = BuildTask::new(&self.name);

        if let Some(compiler) = self.compiler.as_ref().or(defaults.compiler.as_ref()) {
            task = task.set_compiler(compiler);
        }
        if let Some(std) = self.std.as_ref().or(defaults.std.as_ref()) {
            task = task.set_std(std);
        }
        if let Some(opt) = self.opt.as_ref().or(defaults.opt.as_ref()) {
            task = match opt.parse::<OptLevel>() {
                Ok(level) => task.set_optimization(level),
                Err(_) => task.set_optimization_flag(opt),
            };
        }

        task = task
            .add_cflags(&self.cflags)
            .add_ldflags(&self.ldflags)
            .add_libraries(&self.libs)
            .set_cache(self.cache.or(defaults.cache).unwrap_or(false));

        if let Some(output) = &self.output {
            task = task
                .set_output(output)
                .with_context(|| format!("Failed to prepare output for task '{}'", self.name))?;
        }

        if self.files.is_some() || self.sources.is_some() {
            let mut files = FileSet::new();
            if let Some(listed) = &self.files {
                files.extend(listed.iter().cloned());
            }
            if let Some(dir) = &self.sources {
                let scanned = FileSet::from_dir(dir)
                    .with_context(|| format!("Failed to collect sources for '{}'", self.name))?;
                files.extend(scanned.resolve());
            }
            if let Some(prefix) = &self.prefix {
                files.set_prefix(prefix);
            }
            task = task.set_files(files);
        }

        Ok(task)
    }
}

impl KilnConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: KilnConfig = toml::from_str(content).context(
            "Failed to parse kiln.toml - check for syntax errors (missing quotes, brackets)",
        )?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(anyhow::anyhow!("Every [[task]] needs a non-empty name"));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(anyhow::anyhow!("Task '{}' is defined twice", task.name));
            }
        }

        let defaults: Vec<&str> = self
            .tasks
            .iter()
            .filter(|t| t.default)
            .map(|t| t.name.as_str())
            .collect();
        if defaults.len() > 1 {
            return Err(anyhow::anyhow!(
                "Only one task can be the default, found: {}",
                defaults.join(", ")
            ));
        }
        Ok(())
    }

    pub fn build_tasks(&self) -> Result<Vec<BuildTask>> {
        self.tasks
            .iter()
            .map(|t| t.to_task(&self.defaults))
            .collect()
    }

    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Name of the task `kiln cook` runs without arguments.
    pub fn default_task_name(&self) -> Option<&str> {
        self.tasks
            .iter()
            .find(|t| t.default)
            .or(self.tasks.first())
            .map(|t| t.name.as_str())
    }

    pub fn runner(&self) -> Result<TaskRunner> {
        let mut runner = TaskRunner::new();
        for task in self.build_tasks()? {
            runner.add(task);
        }
        Ok(runner)
    }

    pub fn selector(&self) -> Result<TaskSelector> {
        let has_explicit = self.tasks.iter().any(|t| t.default);
        let mut selector = TaskSelector::new();
        for cfg in &self.tasks {
            let task = cfg.to_task(&self.defaults)?;
            if cfg.default {
                selector.set_default(task);
            } else if has_explicit {
                selector.learn(task);
            } else {
                selector.add(task);
            }
        }
        Ok(selector)
    }
}

/// Picks the config path: explicit flag, then `KILN_CONFIG`, then `kiln.toml`.
pub fn config_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG),
    }
}

pub fn load_config(path: &Path) -> Result<KilnConfig> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "{} not found.\n\n\
            💡 Tip: create one with at least one [[task]] table, or pass --config <path>.",
            path.display()
        ));
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} - check file permissions", path.display()))?;
    KilnConfig::parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[defaults]
compiler = "clang++"
std = "c++20"
cache = true

[[task]]
name = "debug"
opt = "Og"
cflags = ["-g", "-Wall"]
files = ["main.cpp", "util.cpp"]
prefix = "src/"

[[task]]
name = "release"
compiler = "g++"
opt = "-O3"
libs = ["m"]
ldflags = ["-static"]
files = ["src/main.cpp"]
cache = false
default = true
"#;

    #[test]
    fn test_parse_sample() {
        let config = KilnConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.tasks.len(), 2);
        assert_eq!(config.defaults.compiler.as_deref(), Some("clang++"));
        assert_eq!(config.default_task_name(), Some("release"));
    }

    #[cfg(unix)]
    #[test]
    fn test_defaults_fill_unset_fields() {
        let config = KilnConfig::parse(SAMPLE).unwrap();
        let tasks = config.build_tasks().unwrap();

        assert_eq!(
            tasks[0].render_command().unwrap(),
            vec![
                "clang++", "-g", "-Wall", "-std=c++20", "-Og", "src/main.cpp", "src/util.cpp"
            ]
        );
        assert!(tasks[0].cache_enabled());

        assert_eq!(
            tasks[1].render_command().unwrap(),
            vec!["g++", "-std=c++20", "-O3", "-lm", "src/main.cpp", "-static"]
        );
        assert!(!tasks[1].cache_enabled());
    }

    #[test]
    fn test_raw_opt_flag_falls_back() {
        let config = KilnConfig::parse(
            r#"
[[task]]
name = "t"
compiler = "cc"
opt = "O2 -fno-inline"
files = []
"#,
        )
        .unwrap();
        let task = &config.build_tasks().unwrap()[0];
        assert_eq!(task.render_command().unwrap(), vec!["cc", "-O2 -fno-inline"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = KilnConfig::parse(
            r#"
[[task]]
name = "a"
[[task]]
name = "a"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("defined twice"));
    }

    #[test]
    fn test_two_defaults_rejected() {
        let err = KilnConfig::parse(
            r#"
[[task]]
name = "a"
default = true
[[task]]
name = "b"
default = true
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Only one task"));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(KilnConfig::parse("[[task]]\nname = \"  \"\n").is_err());
    }

    #[test]
    fn test_task_without_files_fails_at_render() {
        let config = KilnConfig::parse("[[task]]\nname = \"t\"\ncompiler = \"cc\"\n").unwrap();
        let task = &config.build_tasks().unwrap()[0];
        assert!(task.render_command().is_err());
    }

    #[test]
    fn test_selector_respects_explicit_default() {
        let config = KilnConfig::parse(SAMPLE).unwrap();
        let selector = config.selector().unwrap();
        assert_eq!(selector.default_task().unwrap().name(), "release");
        assert_eq!(selector.tasks().len(), 2);
    }

    #[test]
    fn test_output_directory_created_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("bin").join("app");
        let toml = format!(
            "[[task]]\nname = \"t\"\ncompiler = \"cc\"\nfiles = []\noutput = {:?}\n",
            out.to_string_lossy()
        );
        let config = KilnConfig::parse(&toml).unwrap();
        config.build_tasks().unwrap();
        assert!(dir.path().join("out").join("bin").is_dir());
    }

    #[test]
    fn test_missing_config_has_tip() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("kiln.toml")).unwrap_err();
        assert!(err.to_string().contains("Tip"));
    }

    #[test]
    fn test_config_path_prefers_flag() {
        assert_eq!(
            config_path(Some(Path::new("custom.toml"))),
            PathBuf::from("custom.toml")
        );
    }
}
