//! `kiln watch`: re-run the parallel build whenever an input changes.

use crate::config::{KilnConfig, load_config};
use crate::fileset::SOURCE_EXTENSIONS;
use crate::ui::ConsoleReporter;
use anyhow::Result;
use colored::*;
use notify::{Config, Event, EventKind, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}

/// What one loaded config asks the watcher to observe.
#[derive(Debug, Default)]
struct WatchPlan {
    /// Every resolved input of every task, made absolute.
    inputs: HashSet<PathBuf>,
    /// `sources` directories; new files appearing below them matter too.
    source_roots: HashSet<PathBuf>,
    /// Directories to register with the watcher.
    dirs: HashMap<PathBuf, RecursiveMode>,
}

impl WatchPlan {
    // Directories rather than files, so editors that replace files on save
    // are still seen.
    fn new(config: &KilnConfig, cwd: &Path, config_file: &Path) -> Result<Self> {
        let mut plan = WatchPlan::default();
        for task in config.build_tasks()? {
            if let Some(files) = task.files() {
                for file in files.resolve() {
                    plan.inputs.insert(absolute(Path::new(&file), cwd));
                }
            }
        }
        for task in &config.tasks {
            if let Some(dir) = &task.sources {
                plan.source_roots.insert(absolute(Path::new(dir), cwd));
            }
        }

        for parent in plan.inputs.iter().filter_map(|p| p.parent()) {
            plan.dirs
                .insert(parent.to_path_buf(), RecursiveMode::NonRecursive);
        }
        if let Some(parent) = config_file.parent() {
            plan.dirs
                .entry(parent.to_path_buf())
                .or_insert(RecursiveMode::NonRecursive);
        }
        for root in &plan.source_roots {
            plan.dirs.insert(root.clone(), RecursiveMode::Recursive);
        }
        Ok(plan)
    }

    /// `true` if the event touches a watched input, the config file, or
    /// creates a source file under a `sources` directory.
    fn is_relevant(&self, event: &Event, config_file: &Path) -> bool {
        event.paths.iter().any(|path| {
            let path = path.canonicalize().unwrap_or_else(|_| path.clone());
            path == config_file
                || self.inputs.contains(&path)
                || (matches!(event.kind, EventKind::Create(_)) && self.is_new_source(&path))
        })
    }

    fn is_new_source(&self, path: &Path) -> bool {
        let is_source = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e));
        is_source && self.source_roots.iter().any(|root| path.starts_with(root))
    }
}

/// Splits the difference between the active and wanted registrations into
/// directories to drop and directories to (re)register.
fn diff_watches(
    active: &HashMap<PathBuf, RecursiveMode>,
    wanted: &HashMap<PathBuf, RecursiveMode>,
) -> (Vec<PathBuf>, Vec<(PathBuf, RecursiveMode)>) {
    let unwatch = active
        .iter()
        .filter(|(dir, mode)| wanted.get(*dir) != Some(*mode))
        .map(|(dir, _)| dir.clone())
        .collect();
    let watch = wanted
        .iter()
        .filter(|(dir, mode)| active.get(*dir) != Some(*mode))
        .map(|(dir, mode)| (dir.clone(), *mode))
        .collect();
    (unwatch, watch)
}

/// Brings the watcher in line with `plan`. Directories that do not exist yet
/// stay out of `active` and are retried on the next reload.
fn sync_watches(
    watcher: &mut impl Watcher,
    active: &mut HashMap<PathBuf, RecursiveMode>,
    plan: &WatchPlan,
) {
    let (unwatch, watch) = diff_watches(active, &plan.dirs);
    for dir in unwatch {
        let _ = watcher.unwatch(&dir);
        active.remove(&dir);
    }
    for (dir, mode) in watch {
        if !dir.is_dir() {
            continue;
        }
        match watcher.watch(&dir, mode) {
            Ok(()) => {
                active.insert(dir, mode);
            }
            Err(e) => println!("{} Cannot watch {}: {}", "!".yellow(), dir.display(), e),
        }
    }
}

fn rebuild(config: &KilnConfig) {
    print!("\x1B[2J\x1B[1;1H");
    println!("{} Change detected. Rebuilding...", "🔄".yellow());

    let result = config
        .runner()
        .and_then(|runner| Ok(runner.execute(&ConsoleReporter::new(true))?));
    match result {
        Ok(report) if report.success() => println!("{} Build finished", "✓".green()),
        Ok(report) => println!("{} Build failed with status {}", "x".red(), report.status),
        Err(e) => println!("{} Error: {}", "x".red(), e),
    }
}

pub fn watch(config_path: &Path) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config_file = absolute(config_path, &cwd);
    let mut config = load_config(config_path)?;
    let mut plan = WatchPlan::new(&config, &cwd, &config_file)?;

    let (tx, rx) = channel::<notify::Result<Event>>();
    let notify_config = Config::default().with_poll_interval(Duration::from_secs(1));
    let mut watcher = notify::RecommendedWatcher::new(tx, notify_config)?;
    let mut active = HashMap::new();
    sync_watches(&mut watcher, &mut active, &plan);

    println!(
        "{} Watching {} input file(s) across {} director{}...",
        "👀".cyan(),
        plan.inputs.len(),
        active.len(),
        if active.len() == 1 { "y" } else { "ies" }
    );

    rebuild(&config);

    while let Ok(event) = rx.recv() {
        let Ok(event) = event else {
            continue;
        };
        if !plan.is_relevant(&event, &config_file) {
            continue;
        }

        std::thread::sleep(Duration::from_millis(100));
        while rx.try_recv().is_ok() {}

        match load_config(config_path) {
            Ok(fresh) => {
                match WatchPlan::new(&fresh, &cwd, &config_file) {
                    Ok(next) => {
                        sync_watches(&mut watcher, &mut active, &next);
                        plan = next;
                    }
                    Err(e) => println!("{} Keeping previous watch list: {}", "!".yellow(), e),
                }
                config = fresh;
            }
            Err(e) => println!("{} Keeping previous config: {}", "!".yellow(), e),
        }
        rebuild(&config);
    }
    Ok(())
}
