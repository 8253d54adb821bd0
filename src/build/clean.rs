//! Removal of declared task outputs (`kiln clean`).

use crate::config::KilnConfig;
use crate::fileset::to_host_separators;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Deletes every task's output file and returns how many were removed.
///
/// Directories are never removed, even if a task names one as its output.
/// With `all`, a generated `compile_commands.json` goes too.
pub fn clean(config: &KilnConfig, all: bool) -> Result<usize> {
    let mut removed = 0;

    for task in &config.tasks {
        let Some(output) = &task.output else {
            continue;
        };
        let path = PathBuf::from(to_host_separators(output));
        if path.is_dir() {
            println!(
                "{} Skipping '{}': output of task '{}' is a directory",
                "!".yellow(),
                path.display(),
                task.name
            );
            continue;
        }
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            println!("   {} Removed {}", "🗑️".red(), path.display());
            removed += 1;
        }
    }

    let compile_db = Path::new(super::compile_commands::FILE_NAME);
    if all && compile_db.exists() {
        fs::remove_file(compile_db).context("Failed to remove compile commands")?;
        removed += 1;
    }

    if removed > 0 {
        println!("{} Clean complete.", "✓".green());
    } else {
        println!("{} Nothing to clean", "!".yellow());
    }
    Ok(removed)
}
