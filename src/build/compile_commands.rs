//! `compile_commands.json` generation for editor tooling.

use crate::task::BuildTask;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

pub const FILE_NAME: &str = "compile_commands.json";

/// One entry per input file of every task, in task order.
pub fn entries(tasks: &[BuildTask], directory: &Path) -> Result<Vec<Value>> {
    let directory = directory.to_string_lossy().to_string();
    let mut out = Vec::new();

    for task in tasks {
        let argv = task.render_command()?;
        let Some(files) = task.files() else {
            continue;
        };
        for file in files.resolve() {
            let mut entry = json!({
                "directory": directory,
                "arguments": argv,
                "file": file,
            });
            if let Some(output) = task.output() {
                entry["output"] = json!(output.to_string_lossy());
            }
            out.push(entry);
        }
    }

    Ok(out)
}

/// Writes the database to `path` and returns the number of entries.
pub fn write(tasks: &[BuildTask], path: &Path) -> Result<usize> {
    let cwd = std::env::current_dir()?;
    let entries = entries(tasks, &cwd)?;
    let json_str = serde_json::to_string_pretty(&entries)?;
    fs::write(path, json_str).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(entries.len())
}
