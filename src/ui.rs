//! Terminal output: the diagnostic stream and the task table.
//!
//! Runners never print directly. They emit events to a [`Reporter`], and the
//! default [`ConsoleReporter`] turns those into colored lines:
//!
//! ```text
//! [COMMAND]: clang++ -std=c++20 -o build/app main.cpp
//! x Task 'app' exited with error status: 1
//! ```

use colored::*;
use indicatif::ProgressBar;
use std::sync::Mutex;

/// Receives build events. Shared across worker threads.
pub trait Reporter: Sync {
    /// A command is about to be executed.
    fn command(&self, task: &str, argv: &[String]);
    /// A task was up to date and will not run.
    fn skipped(&self, _task: &str) {}
    /// A task's command exited with a non-zero status.
    fn failed(&self, task: &str, status: i32);
    /// A task's command exited with status zero.
    fn succeeded(&self, _task: &str) {}
    /// Every scheduled task has joined; `status` is the aggregated result.
    fn finished(&self, _status: i32) {}
}

/// Renders an argv the way it is echoed before execution.
pub fn format_command(argv: &[String]) -> String {
    let mut line = String::from("[COMMAND]:");
    for arg in argv {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Prints events to stdout/stderr, optionally through a progress bar.
#[derive(Default)]
pub struct ConsoleReporter {
    progress: Mutex<Option<ProgressBar>>,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            progress: Mutex::new(None),
            verbose,
        }
    }

    /// Routes output through `bar` until [`ConsoleReporter::detach`] is called.
    pub fn attach(&self, bar: ProgressBar) {
        if let Ok(mut slot) = self.progress.lock() {
            *slot = Some(bar);
        }
    }

    pub fn detach(&self) -> Option<ProgressBar> {
        self.progress.lock().ok().and_then(|mut slot| slot.take())
    }

    fn emit(&self, line: String, to_stderr: bool) {
        let guard = self.progress.lock().ok();
        match guard.as_ref().and_then(|slot| slot.as_ref()) {
            Some(bar) => bar.println(line),
            None if to_stderr => eprintln!("{}", line),
            None => println!("{}", line),
        }
    }

    fn tick(&self) {
        if let Ok(slot) = self.progress.lock()
            && let Some(bar) = slot.as_ref()
        {
            bar.inc(1);
        }
    }
}

impl Reporter for ConsoleReporter {
    fn command(&self, _task: &str, argv: &[String]) {
        self.emit(format_command(argv).dimmed().to_string(), false);
    }

    fn skipped(&self, task: &str) {
        self.tick();
        if self.verbose {
            self.emit(format!("{} {} is up to date", "⚡".green(), task.bold()), false);
        }
    }

    fn failed(&self, task: &str, status: i32) {
        self.tick();
        self.emit(
            format!(
                "{} Task '{}' exited with error status: {}",
                "x".red(),
                task,
                status
            ),
            true,
        );
    }

    fn succeeded(&self, task: &str) {
        self.tick();
        if self.verbose {
            self.emit(format!("{} {}", "✓".green(), task), false);
        }
    }
}

/// Box-drawn table sized to the terminal.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(console::measure_text_width(cell));
            }
        }

        // "  │ " + " │ " between columns + " │"
        let overhead = 3 + 3 * widths.len();
        while overhead + widths.iter().sum::<usize>() > max_width {
            let Some(widest) = widths.iter_mut().max() else {
                break;
            };
            if *widest <= 8 {
                break;
            }
            *widest -= 1;
        }
        widths
    }

    /// Renders the table to a string without printing it.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(max_width);

        let rule = |left: &str, mid: &str, right: &str| {
            let cells: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, cells.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut out = String::from("  │");
            for (cell, width) in cells.iter().zip(&widths) {
                let truncated = console::truncate_str(cell, *width, "...");
                let text: &str = &truncated;
                let pad = width.saturating_sub(console::measure_text_width(text));
                let shown = if bold {
                    text.bold().to_string()
                } else {
                    text.to_string()
                };
                out.push_str(&format!(" {}{} │", shown, " ".repeat(pad)));
            }
            out.push('\n');
            out
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }

    pub fn print(&self) {
        let (_, columns) = console::Term::stdout().size();
        print!("{}", self.render(columns as usize));
    }
}
