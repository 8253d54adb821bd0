//! # kiln CLI Entry Point
//!
//! Loads `kiln.toml` and routes commands:
//! - **Run**: `build` (parallel, stale tasks only), `cook` (one task, always)
//! - **Inspect**: `list`, `show`
//! - **Housekeeping**: `clean`, `watch`, `compile-commands`, `completion`
//!
//! The process exit code of `build` and `cook` is the aggregated compiler
//! status: 0 on success, otherwise the first failure observed.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use kiln::build;
use kiln::config::{self, KilnConfig};
use kiln::ui::{self, ConsoleReporter};

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_windows_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_windows_utf8_console() {}

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Run compiler recipes, rebuilding only what is stale", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the task file [default: $KILN_CONFIG or kiln.toml]
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stale task in parallel
    Build {
        /// Report skipped and finished tasks too
        #[arg(short, long)]
        verbose: bool,
    },
    /// Run one task (the default if no name is given), ignoring timestamps
    Cook {
        /// Task name
        name: Option<String>,
    },
    /// List configured tasks
    List,
    /// Print a task's command and whether it is stale, without running it
    Show {
        /// Task name
        name: String,
    },
    /// Remove task outputs
    Clean {
        /// Also remove compile_commands.json
        #[arg(long)]
        all: bool,
    },
    /// Rebuild whenever an input file changes
    Watch,
    /// Generate compile_commands.json (for IDE integration)
    CompileCommands {
        /// Output path
        #[arg(long, short, default_value = build::compile_commands::FILE_NAME)]
        output: PathBuf,
    },
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn main() -> Result<()> {
    enable_windows_utf8_console();

    let cli = Cli::parse();
    let config_path = config::config_path(cli.config.as_deref());

    match cli.command {
        Commands::Build { verbose } => {
            let config = config::load_config(&config_path)?;
            let status = run_build(&config, verbose)?;
            std::process::exit(status);
        }
        Commands::Cook { name } => {
            let config = config::load_config(&config_path)?;
            let selector = config.selector()?;
            let status = match name {
                Some(name) => selector.run_named(&name)?,
                None => selector.run_default()?,
            };
            if status != 0 {
                eprintln!("{} Exited with status {}", "x".red(), status);
            }
            std::process::exit(status);
        }
        Commands::List => list(&config::load_config(&config_path)?),
        Commands::Show { name } => show(&config::load_config(&config_path)?, &name),
        Commands::Clean { all } => {
            build::clean(&config::load_config(&config_path)?, all)?;
            Ok(())
        }
        Commands::Watch => build::watch(&config_path),
        Commands::CompileCommands { output } => {
            let config = config::load_config(&config_path)?;
            let tasks = config.build_tasks()?;
            let count = build::compile_commands::write(&tasks, &output)?;
            println!(
                "{} Wrote {} entries to {}",
                "✓".green(),
                count,
                output.display()
            );
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn run_build(config: &KilnConfig, verbose: bool) -> Result<i32> {
    let runner = config.runner()?;
    if runner.is_empty() {
        println!("{} No tasks defined.", "!".yellow());
        return Ok(0);
    }

    let reporter = ConsoleReporter::new(verbose);
    if console::Term::stdout().is_term() {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-");
        let bar = ProgressBar::new(runner.len() as u64);
        bar.set_style(style);
        bar.set_message("Cooking...");
        reporter.attach(bar);
    }

    let report = runner.execute(&reporter)?;
    if let Some(bar) = reporter.detach() {
        bar.finish_and_clear();
    }

    let ran = report.count(|s| {
        matches!(
            s,
            build::TaskState::Succeeded | build::TaskState::Failed(_)
        )
    });
    let skipped = report.count(|s| s == build::TaskState::Skipped);

    if report.success() {
        if ran == 0 {
            println!("{} Up to date", "⚡".green());
        } else {
            println!(
                "{} Built {} task(s), {} up to date",
                "✓".green(),
                ran,
                skipped
            );
        }
    } else {
        eprintln!(
            "{} Build failed with status {}",
            "x".red(),
            report.status
        );
    }
    Ok(report.status)
}

fn list(config: &KilnConfig) -> Result<()> {
    if config.tasks.is_empty() {
        println!("{} No tasks defined.", "!".yellow());
        return Ok(());
    }

    let default = config.default_task_name();
    let mut table = ui::Table::new(&["Task", "Compiler", "Output", "Cache", "Default"]);
    for task in config.build_tasks()? {
        let is_default = Some(task.name()) == default;
        table.add_row(vec![
            task.name().bold().to_string(),
            task.compiler().unwrap_or("-").to_string(),
            task.output()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
            if task.cache_enabled() { "yes" } else { "no" }.to_string(),
            if is_default { "*".green().to_string() } else { String::new() },
        ]);
    }
    table.print();
    Ok(())
}

fn show(config: &KilnConfig, name: &str) -> Result<()> {
    let task_config = config
        .task(name)
        .ok_or_else(|| kiln::error::BuildError::UnknownTask(name.to_string()))?;
    let task = task_config.to_task(&config.defaults)?;

    println!("{}", ui::format_command(&task.render_command()?));
    let freshness = task.freshness();
    let verdict = if freshness.needs_rebuild() {
        "stale".yellow()
    } else {
        "fresh".green()
    };
    println!(
        "   {} {} ({})",
        "→".cyan(),
        verdict,
        freshness.describe()
    );
    if let Some(output) = task.output() {
        println!("   {} output: {}", "→".cyan(), output.display());
    }
    Ok(())
}
