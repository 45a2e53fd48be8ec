use colored::Colorize;
use parking_lot::Mutex;
use std::path::Path;

use crate::workflow::{RepoReport, StepResult, WorkflowReport};

/// Track quiet mode state
static QUIET_MODE: std::sync::LazyLock<Mutex<bool>> =
    std::sync::LazyLock::new(|| Mutex::new(false));

/// Enable or disable quiet mode
pub fn set_quiet_mode(enabled: bool) {
    let mut quiet_mode = QUIET_MODE.lock();
    *quiet_mode = enabled;
}

/// Check if quiet mode is enabled
pub fn is_quiet_mode() -> bool {
    *QUIET_MODE.lock()
}

pub fn print_info(message: &str) {
    if !is_quiet_mode() {
        println!("{}", message.cyan().bold());
    }
}

pub fn print_warning(message: &str) {
    if !is_quiet_mode() {
        println!("{}", message.yellow().bold());
    }
}

pub fn print_error(message: &str) {
    // Always print errors, even in quiet mode
    eprintln!("{}", message.red().bold());
}

pub fn print_success(message: &str) {
    if !is_quiet_mode() {
        println!("{}", message.green().bold());
    }
}

pub fn print_version(version: &str) {
    if !is_quiet_mode() {
        println!(
            "{} {} {}",
            "git-commitflow".yellow().bold(),
            "version".cyan(),
            version.green()
        );
    }
}

/// Section header naming the repository an action applies to,
/// e.g. `[GIT COMMIT] /path/to/repo`
pub fn print_section(tag: &str, path: &Path) {
    if !is_quiet_mode() {
        println!("{}", format!("[{tag}] {}", path.display()).bright_yellow());
    }
}

/// Print a simple message (respects quiet mode)
pub fn print_message(message: &str) {
    if !is_quiet_mode() {
        println!("{message}");
    }
}

/// Print a labelled value with the value highlighted
pub fn print_field(label: &str, value: &str) {
    if !is_quiet_mode() {
        println!("{label}: {}", value.yellow());
    }
}

/// Print an empty line (respects quiet mode)
pub fn print_newline() {
    if !is_quiet_mode() {
        println!();
    }
}

/// Plain-text rendering of one step result
pub fn describe_step(result: &StepResult) -> String {
    match result {
        StepResult::Success => "ok".to_string(),
        StepResult::Skipped(reason) => format!("skipped ({reason})"),
        StepResult::Failed { code, detail } => {
            let code = code.map_or_else(|| "signal".to_string(), |code| format!("exit code {code}"));
            if detail.is_empty() {
                format!("FAILED ({code})")
            } else {
                format!("FAILED ({code}): {detail}")
            }
        }
    }
}

fn colorize_step(result: &StepResult) -> String {
    let text = describe_step(result);
    match result {
        StepResult::Success => text.green().to_string(),
        StepResult::Skipped(_) => text.dimmed().to_string(),
        StepResult::Failed { .. } => text.red().bold().to_string(),
    }
}

fn print_repo_report(report: &RepoReport) {
    println!("{}", report.path.display().to_string().bold());
    println!("  add     {}", colorize_step(&report.add));
    println!("  commit  {}", colorize_step(&report.commit));
    println!("  push    {}", colorize_step(&report.push));
    for command in &report.planned {
        println!("  {} {}", "would run:".cyan(), command);
    }
}

/// Summary of every repository the workflow visited.
///
/// Failures are always shown, even in quiet mode.
pub fn print_report(report: &WorkflowReport) {
    if is_quiet_mode() {
        for repo in report.repositories.iter().filter(|repo| repo.failure().is_some()) {
            print_repo_report(repo);
        }
        return;
    }

    println!();
    let title = if report.dry_run {
        "Summary (dry run, nothing was changed)"
    } else {
        "Summary"
    };
    println!("{}", title.magenta().bold());
    for repo in &report.repositories {
        print_repo_report(repo);
    }
}
