use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::log_debug;

/// Captured result of a git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit code, `None` when git was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Successful output carrying `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and `stderr`
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Non-empty lines of stdout
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().filter(|line| !line.is_empty()).collect()
    }

    /// First line of stdout, trimmed; empty when there is no output
    pub fn first_line(&self) -> &str {
        self.stdout.lines().next().unwrap_or("").trim()
    }
}

/// Executes the external `git` binary.
///
/// Every repository operation in this crate goes through this trait so the
/// orchestration can be exercised without touching a real repository.
pub trait GitRunner {
    /// Runs git in `dir` and captures its output.
    ///
    /// A non-zero exit is not an error here; only failing to start git is.
    fn capture(&self, dir: &Path, args: &[&str]) -> Result<GitOutput>;

    /// Runs git in `dir` with the terminal attached and returns its exit code.
    fn interactive(&self, dir: &Path, args: &[&str]) -> Result<Option<i32>>;
}

/// [`GitRunner`] backed by the `git` found on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl SystemGit {
    pub fn new() -> Self {
        Self
    }

    fn command(self, dir: &Path, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command.args(args).current_dir(dir);
        command
    }
}

impl GitRunner for SystemGit {
    fn capture(&self, dir: &Path, args: &[&str]) -> Result<GitOutput> {
        log_debug!("git {} (in {})", args.join(" "), dir.display());
        let output = self
            .command(dir, args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

        Ok(GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn interactive(&self, dir: &Path, args: &[&str]) -> Result<Option<i32>> {
        log_debug!("git {} (in {}, interactive)", args.join(" "), dir.display());
        let status = self
            .command(dir, args)
            .status()
            .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

        Ok(status.code())
    }
}

/// Renders a git invocation the way a user would type it
pub fn format_command(args: &[&str]) -> String {
    let mut rendered = String::from("git");
    for arg in args {
        rendered.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('\'') {
            rendered.push('\'');
            rendered.push_str(&arg.replace('\'', r"'\''"));
            rendered.push('\'');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}
