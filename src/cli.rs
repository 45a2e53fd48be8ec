use crate::cache::PushCache;
use crate::commit::ReadlinePrompter;
use crate::config::Config;
use crate::git::SystemGit;
use crate::workflow::{Workflow, WorkflowOptions};
use crate::{log_debug, log_info, ui};
use anyhow::{Context, Result};
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, crate_version};
use std::io::IsTerminal;
use std::path::PathBuf;

const LOG_FILE: &str = "git-commitflow-debug.log";

/// CLI structure defining the available arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version = crate_version!(),
    about = "Stage, commit and push a Git repository and its submodules",
    long_about = "git-commitflow adds untracked files, commits with a validated message and \
                  pushes, in every initialised submodule first and then in the repository itself.",
    disable_version_flag = true,
    styles = get_styles(),
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Commit message to use instead of prompting
    #[arg(short = 'm', long = "message", help = "Commit message to use instead of prompting")]
    pub message: Option<String>,

    /// Show what would run without changing anything
    #[arg(
        short = 'n',
        long = "dry-run",
        help = "Show the git commands that would run without running them"
    )]
    pub dry_run: bool,

    /// Only process the repository itself
    #[arg(long = "no-submodules", help = "Do not recurse into submodules")]
    pub no_submodules: bool,

    /// Stop after committing
    #[arg(long = "no-push", help = "Commit without pushing")]
    pub no_push: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long = "yes", help = "Answer yes to every confirmation")]
    pub yes: bool,

    /// Directory to run in
    #[arg(
        short = 'C',
        long = "directory",
        value_name = "DIR",
        help = "Run as if started in DIR"
    )]
    pub directory: Option<PathBuf>,

    /// Write the effective configuration to the personal config file and exit
    #[arg(
        long = "init-config",
        help = "Write the effective configuration to the personal config file"
    )]
    pub init_config: bool,

    /// Log debug messages to a file
    #[arg(short = 'l', long = "log", help = "Log debug messages to a file")]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(long = "log-file", help = "Specify a custom log file path")]
    pub log_file: Option<String>,

    /// Suppress non-essential output
    #[arg(short = 'q', long = "quiet", help = "Suppress non-essential output")]
    pub quiet: bool,

    /// Display the version
    #[arg(short = 'v', long = "version", help = "Display the version")]
    pub version: bool,
}

impl Cli {
    /// Workflow switches from the command line, on top of the configuration
    pub fn workflow_options(&self, config: &Config, interactive: bool) -> WorkflowOptions {
        WorkflowOptions {
            dry_run: self.dry_run,
            recurse_submodules: config.recurse_submodules && !self.no_submodules,
            push: config.push && !self.no_push,
            assume_yes: self.yes,
            message: self.message.clone(),
            preview: interactive && self.message.is_none(),
        }
    }
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Main function to parse arguments and run the workflow
pub fn main() -> Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    let dir = match &cli.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine the current directory")?,
    };

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    let git = SystemGit::new();
    let config = Config::load(&git, &dir)?;
    if crate::logger::is_logging_enabled() {
        crate::logger::set_verbose_logging(config.verbose_logging);
        if config.verbose_logging {
            log_debug!("Verbose logging enabled - will show external library logs");
        }
    }

    if cli.init_config {
        config.save()?;
        ui::print_success(&format!(
            "Configuration written to {}",
            Config::get_config_path()?.display()
        ));
        return Ok(());
    }

    let options = cli.workflow_options(&config, std::io::stdin().is_terminal());
    log_debug!("Workflow options: {:?}", options);

    let cache = PushCache::load(&config.cache_path()?)?;
    let mut prompter = ReadlinePrompter::new()?;
    let mut workflow = Workflow::new(&git, &mut prompter, &config, options, cache)?;

    let report = match workflow.run(&dir) {
        Ok(report) => report,
        Err(err) => {
            // Submodules committed before a rejected message stay committed
            if !workflow.report().repositories.is_empty() {
                ui::print_report(workflow.report());
            }
            return Err(err);
        }
    };
    ui::print_report(&report);

    match report.failure() {
        Some(err) => Err(err.into()),
        None => {
            log_info!("Workflow finished in {}", dir.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::parse_from([
            "git-commitflow",
            "--no-submodules",
            "--no-push",
            "-n",
            "-m",
            "Fix typo",
        ]);
        let options = cli.workflow_options(&Config::default(), true);

        assert!(options.dry_run);
        assert!(!options.recurse_submodules);
        assert!(!options.push);
        assert_eq!(options.message.as_deref(), Some("Fix typo"));
        assert!(!options.preview, "a given message needs no preview");
    }

    #[test]
    fn configuration_can_disable_push() {
        let cli = Cli::parse_from(["git-commitflow", "-C", "/tmp"]);
        let config = Config {
            push: false,
            ..Config::default()
        };
        let options = cli.workflow_options(&config, false);

        assert!(!options.push);
        assert!(options.recurse_submodules);
        assert!(!options.preview);
        assert_eq!(cli.directory, Some(PathBuf::from("/tmp")));
    }
}
