//! The add → commit → push workflow.
//!
//! [`Workflow::run`] discovers the repository (and its submodules), refuses
//! to touch anything if one of them is unusable, then walks each repository
//! innermost first through the three stages. A failing stage stops the run;
//! whatever already happened (a commit whose push failed, for instance) is
//! left as is.
//!
//! In dry-run mode a planned submodule commit counts as a change in its
//! superproject, since the real run would leave a new gitlink there.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::cache::PushCache;
use crate::commit::{
    CommitMessage, DefaultMessage, HISTORY_FILE_NAME, MessageRules, Prompter, resolve_message,
};
use crate::config::Config;
use crate::error::{FlowError, Stage};
use crate::git::{
    FilenameFilter, GitRepo, GitRunner, SubmoduleState, format_command, innermost_first,
};
use crate::{log_debug, log_error, log_info, log_warn, trace_debug, trace_info, trace_warn, ui};

/// Per-run switches, usually derived from the command line and [`Config`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct WorkflowOptions {
    /// Report the plan without running any mutating git command
    pub dry_run: bool,
    pub recurse_submodules: bool,
    pub push: bool,
    /// Answer yes to every confirmation
    pub assume_yes: bool,
    /// Commit message to use instead of prompting
    pub message: Option<String>,
    /// Show diff and status before prompting for a message
    pub preview: bool,
}

/// Outcome of one stage in one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Success,
    Skipped(String),
    Failed { code: Option<i32>, detail: String },
}

impl StepResult {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Stage results for a single repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub path: PathBuf,
    pub add: StepResult,
    pub commit: StepResult,
    pub push: StepResult,
    /// Mutating commands that would have run, filled in dry-run mode only
    pub planned: Vec<String>,
}

impl RepoReport {
    fn new(path: &Path) -> Self {
        let not_reached = StepResult::skipped("not reached");
        Self {
            path: path.to_path_buf(),
            add: not_reached.clone(),
            commit: not_reached.clone(),
            push: not_reached,
            planned: Vec::new(),
        }
    }

    /// The stage that failed, if any
    pub fn failure(&self) -> Option<(Stage, &StepResult)> {
        [
            (Stage::Add, &self.add),
            (Stage::Commit, &self.commit),
            (Stage::Push, &self.push),
        ]
        .into_iter()
        .find(|(_, result)| result.is_failed())
    }

    pub fn to_error(&self) -> Option<FlowError> {
        self.failure().map(|(stage, result)| {
            let (code, detail) = match result {
                StepResult::Failed { code, detail } => (*code, detail.clone()),
                _ => (None, String::new()),
            };
            FlowError::StageFailed {
                stage,
                path: self.path.clone(),
                code,
                detail,
            }
        })
    }
}

/// Everything a run did, submodules first and the superproject last
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowReport {
    pub repositories: Vec<RepoReport>,
    pub dry_run: bool,
}

impl WorkflowReport {
    /// Error for the first failed stage, `None` when every stage succeeded or was skipped
    pub fn failure(&self) -> Option<FlowError> {
        self.repositories.iter().find_map(RepoReport::to_error)
    }

    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }
}

/// Drives the stages for one invocation
pub struct Workflow<'a> {
    git: &'a dyn GitRunner,
    prompter: &'a mut dyn Prompter,
    rules: MessageRules,
    filter: FilenameFilter,
    diff_args: Vec<String>,
    options: WorkflowOptions,
    cache: PushCache,
    planned: Vec<String>,
    report: WorkflowReport,
}

impl<'a> Workflow<'a> {
    pub fn new(
        git: &'a dyn GitRunner,
        prompter: &'a mut dyn Prompter,
        config: &Config,
        options: WorkflowOptions,
        cache: PushCache,
    ) -> Result<Self> {
        Ok(Self {
            git,
            prompter,
            rules: config.message.clone(),
            filter: config.filename_filter()?,
            diff_args: config.diff_args.clone(),
            report: WorkflowReport {
                repositories: Vec::new(),
                dry_run: options.dry_run,
            },
            options,
            cache,
            planned: Vec::new(),
        })
    }

    /// What the last [`Workflow::run`] did, including the repositories it
    /// got through before returning an error
    pub fn report(&self) -> &WorkflowReport {
        &self.report
    }

    /// Runs the workflow for the repository containing `dir`.
    ///
    /// Invalid repositories are rejected before anything changes. A rejected
    /// message or an interruption also returns `Err`, but submodules handled
    /// before it keep their commits; [`Workflow::report`] lists them. Stage
    /// failures are recorded in the report instead.
    pub fn run(&mut self, dir: &Path) -> Result<WorkflowReport> {
        self.report.repositories.clear();
        self.planned.clear();

        let top = GitRepo::discover(self.git, dir)?;
        log_info!("Running workflow in {}", top.path().display());

        let mut repositories = Vec::new();
        if self.options.recurse_submodules {
            for submodule in innermost_first(top.submodules()?) {
                let work_tree = submodule.work_tree(top.path());
                if submodule.state == SubmoduleState::Conflicted {
                    return Err(FlowError::InvalidRepository {
                        path: work_tree,
                        reason: "the submodule has merge conflicts".to_string(),
                    }
                    .into());
                }
                repositories.push(GitRepo::discover(self.git, &work_tree)?);
            }
        }
        repositories.push(top);

        for repo in &repositories {
            repo.check_integrity()?;
        }

        let superprojects = superproject_indices(&repositories);
        let mut gitlink_pending = vec![false; repositories.len()];
        let submodule_count = repositories.len() - 1;

        for (index, repo) in repositories.iter().enumerate() {
            if index < submodule_count {
                ui::print_section("SUBMODULE", repo.path());
            }

            let mut repo_report = RepoReport::new(repo.path());
            let outcome = self.run_repository(repo, &mut repo_report, gitlink_pending[index]);
            repo_report.planned = std::mem::take(&mut self.planned);

            let planned_commit =
                self.options.dry_run && repo_report.commit == StepResult::skipped("dry run");
            if planned_commit
                && let Some(parent) = superprojects[index]
            {
                gitlink_pending[parent] = true;
            }

            let failed = repo_report.failure().is_some();
            self.report.repositories.push(repo_report);
            outcome?;
            if failed {
                log_error!("Stopping after failure in {}", repo.path().display());
                break;
            }
        }

        Ok(self.report.clone())
    }

    /// Runs the stages in one repository, filling in `report` as they finish.
    ///
    /// `gitlink_pending` is set in dry-run mode when a submodule of `repo`
    /// has a planned commit, which would leave `repo` with a new gitlink to
    /// commit.
    fn run_repository(
        &mut self,
        repo: &GitRepo<'_>,
        report: &mut RepoReport,
        gitlink_pending: bool,
    ) -> Result<()> {
        let _span = tracing::info_span!("repository", path = %repo.path().display()).entered();
        let mut committed = false;

        if gitlink_pending || repo.has_changes()? {
            let (add, files_added) = self.add_stage(repo)?;
            report.add = add;
            if report.add.is_failed() {
                return Ok(());
            }

            if !gitlink_pending && !files_added && !repo.has_tracked_changes()? {
                report.commit = StepResult::skipped("only untracked files, none added");
                report.push = self.push_or_skip(repo, false)?;
                return Ok(());
            }

            let message = self.commit_message(repo)?;
            report.commit = self.commit_stage(repo, &message)?;
            if report.commit.is_failed() {
                return Ok(());
            }
            committed = true;
        } else {
            ui::print_message(&format!(
                "[COMMIT] Nothing to commit (Path: '{}').",
                repo.path().display()
            ));
            report.add = StepResult::skipped("nothing to commit");
            report.commit = StepResult::skipped("nothing to commit");
        }

        report.push = self.push_or_skip(repo, committed)?;

        trace_info!(
            add = ?report.add,
            commit = ?report.commit,
            push = ?report.push,
            "repository done"
        );
        Ok(())
    }

    /// Offers to add untracked files. The flag tells whether files were
    /// (or, in dry-run mode, would be) added.
    fn add_stage(&mut self, repo: &GitRepo<'_>) -> Result<(StepResult, bool)> {
        let untracked = self.filter.retain(repo.untracked_files()?);
        if untracked.is_empty() {
            return Ok((StepResult::skipped("no untracked files"), false));
        }

        ui::print_field("Git repository", &repo.path().display().to_string());
        ui::print_newline();
        ui::print_info("Untracked files:");
        for file in &untracked {
            ui::print_message(&format!("  {file}"));
        }
        ui::print_newline();

        if !self.confirm("git add?")? {
            ui::print_warning("Untracked files were left out.");
            return Ok((StepResult::skipped("untracked files left out"), false));
        }

        let mut args = vec!["add", "--"];
        args.extend(untracked.iter().map(String::as_str));
        let code = self.mutate(repo, &args)?;
        let result = self.settle(code, "git add failed");
        let added = !result.is_failed();
        Ok((result, added))
    }

    fn commit_message(&mut self, repo: &GitRepo<'_>) -> Result<CommitMessage> {
        let default = default_message(repo)?;

        if let Some(message) = &self.options.message {
            let resolved =
                resolve_message(message, default.as_ref(), &self.rules).map_err(FlowError::from)?;
            log_debug!("Using commit message from the command line: {:?}", resolved);
            return Ok(resolved);
        }

        self.prompt_message(repo, default)
    }

    fn prompt_message(
        &mut self,
        repo: &GitRepo<'_>,
        default: Option<DefaultMessage>,
    ) -> Result<CommitMessage> {
        let history = if self.options.dry_run {
            None
        } else {
            repo.common_dir()?.map(|dir| dir.join(HISTORY_FILE_NAME))
        };
        self.prompter.use_history(history.as_deref())?;

        if self.options.preview {
            self.preview(repo, default.as_ref())?;
        }

        loop {
            let Some(input) = self.prompter.read_message("Commit message: ")? else {
                return Err(FlowError::Interrupted.into());
            };

            match resolve_message(&input, default.as_ref(), &self.rules) {
                Ok(message) => {
                    if let (CommitMessage::ReuseHead, Some(DefaultMessage::Previous(previous))) =
                        (&message, &default)
                        && !self.options.dry_run
                    {
                        self.prompter.remember(previous)?;
                    }
                    return Ok(message);
                }
                Err(violation) => {
                    ui::print_error(&format!("Error: {violation}."));
                    ui::print_newline();
                }
            }
        }
    }

    fn preview(&self, repo: &GitRepo<'_>, default: Option<&DefaultMessage>) -> Result<()> {
        if repo.has_commits() {
            // Diff against HEAD shows both staged and unstaged changes
            let mut args = vec!["--paginate", "diff", "--diff-filter=d", "--color", "HEAD"];
            args.extend(self.diff_args.iter().map(String::as_str));
            if repo.interactive(&args)? != Some(0) {
                log_warn!("Showing the diff failed in {}", repo.path().display());
            }
        }
        if repo.interactive(&["status"])? != Some(0) {
            log_warn!("Showing the status failed in {}", repo.path().display());
        }

        ui::print_field("Git repo", &repo.path().display().to_string());
        ui::print_newline();
        ui::print_field("Author", &repo.author()?);
        ui::print_field(
            "Branch",
            &repo
                .current_branch()?
                .unwrap_or_else(|| "(detached HEAD)".to_string()),
        );
        ui::print_field(
            "Git message",
            default.map_or("(none, a message is required)", DefaultMessage::text),
        );
        Ok(())
    }

    fn commit_stage(&mut self, repo: &GitRepo<'_>, message: &CommitMessage) -> Result<StepResult> {
        ui::print_section("GIT COMMIT", repo.path());
        if let CommitMessage::Text(text) = message {
            ui::print_field("Commit message", text);
        }

        let args = message.commit_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let code = self.mutate(repo, &args)?;
        let result = self.settle(code, "git commit failed");

        match &result {
            StepResult::Success => ui::print_success("[COMMIT] git commit was SUCCESSFUL."),
            StepResult::Failed { .. } => ui::print_error("[COMMIT] git commit has FAILED."),
            StepResult::Skipped(_) => {}
        }
        Ok(result)
    }

    fn push_or_skip(&mut self, repo: &GitRepo<'_>, committed: bool) -> Result<StepResult> {
        if self.options.push {
            self.push_stage(repo, committed)
        } else {
            Ok(StepResult::skipped("push disabled"))
        }
    }

    fn push_stage(&mut self, repo: &GitRepo<'_>, committed: bool) -> Result<StepResult> {
        if !repo.has_remotes()? {
            return Ok(StepResult::skipped("no remote"));
        }
        let Some(branch) = repo.current_branch()? else {
            return Ok(StepResult::skipped("detached HEAD"));
        };
        let Some(head) = repo.head_commit()? else {
            return Ok(StepResult::skipped("no commits"));
        };
        let remote_url = repo.remote_url()?.unwrap_or_default();

        // A planned commit has not moved HEAD yet, so the cache cannot tell.
        let head_is_final = !(self.options.dry_run && committed);
        if head_is_final && self.cache.is_pushed(&remote_url, &branch, &head) {
            ui::print_message(&format!("[PUSH] Already pushed: {}", repo.path().display()));
            return Ok(StepResult::skipped("already pushed"));
        }

        ui::print_section("GIT PUSH", repo.path());

        let upstream = repo.capture(&["rev-parse", "--symbolic-full-name", "HEAD@{u}"])?;
        if !upstream.success() {
            trace_warn!(branch = %branch, "no upstream configured");
            return Ok(StepResult::Failed {
                code: upstream.code,
                detail: format!("branch '{branch}' has no upstream branch"),
            });
        }

        let code = self.mutate(repo, &["fetch"])?;
        if code != Some(0) {
            return Ok(StepResult::Failed {
                code,
                detail: "git fetch failed".to_string(),
            });
        }

        if self.mutate(repo, &["merge", "--ff-only"])? != Some(0)
            && self.confirm(
                "Git failed to merge fast-forward. Do you want to run 'git pull --rebase'",
            )?
        {
            let code = self.mutate(repo, &["pull", "--rebase"])?;
            if code != Some(0) {
                return Ok(StepResult::Failed {
                    code,
                    detail: "git pull --rebase failed".to_string(),
                });
            }
        }

        let code = self.mutate(repo, &["push"])?;
        let result = self.settle(code, "git push failed");
        match &result {
            StepResult::Success => {
                ui::print_success("[PUSH] git commit and push were SUCCESSFUL.");
                if let Some(pushed) = repo.head_commit()? {
                    self.cache.record_push(&remote_url, &branch, &pushed);
                    self.cache.save()?;
                }
            }
            StepResult::Failed { .. } => ui::print_error("[PUSH] git commit and push FAILED."),
            StepResult::Skipped(_) => {}
        }
        Ok(result)
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        if self.options.assume_yes {
            log_debug!("Assuming yes for: {}", question);
            return Ok(true);
        }
        self.prompter
            .confirm(question)?
            .ok_or_else(|| FlowError::Interrupted.into())
    }

    /// Runs a command that changes the repository or its remote.
    ///
    /// In dry-run mode the command is only recorded and reported as successful.
    fn mutate(&mut self, repo: &GitRepo<'_>, args: &[&str]) -> Result<Option<i32>> {
        let rendered = format_command(args);
        if self.options.dry_run {
            ui::print_message(&format!("[DRY RUN] {rendered}"));
            self.planned.push(rendered);
            return Ok(Some(0));
        }

        ui::print_message(&format!("[RUN] {rendered}"));
        let code = repo.interactive(args)?;
        trace_debug!(command = %rendered, code = ?code, "git finished");
        Ok(code)
    }

    fn settle(&self, code: Option<i32>, detail: &str) -> StepResult {
        if code != Some(0) {
            return StepResult::Failed {
                code,
                detail: detail.to_string(),
            };
        }
        if self.options.dry_run {
            StepResult::skipped("dry run")
        } else {
            StepResult::Success
        }
    }
}

/// What an empty commit message resolves to in `repo`
fn default_message(repo: &GitRepo<'_>) -> Result<Option<DefaultMessage>> {
    if let Some(configured) = repo.config_value("custom.commit-message")? {
        return Ok(Some(DefaultMessage::Configured(configured)));
    }
    Ok(repo.previous_message()?.map(DefaultMessage::Previous))
}

/// For each repository, the index of the closest repository containing it.
///
/// Submodule work trees are nested inside their superproject's, so the
/// containing repository with the longest path is the superproject.
fn superproject_indices(repositories: &[GitRepo<'_>]) -> Vec<Option<usize>> {
    repositories
        .iter()
        .map(|repo| {
            repositories
                .iter()
                .enumerate()
                .filter(|(_, other)| {
                    other.path() != repo.path() && repo.path().starts_with(other.path())
                })
                .max_by_key(|(_, other)| other.path().components().count())
                .map(|(index, _)| index)
        })
        .collect()
}
