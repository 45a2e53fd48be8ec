use crate::error::FlowError;
use crate::git::runner::{GitOutput, GitRunner};
use crate::git::submodule::{Submodule, parse_submodule_status};
use crate::log_debug;
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// A Git work tree, addressed by its top-level directory.
///
/// All queries go through the [`GitRunner`] the repository was discovered
/// with; nothing here mutates the repository.
pub struct GitRepo<'g> {
    git: &'g dyn GitRunner,
    path: PathBuf,
    has_commits: bool,
}

impl fmt::Debug for GitRepo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRepo")
            .field("path", &self.path)
            .field("has_commits", &self.has_commits)
            .finish_non_exhaustive()
    }
}

impl<'g> GitRepo<'g> {
    /// Finds the work tree containing `dir`.
    ///
    /// Fails with [`FlowError::InvalidRepository`] when `dir` is not inside a
    /// Git work tree or its top level is not a directory.
    pub fn discover(git: &'g dyn GitRunner, dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(invalid(dir, "not a directory").into());
        }

        let toplevel = git.capture(dir, &["rev-parse", "--show-toplevel"])?;
        if !toplevel.success() {
            let reason = toplevel.stderr.lines().next().unwrap_or("").trim();
            let reason = if reason.is_empty() {
                "not inside a Git work tree"
            } else {
                reason
            };
            return Err(invalid(dir, reason).into());
        }

        let path = PathBuf::from(toplevel.first_line());
        if !path.is_dir() {
            return Err(invalid(&path, "the work tree top level is not a directory").into());
        }

        let has_commits = git
            .capture(&path, &["rev-parse", "--verify", "--quiet", "HEAD"])?
            .success();

        log_debug!(
            "Discovered repository at {} (has commits: {})",
            path.display(),
            has_commits
        );

        Ok(Self {
            git,
            path,
            has_commits,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `HEAD` resolved to a commit when the repository was discovered
    pub fn has_commits(&self) -> bool {
        self.has_commits
    }

    /// Runs a read-only git command in the work tree
    pub fn capture(&self, args: &[&str]) -> Result<GitOutput> {
        self.git.capture(&self.path, args)
    }

    /// Runs git in the work tree with the terminal attached
    pub fn interactive(&self, args: &[&str]) -> Result<Option<i32>> {
        self.git.interactive(&self.path, args)
    }

    /// Refuses repositories with paths git cannot commit as-is.
    ///
    /// Type changes, unknown and unmerged entries, and broken pairs against
    /// `HEAD` all mean a plain `commit -a` would not do what the user expects.
    pub fn check_integrity(&self) -> Result<()> {
        if !self.has_commits {
            return Ok(());
        }

        let output = self.capture(&["diff", "--name-only", "--diff-filter=TXBU", "HEAD"])?;
        let problems = output.lines();
        if problems.is_empty() {
            return Ok(());
        }

        Err(invalid(
            &self.path,
            &format!(
                "there is an issue with the following paths: {}",
                problems.join(", ")
            ),
        )
        .into())
    }

    /// Whether `git status` reports anything to commit.
    ///
    /// Uncommitted work inside submodules is not counted; only a submodule
    /// checked out at a new commit is.
    pub fn has_changes(&self) -> Result<bool> {
        let output = self.capture(&["status", "--porcelain", "--ignore-submodules=dirty"])?;
        Ok(!output.lines().is_empty())
    }

    /// Like [`Self::has_changes`], ignoring untracked files
    pub fn has_tracked_changes(&self) -> Result<bool> {
        let output = self.capture(&[
            "status",
            "--porcelain",
            "--untracked-files=no",
            "--ignore-submodules=dirty",
        ])?;
        Ok(!output.lines().is_empty())
    }

    /// Untracked files that are not excluded by `.gitignore` and friends
    pub fn untracked_files(&self) -> Result<Vec<String>> {
        let output = self.capture(&["ls-files", "-z", "--others", "--exclude-standard"])?;
        Ok(output
            .stdout
            .split('\0')
            .filter(|file| !file.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Initialised submodules at any depth, in git's listing order
    pub fn submodules(&self) -> Result<Vec<Submodule>> {
        let output = self.capture(&["submodule", "status", "--recursive"])?;
        if !output.success() {
            log_debug!("Listing submodules failed: {}", output.stderr.trim());
            return Ok(Vec::new());
        }

        Ok(parse_submodule_status(&output.stdout)
            .into_iter()
            .filter(Submodule::is_initialized)
            .collect())
    }

    /// Value of a git configuration key, `None` when unset or empty
    pub fn config_value(&self, key: &str) -> Result<Option<String>> {
        // Values may span lines, as `custom.commit-message` often does
        let output = self.capture(&["config", key])?;
        Ok(non_empty(output.success(), output.stdout.trim_end()))
    }

    /// Full message of the `HEAD` commit
    pub fn previous_message(&self) -> Result<Option<String>> {
        if !self.has_commits {
            return Ok(None);
        }

        let output = self.capture(&["--no-pager", "log", "-1", "--pretty=%B"])?;
        Ok(non_empty(output.success(), output.stdout.trim_end()))
    }

    /// Short name of the checked-out branch, `None` on a detached `HEAD`
    pub fn current_branch(&self) -> Result<Option<String>> {
        let output = self.capture(&["symbolic-ref", "--short", "HEAD"])?;
        Ok(non_empty(output.success(), output.first_line()))
    }

    /// Object id `HEAD` currently points to
    pub fn head_commit(&self) -> Result<Option<String>> {
        let output = self.capture(&["rev-parse", "--verify", "HEAD"])?;
        Ok(non_empty(output.success(), output.first_line()))
    }

    pub fn has_remotes(&self) -> Result<bool> {
        Ok(!self.capture(&["remote", "-v"])?.lines().is_empty())
    }

    /// URL of the remote `git push` would use
    pub fn remote_url(&self) -> Result<Option<String>> {
        let output = self.capture(&["ls-remote", "--get-url"])?;
        Ok(non_empty(output.success(), output.first_line()))
    }

    /// Directory shared by all work trees of this repository
    pub fn common_dir(&self) -> Result<Option<PathBuf>> {
        let output = self.capture(&["rev-parse", "--git-common-dir"])?;
        Ok(non_empty(output.success(), output.first_line()).map(|dir| {
            let dir = PathBuf::from(dir);
            if dir.is_absolute() {
                dir
            } else {
                self.path.join(dir)
            }
        }))
    }

    /// `Name <email>` as git would record it
    pub fn author(&self) -> Result<String> {
        let name = self
            .config_value("user.name")?
            .unwrap_or_else(|| "Unknown".to_string());
        let email = self
            .config_value("user.email")?
            .unwrap_or_else(|| "unknown@domain.ext".to_string());
        Ok(format!("{name} <{email}>"))
    }
}

fn non_empty(success: bool, value: &str) -> Option<String> {
    (success && !value.is_empty()).then(|| value.to_string())
}

fn invalid(path: &Path, reason: &str) -> FlowError {
    FlowError::InvalidRepository {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
