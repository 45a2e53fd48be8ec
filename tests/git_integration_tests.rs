use anyhow::Result;
use git_commitflow::error::exit_code;
use git_commitflow::{
    Config, PushCache, StepResult, SystemGit, Workflow, WorkflowOptions, WorkflowReport,
};
use git2::Repository;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use test_utils::{ScriptedPrompter, add_submodule, git, head_message, setup_git_repo, setup_remote};

fn options(message: &str, push: bool) -> WorkflowOptions {
    WorkflowOptions {
        recurse_submodules: true,
        push,
        assume_yes: true,
        message: Some(message.to_string()),
        ..WorkflowOptions::default()
    }
}

fn run_workflow(
    dir: &Path,
    cache_file: &Path,
    config: &Config,
    options: WorkflowOptions,
) -> Result<WorkflowReport> {
    let git = SystemGit::new();
    let mut prompter = ScriptedPrompter::new();
    let cache = PushCache::load(cache_file)?;
    let mut workflow = Workflow::new(&git, &mut prompter, config, options, cache)?;
    workflow.run(dir)
}

#[test]
fn commits_tracked_changes_with_message() -> Result<()> {
    let (temp_dir, repo) = setup_git_repo();
    let state = TempDir::new()?;
    fs::write(temp_dir.path().join("initial.txt"), "Changed content")?;

    let report = run_workflow(
        temp_dir.path(),
        &state.path().join("cache.json"),
        &Config::default(),
        options("Update initial content", true),
    )?;

    assert!(report.is_success());
    assert_eq!(head_message(&repo), "Update initial content");
    assert_eq!(report.repositories[0].push, StepResult::skipped("no remote"));
    assert!(git(temp_dir.path(), &["status", "--porcelain"]).is_empty());
    Ok(())
}

#[test]
fn directory_outside_repository_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let state = TempDir::new().expect("Failed to create temporary directory");

    let err = run_workflow(
        dir.path(),
        &state.path().join("cache.json"),
        &Config::default(),
        options("Fix", false),
    )
    .expect_err("a plain directory is not a repository");

    assert_eq!(exit_code(&err), 3);
}

#[test]
fn dry_run_leaves_repository_untouched() -> Result<()> {
    let (temp_dir, repo) = setup_git_repo();
    let state = TempDir::new()?;
    fs::write(temp_dir.path().join("initial.txt"), "Changed content")?;
    fs::write(temp_dir.path().join("new.txt"), "New file")?;
    let head_before = repo.head()?.target();

    let report = run_workflow(
        temp_dir.path(),
        &state.path().join("cache.json"),
        &Config::default(),
        WorkflowOptions {
            dry_run: true,
            ..options("Would commit", false)
        },
    )?;

    assert_eq!(repo.head()?.target(), head_before);
    assert_eq!(
        git(temp_dir.path(), &["status", "--porcelain"]),
        "M initial.txt\n?? new.txt"
    );
    assert_eq!(
        report.repositories[0].planned,
        vec!["git add -- new.txt", "git commit -a -m 'Would commit'"]
    );
    Ok(())
}

#[test]
fn untracked_files_are_added_except_ignored_names() -> Result<()> {
    let (temp_dir, repo) = setup_git_repo();
    let state = TempDir::new()?;
    fs::write(temp_dir.path().join("notes.txt"), "Notes")?;
    fs::write(temp_dir.path().join("flycheck_notes.txt"), "Scratch")?;
    let config = Config {
        ignore_filename_patterns: vec!["flycheck_".to_string()],
        ..Config::default()
    };

    let report = run_workflow(
        temp_dir.path(),
        &state.path().join("cache.json"),
        &config,
        options("Add notes", false),
    )?;

    assert_eq!(report.repositories[0].add, StepResult::Success);
    let tree = repo.head()?.peel_to_tree()?;
    assert!(tree.get_name("notes.txt").is_some());
    assert!(tree.get_name("flycheck_notes.txt").is_none());
    assert_eq!(
        git(temp_dir.path(), &["status", "--porcelain"]),
        "?? flycheck_notes.txt"
    );
    Ok(())
}

#[test]
fn pushes_to_upstream_once() -> Result<()> {
    let (temp_dir, repo) = setup_git_repo();
    let remote_dir = setup_remote(temp_dir.path());
    let state = TempDir::new()?;
    let cache_file = state.path().join("cache.json");
    fs::write(temp_dir.path().join("initial.txt"), "Changed content")?;

    let report = run_workflow(
        temp_dir.path(),
        &cache_file,
        &Config::default(),
        options("Publish change", true),
    )?;
    assert!(report.is_success());
    assert_eq!(report.repositories[0].push, StepResult::Success);

    let remote = Repository::open_bare(remote_dir.path())?;
    let local_head = repo.head()?.target();
    assert_eq!(Some(remote.refname_to_id("refs/heads/main")?), local_head);

    let report = run_workflow(
        temp_dir.path(),
        &cache_file,
        &Config::default(),
        options("Publish change", true),
    )?;
    assert_eq!(
        report.repositories[0].push,
        StepResult::skipped("already pushed")
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn rejected_push_keeps_local_commit() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let (temp_dir, repo) = setup_git_repo();
    let remote_dir = setup_remote(temp_dir.path());
    let state = TempDir::new()?;

    let hook = remote_dir.path().join("hooks").join("pre-receive");
    fs::create_dir_all(remote_dir.path().join("hooks"))?;
    fs::write(&hook, "#!/bin/sh\nexit 1\n")?;
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755))?;

    fs::write(temp_dir.path().join("initial.txt"), "Changed content")?;
    let report = run_workflow(
        temp_dir.path(),
        &state.path().join("cache.json"),
        &Config::default(),
        options("Rejected change", true),
    )?;

    let failure = report.failure().expect("the push must fail");
    assert_eq!(failure.exit_code(), 12);
    assert_eq!(report.repositories[0].commit, StepResult::Success);
    assert_eq!(head_message(&repo), "Rejected change");

    let remote = Repository::open_bare(remote_dir.path())?;
    assert_ne!(Some(remote.refname_to_id("refs/heads/main")?), repo.head()?.target());
    Ok(())
}

#[test]
fn submodule_is_committed_before_superproject() -> Result<()> {
    let (parent_dir, parent) = setup_git_repo();
    let (child_dir, _child) = setup_git_repo();
    let state = TempDir::new()?;
    let sub_path = add_submodule(parent_dir.path(), child_dir.path(), "sub");
    fs::write(sub_path.join("initial.txt"), "Changed in submodule")?;

    let report = run_workflow(
        parent_dir.path(),
        &state.path().join("cache.json"),
        &Config::default(),
        options("Update both", false),
    )?;

    assert!(report.is_success());
    assert_eq!(report.repositories.len(), 2);
    assert_eq!(report.repositories[0].commit, StepResult::Success);
    assert_eq!(report.repositories[1].commit, StepResult::Success);

    let sub = Repository::open(&sub_path)?;
    assert_eq!(head_message(&sub), "Update both");
    assert_eq!(head_message(&parent), "Update both");

    let recorded = parent.head()?.peel_to_tree()?.get_name("sub").map(|entry| entry.id());
    assert_eq!(recorded, sub.head()?.target());
    Ok(())
}

#[test]
fn dry_run_plans_superproject_commit_after_submodule_commit() -> Result<()> {
    let (parent_dir, parent) = setup_git_repo();
    let (child_dir, _child) = setup_git_repo();
    let state = TempDir::new()?;
    let sub_path = add_submodule(parent_dir.path(), child_dir.path(), "sub");
    fs::write(sub_path.join("initial.txt"), "Changed in submodule")?;
    let parent_head = parent.head()?.target();
    let sub_head = Repository::open(&sub_path)?.head()?.target();

    let report = run_workflow(
        parent_dir.path(),
        &state.path().join("cache.json"),
        &Config::default(),
        WorkflowOptions {
            dry_run: true,
            ..options("Update both", false)
        },
    )?;

    assert_eq!(report.repositories.len(), 2);
    for repo in &report.repositories {
        assert_eq!(repo.commit, StepResult::skipped("dry run"));
        assert_eq!(repo.planned, vec!["git commit -a -m 'Update both'"]);
    }
    assert_eq!(parent.head()?.target(), parent_head);
    assert_eq!(Repository::open(&sub_path)?.head()?.target(), sub_head);
    Ok(())
}

#[test]
fn no_submodules_leaves_submodule_changes_alone() -> Result<()> {
    let (parent_dir, parent) = setup_git_repo();
    let (child_dir, _child) = setup_git_repo();
    let state = TempDir::new()?;
    let sub_path = add_submodule(parent_dir.path(), child_dir.path(), "sub");
    fs::write(sub_path.join("initial.txt"), "Changed in submodule")?;
    let parent_head = parent.head()?.target();

    let report = run_workflow(
        parent_dir.path(),
        &state.path().join("cache.json"),
        &Config::default(),
        WorkflowOptions {
            recurse_submodules: false,
            ..options("Only the top", false)
        },
    )?;

    assert_eq!(report.repositories.len(), 1);
    assert_eq!(
        report.repositories[0].commit,
        StepResult::skipped("nothing to commit")
    );
    assert_eq!(parent.head()?.target(), parent_head);
    assert_eq!(head_message(&Repository::open(&sub_path)?), "Initial commit");
    Ok(())
}
