//! git-commitflow - stage, commit and push in one validated step
//!
//! This library drives the external `git` binary through the add, commit and
//! push stages for a repository and, optionally, every initialised submodule.

// Allow certain clippy warnings that are either stylistic or from external dependencies
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine
#![allow(clippy::option_as_ref_cloned)] // .as_ref().cloned() is sometimes clearer

pub mod cache;
pub mod cli;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod logger;
pub mod ui;
pub mod workflow;

// Re-export important structs and functions for easier testing
pub use cache::PushCache;
pub use config::Config;
pub use error::{FlowError, Stage};
pub use git::{GitOutput, GitRunner, SystemGit};
pub use workflow::{RepoReport, StepResult, Workflow, WorkflowOptions, WorkflowReport};
