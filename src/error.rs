//! Error types surfaced by the commit workflow.
//!
//! Everything internal propagates `anyhow::Error`; the variants here are the
//! failures a user (or a script) needs to tell apart, and each maps to its
//! own process exit code.

use std::path::PathBuf;

use strum_macros::Display;

use crate::commit::MessageViolation;

/// One step of the add → commit → push sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Add,
    Commit,
    Push,
}

impl Stage {
    /// Exit code reported when this stage fails
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Add => 10,
            Self::Commit => 11,
            Self::Push => 12,
        }
    }
}

/// Failures of the workflow that are reported with a dedicated exit code
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Invalid Git repository '{}': {reason}", .path.display())]
    InvalidRepository { path: PathBuf, reason: String },

    #[error("Commit message rejected: {0}")]
    MessageValidationFailed(#[from] MessageViolation),

    #[error("{stage} stage failed in '{}' ({}){}", .path.display(), format_code(.code), format_detail(.detail))]
    StageFailed {
        stage: Stage,
        path: PathBuf,
        code: Option<i32>,
        detail: String,
    },

    #[error("Interrupted")]
    Interrupted,
}

impl FlowError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidRepository { .. } => 3,
            Self::MessageValidationFailed(_) => 4,
            Self::StageFailed { stage, .. } => stage.exit_code(),
            Self::Interrupted => 130,
        }
    }
}

/// Maps any error coming out of the CLI to the process exit code.
///
/// Errors that are not a [`FlowError`] anywhere in their chain exit with `1`.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<FlowError>())
        .map_or(1, FlowError::exit_code)
}

#[allow(clippy::ref_option)]
fn format_code(code: &Option<i32>) -> String {
    code.map_or_else(
        || "terminated by signal".to_string(),
        |code| format!("exit code {code}"),
    )
}

fn format_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}
