use serde::{Deserialize, Serialize};

/// Why a commit message was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageViolation {
    #[error("the commit message is empty and there is no previous message to reuse")]
    Empty,
    #[error("the commit message is too short ({length} characters, at least {min} required)")]
    TooShort { length: usize, min: usize },
    #[error("the subject line is too long ({length} characters, at most {max} allowed)")]
    SubjectTooLong { length: usize, max: usize },
}

/// Rules a commit message must satisfy before `git commit` is invoked
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MessageRules {
    /// Minimum number of characters of a non-empty message
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Maximum number of characters on the first line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_subject_length: Option<usize>,
    /// Whether an empty message falls back to the default message
    #[serde(default = "default_allow_reuse")]
    pub allow_reuse: bool,
}

fn default_min_length() -> usize {
    2
}

fn default_allow_reuse() -> bool {
    true
}

impl Default for MessageRules {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_subject_length: None,
            allow_reuse: default_allow_reuse(),
        }
    }
}

impl MessageRules {
    /// Validates a non-default message. Surrounding whitespace is ignored.
    pub fn validate(&self, message: &str) -> Result<(), MessageViolation> {
        let message = message.trim();
        if message.is_empty() {
            return Err(MessageViolation::Empty);
        }

        let length = message.chars().count();
        if length < self.min_length {
            return Err(MessageViolation::TooShort {
                length,
                min: self.min_length,
            });
        }

        if let Some(max) = self.max_subject_length {
            let subject = message.lines().next().unwrap_or("").trim_end();
            let length = subject.chars().count();
            if length > max {
                return Err(MessageViolation::SubjectTooLong { length, max });
            }
        }

        Ok(())
    }
}

/// The message a commit will be created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMessage {
    /// Literal, already validated text
    Text(String),
    /// Reuse the message of the current `HEAD` commit
    ReuseHead,
}

impl CommitMessage {
    /// Arguments for `git commit`, staging tracked changes with `-a`
    pub fn commit_args(&self) -> Vec<String> {
        let mut args = vec!["commit".to_string(), "-a".to_string()];
        match self {
            Self::Text(text) => {
                args.push("-m".to_string());
                args.push(text.clone());
            }
            Self::ReuseHead => {
                args.push("--reset-author".to_string());
                args.push("--reuse-message=HEAD".to_string());
            }
        }
        args
    }
}

/// What an empty message stands for in a given repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultMessage {
    /// Set through the `custom.commit-message` git configuration key
    Configured(String),
    /// The message of the previous commit
    Previous(String),
}

impl DefaultMessage {
    pub fn text(&self) -> &str {
        match self {
            Self::Configured(text) | Self::Previous(text) => text,
        }
    }

    pub fn to_commit_message(&self) -> CommitMessage {
        match self {
            Self::Configured(text) => CommitMessage::Text(text.clone()),
            Self::Previous(_) => CommitMessage::ReuseHead,
        }
    }
}

/// Turns user input into the message to commit with.
///
/// Empty input resolves to `default` when reuse is allowed; any literal text,
/// including a configured default, must pass `rules`.
pub fn resolve_message(
    input: &str,
    default: Option<&DefaultMessage>,
    rules: &MessageRules,
) -> Result<CommitMessage, MessageViolation> {
    let input = input.trim();
    if input.is_empty() {
        return match default {
            Some(default) if rules.allow_reuse => {
                if let DefaultMessage::Configured(text) = default {
                    rules.validate(text)?;
                }
                Ok(default.to_commit_message())
            }
            _ => Err(MessageViolation::Empty),
        };
    }

    rules.validate(input)?;
    Ok(CommitMessage::Text(input.to_string()))
}
