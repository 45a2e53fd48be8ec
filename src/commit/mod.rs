mod message;
pub mod prompt;

pub use message::{
    CommitMessage, DefaultMessage, MessageRules, MessageViolation, resolve_message,
};
pub use prompt::{HISTORY_FILE_NAME, KeywordCompleter, Prompter, ReadlinePrompter};
