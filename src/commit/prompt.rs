//! Interactive input for the commit workflow.
//!
//! The workflow only talks to the [`Prompter`] trait; [`ReadlinePrompter`]
//! is the terminal implementation with per-repository history and
//! completion of words previously typed in that repository.

use anyhow::{Context as _, Result};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::log_debug;

/// Name of the history file kept in each repository's common git directory
pub const HISTORY_FILE_NAME: &str = "git-commitflow-history";

/// Source of user decisions during the workflow
pub trait Prompter {
    /// Switches history (and completion words) to `path`, or disables it
    fn use_history(&mut self, path: Option<&Path>) -> Result<()>;

    /// Reads a commit message. `None` means the user aborted (EOF or Ctrl-C).
    fn read_message(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Asks a yes/no question until answered. `None` means the user aborted.
    fn confirm(&mut self, question: &str) -> Result<Option<bool>>;

    /// Stores an entry in the active history without prompting
    fn remember(&mut self, entry: &str) -> Result<()>;
}

/// Tab completion over a fixed, sorted set of words
#[derive(Debug, Default)]
pub struct KeywordCompleter {
    keywords: BTreeSet<String>,
}

impl KeywordCompleter {
    pub fn new(keywords: impl IntoIterator<Item = String>) -> Self {
        Self {
            keywords: keywords.into_iter().collect(),
        }
    }

    /// Collects the whitespace-separated words of a history file
    pub fn from_history_lines(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .filter(|line| !line.starts_with("#V2"))
                .flat_map(str::split_whitespace)
                .map(str::to_string),
        )
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Start of the word under the cursor and the keywords completing it
    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let before = &line[..pos];
        let start = before
            .rfind(char::is_whitespace)
            .map_or(0, |index| {
                index + before[index..].chars().next().map_or(1, char::len_utf8)
            });
        let word = &before[start..];

        let matches = self
            .keywords
            .iter()
            .filter(|keyword| keyword.starts_with(word))
            .cloned()
            .collect();
        (start, matches)
    }
}

impl Completer for KeywordCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Hinter for KeywordCompleter {
    type Hint = String;
}

impl Highlighter for KeywordCompleter {}

impl Validator for KeywordCompleter {}

impl Helper for KeywordCompleter {}

/// [`Prompter`] reading from the terminal through `rustyline`
pub struct ReadlinePrompter {
    editor: Editor<KeywordCompleter, DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl ReadlinePrompter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: new_editor(KeywordCompleter::default())?,
            history_file: None,
        })
    }

    fn save_history(&mut self) -> Result<()> {
        if let Some(path) = &self.history_file {
            self.editor
                .save_history(path)
                .with_context(|| format!("Failed to save history to {}", path.display()))?;
            log_debug!("History saved to {}", path.display());
        }
        Ok(())
    }
}

fn new_editor(completer: KeywordCompleter) -> Result<Editor<KeywordCompleter, DefaultHistory>> {
    let mut editor = Editor::new().context("Failed to initialize line editor")?;
    editor.set_helper(Some(completer));
    Ok(editor)
}

impl Prompter for ReadlinePrompter {
    fn use_history(&mut self, path: Option<&Path>) -> Result<()> {
        let completer = match path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read history {}", path.display()))?;
                KeywordCompleter::from_history_lines(&content)
            }
            _ => KeywordCompleter::default(),
        };
        log_debug!("Loaded {} completion keywords", completer.len());

        self.editor = new_editor(completer)?;
        if let Some(path) = path
            && path.exists()
        {
            self.editor
                .load_history(path)
                .with_context(|| format!("Failed to load history {}", path.display()))?;
            log_debug!("History loaded from {}", path.display());
        }
        self.history_file = path.map(Path::to_path_buf);
        Ok(())
    }

    fn read_message(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                    self.save_history()?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e).context("Failed to read commit message"),
        }
    }

    fn confirm(&mut self, question: &str) -> Result<Option<bool>> {
        let prompt = format!("{question} [y,n] ");
        loop {
            match self.editor.readline(&prompt) {
                Ok(answer) => match answer.trim() {
                    "y" | "Y" => return Ok(Some(true)),
                    "n" | "N" => return Ok(Some(false)),
                    _ => {}
                },
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(None),
                Err(e) => return Err(e).context("Failed to read answer"),
            }
        }
    }

    fn remember(&mut self, entry: &str) -> Result<()> {
        if self.history_file.is_none() {
            return Ok(());
        }
        self.editor.add_history_entry(entry)?;
        self.save_history()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_come_from_history_words() {
        let completer =
            KeywordCompleter::from_history_lines("#V2\nFix parser crash\nUpdate parser docs\n");

        assert_eq!(completer.len(), 5);
        assert_eq!(
            completer.candidates("Fix pa", 6),
            (4, vec!["parser".to_string()])
        );
    }

    #[test]
    fn completion_uses_word_under_cursor() {
        let completer = KeywordCompleter::new(
            ["Update", "Upgrade", "docs"].into_iter().map(str::to_string),
        );

        let (start, matches) = completer.candidates("Up", 2);
        assert_eq!(start, 0);
        assert_eq!(matches, vec!["Update", "Upgrade"]);

        let (start, matches) = completer.candidates("Update d and more", 8);
        assert_eq!(start, 7);
        assert_eq!(matches, vec!["docs"]);
    }

    #[test]
    fn empty_word_offers_every_keyword() {
        let completer = KeywordCompleter::new(["b", "a"].into_iter().map(str::to_string));
        assert_eq!(completer.candidates("Fix ", 4), (4, vec!["a".to_string(), "b".to_string()]));
        assert!(!completer.is_empty());
    }
}
