use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

use crate::log_debug;

/// Drops file names whose base name matches one of the ignore patterns.
///
/// Patterns are regular expressions anchored at the start of the base name,
/// so `flycheck_` ignores `src/flycheck_main.rs` but not `src/main_flycheck_.rs`.
#[derive(Debug, Clone, Default)]
pub struct FilenameFilter {
    patterns: Vec<Regex>,
}

impl FilenameFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&format!("^(?:{pattern})"))
                    .with_context(|| format!("Invalid ignore pattern '{pattern}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        let base_name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);

        let ignored = self.patterns.iter().any(|re| re.is_match(base_name));
        if ignored {
            log_debug!("Ignoring untracked file: {}", path);
        }
        ignored
    }

    pub fn retain(&self, files: Vec<String>) -> Vec<String> {
        files
            .into_iter()
            .filter(|file| !self.is_ignored(file))
            .collect()
    }
}
