//! Push cache
//!
//! Remembers, per remote URL and branch, the last commit that was pushed so
//! repeated runs (for example over many submodules) skip pushes that would
//! not send anything. Stored as JSON in the configuration directory.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::log_debug;

/// File name of the cache inside the configuration directory
pub const CACHE_FILENAME: &str = "repo-data.json";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheData {
    /// remote URL -> branch -> last pushed commit
    #[serde(default)]
    git_push_commit_refs: BTreeMap<String, BTreeMap<String, String>>,
}

/// Persistent record of pushed commits
#[derive(Debug)]
pub struct PushCache {
    path: PathBuf,
    data: CacheData,
    modified: bool,
}

impl PushCache {
    /// Loads the cache at `path`; a missing file is an empty cache
    pub fn load(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            CacheData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data,
            modified: false,
        })
    }

    /// Default location: `<config dir>/git-commitflow/repo-data.json`
    pub fn default_path() -> Result<PathBuf> {
        let mut path =
            dirs::config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("git-commitflow");
        path.push(CACHE_FILENAME);
        Ok(path)
    }

    /// Last commit pushed from `branch` to `remote_url`
    pub fn pushed_commit(&self, remote_url: &str, branch: &str) -> Option<&str> {
        self.data
            .git_push_commit_refs
            .get(remote_url)
            .and_then(|branches| branches.get(branch))
            .map(String::as_str)
    }

    pub fn is_pushed(&self, remote_url: &str, branch: &str, commit: &str) -> bool {
        self.pushed_commit(remote_url, branch) == Some(commit)
    }

    pub fn record_push(&mut self, remote_url: &str, branch: &str, commit: &str) {
        self.data
            .git_push_commit_refs
            .entry(remote_url.to_string())
            .or_default()
            .insert(branch.to_string(), commit.to_string());
        self.modified = true;
    }

    /// Writes the cache if it changed since it was loaded
    pub fn save(&mut self) -> Result<()> {
        if !self.modified {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.data)?;
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        log_debug!("Push cache saved to {}", self.path.display());
        self.modified = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_survive_a_reload() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("nested").join(CACHE_FILENAME);

        let mut cache = PushCache::load(&path)?;
        assert_eq!(cache.pushed_commit("git@host:repo.git", "main"), None);
        cache.record_push("git@host:repo.git", "main", "abc123");
        cache.save()?;

        let reloaded = PushCache::load(&path)?;
        assert!(reloaded.is_pushed("git@host:repo.git", "main", "abc123"));
        assert!(!reloaded.is_pushed("git@host:repo.git", "main", "def456"));
        assert!(!reloaded.is_pushed("git@host:repo.git", "dev", "abc123"));
        Ok(())
    }

    #[test]
    fn unmodified_cache_is_not_written() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join(CACHE_FILENAME);

        PushCache::load(&path)?.save()?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn reads_the_documented_layout() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join(CACHE_FILENAME);
        fs::write(
            &path,
            r#"{"git_push_commit_refs": {"https://example.com/r.git": {"main": "0123abcd"}}}"#,
        )?;

        let cache = PushCache::load(&path)?;
        assert_eq!(
            cache.pushed_commit("https://example.com/r.git", "main"),
            Some("0123abcd")
        );
        Ok(())
    }
}
