use crate::cache::PushCache;
use crate::commit::MessageRules;
use crate::git::{FilenameFilter, GitRunner};
use crate::log_debug;

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration structure for git-commitflow
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Push after a successful commit
    #[serde(default = "default_true")]
    pub push: bool,
    /// Run the workflow in every initialised submodule first
    #[serde(default = "default_true")]
    pub recurse_submodules: bool,
    /// Regular expressions matched against the start of untracked file names
    #[serde(default)]
    pub ignore_filename_patterns: Vec<String>,
    /// Extra arguments appended to the diff shown before prompting
    #[serde(default)]
    pub diff_args: Vec<String>,
    /// Where the push cache lives, defaults to the configuration directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,
    /// Whether to include logs from external crates in the debug log
    #[serde(default)]
    pub verbose_logging: bool,
    /// Commit message rules
    #[serde(default)]
    pub message: MessageRules,
    /// Flag indicating if this config is from a project file
    #[serde(skip)]
    pub is_project_config: bool,
}

fn default_true() -> bool {
    true
}

/// Project configuration filename
pub const PROJECT_CONFIG_FILENAME: &str = ".commitflow.toml";

impl Default for Config {
    fn default() -> Self {
        Self {
            push: true,
            recurse_submodules: true,
            ignore_filename_patterns: Vec::new(),
            diff_args: Vec::new(),
            cache_file: None,
            verbose_logging: false,
            message: MessageRules::default(),
            is_project_config: false,
        }
    }
}

impl Config {
    /// Load the personal configuration, then merge the project file of the
    /// repository containing `dir` if there is one
    pub fn load(git: &dyn GitRunner, dir: &Path) -> Result<Self> {
        Self::load_layered(&Self::get_config_path()?, git, dir)
    }

    /// Same as [`Config::load`] with the personal file at `personal_path`
    pub fn load_layered(personal_path: &Path, git: &dyn GitRunner, dir: &Path) -> Result<Self> {
        let mut config = if personal_path.exists() {
            Self::load_from_path(personal_path)?
        } else {
            Self::default()
        };

        let root = git.capture(dir, &["rev-parse", "--show-toplevel"])?;
        if root.success() && !root.first_line().is_empty() {
            if let Some(project_config) = Self::load_project_config(Path::new(root.first_line()))? {
                config.merge_with_project_config(project_config);
            }
        } else {
            log_debug!(
                "{} is not inside a repository, skipping project config",
                dir.display()
            );
        }

        config.validate()?;
        log_debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Parse a configuration file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).map_err(|e| {
            anyhow!(
                "Invalid configuration file {}: {}. Please check it for syntax errors.",
                path.display(),
                e
            )
        })
    }

    /// Load `.commitflow.toml` from a repository root, if present
    pub fn load_project_config(repo_root: &Path) -> Result<Option<Self>> {
        let config_path = repo_root.join(PROJECT_CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(None);
        }

        let mut config = Self::load_from_path(&config_path)?;
        config.is_project_config = true;
        log_debug!("Project configuration found at {}", config_path.display());
        Ok(Some(config))
    }

    /// Merge this config with project-specific config, with project config taking precedence.
    ///
    /// Settings left at their default in the project file keep the personal
    /// value; lists are extended. A project file never chooses where the push
    /// cache is stored.
    pub fn merge_with_project_config(&mut self, project_config: Self) {
        log_debug!("Merging with project configuration");
        let defaults = Self::default();

        if project_config.push != defaults.push {
            self.push = project_config.push;
        }
        if project_config.recurse_submodules != defaults.recurse_submodules {
            self.recurse_submodules = project_config.recurse_submodules;
        }

        for pattern in project_config.ignore_filename_patterns {
            if !self.ignore_filename_patterns.contains(&pattern) {
                self.ignore_filename_patterns.push(pattern);
            }
        }
        self.diff_args.extend(project_config.diff_args);

        if project_config.message.min_length != defaults.message.min_length {
            self.message.min_length = project_config.message.min_length;
        }
        if project_config.message.max_subject_length.is_some() {
            self.message.max_subject_length = project_config.message.max_subject_length;
        }
        if project_config.message.allow_reuse != defaults.message.allow_reuse {
            self.message.allow_reuse = project_config.message.allow_reuse;
        }
    }

    /// Reject settings that would only fail later, mid-workflow
    pub fn validate(&self) -> Result<()> {
        self.filename_filter()?;
        Ok(())
    }

    /// Filter built from `ignore_filename_patterns`
    pub fn filename_filter(&self) -> Result<FilenameFilter> {
        FilenameFilter::new(&self.ignore_filename_patterns)
    }

    /// Location of the push cache
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_file {
            Some(path) => Ok(path.clone()),
            None => PushCache::default_path(),
        }
    }

    /// Save the configuration to the personal config file
    pub fn save(&self) -> Result<()> {
        // Don't save project configs to personal config file
        if self.is_project_config {
            return Ok(());
        }

        let config_path = Self::get_config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        log_debug!("Configuration saved: {:?}", self);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("git-commitflow");
        path.push("config.toml");
        Ok(path)
    }
}
