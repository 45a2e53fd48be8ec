use std::path::{Component, Path, PathBuf};

/// Checkout state reported by `git submodule status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmoduleState {
    /// Checked out, at the recorded commit or not
    Initialized,
    /// Not initialised; there is no work tree to operate on
    Uninitialized,
    /// Has merge conflicts
    Conflicted,
}

/// A submodule listed by `git submodule status --recursive`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submodule {
    /// Path relative to the top-level superproject
    pub path: PathBuf,
    pub commit: String,
    pub state: SubmoduleState,
}

impl Submodule {
    pub fn is_initialized(&self) -> bool {
        self.state != SubmoduleState::Uninitialized
    }

    /// Nesting depth, `1` for a direct submodule of the superproject
    pub fn depth(&self) -> usize {
        self.path
            .components()
            .filter(|component| matches!(component, Component::Normal(_)))
            .count()
    }

    pub fn work_tree(&self, superproject: &Path) -> PathBuf {
        superproject.join(&self.path)
    }
}

/// Parses `git submodule status --recursive` output.
///
/// Each line is `<flag><commit> <path>[ (<describe>)]` where the flag is a
/// space, `-`, `+` or `U`. Lines that do not follow that shape are skipped.
pub fn parse_submodule_status(output: &str) -> Vec<Submodule> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Submodule> {
    let mut chars = line.chars();
    let state = match chars.next()? {
        ' ' | '+' => SubmoduleState::Initialized,
        '-' => SubmoduleState::Uninitialized,
        'U' => SubmoduleState::Conflicted,
        _ => return None,
    };

    let (commit, rest) = chars.as_str().split_once(' ')?;
    if commit.is_empty() || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    // The describe suffix is only printed for checked-out submodules.
    let path = match rest.rfind(" (") {
        Some(index) if rest.ends_with(')') => &rest[..index],
        _ => rest,
    };
    if path.is_empty() {
        return None;
    }

    Some(Submodule {
        path: PathBuf::from(path),
        commit: commit.to_string(),
        state,
    })
}

/// Orders submodules so every submodule comes before the one containing it.
///
/// `git submodule status --recursive` lists parents first; committing must
/// happen the other way round so each parent records its children's new
/// commits.
pub fn innermost_first(mut submodules: Vec<Submodule>) -> Vec<Submodule> {
    submodules.reverse();
    submodules.sort_by_key(|submodule| std::cmp::Reverse(submodule.depth()));
    submodules
}
