// Git module: every interaction with the external git binary lives here

mod filter;
mod repository;
mod runner;
mod submodule;

pub use filter::FilenameFilter;
pub use repository::GitRepo;
pub use runner::{GitOutput, GitRunner, SystemGit, format_command};
pub use submodule::{Submodule, SubmoduleState, innermost_first, parse_submodule_status};
