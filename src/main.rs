use git_commitflow::{cli, error, logger, ui};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = logger::init() {
        eprintln!("Note: logging is unavailable: {e}");
    }

    match cli::main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_error(&format!("Error: {err:#}"));
            ExitCode::from(error::exit_code(&err))
        }
    }
}
