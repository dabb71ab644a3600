use std::io::{self, BufRead, Write};

use log::error;

use crate::error::LaunchError;
use crate::launcher::LaunchHandler;
use crate::model::{ExecAction, FileInfo, FilePath, LaunchContext};

/// Asks about executables on stdin and logs errors.
pub struct ConsoleHandler {
    interactive: bool,
}

impl ConsoleHandler {
    /// Without `interactive`, executables are always run directly.
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl LaunchHandler for ConsoleHandler {
    fn ask_exec_file(&self, file: &FileInfo) -> ExecAction {
        if !self.interactive {
            return ExecAction::DirectExec;
        }

        let mut stderr = io::stderr();
        let _ = write!(
            stderr,
            "'{}' is executable. [r]un, run in [t]erminal, [o]pen, [c]ancel? [r] ",
            file.path
        );
        let _ = stderr.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => ExecAction::Cancel,
            Ok(_) => parse_answer(&answer),
        }
    }

    fn show_error(
        &self,
        _ctx: &LaunchContext,
        err: &LaunchError,
        path: Option<&FilePath>,
        _file: Option<&FileInfo>,
    ) -> bool {
        match path {
            Some(path) => error!("{}: {}", path, err),
            None => error!("{}", err),
        }
        false
    }
}

pub fn parse_answer(answer: &str) -> ExecAction {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "r" | "run" => ExecAction::DirectExec,
        "t" | "terminal" => ExecAction::ExecInTerminal,
        "o" | "open" => ExecAction::OpenWithDefaultApp,
        _ => ExecAction::Cancel,
    }
}
