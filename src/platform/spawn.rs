use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use log::info;
use nix::unistd::setsid;

use crate::app::AppInfo;
use crate::error::LaunchError;
use crate::model::LaunchContext;
use crate::platform::AppLauncher;

/// Starts applications as detached child processes.
pub struct ProcessLauncher {
    terminal: String,
}

impl ProcessLauncher {
    pub fn new(terminal: impl Into<String>) -> Self {
        Self { terminal: terminal.into() }
    }

    /// Argument vectors to spawn, wrapped in the terminal when needed.
    pub fn command_lines(
        &self,
        app: &AppInfo,
        uris: &[String],
    ) -> Result<Vec<Vec<String>>, LaunchError> {
        let lines = app.command_lines(uris)?;
        if !app.terminal {
            return Ok(lines);
        }

        let terminal: Vec<String> = self.terminal.split_whitespace().map(str::to_string).collect();
        if terminal.is_empty() {
            return Ok(lines);
        }
        Ok(lines
            .into_iter()
            .map(|line| terminal.iter().cloned().chain(line).collect())
            .collect())
    }
}

impl AppLauncher for ProcessLauncher {
    fn launch(
        &self,
        app: &AppInfo,
        uris: &[String],
        ctx: &LaunchContext,
        working_dir: Option<&Path>,
    ) -> Result<(), LaunchError> {
        for line in self.command_lines(app, uris)? {
            let mut command = Command::new(&line[0]);
            command.args(&line[1..])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());

            for (key, val) in &ctx.env {
                command.env(key, val);
            }
            if let Some(id) = &ctx.startup_id {
                command.env("DESKTOP_STARTUP_ID", id);
            }
            if let Some(dir) = working_dir {
                command.current_dir(dir);
            }

            // SAFETY: setsid is async-signal-safe and touches no memory shared
            // with the parent. It detaches the child from our session.
            unsafe {
                command.pre_exec(|| {
                    setsid().map(|_| ()).map_err(std::io::Error::from)
                });
            }

            let child = command.spawn().map_err(|err| LaunchError::LaunchFailed {
                app: app.display_name().to_string(),
                reason: err.to_string(),
                paths: Vec::new(),
            })?;
            info!("Launched {} as pid {}: {:?}", app.display_name(), child.id(), line);
        }
        Ok(())
    }
}
