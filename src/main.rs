use anyhow::Result;
use clap::Parser;
use filelaunch::config::load_config;
use filelaunch::console::ConsoleHandler;
use filelaunch::{FileLauncher, FilePath, LaunchContext};
use log::warn;
use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Open files, folders and URIs with the right application",
    long_about = None
)]
struct Args {
    /// Files, folders or URIs to open
    #[arg(required = true)]
    paths: Vec<String>,

    /// Config file to use instead of the default one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run executables without asking
    #[arg(short, long)]
    quick_exec: bool,

    /// Terminal command for terminal applications, e.g. "foot -e"
    #[arg(short, long)]
    terminal: Option<String>,

    /// Ask on stdin how to treat executables
    #[arg(short, long)]
    ask: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    // 1. Load Config, CLI flags win
    let mut config = load_config(args.config.as_deref())?;
    if let Some(terminal) = args.terminal {
        config.general.terminal = terminal;
    }
    if args.quick_exec {
        config.general.quick_exec = true;
    }

    // 2. Wire up the launcher
    let interactive = args.ask && io::stdin().is_terminal();
    let launcher =
        FileLauncher::xdg(&config).with_handler(Arc::new(ConsoleHandler::new(interactive)));
    let mut ctx = LaunchContext::new().with_env(config.env.clone());
    // hand our own startup notification on to whatever we open
    ctx.startup_id = env::var("DESKTOP_STARTUP_ID").ok().filter(|id| !id.is_empty());

    // 3. Classify and launch
    let paths: Vec<FilePath> = args
        .paths
        .iter()
        .filter_map(|raw| {
            let path = FilePath::parse(raw);
            if path.is_none() {
                warn!("Ignoring invalid path '{}'", raw);
            }
            path
        })
        .collect();
    let files = launcher.query(&paths);
    if files.is_empty() {
        return Ok(ExitCode::FAILURE);
    }

    // nothing here has to stay responsive, so wait for follow-up launches
    if launcher.launch_files(&files, &ctx).wait() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
