pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod launcher;
pub mod model;
pub mod platform;

pub use app::AppInfo;
pub use error::LaunchError;
pub use launcher::{FileLauncher, LaunchHandler, Launched};
pub use model::{ExecAction, FileInfo, FileKind, FilePath, LaunchContext};
