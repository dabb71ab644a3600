use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::FilePath;

/// Failures reported while dispatching a launch.
///
/// None of these abort a dispatch: they are handed to the launch handler at
/// the point they happen and the offending item is skipped.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("The path is not mounted: {path}")]
    NotMounted { path: FilePath },

    #[error("Invalid desktop entry file: '{name}'")]
    InvalidDesktopEntry { name: String },

    #[error("Cannot set working directory to '{}': {source}", .path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to launch {app}: {reason}")]
    LaunchFailed {
        app: String,
        reason: String,
        paths: Vec<FilePath>,
    },

    #[error("No application is available to open {mime_type}")]
    NoApplication { mime_type: String },

    #[error("Invalid command line '{command}': {reason}")]
    InvalidCommandLine { command: String, reason: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid URI: '{uri}'")]
    InvalidUri { uri: String },

    /// A re-query reached a path already re-queried in the same launch.
    #[error("{path} resolves back to itself")]
    ResolveLoop { path: FilePath },

    #[error("Failed to start file info worker: {0}")]
    Worker(#[source] io::Error),
}

impl LaunchError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LaunchError::Io {
            path: path.into(),
            source,
        }
    }
}
