use crate::app::AppInfo;
use crate::error::LaunchError;
use crate::model::{FileInfo, FilePath, LaunchContext};
use std::path::Path;

/// Classifies paths into [`FileInfo`]s.
pub trait FileInfoProvider: Send + Sync {
    fn query(&self, path: &FilePath) -> Result<FileInfo, LaunchError>;

    /// Paths that cannot be queried are logged and left out.
    fn query_all(&self, paths: &[FilePath]) -> Vec<FileInfo> {
        paths
            .iter()
            .filter_map(|path| match self.query(path) {
                Ok(info) => Some(info),
                Err(err) => {
                    log::warn!("Skipping {}: {}", path, err);
                    None
                }
            })
            .collect()
    }
}

/// Maps MIME types and URI schemes to their default handler.
pub trait AppResolver: Send + Sync {
    fn default_for_type(&self, mime_type: &str) -> Option<AppInfo>;

    fn default_for_uri_scheme(&self, scheme: &str) -> Option<AppInfo> {
        self.default_for_type(&format!("x-scheme-handler/{}", scheme.to_ascii_lowercase()))
    }
}

/// Looks up desktop entries by id or by absolute file name.
pub trait DesktopEntryRegistry: Send + Sync {
    fn resolve(&self, id_or_path: &str) -> Option<AppInfo>;
}

/// Starts an application with a list of URIs.
pub trait AppLauncher: Send + Sync {
    fn launch(
        &self,
        app: &AppInfo,
        uris: &[String],
        ctx: &LaunchContext,
        working_dir: Option<&Path>,
    ) -> Result<(), LaunchError>;

    /// Whether `working_dir` is honoured. When it is not, the caller has
    /// to change the process working directory around the launch.
    fn supports_working_dir(&self) -> bool {
        true
    }
}

pub mod desktop;
pub mod fileinfo;
pub mod mime;
pub mod spawn;
