use crate::error::LaunchError;
use crate::model::{FileInfo, FileKind, FilePath};
use crate::platform::desktop::read_desktop_file;
use crate::platform::FileInfoProvider;
use log::debug;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub const DIRECTORY_MIME: &str = "inode/directory";
pub const DESKTOP_MIME: &str = "application/x-desktop";

/// Extensions that mark a file with the execute bit as something to run
/// rather than to open. Files without an extension count too.
const EXECUTABLE_EXTENSIONS: &[&str] =
    &["sh", "bash", "zsh", "py", "pl", "rb", "run", "bin", "appimage"];

/// Classifies local files from their metadata and a handful of virtual
/// locations from their URI. Mountables are never reported: plain
/// filesystem paths carry no mount state.
pub struct LocalFileInfo;

impl FileInfoProvider for LocalFileInfo {
    fn query(&self, path: &FilePath) -> Result<FileInfo, LaunchError> {
        let info = match path.local_path() {
            Some(local) => query_local(path, &local)?,
            None => query_virtual(path),
        };
        debug!("{} classified as {:?} ({})", path, info.kind, info.mime_type);
        Ok(info)
    }
}

fn query_local(path: &FilePath, local: &Path) -> Result<FileInfo, LaunchError> {
    let metadata = fs::metadata(local).map_err(|e| LaunchError::io(local, e))?;
    if metadata.is_dir() {
        return Ok(FileInfo::new(path.clone(), DIRECTORY_MIME, FileKind::Directory));
    }

    let executable = metadata.is_file() && metadata.permissions().mode() & 0o111 != 0;

    if local.extension().and_then(|s| s.to_str()) == Some("desktop") {
        if let Some(entry) = read_desktop_file(local) {
            let target = if entry.is_link() { entry.url.clone() } else { None };
            return Ok(FileInfo::new(
                path.clone(),
                DESKTOP_MIME,
                FileKind::DesktopEntry {
                    executable,
                    shortcut: entry.is_link(),
                    target,
                },
            ));
        }
    }

    let mime_type = mime_guess::from_path(local).first_or_octet_stream().essence_str().to_string();

    if executable && runs_directly(local) {
        return Ok(FileInfo::new(path.clone(), mime_type, FileKind::Executable));
    }
    Ok(FileInfo::new(path.clone(), mime_type, FileKind::Regular))
}

fn runs_directly(local: &Path) -> bool {
    match local.extension().and_then(|s| s.to_str()) {
        None => true,
        Some(ext) => EXECUTABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
    }
}

fn query_virtual(path: &FilePath) -> FileInfo {
    match path.scheme() {
        "menu" => match path.file_name().filter(|name| name.ends_with(".desktop")) {
            Some(id) => FileInfo::new(
                path.clone(),
                DESKTOP_MIME,
                FileKind::DesktopEntry {
                    executable: false,
                    shortcut: false,
                    target: Some(id),
                },
            ),
            None => FileInfo::new(path.clone(), DIRECTORY_MIME, FileKind::Directory),
        },
        "trash" | "computer" | "network" => {
            FileInfo::new(path.clone(), DIRECTORY_MIME, FileKind::Directory)
        }
        scheme => FileInfo::new(
            path.clone(),
            format!("x-scheme-handler/{}", scheme),
            FileKind::Shortcut {
                target: path.uri().to_string(),
            },
        ),
    }
}
