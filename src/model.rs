use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

static URI_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("valid scheme regex"));

/// Returns the scheme of `s` if it starts like a URI (`scheme:`).
pub fn uri_scheme(s: &str) -> Option<&str> {
    URI_SCHEME
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Location of a file, always held as an absolute URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath {
    uri: Url,
}

impl FilePath {
    /// Relative paths are resolved against the current directory.
    pub fn from_local_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return None;
        }
        let absolute = std::path::absolute(path).ok()?;
        Url::from_file_path(absolute).ok().map(|uri| Self { uri })
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Url::parse(uri).ok().map(|uri| Self { uri })
    }

    /// Accepts either a URI or a plain local path.
    pub fn parse(s: &str) -> Option<Self> {
        if uri_scheme(s).is_some() {
            Self::from_uri(s)
        } else {
            Self::from_local_path(s)
        }
    }

    pub fn scheme(&self) -> &str {
        self.uri.scheme()
    }

    pub fn has_uri_scheme(&self, scheme: &str) -> bool {
        self.uri.scheme().eq_ignore_ascii_case(scheme)
    }

    pub fn is_native(&self) -> bool {
        self.has_uri_scheme("file")
    }

    pub fn local_path(&self) -> Option<PathBuf> {
        if self.is_native() {
            self.uri.to_file_path().ok()
        } else {
            None
        }
    }

    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    /// Host plus path of a non-native URI, e.g. `applications/foo.desktop`
    /// for `menu://applications/foo.desktop`.
    pub fn location(&self) -> String {
        let host = self.uri.host_str().unwrap_or_default();
        let path = self.uri.path().trim_start_matches('/');
        let location = match (host.is_empty(), path.is_empty()) {
            (true, _) => path.to_string(),
            (false, true) => host.to_string(),
            (false, false) => format!("{}/{}", host, path),
        };
        percent_decode(&location)
    }

    pub fn file_name(&self) -> Option<String> {
        match self.local_path() {
            Some(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            None => self
                .uri
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .filter(|name| !name.is_empty())
                .map(|name| percent_decode(&name)),
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local_path() {
            Some(path) => write!(f, "{}", path.display()),
            None => write!(f, "{}", self.uri),
        }
    }
}

fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// What a file is, in the order it is checked: a directory wins over a
/// mountable, which wins over a desktop entry, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    /// `target` is `None` while the volume is not mounted.
    Mountable { target: Option<String> },
    DesktopEntry {
        executable: bool,
        shortcut: bool,
        target: Option<String>,
    },
    Executable,
    Shortcut { target: String },
    Regular,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: FilePath,
    pub mime_type: String,
    pub kind: FileKind,
}

impl FileInfo {
    pub fn new(path: FilePath, mime_type: impl Into<String>, kind: FileKind) -> Self {
        Self {
            path,
            mime_type: mime_type.into(),
            kind,
        }
    }

    pub fn is_native(&self) -> bool {
        self.path.is_native()
    }

    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            FileKind::Mountable { target } | FileKind::DesktopEntry { target, .. } => {
                target.as_deref()
            }
            FileKind::Shortcut { target } => Some(target),
            _ => None,
        }
    }

    pub fn is_executable_type(&self) -> bool {
        matches!(
            self.kind,
            FileKind::Executable
                | FileKind::DesktopEntry {
                    executable: true,
                    ..
                }
        )
    }

    pub fn paths(files: &[FileInfo]) -> Vec<FilePath> {
        files.iter().map(|f| f.path.clone()).collect()
    }
}

/// How the user wants an executable file handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecAction {
    DirectExec,
    ExecInTerminal,
    OpenWithDefaultApp,
    Cancel,
}

/// Environment of the launching session, handed through to every launch.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    pub env: HashMap<String, String>,
    pub startup_id: Option<String>,
}

impl LaunchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }
}
