use crate::app::AppInfo;
use crate::platform::DesktopEntryRegistry;
use directories::BaseDirs;
use log::{debug, trace};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The `[Desktop Entry]` group of a `.desktop` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    pub entry_type: String,
    pub name: Option<String>,
    pub exec: Option<String>,
    pub try_exec: Option<String>,
    pub terminal: bool,
    pub icon: Option<String>,
    pub url: Option<String>,
    pub mime_types: Vec<String>,
    pub hidden: bool,
}

impl DesktopEntry {
    pub fn is_link(&self) -> bool {
        self.entry_type == "Link"
    }

    /// Only `Type=Application` entries that are not `Hidden`, with an `Exec`
    /// line (and an installed `TryExec`, if any) are launchable. `NoDisplay`
    /// only keeps an entry out of menus, so it is not consulted.
    pub fn to_app_info(&self, id: Option<String>, path: &Path) -> Option<AppInfo> {
        if self.entry_type != "Application" || self.hidden {
            return None;
        }
        if let Some(try_exec) = &self.try_exec {
            if !program_exists(try_exec) {
                debug!("TryExec {} of {:?} not found", try_exec, path);
                return None;
            }
        }
        let exec = self.exec.clone()?;
        let name = self
            .name
            .clone()
            .or_else(|| id.clone())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Some(AppInfo {
            id,
            name,
            exec,
            icon: self.icon.clone(),
            terminal: self.terminal,
            desktop_file: Some(path.to_path_buf()),
        })
    }
}

/// Returns `None` when the content has no `[Desktop Entry]` group.
pub fn parse_desktop_file(content: &str) -> Option<DesktopEntry> {
    let mut entry = DesktopEntry::default();
    let mut in_group = false;
    let mut seen_group = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }

        if line == "[Desktop Entry]" {
            in_group = true;
            seen_group = true;
            continue;
        }

        if line.starts_with('[') {
            in_group = false;
            continue;
        }

        if !in_group { continue; }

        let Some((key, value)) = line.split_once('=') else { continue };
        let value = value.trim();
        match key.trim() {
            "Type" => entry.entry_type = value.to_string(),
            "Name" => entry.name = Some(value.to_string()),
            "Exec" => entry.exec = Some(value.to_string()),
            "TryExec" => entry.try_exec = Some(value.to_string()),
            "Terminal" => entry.terminal = value == "true",
            "Icon" => entry.icon = Some(value.to_string()),
            "URL" => entry.url = Some(value.to_string()),
            "MimeType" => {
                entry.mime_types = value
                    .split(';')
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "Hidden" => entry.hidden = value == "true",
            _ => {}
        }
    }

    seen_group.then_some(entry)
}

pub fn read_desktop_file(path: &Path) -> Option<DesktopEntry> {
    match fs::read_to_string(path) {
        Ok(content) => parse_desktop_file(&content),
        Err(err) => {
            debug!("Cannot read desktop file {:?}: {}", path, err);
            None
        }
    }
}

fn program_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.is_absolute() {
        return path.is_file();
    }
    env::var("PATH")
        .map(|path_var| path_var.split(':').any(|dir| Path::new(dir).join(program).is_file()))
        .unwrap_or(false)
}

/// `applications` directories in XDG lookup order, highest priority first.
pub fn application_dirs(extra_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = extra_dirs.to_vec();

    match env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        Some(data_home) => dirs.push(PathBuf::from(data_home).join("applications")),
        None => {
            if let Some(base_dirs) = BaseDirs::new() {
                dirs.push(base_dirs.data_dir().join("applications"));
            }
        }
    }

    let data_dirs = env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
    for dir in data_dirs.split(':').filter(|d| !d.is_empty()) {
        dirs.push(Path::new(dir).join("applications"));
    }

    dirs
}

/// Desktop entries installed in a list of `applications` directories.
#[derive(Debug, Clone)]
pub struct DesktopEntries {
    dirs: Vec<PathBuf>,
}

impl DesktopEntries {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn system(extra_dirs: &[PathBuf]) -> Self {
        Self::new(application_dirs(extra_dirs))
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn load(&self, path: &Path, id: Option<String>) -> Option<AppInfo> {
        read_desktop_file(path)?.to_app_info(id, path)
    }

    /// Locates the file for a desktop id such as `org.gnome.Nautilus.desktop`.
    pub fn find(&self, id: &str) -> Option<PathBuf> {
        let id = if id.ends_with(".desktop") {
            id.to_string()
        } else {
            format!("{}.desktop", id)
        };

        for dir in &self.dirs {
            let candidate = dir.join(&id);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // ids of entries in sub-directories use '-' as separator
        self.entries()
            .into_iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, path)| path)
    }

    /// Every installed entry as `(id, path)`, sorted by id. When an id is
    /// present in several directories the first directory wins.
    pub fn entries(&self) -> Vec<(String, PathBuf)> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for dir in &self.dirs {
            if !dir.exists() { continue; }
            trace!("Scanning desktop files in {:?}", dir);
            for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some("desktop") {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(dir) else { continue };
                let id = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("-");
                if seen.insert(id.clone()) {
                    entries.push((id, path.to_path_buf()));
                }
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl DesktopEntryRegistry for DesktopEntries {
    fn resolve(&self, id_or_path: &str) -> Option<AppInfo> {
        let path = Path::new(id_or_path);
        if path.is_absolute() {
            let id = path.file_name().map(|n| n.to_string_lossy().into_owned());
            return self.load(path, id);
        }
        let file = self.find(id_or_path)?;
        let id = if id_or_path.ends_with(".desktop") {
            id_or_path.to_string()
        } else {
            format!("{}.desktop", id_or_path)
        };
        self.load(&file, Some(id))
    }
}
