use crate::app::AppInfo;
use crate::platform::desktop::{read_desktop_file, DesktopEntries};
use crate::platform::{AppResolver, DesktopEntryRegistry};
use directories::BaseDirs;
use log::debug;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Default applications from config overrides, `mimeapps.list` files and
/// finally the `MimeType=` keys of installed desktop entries.
#[derive(Debug, Clone)]
pub struct MimeApps {
    entries: DesktopEntries,
    overrides: HashMap<String, String>,
    lists: Vec<PathBuf>,
}

impl MimeApps {
    pub fn new(entries: DesktopEntries, overrides: HashMap<String, String>) -> Self {
        let lists = mimeapps_lists(&entries);
        Self::with_lists(entries, overrides, lists)
    }

    pub fn with_lists(
        entries: DesktopEntries,
        overrides: HashMap<String, String>,
        lists: Vec<PathBuf>,
    ) -> Self {
        Self { entries, overrides, lists }
    }

    fn first_resolvable(&self, ids: &[String]) -> Option<AppInfo> {
        ids.iter().find_map(|id| self.entries.resolve(id))
    }

    fn from_lists(&self, mime_type: &str) -> Option<AppInfo> {
        self.lists.iter().find_map(|list| {
            let content = fs::read_to_string(list).ok()?;
            let ids = default_applications(&content, mime_type);
            let app = self.first_resolvable(&ids);
            if app.is_some() {
                debug!("{} handled per {:?}", mime_type, list);
            }
            app
        })
    }

    fn from_installed(&self, mime_type: &str) -> Option<AppInfo> {
        self.entries.entries().into_iter().find_map(|(id, path)| {
            let entry = read_desktop_file(&path)?;
            if entry.mime_types.iter().any(|m| m == mime_type) {
                entry.to_app_info(Some(id), &path)
            } else {
                None
            }
        })
    }
}

impl AppResolver for MimeApps {
    fn default_for_type(&self, mime_type: &str) -> Option<AppInfo> {
        if let Some(ids) = self.overrides.get(mime_type) {
            let ids = split_ids(ids);
            if let Some(app) = self.first_resolvable(&ids) {
                return Some(app);
            }
            debug!("Configured handler for {} is not installed", mime_type);
        }
        self.from_lists(mime_type)
            .or_else(|| self.from_installed(mime_type))
    }
}

/// `mimeapps.list` files in lookup order: the user config dir first, then
/// one next to each `applications` directory.
pub fn mimeapps_lists(entries: &DesktopEntries) -> Vec<PathBuf> {
    let mut lists = Vec::new();
    let config_home = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()));
    if let Some(config_home) = config_home {
        lists.push(config_home.join("mimeapps.list"));
    }
    lists.extend(entries.dirs().iter().map(|dir| dir.join("mimeapps.list")));
    lists
}

/// Desktop ids listed for `mime_type` under `[Default Applications]`.
pub fn default_applications(content: &str, mime_type: &str) -> Vec<String> {
    let mut in_defaults = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        if line.starts_with('[') {
            in_defaults = line == "[Default Applications]";
            continue;
        }
        if !in_defaults { continue; }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == mime_type {
                return split_ids(value);
            }
        }
    }
    Vec::new()
}

fn split_ids(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
