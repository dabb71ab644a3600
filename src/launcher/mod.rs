use std::collections::{BTreeMap, HashSet};
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use nix::unistd::{access, AccessFlags};

use crate::app::AppInfo;
use crate::config::Config;
use crate::error::LaunchError;
use crate::model::{uri_scheme, ExecAction, FileInfo, FileKind, FilePath, LaunchContext};
use crate::platform::desktop::DesktopEntries;
use crate::platform::fileinfo::{LocalFileInfo, DIRECTORY_MIME};
use crate::platform::mime::MimeApps;
use crate::platform::spawn::ProcessLauncher;
use crate::platform::{AppLauncher, AppResolver, DesktopEntryRegistry, FileInfoProvider};


/// Schemes that resolve to something we can query and launch ourselves.
const LOCAL_SCHEMES: &[&str] = &["file", "trash", "network", "computer"];

/// Serialises process-wide working directory changes.
static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Hooks for user interaction. Every method has an unattended default.
pub trait LaunchHandler: Send + Sync {
    fn ask_exec_file(&self, _file: &FileInfo) -> ExecAction {
        ExecAction::DirectExec
    }

    /// Returns true when the error was dealt with (for a mountable that
    /// means it got mounted), false to skip the item.
    fn show_error(
        &self,
        _ctx: &LaunchContext,
        err: &LaunchError,
        path: Option<&FilePath>,
        _file: Option<&FileInfo>,
    ) -> bool {
        match path {
            Some(path) => warn!("{}: {}", path, err),
            None => warn!("{}", err),
        }
        false
    }

    /// Called when no default application exists for `mime_type`.
    fn choose_app(&self, _files: &[FileInfo], _mime_type: &str) -> Option<AppInfo> {
        None
    }
}

pub struct DefaultHandler;

impl LaunchHandler for DefaultHandler {}

/// Result of a dispatch. Paths that needed fresh metadata are handled on
/// worker threads; `wait` joins them, dropping the value detaches them.
#[must_use = "dropping a Launched detaches pending launches"]
#[derive(Debug)]
pub struct Launched {
    ok: bool,
    pending: Vec<JoinHandle<Launched>>,
}

impl Launched {
    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Blocks until every follow-up launch has finished. Do not call this
    /// from a thread that has to stay responsive.
    pub fn wait(self) -> bool {
        let mut pending = self.pending;
        while let Some(handle) = pending.pop() {
            match handle.join() {
                Ok(next) => pending.extend(next.pending),
                Err(_) => error!("File info worker panicked"),
            }
        }
        self.ok
    }
}

/// Restores the previous working directory when dropped.
struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.previous) {
            warn!("Cannot restore working directory {:?}: {}", self.previous, err);
        }
    }
}

/// Opens a selection of files, each the way its kind calls for.
#[derive(Clone)]
pub struct FileLauncher {
    files: Arc<dyn FileInfoProvider>,
    apps: Arc<dyn AppResolver>,
    entries: Arc<dyn DesktopEntryRegistry>,
    launcher: Arc<dyn AppLauncher>,
    handler: Arc<dyn LaunchHandler>,
    quick_exec: bool,
}

impl FileLauncher {
    pub fn new(
        files: Arc<dyn FileInfoProvider>,
        apps: Arc<dyn AppResolver>,
        entries: Arc<dyn DesktopEntryRegistry>,
        launcher: Arc<dyn AppLauncher>,
    ) -> Self {
        Self {
            files,
            apps,
            entries,
            launcher,
            handler: Arc::new(DefaultHandler),
            quick_exec: false,
        }
    }

    /// Local files, installed desktop entries and child processes.
    pub fn xdg(config: &Config) -> Self {
        let entries = DesktopEntries::system(&config.desktop.extra_dirs);
        let apps = MimeApps::new(entries.clone(), config.default_apps.clone());
        Self::new(
            Arc::new(LocalFileInfo),
            Arc::new(apps),
            Arc::new(entries),
            Arc::new(ProcessLauncher::new(config.general.terminal.clone())),
        )
        .with_quick_exec(config.general.quick_exec)
    }

    pub fn with_handler(mut self, handler: Arc<dyn LaunchHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Run executables directly instead of asking.
    pub fn with_quick_exec(mut self, quick_exec: bool) -> Self {
        self.quick_exec = quick_exec;
        self
    }

    pub fn query(&self, paths: &[FilePath]) -> Vec<FileInfo> {
        self.files.query_all(paths)
    }

    pub fn launch_files(&self, files: &[FileInfo], ctx: &LaunchContext) -> Launched {
        self.launch_requeried(files, ctx, &HashSet::new())
    }

    /// Queries `paths` on a worker thread, then launches the results there.
    pub fn launch_paths(&self, paths: Vec<FilePath>, ctx: &LaunchContext) -> Launched {
        let mut pending = Vec::new();
        let ok = self.requery(paths, ctx, &HashSet::new(), &mut pending);
        Launched { ok, pending }
    }

    /// `seen` holds every path already re-queried on the way to `files`.
    fn launch_requeried(
        &self,
        files: &[FileInfo],
        ctx: &LaunchContext,
        seen: &HashSet<FilePath>,
    ) -> Launched {
        let mut pending = Vec::new();
        let ok = self.dispatch(files, ctx, seen, &mut pending);
        Launched { ok, pending }
    }

    fn dispatch(
        &self,
        files: &[FileInfo],
        ctx: &LaunchContext,
        seen: &HashSet<FilePath>,
        pending: &mut Vec<JoinHandle<Launched>>,
    ) -> bool {
        let mut folders = Vec::new();
        let mut by_type: BTreeMap<&str, Vec<FileInfo>> = BTreeMap::new();
        let mut to_launch = Vec::new();

        for file in files {
            match &file.kind {
                FileKind::Directory => folders.push(file.clone()),
                FileKind::Mountable { target } => match non_empty(target.as_deref()) {
                    None => {
                        let err = LaunchError::NotMounted { path: file.path.clone() };
                        if !self.handler.show_error(ctx, &err, Some(&file.path), Some(file)) {
                            debug!("Skipping unmounted {}", file.path);
                            continue;
                        }
                        // mounting changes the target, so ask again
                        to_launch.push(file.path.clone());
                    }
                    Some(target) => match FilePath::parse(target) {
                        Some(path) => to_launch.push(path),
                        None => {
                            let err = LaunchError::InvalidUri { uri: target.to_string() };
                            self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
                        }
                    },
                },
                FileKind::DesktopEntry { .. } => {
                    self.launch_desktop_entry(file, &[], ctx, seen, pending);
                }
                FileKind::Executable => {
                    self.launch_executable(file, ctx);
                }
                FileKind::Shortcut { .. } => {
                    if let Some(path) = self.handle_shortcut(file, ctx) {
                        to_launch.push(path);
                    }
                }
                FileKind::Regular => {
                    by_type.entry(file.mime_type.as_str()).or_default().push(file.clone());
                }
            }
        }

        if !folders.is_empty() {
            self.open_folders(&folders, ctx);
        }

        for (mime_type, files) in &by_type {
            match self.resolve_app(files, mime_type) {
                Some(app) => {
                    self.launch_with_app(&app, &FileInfo::paths(files), ctx);
                }
                None => {
                    let err = LaunchError::NoApplication { mime_type: mime_type.to_string() };
                    self.handler.show_error(ctx, &err, Some(&files[0].path), Some(&files[0]));
                }
            }
        }

        if !to_launch.is_empty() {
            self.requery(to_launch, ctx, seen, pending);
        }

        true
    }

    /// Paths already in `seen` lead back to themselves: they are reported
    /// and dropped instead of being queried again.
    fn requery(
        &self,
        paths: Vec<FilePath>,
        ctx: &LaunchContext,
        seen: &HashSet<FilePath>,
        pending: &mut Vec<JoinHandle<Launched>>,
    ) -> bool {
        let (repeated, paths): (Vec<_>, Vec<_>) =
            paths.into_iter().partition(|path| seen.contains(path));
        for path in &repeated {
            let err = LaunchError::ResolveLoop { path: path.clone() };
            self.handler.show_error(ctx, &err, Some(path), None);
        }
        if paths.is_empty() {
            return false;
        }

        debug!("Re-querying {} path(s)", paths.len());
        let mut seen = seen.clone();
        seen.extend(paths.iter().cloned());
        let launcher = self.clone();
        let worker_ctx = ctx.clone();
        let spawned = thread::Builder::new()
            .name("file-info".to_string())
            .spawn(move || {
                let files = launcher.files.query_all(&paths);
                launcher.launch_requeried(&files, &worker_ctx, &seen)
            });

        match spawned {
            Ok(handle) => {
                pending.push(handle);
                true
            }
            Err(err) => {
                self.handler.show_error(ctx, &LaunchError::Worker(err), None, None);
                false
            }
        }
    }

    fn resolve_app(&self, files: &[FileInfo], mime_type: &str) -> Option<AppInfo> {
        self.apps
            .default_for_type(mime_type)
            .or_else(|| self.handler.choose_app(files, mime_type))
    }

    fn open_folders(&self, folders: &[FileInfo], ctx: &LaunchContext) -> bool {
        match self.resolve_app(folders, DIRECTORY_MIME) {
            Some(app) => self.launch_with_app(&app, &FileInfo::paths(folders), ctx),
            None => {
                let err = LaunchError::NoApplication { mime_type: DIRECTORY_MIME.to_string() };
                self.handler.show_error(ctx, &err, Some(&folders[0].path), Some(&folders[0]));
                false
            }
        }
    }

    fn exec_action(&self, file: &FileInfo) -> ExecAction {
        if self.quick_exec {
            ExecAction::DirectExec
        } else {
            self.handler.ask_exec_file(file)
        }
    }

    /// Starts `app` once with all of `paths`.
    pub fn launch_with_app(&self, app: &AppInfo, paths: &[FilePath], ctx: &LaunchContext) -> bool {
        let uris: Vec<String> = paths.iter().map(|p| p.uri().to_string()).collect();
        info!("Opening {} item(s) with {}", uris.len(), app.display_name());
        match self.launcher.launch(app, &uris, ctx, None) {
            Ok(()) => true,
            Err(err) => {
                let err = match err {
                    LaunchError::LaunchFailed { app, reason, .. } => LaunchError::LaunchFailed {
                        app,
                        reason,
                        paths: paths.to_vec(),
                    },
                    other => other,
                };
                self.handler.show_error(ctx, &err, paths.first(), None);
                false
            }
        }
    }

    fn launch_desktop_entry(
        &self,
        file: &FileInfo,
        paths: &[FilePath],
        ctx: &LaunchContext,
        seen: &HashSet<FilePath>,
        pending: &mut Vec<JoinHandle<Launched>>,
    ) -> bool {
        let shortcut = matches!(file.kind, FileKind::DesktopEntry { shortcut: true, .. });

        if file.is_executable_type() {
            match self.exec_action(file) {
                ExecAction::DirectExec | ExecAction::ExecInTerminal => {}
                ExecAction::OpenWithDefaultApp => return self.launch_with_default_app(file, ctx),
                ExecAction::Cancel => return false,
            }
        } else if !(file.is_native() || file.path.has_uri_scheme("menu")) {
            debug!("Not launching untrusted desktop entry {}", file.path);
            return false;
        }

        if shortcut {
            return match self.handle_shortcut(file, ctx) {
                Some(path) => self.requery(vec![path], ctx, seen, pending),
                None => false,
            };
        }

        let name = non_empty(file.target())
            .map(str::to_string)
            .or_else(|| file.path.local_path().map(|p| p.to_string_lossy().into_owned()));
        match name {
            Some(name) => self.launch_desktop_entry_named(&name, paths, ctx),
            None => {
                let err = LaunchError::InvalidDesktopEntry { name: file.path.to_string() };
                self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
                false
            }
        }
    }

    /// Launches the desktop entry `name`, either an absolute file name or
    /// a desktop id, with `paths` as arguments.
    pub fn launch_desktop_entry_named(
        &self,
        name: &str,
        paths: &[FilePath],
        ctx: &LaunchContext,
    ) -> bool {
        match self.entries.resolve(name) {
            Some(app) => self.launch_with_app(&app, paths, ctx),
            None => {
                let err = LaunchError::InvalidDesktopEntry { name: name.to_string() };
                self.handler.show_error(ctx, &err, None, None);
                false
            }
        }
    }

    /// Local targets are returned for launching; anything else goes
    /// straight to the scheme handler and yields `None`.
    fn handle_shortcut(&self, file: &FileInfo, ctx: &LaunchContext) -> Option<FilePath> {
        let target = file.target().unwrap_or_default();
        let Some(scheme) = uri_scheme(target) else {
            return FilePath::from_local_path(target);
        };

        if LOCAL_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
            return FilePath::from_uri(target);
        }

        let Some(uri) = FilePath::from_uri(target) else {
            let err = LaunchError::InvalidUri { uri: target.to_string() };
            self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
            return None;
        };
        match self.apps.default_for_uri_scheme(scheme) {
            Some(app) => {
                self.launch_with_app(&app, &[uri], ctx);
            }
            None => {
                let err = LaunchError::NoApplication {
                    mime_type: format!("x-scheme-handler/{}", scheme),
                };
                self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
            }
        }
        None
    }

    fn launch_executable(&self, file: &FileInfo, ctx: &LaunchContext) -> bool {
        let Some(filename) = file.path.local_path() else { return false };
        // permissions may have changed since the file was listed
        if let Err(errno) = access(filename.as_path(), AccessFlags::X_OK) {
            debug!("{} is not executable: {}", filename.display(), errno);
            return false;
        }

        let terminal = match self.exec_action(file) {
            ExecAction::DirectExec => false,
            ExecAction::ExecInTerminal => true,
            ExecAction::OpenWithDefaultApp => return self.launch_with_default_app(file, ctx),
            ExecAction::Cancel => return false,
        };

        let filename_str = filename.to_string_lossy();
        let quoted = match shlex::try_quote(&filename_str) {
            Ok(quoted) => quoted.into_owned(),
            Err(err) => {
                let err = LaunchError::InvalidCommandLine {
                    command: filename_str.to_string(),
                    reason: err.to_string(),
                };
                self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
                return false;
            }
        };
        let app = AppInfo::from_commandline(&quoted, terminal);
        let run_dir = filename
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty() && *dir != Path::new("."));

        let result = if self.launcher.supports_working_dir() {
            self.launcher.launch(&app, &[], ctx, run_dir)
        } else {
            let _lock = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            let _cwd = run_dir.and_then(|dir| match CwdGuard::enter(dir) {
                Ok(guard) => Some(guard),
                Err(source) => {
                    let err = LaunchError::WorkingDirectory { path: dir.to_path_buf(), source };
                    self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
                    None
                }
            });
            self.launcher.launch(&app, &[], ctx, None)
        };

        if let Err(err) = result {
            self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
        }
        true
    }

    fn launch_with_default_app(&self, file: &FileInfo, ctx: &LaunchContext) -> bool {
        match self.apps.default_for_type(&file.mime_type) {
            Some(app) => self.launch_with_app(&app, std::slice::from_ref(&file.path), ctx),
            None => {
                let err = LaunchError::NoApplication { mime_type: file.mime_type.clone() };
                self.handler.show_error(ctx, &err, Some(&file.path), Some(file));
                false
            }
        }
    }
}

fn non_empty(target: Option<&str>) -> Option<&str> {
    target.filter(|t| !t.is_empty())
}
