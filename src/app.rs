use std::path::PathBuf;

use url::Url;

use crate::error::LaunchError;

/// A resolved, launchable application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub id: Option<String>,           // Desktop file id, e.g. "firefox.desktop"
    pub name: String,                 // Display name
    pub exec: String,                 // Exec line, may contain field codes
    pub icon: Option<String>,         // Icon name/path
    pub terminal: bool,               // Needs a terminal emulator
    pub desktop_file: Option<PathBuf>, // Where the entry was loaded from
}

impl AppInfo {
    /// An ad-hoc application running `command` as-is.
    pub fn from_commandline(command: &str, terminal: bool) -> Self {
        let name = shlex::split(command)
            .and_then(|parts| parts.into_iter().next())
            .map(|program| {
                PathBuf::from(&program)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or(program)
            })
            .unwrap_or_else(|| command.to_string());

        Self {
            id: None,
            name,
            exec: command.to_string(),
            icon: None,
            terminal,
            desktop_file: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Expands the exec line against `uris`, producing one argument vector
    /// per process to start.
    ///
    /// `%f`/`%u` take a single file, so several URIs start several
    /// processes; `%F`/`%U` take all of them at once. An exec line without
    /// any file code behaves as if it ended in `%f`.
    pub fn command_lines(&self, uris: &[String]) -> Result<Vec<Vec<String>>, LaunchError> {
        let mut tokens = shlex::split(&self.exec).ok_or_else(|| LaunchError::InvalidCommandLine {
            command: self.exec.clone(),
            reason: "unbalanced quotes".to_string(),
        })?;

        let mut single = tokens.iter().any(|t| has_field_code(t, &['f', 'u']));
        let multi = tokens.iter().any(|t| has_field_code(t, &['F', 'U']));
        if !single && !multi && !uris.is_empty() {
            tokens.push("%f".to_string());
            single = true;
        }

        if single && !multi && uris.len() > 1 {
            return uris
                .iter()
                .map(|uri| self.expand(&tokens, std::slice::from_ref(uri)))
                .collect();
        }
        Ok(vec![self.expand(&tokens, uris)?])
    }

    fn expand(&self, tokens: &[String], uris: &[String]) -> Result<Vec<String>, LaunchError> {
        let mut argv = Vec::new();
        for token in tokens {
            match token.as_str() {
                "%F" => argv.extend(uris.iter().map(|u| to_local(u))),
                "%U" => argv.extend(uris.iter().cloned()),
                "%i" => {
                    if let Some(icon) = &self.icon {
                        argv.push("--icon".to_string());
                        argv.push(icon.clone());
                    }
                }
                _ => {
                    let expanded = self.expand_inline(token, uris);
                    if !expanded.is_empty() || !has_any_field_code(token) {
                        argv.push(expanded);
                    }
                }
            }
        }

        if argv.is_empty() {
            return Err(LaunchError::InvalidCommandLine {
                command: self.exec.clone(),
                reason: "empty command".to_string(),
            });
        }
        Ok(argv)
    }

    fn expand_inline(&self, token: &str, uris: &[String]) -> String {
        let mut out = String::with_capacity(token.len());
        let mut chars = token.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => out.push('%'),
                Some('f') => {
                    if let Some(uri) = uris.first() {
                        out.push_str(&to_local(uri));
                    }
                }
                Some('u') => {
                    if let Some(uri) = uris.first() {
                        out.push_str(uri);
                    }
                }
                Some('F') => {
                    let files: Vec<String> = uris.iter().map(|u| to_local(u)).collect();
                    out.push_str(&files.join(" "));
                }
                Some('U') => out.push_str(&uris.join(" ")),
                Some('c') => out.push_str(&self.name),
                Some('k') => {
                    if let Some(file) = &self.desktop_file {
                        out.push_str(&file.to_string_lossy());
                    }
                }
                Some('i') => {
                    if let Some(icon) = &self.icon {
                        out.push_str(icon);
                    }
                }
                // deprecated (%d %D %n %N %v %m) and unknown codes vanish
                _ => {}
            }
        }
        out
    }
}

fn has_field_code(token: &str, codes: &[char]) -> bool {
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some(code) if codes.contains(&code) => return true,
                _ => {}
            }
        }
    }
    false
}

fn has_any_field_code(token: &str) -> bool {
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('%') | None => {}
                Some(_) => return true,
            }
        }
    }
    false
}

/// `file:` URIs become local paths; everything else is passed through.
fn to_local(uri: &str) -> String {
    Url::parse(uri)
        .ok()
        .filter(|u| u.scheme() == "file")
        .and_then(|u| u.to_file_path().ok())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(exec: &str) -> AppInfo {
        AppInfo {
            id: Some("test.desktop".to_string()),
            name: "Test App".to_string(),
            exec: exec.to_string(),
            icon: Some("test-icon".to_string()),
            terminal: false,
            desktop_file: Some(PathBuf::from("/usr/share/applications/test.desktop")),
        }
    }

    fn uris(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn multi_file_code_uses_one_process() {
        let lines = app("viewer %F")
            .command_lines(&uris(&["file:///a%20b.txt", "file:///c.txt"]))
            .unwrap();
        assert_eq!(lines, vec![vec!["viewer", "/a b.txt", "/c.txt"]]);
    }

    #[test]
    fn single_file_code_spawns_per_uri() {
        let lines = app("editor --new %u")
            .command_lines(&uris(&["file:///a", "https://example.com"]))
            .unwrap();
        assert_eq!(
            lines,
            vec![
                vec!["editor", "--new", "file:///a"],
                vec!["editor", "--new", "https://example.com"],
            ]
        );
    }

    #[test]
    fn missing_file_code_appends_file() {
        let lines = app("player").command_lines(&uris(&["file:///m.ogg"])).unwrap();
        assert_eq!(lines, vec![vec!["player", "/m.ogg"]]);
    }

    #[test]
    fn codes_without_files_are_dropped() {
        let lines = app("browser %U --flag").command_lines(&[]).unwrap();
        assert_eq!(lines, vec![vec!["browser", "--flag"]]);

        let lines = app("browser %f").command_lines(&[]).unwrap();
        assert_eq!(lines, vec![vec!["browser"]]);
    }

    #[test]
    fn expands_metadata_codes() {
        let lines = app("run %i --title=%c --from %k 100%% %d").command_lines(&[]).unwrap();
        assert_eq!(
            lines,
            vec![vec![
                "run",
                "--icon",
                "test-icon",
                "--title=Test App",
                "--from",
                "/usr/share/applications/test.desktop",
                "100%",
            ]]
        );
    }

    #[test]
    fn quoted_paths_survive() {
        let quoted = shlex::try_quote("/home/u/my script.sh").unwrap();
        let info = AppInfo::from_commandline(&quoted, true);
        assert_eq!(info.name, "my script.sh");
        assert!(info.terminal);
        assert_eq!(
            info.command_lines(&[]).unwrap(),
            vec![vec!["/home/u/my script.sh"]]
        );
    }

    #[test]
    fn rejects_bad_exec_lines() {
        assert!(matches!(
            app("\"unterminated").command_lines(&[]),
            Err(LaunchError::InvalidCommandLine { .. })
        ));
        assert!(matches!(
            app("%f").command_lines(&[]),
            Err(LaunchError::InvalidCommandLine { .. })
        ));
    }
}
