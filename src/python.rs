//! Locating a Python 3 interpreter for the external course tools.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Probed in order; the first one found on the search path wins.
pub const CANDIDATES: [&str; 3] = ["py", "python3", "python"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interpreter {
    pub path: PathBuf,
    /// As reported by `--version`, e.g. `Python 3.12.1`.
    pub version: String,
}

impl Interpreter {
    pub fn command(&self) -> Command {
        Command::new(&self.path)
    }
}

/// Finds the interpreter on the process search path, or uses `preferred`.
pub fn find(preferred: Option<&str>) -> Result<Interpreter> {
    let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;
    find_in(preferred, std::env::var_os("PATH"), &cwd)
}

/// Like [`find`], searching `paths` (a `PATH`-style list) instead.
pub fn find_in<P: AsRef<OsStr>>(preferred: Option<&str>, paths: Option<P>, cwd: &Path) -> Result<Interpreter> {
    let names: Vec<&str> = match preferred {
        Some(name) => vec![name],
        None => CANDIDATES.to_vec(),
    };
    let path = names
        .iter()
        .find_map(|name| {
            let found = which::which_in(name, paths.as_ref(), cwd).ok();
            debug!(candidate = name, found = ?found, "probing interpreter");
            found
        })
        .ok_or_else(|| Error::NoInterpreter {
            tried: names.iter().map(|name| name.to_string()).collect(),
        })?;
    let version = version_of(&path)?;
    if !is_python3(&version) {
        return Err(Error::NotPython3 { path, version });
    }
    info!(path = %path.display(), version = %version, "using interpreter");
    Ok(Interpreter { path, version })
}

/// Python 2 prints its version on stderr, Python 3 on stdout.
fn version_of(path: &Path) -> Result<String> {
    let output = Command::new(path)
        .arg("--version")
        .output()
        .map_err(|e| Error::io(path, e))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stdout.trim().is_empty() { stderr } else { stdout };
    Ok(text.trim().to_string())
}

fn is_python3(version: &str) -> bool {
    version
        .strip_prefix("Python ")
        .and_then(|v| v.split('.').next())
        .is_some_and(|major| major == "3")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_strings() {
        assert!(is_python3("Python 3.12.1"));
        assert!(is_python3("Python 3"));
        assert!(!is_python3("Python 2.7.18"));
        assert!(!is_python3("Python 30.1"));
        assert!(!is_python3("pypy 3"));
    }

    #[test]
    fn nothing_on_empty_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_in(None, Some(dir.path()), dir.path()).unwrap_err();
        match err {
            Error::NoInterpreter { tried } => assert_eq!(tried, CANDIDATES),
            other => panic!("{other:?}"),
        }
    }

    #[cfg(unix)]
    mod fake {
        use std::{fs, os::unix::fs::PermissionsExt};

        use super::*;

        pub fn script(dir: &Path, name: &str, body: &str) {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[test]
        fn first_candidate_wins() {
            let dir = tempfile::tempdir().unwrap();
            script(dir.path(), "python3", "echo 'Python 3.11.4'");
            script(dir.path(), "python", "echo 'Python 3.9.0'");
            let interpreter = find_in(None, Some(dir.path()), dir.path()).unwrap();
            assert_eq!(interpreter.path, dir.path().join("python3"));
            assert_eq!(interpreter.version, "Python 3.11.4");
        }

        #[test]
        fn python2_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            script(dir.path(), "py", "echo 'Python 2.7.18' >&2");
            script(dir.path(), "python3", "echo 'Python 3.11.4'");
            let err = find_in(None, Some(dir.path()), dir.path()).unwrap_err();
            assert!(
                matches!(&err, Error::NotPython3 { version, .. } if version == "Python 2.7.18"),
                "{err:?}"
            );
        }

        #[test]
        fn preferred_name() {
            let dir = tempfile::tempdir().unwrap();
            script(dir.path(), "python3", "echo 'Python 3.11.4'");
            script(dir.path(), "mypython", "echo 'Python 3.13.0'");
            let interpreter = find_in(Some("mypython"), Some(dir.path()), dir.path()).unwrap();
            assert_eq!(interpreter.version, "Python 3.13.0");
        }
    }
}
