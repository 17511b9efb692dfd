//! Discovers test netlists, runs them against their reference tables and
//! prints a PASS/FAIL summary.

mod imports;

use std::{
    cell::OnceCell,
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use sha3::{Digest, Sha3_256};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    harness::{self, VectorTable},
    netlist::Netlist,
    Config, Design,
};

pub use imports::{repair, KNOWN_IMPORTS};

pub const STARTER_HASHES: &str = ".starter-hashes";

/// Designs exempt from the banned component check.
const BANNED_EXEMPT: [&str; 1] = ["mem.json"];

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "run_test", about = "Run circuit tests")]
pub struct RunnerArgs {
    /// Path to a test netlist, or a directory containing test netlists
    #[arg(required = true)]
    pub test_path: Vec<PathBuf>,

    /// Check against reference output for 2-stage pipeline (when applicable)
    #[arg(short, long)]
    pub pipelined: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub path: PathBuf,
    pub id: String,
    pub name: String,
}

impl TestCase {
    pub fn new(path: PathBuf) -> TestCase {
        let id = path.display().to_string();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        TestCase { path, id, name }
    }

    /// Unit tests have no pipelined reference.
    pub fn can_pipeline(&self) -> bool {
        !self
            .path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|dir| dir.to_string_lossy().starts_with("unit-"))
    }

    fn out_dir(&self) -> PathBuf {
        self.path.parent().unwrap_or(Path::new(".")).join("out")
    }

    pub fn expected_path(&self, pipelined: bool) -> PathBuf {
        let extension = if pipelined { "piperef" } else { "ref" };
        self.out_dir().join(format!("{}.{extension}", self.name))
    }

    pub fn actual_path(&self) -> PathBuf {
        self.out_dir().join(format!("{}.out", self.name))
    }
}

fn is_netlist(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Test netlists named by `paths`, sorted. Directories are searched
/// recursively, skipping `out/` directories.
pub fn discover(paths: &[PathBuf]) -> Vec<TestCase> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_file() && is_netlist(path) {
            found.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            warn!(path = %path.display(), "test path does not exist");
            continue;
        }
        let walker = WalkDir::new(path)
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == "out"));
        for entry in walker.filter_map(|entry| entry.ok()) {
            if entry.file_type().is_file() && is_netlist(entry.path()) {
                found.push(entry.into_path());
            }
        }
    }
    found.sort();
    found.dedup();
    found.into_iter().map(TestCase::new).collect()
}

/// Hashes of the files handed out with the assignment, keyed by path
/// relative to the project root.
#[derive(Clone, Debug, Default)]
pub struct Integrity {
    root: PathBuf,
    hashes: BTreeMap<String, String>,
}

/// sha3-256 hex digest with CRLF line endings normalized to LF.
pub fn starter_hash(contents: &[u8]) -> String {
    let mut normalized = Vec::with_capacity(contents.len());
    let mut bytes = contents.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte == b'\r' && bytes.peek() == Some(&b'\n') {
            continue;
        }
        normalized.push(byte);
    }
    let mut hasher = Sha3_256::new();
    hasher.update(&normalized);
    format!("{:x}", hasher.finalize())
}

impl Integrity {
    /// Reads `<project>/.starter-hashes` (`<hash> <relative path>` per line).
    /// A missing manifest checks nothing.
    pub fn load(project: &Path) -> Result<Integrity> {
        let root = fs::canonicalize(project).map_err(|e| Error::io(project, e))?;
        let manifest = root.join(STARTER_HASHES);
        let text = match fs::read_to_string(&manifest) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::io(manifest, e)),
        };
        let hashes = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(char::is_whitespace))
            .map(|(hash, path)| (path.trim().to_string(), hash.to_ascii_lowercase()))
            .collect();
        Ok(Integrity { root, hashes })
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let path = fs::canonicalize(path).ok()?;
        let relative = path.strip_prefix(&self.root).ok()?;
        Some(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    /// `Err(reason)` when a listed file differs from the starter version.
    pub fn check(&self, path: &Path) -> std::result::Result<(), String> {
        let Some(relative) = self.relative(path) else {
            return Ok(());
        };
        let Some(expected) = self.hashes.get(&relative) else {
            return Ok(());
        };
        let contents = fs::read(path).map_err(|e| format!("could not read {relative}: {e}"))?;
        if &starter_hash(&contents) != expected {
            return Err(format!("{relative} was changed from starter"));
        }
        Ok(())
    }

    /// Checks the case's netlist and reference table.
    pub fn check_case(&self, case: &TestCase, pipelined: bool) -> std::result::Result<(), String> {
        self.check(&case.path)?;
        self.check(&case.expected_path(pipelined))
    }

    /// Checks every listed harness file.
    pub fn check_harnesses(&self) -> std::result::Result<(), String> {
        self.hashes
            .keys()
            .filter(|p| p.starts_with("harnesses/"))
            .try_for_each(|relative| self.check(&self.root.join(relative)))
    }
}

/// Netlists directly inside any directory named `dir_name` under `project`,
/// sorted by name.
fn designs_in<'a>(project: &Path, dir_name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(project)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(move |entry| {
            entry.file_type().is_file()
                && is_netlist(entry.path())
                && entry
                    .path()
                    .parent()
                    .and_then(Path::file_name)
                    .is_some_and(|dir| dir == dir_name)
        })
        .map(walkdir::DirEntry::into_path)
}

/// Prints `ERROR: found banned element (<kind>) in <path>` for every banned
/// kind used directly by a netlist in a `cpu/` directory of the project.
/// Netlists that do not parse are skipped; the tests that load them fail.
/// Returns whether anything was found.
pub fn find_banned(project: &Path, banned: &[String], out: &mut impl Write) -> Result<bool> {
    let mut found = false;
    let designs = designs_in(project, "cpu").filter(|path| {
        !BANNED_EXEMPT
            .iter()
            .any(|name| path.file_name().is_some_and(|file| file == *name))
    });
    for path in designs {
        let netlist = match Netlist::from_path(&path) {
            Ok(netlist) => netlist,
            Err(err) => {
                warn!(path = %path.display(), "skipping banned component check: {err}");
                continue;
            }
        };
        for kind in banned {
            if netlist.components.iter().any(|c| c.kind.name() == *kind) {
                writeln!(out, "ERROR: found banned element ({kind}) in {}", path.display())
                    .map_err(Error::Output)?;
                found = true;
            }
        }
    }
    Ok(found)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail { reason: String, extra: Option<String> },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    /// The run stopped before testing anything because of banned components.
    pub banned: bool,
}

impl Summary {
    pub fn exit_code(&self) -> i32 {
        if self.banned || !self.failed.is_empty() {
            1
        } else {
            0
        }
    }
}

pub struct Runner<'a> {
    config: &'a Config,
    integrity: Integrity,
    /// Harness hashes, checked once per run after imports are repaired.
    harnesses: OnceCell<std::result::Result<(), String>>,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a Config) -> Result<Runner<'a>> {
        let integrity = Integrity::load(&config.project_dir)?;
        Ok(Runner {
            config,
            integrity,
            harnesses: OnceCell::new(),
        })
    }

    pub fn run_case(&self, case: &TestCase, pipelined: bool) -> Outcome {
        let pipelined = pipelined && case.can_pipeline();
        let harnesses = self
            .harnesses
            .get_or_init(|| self.integrity.check_harnesses());
        if let Err(reason) = harnesses
            .clone()
            .and_then(|()| self.integrity.check_case(case, pipelined))
        {
            return Outcome::Fail {
                reason,
                extra: None,
            };
        }
        match self.compare(case, pipelined) {
            Ok(None) => Outcome::Pass,
            Ok(Some(diff)) => Outcome::Fail {
                reason: "Did not match expected output".to_string(),
                extra: Some(diff),
            },
            Err(err) => {
                error!(test = %case.id, "{err}");
                Outcome::Fail {
                    reason: "Errored while running test".to_string(),
                    extra: Some(error_chain(&err)),
                }
            }
        }
    }

    /// Runs the case and writes its actual table. `Some(diff)` on mismatch.
    fn compare(&self, case: &TestCase, pipelined: bool) -> Result<Option<String>> {
        let expected = VectorTable::from_path(&case.expected_path(pipelined))?;
        let mut design = Design::load(&case.path, self.config.max_ticks)?;
        let report = harness::run(&mut design, &expected)?;
        let actual_path = case.actual_path();
        if let Some(dir) = actual_path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        report.actual.write_to_path(&actual_path, &report.widths)?;
        debug!(
            test = %case.id,
            cycles = report.cycles,
            ticks = report.ticks,
            "ran test"
        );
        Ok((!report.passed()).then(|| report.diff()))
    }

    /// Runs every case named by `args`, printing progress to `out`.
    pub fn run(&self, args: &RunnerArgs, out: &mut impl Write) -> Result<Summary> {
        let mut summary = Summary::default();
        let root = &self.integrity.root;
        for path in designs_in(root, "cpu").chain(designs_in(root, "harnesses")) {
            repair(root, &path, out)?;
        }
        if find_banned(&self.config.project_dir, &self.config.banned, out)? {
            summary.banned = true;
            return Ok(summary);
        }
        let print = |out: &mut dyn Write, line: String| {
            writeln!(out, "{line}")
                .and_then(|_| out.flush())
                .map_err(Error::Output)
        };
        for case in discover(&args.test_path) {
            repair(root, &case.path, out)?;
            match self.run_case(&case, args.pipelined) {
                Outcome::Pass => {
                    print(out, format!("PASS: {}", case.id))?;
                    summary.passed.push(case.id);
                }
                Outcome::Fail { reason, extra } => {
                    print(out, format!("FAIL: {} ({reason})", case.id))?;
                    if let Some(extra) = extra {
                        let indented: Vec<String> =
                            extra.lines().map(|line| format!("  {line}")).collect();
                        print(out, indented.join("\n"))?;
                    }
                    summary.failed.push(case.id);
                }
            }
        }
        print(
            out,
            format!(
                "Passed {}/{} tests",
                summary.passed.len(),
                summary.passed.len() + summary.failed.len()
            ),
        )?;
        Ok(summary)
    }
}

fn error_chain(err: &Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(&format!("\ncaused by: {cause}"));
        source = std::error::Error::source(cause);
    }
    text
}
