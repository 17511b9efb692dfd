//! Repairs subcircuit paths in project netlists.
//!
//! Designs copied between checkouts often keep a subcircuit `path` that
//! points into the old checkout, or takes a detour through other
//! directories. Before a run, every netlist with a known place in the
//! project gets its imports rewritten to the canonical relative path.

use std::{
    collections::BTreeSet,
    fs,
    io::Write,
    path::{Component, Path, PathBuf},
};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    netlist::{ComponentKind, Netlist},
};

/// Designs each project netlist is expected to import, keyed by a glob over
/// its project-relative path.
pub const KNOWN_IMPORTS: &[(&str, &[&str])] = &[
    (
        "cpu/cpu.json",
        &[
            "cpu/alu.json",
            "cpu/branch-comp.json",
            "cpu/control-logic.json",
            "cpu/imm-gen.json",
            "cpu/regfile.json",
        ],
    ),
    ("harnesses/alu-harness.json", &["cpu/alu.json"]),
    ("harnesses/imm-gen-harness.json", &["cpu/imm-gen.json"]),
    ("harnesses/branch-comp-harness.json", &["cpu/branch-comp.json"]),
    ("harnesses/cpu-harness.json", &["cpu/cpu.json", "cpu/mem.json"]),
    ("harnesses/regfile-harness.json", &["cpu/regfile.json"]),
    ("harnesses/run.json", &["harnesses/cpu-harness.json"]),
    ("tests/unit-alu/*.json", &["harnesses/alu-harness.json", "cpu/alu.json"]),
    (
        "tests/unit-regfile/*.json",
        &["harnesses/regfile-harness.json", "cpu/regfile.json"],
    ),
    ("tests/unit-partial-load/*.json", &["cpu/partial-load.json"]),
    ("tests/integration-*/*.json", &["harnesses/cpu-harness.json", "cpu/cpu.json"]),
];

lazy_static! {
    static ref RULES: Vec<(Regex, &'static [&'static str])> = KNOWN_IMPORTS
        .iter()
        .map(|(glob, imports)| (Regex::new(&glob_pattern(glob)).unwrap(), *imports))
        .collect();
}

/// `*` matches within one path segment.
fn glob_pattern(glob: &str) -> String {
    let segments: Vec<String> = glob.split('*').map(regex::escape).collect();
    format!("^{}$", segments.join("[^/]*"))
}

/// Resolves `.` and `..` without touching the filesystem, since the target
/// may not exist.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// `target` relative to the directory `base`, `/`-separated.
fn relative_path(target: &Path, base: &Path) -> String {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = target.iter().zip(&base).take_while(|(a, b)| a == b).count();
    let mut parts = vec!["..".to_string(); base.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

/// Rewrites the subcircuit paths of `path` that do not take the canonical
/// route to their design, printing a line per fix. `root` is the canonical
/// project directory. Unreadable or malformed files are left for the test
/// that loads them to report. Returns whether the file changed.
pub fn repair(root: &Path, path: &Path, out: &mut impl Write) -> Result<bool> {
    let Ok(canonical) = fs::canonicalize(path) else {
        return Ok(false);
    };
    let Ok(relative) = canonical.strip_prefix(root) else {
        return Ok(false);
    };
    let relative = relative_path(relative, Path::new(""));
    let Some(known) = RULES
        .iter()
        .find(|(glob, _)| glob.is_match(&relative))
        .map(|(_, known)| *known)
    else {
        return Ok(false);
    };

    let text = match fs::read_to_string(&canonical) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), "skipping import check: {err}");
            return Ok(false);
        }
    };
    let netlist: Netlist = match serde_json::from_str(&text) {
        Ok(netlist) => netlist,
        Err(err) => {
            warn!(path = %path.display(), "skipping import check: {err}");
            return Ok(false);
        }
    };

    let dir = canonical.parent().unwrap_or(root);
    let mut fixed = text.clone();
    let mut seen = BTreeSet::new();
    for component in &netlist.components {
        let ComponentKind::Subcircuit { path: import } = &component.kind else {
            continue;
        };
        let Some(import) = import.to_str() else {
            continue;
        };
        if !seen.insert(import) {
            continue;
        }
        let target = normalize(&dir.join(import));
        let canonical_target = known
            .iter()
            .find(|design| target.ends_with(design))
            .map(|design| root.join(design));
        let expected = relative_path(canonical_target.as_ref().unwrap_or(&target), dir);
        if import == expected {
            continue;
        }
        let which = if canonical_target.is_some() { "bad" } else { "probably bad" };
        writeln!(
            out,
            "Fixing {which} import {import} in {} (should be {expected})",
            path.display()
        )
        .map_err(Error::Output)?;
        if let (Ok(old), Ok(new)) = (
            serde_json::to_string(import),
            serde_json::to_string(&expected),
        ) {
            fixed = fixed.replace(&old, &new);
        }
    }

    if fixed == text {
        return Ok(false);
    }
    if let Err(err) = fs::write(&canonical, fixed) {
        warn!(path = %path.display(), "could not save fixed imports: {err}");
        return Ok(false);
    }
    debug!(path = %path.display(), "fixed imports");
    Ok(true)
}
