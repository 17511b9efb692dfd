//! Settings read from `NETSIM_*` environment variables.

use std::{env, path::PathBuf};

use crate::{
    circuit_sim::Ticks,
    error::{Error, Result},
};

pub const DEFAULT_MAX_TICKS: Ticks = 100_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunnerKind {
    /// Built-in netlist runner.
    #[default]
    Native,
    /// `tools/run_test.py` under the detected Python interpreter.
    External,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Root of the course project: `cpu/`, `harnesses/`, `tests/`, `tools/`.
    pub project_dir: PathBuf,
    pub runner: RunnerKind,
    /// Interpreter to use instead of probing the search path.
    pub python: Option<String>,
    /// Upper bound on ticks for a single settle.
    pub max_ticks: Ticks,
    /// Component kinds not allowed in `cpu/` designs.
    pub banned: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project_dir: PathBuf::from("."),
            runner: RunnerKind::Native,
            python: None,
            max_ticks: DEFAULT_MAX_TICKS,
            banned: vec!["rom".to_string()],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Self::from_vars(|var| env::var(var).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for unset or
    /// empty variables.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let lookup = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let mut config = Config::default();
        if let Some(dir) = lookup("NETSIM_PROJECT_DIR") {
            config.project_dir = PathBuf::from(dir);
        }
        if let Some(runner) = lookup("NETSIM_RUNNER") {
            config.runner = match runner.trim().to_ascii_lowercase().as_str() {
                "native" => RunnerKind::Native,
                "external" => RunnerKind::External,
                _ => {
                    return Err(Error::BadEnv {
                        var: "NETSIM_RUNNER",
                        value: runner,
                    })
                }
            };
        }
        config.python = lookup("NETSIM_PYTHON");
        if let Some(max_ticks) = lookup("NETSIM_MAX_TICKS") {
            config.max_ticks = match max_ticks.trim().parse() {
                Ok(ticks) if ticks > 0 => ticks,
                _ => {
                    return Err(Error::BadEnv {
                        var: "NETSIM_MAX_TICKS",
                        value: max_ticks,
                    })
                }
            };
        }
        if let Some(banned) = lookup("NETSIM_BANNED") {
            config.banned = banned
                .split(',')
                .map(|kind| kind.trim().to_string())
                .filter(|kind| !kind.is_empty())
                .collect();
        }
        Ok(config)
    }
}
