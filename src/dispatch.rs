//! The `netsim <command> [args...]` command table.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{debug, info};

use crate::{
    config::RunnerKind,
    python,
    runner::{Runner, RunnerArgs},
    Config,
};

pub const RUN_TEST_SCRIPT: &str = "tools/run_test.py";
pub const DOWNLOAD_TOOLS_SCRIPT: &str = "tools/download_tools.py";

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(
    name = "netsim",
    about = "Circuit test dispatcher for the CPU project",
    long_about = None,
    disable_help_subcommand = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Everything after the command, handed to the target untouched.
#[derive(Args, Debug, Default, PartialEq, Eq)]
pub struct Forwarded {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the ALU, regfile and addi tests
    #[command(name = "part_a", disable_help_flag = true)]
    PartA(Forwarded),
    /// Run the addi integration tests
    #[command(name = "test_addi", disable_help_flag = true)]
    TestAddi(Forwarded),
    /// Run the ALU unit tests
    #[command(name = "test_alu", disable_help_flag = true)]
    TestAlu(Forwarded),
    /// Run the regfile unit tests
    #[command(name = "test_regfile", disable_help_flag = true)]
    TestRegfile(Forwarded),
    /// Download the external course tools
    #[command(name = "download_tools", disable_help_flag = true)]
    DownloadTools(Forwarded),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The test runner over these project-relative test directories.
    Tests(&'static [&'static str]),
    DownloadTools,
}

impl Command {
    pub fn target(&self) -> Target {
        match self {
            Command::PartA(_) => Target::Tests(&[
                "tests/unit-alu",
                "tests/unit-regfile",
                "tests/integration-addi",
            ]),
            Command::TestAddi(_) => Target::Tests(&["tests/integration-addi"]),
            Command::TestAlu(_) => Target::Tests(&["tests/unit-alu"]),
            Command::TestRegfile(_) => Target::Tests(&["tests/unit-regfile"]),
            Command::DownloadTools(_) => Target::DownloadTools,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            Command::PartA(forwarded)
            | Command::TestAddi(forwarded)
            | Command::TestAlu(forwarded)
            | Command::TestRegfile(forwarded)
            | Command::DownloadTools(forwarded) => &forwarded.args,
        }
    }
}

/// Parses `argv` (program name first) and runs the command, returning the
/// process exit code. A missing or unknown command prints the help text on
/// stderr and returns 1.
pub fn run<I, T>(argv: I, config: &Config) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) => {
            debug!(kind = ?err.kind(), "bad command line");
            eprintln!("{}", Cli::command().render_help());
            return 1;
        }
    };
    match execute(&cli.command, config) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    }
}

pub fn execute(command: &Command, config: &Config) -> Result<i32> {
    let args = command.args();
    match command.target() {
        Target::Tests(dirs) => match config.runner {
            RunnerKind::Native => {
                run_native(config, dirs.iter().map(|dir| project_path(config, dir)), args)
            }
            // The script runs inside the project, so it gets the relative paths
            RunnerKind::External => {
                let script_args: Vec<OsString> = dirs
                    .iter()
                    .map(OsString::from)
                    .chain(args.iter().map(OsString::from))
                    .collect();
                run_python(config, RUN_TEST_SCRIPT, &script_args)
            }
        },
        Target::DownloadTools => {
            let script_args: Vec<OsString> = args.iter().map(OsString::from).collect();
            run_python(config, DOWNLOAD_TOOLS_SCRIPT, &script_args)
        }
    }
}

fn project_path(config: &Config, relative: &str) -> PathBuf {
    if config.project_dir == Path::new(".") {
        PathBuf::from(relative)
    } else {
        config.project_dir.join(relative)
    }
}

fn run_native(
    config: &Config,
    dirs: impl Iterator<Item = PathBuf>,
    args: &[String],
) -> Result<i32> {
    let argv = std::iter::once(OsString::from("run_test"))
        .chain(dirs.map(PathBuf::into_os_string))
        .chain(args.iter().map(OsString::from));
    let runner_args = match RunnerArgs::try_parse_from(argv) {
        Ok(runner_args) => runner_args,
        Err(err) => {
            let _ = err.print();
            return Ok(err.exit_code());
        }
    };
    let runner = Runner::new(config).context("could not open the project")?;
    let summary = runner.run(&runner_args, &mut io::stdout().lock())?;
    Ok(summary.exit_code())
}

fn run_python(config: &Config, script: &str, args: &[OsString]) -> Result<i32> {
    let interpreter = python::find(config.python.as_deref())?;
    info!(script, interpreter = %interpreter.path.display(), "running external tool");
    let status = interpreter
        .command()
        .arg(script)
        .args(args)
        .current_dir(&config.project_dir)
        .status()
        .with_context(|| format!("could not run {} {script}", interpreter.path.display()))?;
    Ok(exit_code(status))
}

/// The child's exit code. A child killed by a signal maps to `128 + signal`,
/// the way shells report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
