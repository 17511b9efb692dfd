//! Error type shared by the library.

use std::path::PathBuf;

use thiserror::Error;

use crate::circuit_sim::Ticks;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write test results")]
    Output(#[source] std::io::Error),

    #[error("could not parse netlist `{}`", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("vector table error: {0}")]
    Table(#[from] csv::Error),

    #[error("{netlist}: duplicate component `{name}`")]
    DuplicateComponent { netlist: String, name: String },

    #[error("{netlist}: invalid component name `{name}`")]
    InvalidName { netlist: String, name: String },

    #[error("{netlist}: component `{name}` has unsupported width {width} (1..=64)")]
    BadWidth {
        netlist: String,
        name: String,
        width: usize,
    },

    #[error("{netlist}: component `{name}`: {reason}")]
    BadComponent {
        netlist: String,
        name: String,
        reason: String,
    },

    #[error("{netlist}: malformed endpoint `{endpoint}`")]
    BadEndpoint { netlist: String, endpoint: String },

    #[error("{netlist}: unknown component `{name}`")]
    UnknownComponent { netlist: String, name: String },

    #[error("{netlist}: component `{component}` has no port `{port}`")]
    UnknownPort {
        netlist: String,
        component: String,
        port: String,
    },

    #[error("{netlist}: `{endpoint}` needs a port name, `{component}` has several")]
    AmbiguousPort {
        netlist: String,
        endpoint: String,
        component: String,
    },

    #[error("{netlist}: bits [{hi}:{lo}] out of range for `{endpoint}` ({width} bits wide)")]
    BitRange {
        netlist: String,
        endpoint: String,
        hi: usize,
        lo: usize,
        width: usize,
    },

    #[error("{netlist}: `{endpoint}` cannot be used as a wire {role}")]
    Direction {
        netlist: String,
        endpoint: String,
        role: &'static str,
    },

    #[error("{netlist}: wire `{from}` -> `{to}` connects {from_width} bits to {to_width} bits")]
    WidthMismatch {
        netlist: String,
        from: String,
        to: String,
        from_width: usize,
        to_width: usize,
    },

    #[error("{netlist}: bit {bit} of `{endpoint}` has more than one driver")]
    MultipleDrivers {
        netlist: String,
        endpoint: String,
        bit: usize,
    },

    #[error("subcircuit import cycle through `{}`", path.display())]
    ImportCycle { path: PathBuf },

    #[error("circuit did not settle within {max_ticks} ticks")]
    Oscillation { max_ticks: Ticks },

    #[error("design has no pin named `{0}`")]
    UnknownPin(String),

    #[error("pin `{0}` is an output and cannot be driven")]
    NotAnInput(String),

    #[error("row {row}, column `{column}`: cannot parse `{value}`")]
    BadValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row} has {found} cells, header has {expected}")]
    RowLength {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("environment variable {var} has invalid value `{value}`")]
    BadEnv { var: &'static str, value: String },

    #[error("no python interpreter found (tried {})", tried.join(", "))]
    NoInterpreter { tried: Vec<String> },

    #[error("`{}` is not Python 3 (reports `{version}`)", path.display())]
    NotPython3 { path: PathBuf, version: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
