//! Netlist data model.
//!
//! A netlist is a JSON document listing named components placed at 2D
//! coordinates and the wires between their ports:
//!
//! ```json
//! {
//!   "name": "half_adder",
//!   "components": [
//!     { "name": "a", "kind": "input" },
//!     { "name": "b", "kind": "input" },
//!     { "name": "s", "kind": "xor", "at": { "x": 40, "y": 10 } },
//!     { "name": "sum", "kind": "output" }
//!   ],
//!   "wires": [
//!     { "from": "a", "to": "s.in0" },
//!     { "from": "b", "to": "s.in1" },
//!     { "from": "s", "to": "sum" }
//!   ]
//! }
//! ```

mod endpoint;
mod load;
mod validate;

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::components::{alu, memory::RegFile, wire::select_bits};

pub use endpoint::Endpoint;
pub use load::{Definition, Library, Pin};
pub use validate::{Connection, PortRef};

pub const MAX_WIDTH: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Netlist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub wires: Vec<WireSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub at: Point,
    #[serde(flatten)]
    pub kind: ComponentKind,
}

/// A point-to-point connection. `path` holds the drawn corner points and has
/// no electrical meaning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub path: Vec<Point>,
}

fn default_width() -> usize {
    1
}

fn default_inputs() -> usize {
    2
}

fn default_registers() -> usize {
    32
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_inputs")]
    pub inputs: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ComponentKind {
    Input {
        #[serde(default = "default_width")]
        width: usize,
    },
    Output {
        #[serde(default = "default_width")]
        width: usize,
    },
    Clock,
    Constant {
        #[serde(default = "default_width")]
        width: usize,
        #[serde(default, deserialize_with = "word")]
        value: u64,
    },
    And(Gate),
    Or(Gate),
    Xor(Gate),
    Nand(Gate),
    Nor(Gate),
    Xnor(Gate),
    Not {
        #[serde(default = "default_width")]
        width: usize,
    },
    Mux {
        #[serde(default = "default_width")]
        width: usize,
        #[serde(default = "default_inputs")]
        inputs: usize,
    },
    Adder {
        #[serde(default = "default_width")]
        width: usize,
    },
    Register {
        #[serde(default = "default_width")]
        width: usize,
    },
    Regfile {
        #[serde(default = "default_width")]
        width: usize,
        #[serde(default = "default_registers")]
        registers: usize,
    },
    Alu {
        #[serde(default = "default_width")]
        width: usize,
    },
    Extend {
        #[serde(default = "default_width")]
        width: usize,
        to: usize,
        #[serde(default)]
        signed: bool,
    },
    Rom {
        addr_width: usize,
        #[serde(default = "default_width")]
        width: usize,
        #[serde(default, deserialize_with = "words")]
        contents: Vec<u64>,
    },
    Subcircuit {
        path: PathBuf,
    },
}

/// Numbers in netlists may also be written as strings such as `"0x00500293"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Word {
    Number(u64),
    Text(String),
}

impl Word {
    fn value<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            Word::Number(n) => Ok(n),
            Word::Text(text) => parse_unsigned(&text)
                .ok_or_else(|| E::custom(format!("invalid number `{text}`"))),
        }
    }
}

fn word<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Word::deserialize(deserializer)?.value()
}

fn words<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
    Vec::<Word>::deserialize(deserializer)?
        .into_iter()
        .map(Word::value)
        .collect()
}

/// Parses decimal, `0x` hex or `0b` binary, with optional `_` separators.
pub fn parse_unsigned(text: &str) -> Option<u64> {
    let text = text.trim().replace('_', "");
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or(text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b").or(text.strip_prefix("0B")) {
        (bin, 2)
    } else {
        (text.as_str(), 10)
    };
    if digits.is_empty() || digits.starts_with('+') {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dir {
    In,
    Out,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSpec {
    pub name: String,
    pub dir: Dir,
    pub width: usize,
    /// Reads high while undriven.
    pub floating_high: bool,
}

impl PortSpec {
    fn input(name: impl Into<String>, width: usize) -> Self {
        PortSpec {
            name: name.into(),
            dir: Dir::In,
            width,
            floating_high: false,
        }
    }

    fn output(name: impl Into<String>, width: usize) -> Self {
        PortSpec {
            name: name.into(),
            dir: Dir::Out,
            width,
            floating_high: false,
        }
    }
}

impl ComponentKind {
    /// The `kind` tag as written in netlists.
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Input { .. } => "input",
            ComponentKind::Output { .. } => "output",
            ComponentKind::Clock => "clock",
            ComponentKind::Constant { .. } => "constant",
            ComponentKind::And(_) => "and",
            ComponentKind::Or(_) => "or",
            ComponentKind::Xor(_) => "xor",
            ComponentKind::Nand(_) => "nand",
            ComponentKind::Nor(_) => "nor",
            ComponentKind::Xnor(_) => "xnor",
            ComponentKind::Not { .. } => "not",
            ComponentKind::Mux { .. } => "mux",
            ComponentKind::Adder { .. } => "adder",
            ComponentKind::Register { .. } => "register",
            ComponentKind::Regfile { .. } => "regfile",
            ComponentKind::Alu { .. } => "alu",
            ComponentKind::Extend { .. } => "extend",
            ComponentKind::Rom { .. } => "rom",
            ComponentKind::Subcircuit { .. } => "subcircuit",
        }
    }

    /// Ports of a primitive component. Subcircuit ports come from the
    /// referenced netlist's pins instead.
    pub fn ports(&self) -> Vec<PortSpec> {
        let numbered = |prefix: &'static str, count: usize, width: usize| {
            (0..count).map(move |i| PortSpec::input(format!("{prefix}{i}"), width))
        };
        match self {
            ComponentKind::Input { width } | ComponentKind::Constant { width, .. } => {
                vec![PortSpec::output("out", *width)]
            }
            ComponentKind::Clock => vec![PortSpec::output("out", 1)],
            ComponentKind::Output { width } => vec![PortSpec::input("in", *width)],
            ComponentKind::And(gate)
            | ComponentKind::Or(gate)
            | ComponentKind::Xor(gate)
            | ComponentKind::Nand(gate)
            | ComponentKind::Nor(gate)
            | ComponentKind::Xnor(gate) => numbered("in", gate.inputs, gate.width)
                .chain([PortSpec::output("out", gate.width)])
                .collect(),
            ComponentKind::Not { width } => {
                vec![PortSpec::input("in", *width), PortSpec::output("out", *width)]
            }
            ComponentKind::Mux { width, inputs } => numbered("in", *inputs, *width)
                .chain([
                    PortSpec::input("sel", select_bits(*inputs)),
                    PortSpec::output("out", *width),
                ])
                .collect(),
            ComponentKind::Adder { width } => vec![
                PortSpec::input("a", *width),
                PortSpec::input("b", *width),
                PortSpec::input("cin", 1),
                PortSpec::output("sum", *width),
                PortSpec::output("cout", 1),
            ],
            ComponentKind::Register { width } => vec![
                PortSpec::input("d", *width),
                PortSpec::input("clk", 1),
                PortSpec {
                    floating_high: true,
                    ..PortSpec::input("en", 1)
                },
                PortSpec::output("q", *width),
            ],
            ComponentKind::Regfile { width, registers } => {
                let address = RegFile::address_width(*registers);
                let mut ports = vec![
                    PortSpec::input("rs1", address),
                    PortSpec::input("rs2", address),
                    PortSpec::input("rd", address),
                    PortSpec::input("wdata", *width),
                    PortSpec::input("wen", 1),
                    PortSpec::input("clk", 1),
                    PortSpec::output("rd1", *width),
                    PortSpec::output("rd2", *width),
                ];
                ports.extend((0..*registers).map(|i| PortSpec::output(format!("x{i}"), *width)));
                ports
            }
            ComponentKind::Alu { width } => vec![
                PortSpec::input("a", *width),
                PortSpec::input("b", *width),
                PortSpec::input("sel", alu::SELECT_WIDTH),
                PortSpec::output("result", *width),
            ],
            ComponentKind::Extend { width, to, .. } => {
                vec![PortSpec::input("in", *width), PortSpec::output("out", *to)]
            }
            ComponentKind::Rom {
                addr_width, width, ..
            } => vec![
                PortSpec::input("addr", *addr_width),
                PortSpec::output("data", *width),
            ],
            ComponentKind::Subcircuit { .. } => Vec::new(),
        }
    }
}
