use std::ops::{BitAnd, Shl};

use num_traits::Unsigned;

use crate::{
    circuit_sim::{CircuitSim, NodeType},
    Circuit, NodeId,
};

/// An ordered bundle of nodes, least significant bit first.
///
/// A node may appear more than once (sign extension repeats the top bit).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Wire(Vec<NodeId>);

pub fn mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Number of select bits needed to address `n` items.
pub fn select_bits(n: usize) -> usize {
    let mut bits = 0;
    while (1usize << bits) < n {
        bits += 1;
    }
    bits
}

impl Wire {
    /// Buffer nodes, low until something drives them.
    pub fn new(circuit: &mut Circuit, width: usize) -> Self {
        Wire((0..width).map(|_| circuit.create_node(NodeType::Or)).collect())
    }

    pub fn inputs(circuit: &mut Circuit, width: usize) -> Self {
        Wire((0..width).map(|_| circuit.create_input()).collect())
    }

    pub fn from_nodes(nodes: Vec<NodeId>) -> Self {
        Wire(nodes)
    }

    /// Gates without inputs: an unconnected Or is always low, an unconnected
    /// Nor always high.
    pub fn constant(circuit: &mut Circuit, width: usize, val: u64) -> Self {
        let low = circuit.create_node(NodeType::Or);
        let high = circuit.create_node(NodeType::Nor);
        Wire(
            (0..width)
                .map(|bit| if bit < 64 && val >> bit & 1 == 1 { high } else { low })
                .collect(),
        )
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    pub fn bit(&self, bit: usize) -> NodeId {
        self.0[bit]
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn msb(&self) -> NodeId {
        self.0[self.0.len() - 1]
    }

    pub fn read<T>(&self, circuit: &Circuit) -> T
    where
        T: Unsigned + Shl<usize, Output = T>,
    {
        let mut sum = T::zero();
        for (bit, node_id) in self.0.iter().cloned().enumerate() {
            if circuit.get_output(node_id) {
                sum = sum + (T::one() << bit);
            }
        }
        sum
    }

    pub fn read_signed(&self, circuit: &Circuit) -> i64 {
        let raw = self.read::<u64>(circuit);
        let width = self.width();
        if width == 0 || width >= 64 {
            return raw as i64;
        }
        let shift = 64 - width;
        ((raw << shift) as i64) >> shift
    }

    /// Drive every bit. Only valid for wires made of input nodes.
    pub fn set<T>(&self, circuit: &mut Circuit, val: T)
    where
        T: Unsigned + Copy + BitAnd<T, Output = T> + Shl<usize, Output = T>,
    {
        for (bit, node_id) in self.0.iter().cloned().enumerate() {
            let bit_val = !(val & (T::one() << bit)).is_zero();
            circuit.set_input(node_id, bit_val);
        }
    }

    pub fn connect(&self, circuit: &mut Circuit, output: &Wire) {
        assert_eq!(self.width(), output.width(), "connecting wires of different width");
        for (input, output) in self.0.iter().zip(output.0.iter()) {
            circuit.connect(*input, *output);
        }
    }

    pub fn map(&self, f: impl FnMut(NodeId) -> NodeId) -> Wire {
        Wire(self.0.iter().cloned().map(f).collect())
    }

    fn gate_each(&self, circuit: &mut Circuit, node_type: NodeType, inputs: &[NodeId]) -> Wire {
        self.map(|node_id| {
            let gate = circuit.create_node(node_type);
            circuit.connect(node_id, gate);
            for input in inputs {
                circuit.connect(*input, gate);
            }
            gate
        })
    }

    fn zip_gate(&self, circuit: &mut Circuit, node_type: NodeType, other: &Wire) -> Wire {
        assert_eq!(self.width(), other.width());
        Wire(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| {
                    let gate = circuit.create_node(node_type);
                    circuit.connect(*a, gate);
                    circuit.connect(*b, gate);
                    gate
                })
                .collect(),
        )
    }

    /// Every bit ANDed with `enable`.
    pub fn enable(&self, circuit: &mut Circuit, enable: NodeId) -> Wire {
        self.gate_each(circuit, NodeType::And, &[enable])
    }

    pub fn not(&self, circuit: &mut Circuit) -> Wire {
        self.gate_each(circuit, NodeType::Nor, &[])
    }

    pub fn and(&self, circuit: &mut Circuit, other: &Wire) -> Wire {
        self.zip_gate(circuit, NodeType::And, other)
    }

    pub fn or(&self, circuit: &mut Circuit, other: &Wire) -> Wire {
        self.zip_gate(circuit, NodeType::Or, other)
    }

    pub fn xor(&self, circuit: &mut Circuit, other: &Wire) -> Wire {
        self.zip_gate(circuit, NodeType::Xor, other)
    }

    /// Wired-or of several wires of equal width.
    pub fn merge(circuit: &mut Circuit, wires: &[Wire], width: usize) -> Wire {
        let output = Wire::new(circuit, width);
        for wire in wires {
            wire.connect(circuit, &output);
        }
        output
    }

    /// One-hot decode into `n` select lines.
    pub fn decode(&self, circuit: &mut Circuit, n: usize) -> Vec<NodeId> {
        assert!(
            self.width() >= 64 || n <= 1 << self.width(),
            "cannot decode {n} lines from {} bits",
            self.width()
        );
        let inverted = self.not(circuit);
        (0..n)
            .map(|i| {
                let line = circuit.create_node(NodeType::And);
                for bit in 0..self.width() {
                    let literal = if i >> bit & 1 == 1 {
                        self.0[bit]
                    } else {
                        inverted.0[bit]
                    };
                    circuit.connect(literal, line);
                }
                // Zero-width select: the only line is always on
                if self.width() == 0 {
                    let high = circuit.create_node(NodeType::Nor);
                    circuit.connect(high, line);
                }
                line
            })
            .collect()
    }

    pub fn slice(&self, start: usize, len: usize) -> Wire {
        Wire(self.0[start..start + len].to_vec())
    }

    /// `self` in the low bits, `high` above it.
    pub fn concat(&self, high: &Wire) -> Wire {
        let mut nodes = self.0.clone();
        nodes.extend_from_slice(&high.0);
        Wire(nodes)
    }

    /// Widen (or truncate) to `width`, filling with the top bit when `signed`.
    pub fn extend(&self, circuit: &mut Circuit, width: usize, signed: bool) -> Wire {
        if width <= self.width() {
            return self.slice(0, width);
        }
        let fill = if signed && self.width() > 0 {
            self.msb()
        } else {
            circuit.create_node(NodeType::Or)
        };
        let mut nodes = self.0.clone();
        nodes.resize(width, fill);
        Wire(nodes)
    }
}
