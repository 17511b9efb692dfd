use crate::{
    circuit_builder::{ops::*, BuilderHooks, Connector},
    circuit_sim::{CircuitSim, NodeType},
    Circuit, InputId, NodeId,
};

use super::{gate, wire::Wire};

pub struct Adder<T: BuilderHooks> {
    pub sum: Connector<T>,
    pub cout: Connector<T>,
}

pub fn adder<T: BuilderHooks>(a: Connector<T>, b: Connector<T>, cin: Connector<T>) -> Adder<T> {
    let sum = gate!(xor, a, b, cin);
    let cout = gate!(or, gate!(and, a, b), gate!(and, a, cin), gate!(and, b, cin));
    Adder { sum, cout }
}

pub fn full_adder(circuit: &mut Circuit, a: NodeId, b: NodeId, cin: NodeId) -> (NodeId, NodeId) {
    let sum = gate(circuit, NodeType::Xor, &[a, b, cin]);
    let ab = gate(circuit, NodeType::And, &[a, b]);
    let a_cin = gate(circuit, NodeType::And, &[a, cin]);
    let b_cin = gate(circuit, NodeType::And, &[b, cin]);
    let cout = gate(circuit, NodeType::Or, &[ab, a_cin, b_cin]);
    (sum, cout)
}

/// Returns `(sum, carry out)`.
pub fn ripple_carry(circuit: &mut Circuit, a: &Wire, b: &Wire, cin: NodeId) -> (Wire, NodeId) {
    assert_eq!(a.width(), b.width());
    let mut carry = cin;
    let mut sum = Vec::with_capacity(a.width());
    for (a, b) in a.nodes().iter().zip(b.nodes()) {
        let (bit, cout) = full_adder(circuit, *a, *b, carry);
        sum.push(bit);
        carry = cout;
    }
    (Wire::from_nodes(sum), carry)
}

/// `a - b` as `a + !b + 1`. The carry out is set when no borrow happened.
pub fn subtract(circuit: &mut Circuit, a: &Wire, b: &Wire) -> (Wire, NodeId) {
    let b_not = b.not(circuit);
    let one = circuit.create_node(NodeType::Nor);
    ripple_carry(circuit, a, &b_not, one)
}

pub struct RippleCarryAdder {
    pub input_a: Wire,
    pub input_b: Wire,
    pub cin: InputId,
    pub cout: NodeId,
    pub sum: Wire,
}

impl RippleCarryAdder {
    pub fn new(circuit: &mut Circuit, bits: usize) -> RippleCarryAdder {
        assert!(bits > 0);
        let input_a = Wire::inputs(circuit, bits);
        let input_b = Wire::inputs(circuit, bits);
        let cin = circuit.create_input();
        let (sum, cout) = ripple_carry(circuit, &input_a, &input_b, cin);
        RippleCarryAdder {
            input_a,
            input_b,
            cin,
            cout,
            sum,
        }
    }
}
